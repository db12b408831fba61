use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// The transfer a stop control currently targets.
struct ActiveTransfer {
    id: u64,
    abort_tx: watch::Sender<bool>,
}

/// Single-slot registry of the current streaming transfer.
///
/// Only one transfer is reachable at a time. Registering a new one replaces the
/// previous handle without cancelling it: the superseded transfer keeps running
/// but can no longer be stopped through [`abort_current`](Self::abort_current).
/// Callers that need exclusivity must abort before starting again.
pub struct TransferSlot {
    current: Mutex<Option<ActiveTransfer>>,
    next_id: AtomicU64,
    user_abort: AtomicBool,
}

impl TransferSlot {
    /// An empty slot.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install a new current transfer.
    pub fn begin(self: &Arc<Self>) -> TransferGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (abort_tx, abort_rx) = watch::channel(false);
        let previous = self
            .current
            .lock()
            .replace(ActiveTransfer { id, abort_tx });
        if let Some(prev) = previous {
            tracing::debug!(
                transfer_id = id,
                superseded = prev.id,
                "Previous transfer is no longer cancellable"
            );
        }
        TransferGuard {
            slot: Arc::clone(self),
            id,
            abort_rx,
        }
    }

    /// Abort the current transfer, if any.
    ///
    /// Arms the one-shot user-abort flag before signalling, so the error the
    /// transfer surfaces can be recognised as requested. Returns `false` and
    /// leaves the flag untouched when nothing is active.
    pub fn abort_current(&self) -> bool {
        let Some(active) = self.current.lock().take() else {
            return false;
        };
        self.user_abort.store(true, Ordering::SeqCst);
        let _ = active.abort_tx.send(true);
        tracing::info!(transfer_id = active.id, "Transfer aborted by user");
        true
    }

    /// Consume the user-abort flag: `true` exactly once per abort.
    pub fn take_user_abort(&self) -> bool {
        self.user_abort.swap(false, Ordering::SeqCst)
    }

    /// Whether a transfer is currently registered.
    pub fn is_active(&self) -> bool {
        self.current.lock().is_some()
    }

    fn settle(&self, id: u64) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|t| t.id == id) {
            *current = None;
        }
    }
}

impl Default for TransferSlot {
    fn default() -> Self {
        Self {
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            user_abort: AtomicBool::new(false),
        }
    }
}

/// Registration of one transfer; clears the slot on drop if still current.
pub struct TransferGuard {
    slot: Arc<TransferSlot>,
    id: u64,
    abort_rx: watch::Receiver<bool>,
}

impl TransferGuard {
    /// Identifier of this transfer, unique within its slot.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Resolves once this transfer has been aborted.
    ///
    /// Never resolves for a superseded transfer, whose abort handle was dropped
    /// without firing.
    pub async fn aborted(&mut self) {
        loop {
            if *self.abort_rx.borrow_and_update() {
                return;
            }
            if self.abort_rx.changed().await.is_err() {
                // Check the final value once more; the sender may have fired
                // right before being dropped.
                if *self.abort_rx.borrow() {
                    return;
                }
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.slot.settle(self.id);
    }
}
