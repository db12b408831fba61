use crate::rate::RevealRate;
use crate::store::RevealStore;
use ragchat_core::PersistKey;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A mounted view of one timeline.
///
/// While alive, a background task ticks the timeline every
/// [`RevealRate::tick_interval`] and publishes the displayed text. The first
/// tick happens immediately, crediting the time spent unmounted. Dropping the
/// subscription stops ticking; the timeline itself stays in the store.
pub struct RevealSubscription {
    key: PersistKey,
    rx: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl RevealSubscription {
    /// Mount a view of `key`, ticking at `rate` until dropped.
    pub fn spawn(store: Arc<RevealStore>, key: PersistKey, rate: RevealRate) -> Self {
        let initial = store.displayed(&key).unwrap_or_default();
        let (tx, rx) = watch::channel(initial);

        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(rate.tick_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = interval.tick() => {}
                }

                if store.tick(&task_key, &rate).is_none() {
                    continue;
                }
                if let Some(text) = store.displayed(&task_key) {
                    tx.send_if_modified(|current| {
                        if *current == text {
                            false
                        } else {
                            *current = text;
                            true
                        }
                    });
                }
            }
            tracing::debug!(key = %task_key, "Reveal subscription closed");
        });

        Self { key, rx, task }
    }

    /// The key this subscription ticks.
    pub fn key(&self) -> &PersistKey {
        &self.key
    }

    /// The text displayed as of the last tick.
    pub fn displayed(&self) -> String {
        self.rx.borrow().clone()
    }

    /// Wait for the displayed text to change. Returns `false` once the ticking
    /// task has stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// An independent receiver of the displayed text.
    pub fn receiver(&self) -> watch::Receiver<String> {
        self.rx.clone()
    }
}

impl Drop for RevealSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
