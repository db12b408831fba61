use crate::fields::MessageFields;
use ragchat_core::{PersistKey, RagchatError, StreamEvent};
use ragchat_reveal::RevealStore;
use ragchat_stream::StreamClient;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// How a streamed turn settled.
#[derive(Debug)]
pub enum TurnStatus {
    /// The stream ended normally.
    Completed,
    /// Stopped on request; partial text is kept.
    Cancelled,
    /// Transport failure, error status, or stall. The turn is retryable.
    Failed(RagchatError),
}

/// Result of one streamed turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Everything the stream delivered before it settled.
    pub fields: MessageFields,
    /// How the turn settled.
    pub status: TurnStatus,
}

impl TurnOutcome {
    /// Whether the turn ended normally.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, TurnStatus::Completed)
    }

    /// Whether the turn was stopped on request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, TurnStatus::Cancelled)
    }
}

/// Streams one turn into a reveal timeline.
pub struct TurnStreamer {
    client: StreamClient,
    store: Arc<RevealStore>,
}

impl TurnStreamer {
    /// Stream with `client`, revealing into `store`.
    pub fn new(client: StreamClient, store: Arc<RevealStore>) -> Self {
        Self { client, store }
    }

    /// The streaming client; use it to stop the turn.
    pub fn client(&self) -> &StreamClient {
        &self.client
    }

    /// The store the turn reveals into.
    pub fn store(&self) -> &Arc<RevealStore> {
        &self.store
    }

    /// [`run_with`](Self::run_with) without an observer.
    pub async fn run<P>(&self, path: &str, payload: &P, key: &PersistKey) -> TurnOutcome
    where
        P: Serialize + ?Sized,
    {
        self.run_with(path, payload, key, |_, _| {}).await
    }

    /// Stream `path` into the timeline for `key`, calling `observe` after each
    /// event has been folded into the message fields.
    ///
    /// The timeline restarts from empty, so re-running a turn on the same key
    /// (a retry) animates the new generation from the beginning. The final
    /// answer replaces the source without re-animating text already revealed
    /// (see [`RevealStore::replace_source`]). A failure
    /// while the user-abort flag is armed settles as
    /// [`TurnStatus::Cancelled`] and leaves revealed text in place.
    pub async fn run_with<P, F>(
        &self,
        path: &str,
        payload: &P,
        key: &PersistKey,
        mut observe: F,
    ) -> TurnOutcome
    where
        P: Serialize + ?Sized,
        F: FnMut(&StreamEvent, &MessageFields),
    {
        let mut fields = MessageFields::new();
        self.store.update_source(key, "", true);

        let result = self
            .client
            .start_stream(path, payload, |event| {
                fields.apply(&event);
                match fields.final_answer() {
                    Some(answer) if event.is_final() => {
                        self.store.replace_source(key, answer, true);
                    }
                    _ => self.store.update_source(key, fields.answer_source(), true),
                }
                observe(&event, &fields);
            })
            .await;

        // Production is over; whatever is queued keeps animating.
        self.store.update_source(key, fields.answer_source(), false);

        let status = match result {
            Ok(()) => {
                info!(key = %key, tokens = fields.token_count(), "Turn completed");
                TurnStatus::Completed
            }
            Err(e) => {
                if self.client.take_user_abort() {
                    info!(key = %key, "Turn stopped by user");
                    TurnStatus::Cancelled
                } else {
                    warn!(key = %key, error = %e, "Turn failed");
                    TurnStatus::Failed(e)
                }
            }
        };

        TurnOutcome { fields, status }
    }

    /// Text to render for `fields` on `key` right now.
    pub fn visible_answer(&self, key: &PersistKey, fields: &MessageFields) -> String {
        let displayed = self.store.displayed(key).unwrap_or_default();
        fields.visible_answer(&displayed).to_string()
    }
}
