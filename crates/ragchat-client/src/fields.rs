use ragchat_core::StreamEvent;
use serde_json::{Map, Value};
use tracing::debug;

/// The fields of one assistant message, folded from its stream events.
///
/// Tokens build a best-effort preview of the answer. The `final` event carries
/// the authoritative answer, which always wins over the preview. Every other
/// field is replaced wholesale by each new event of its kind.
#[derive(Debug, Clone, Default)]
pub struct MessageFields {
    answer_source: String,
    authoritative: Option<String>,
    status: Option<String>,
    label: Option<f64>,
    reason: Option<String>,
    rewritten_question: Option<String>,
    extra: Map<String, Value>,
    token_count: usize,
    unrecognized: usize,
}

impl MessageFields {
    /// Empty fields for a new turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the fields.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Token { text } => {
                if self.authoritative.is_some() {
                    debug!("Token after final answer ignored");
                    return;
                }
                self.answer_source.push_str(text);
                self.token_count += 1;
            }
            StreamEvent::Status { text } => self.status = Some(text.clone()),
            StreamEvent::Label { value } => self.label = Some(*value),
            StreamEvent::Reason { text } => self.reason = Some(text.clone()),
            StreamEvent::RewrittenQuestion { text } => {
                self.rewritten_question = Some(text.clone());
            }
            StreamEvent::Final { answer, extra } => {
                if answer.len() != self.answer_source.len() {
                    debug!(
                        preview_len = self.answer_source.len(),
                        final_len = answer.len(),
                        "Final answer replaces token preview"
                    );
                    self.answer_source = answer.clone();
                }
                self.authoritative = Some(answer.clone());
                self.extra = extra.clone();
                self.status = None;
            }
            StreamEvent::Other(_) => {
                self.unrecognized += 1;
                debug!(kind = event.kind(), "Ignoring unrecognized event");
            }
        }
    }

    /// Text the reveal timeline should animate toward.
    pub fn answer_source(&self) -> &str {
        &self.answer_source
    }

    /// What to render given the currently revealed text.
    ///
    /// Once the reveal has caught up with the full known answer, the answer
    /// itself is returned (the authoritative one after `final`), so nothing is
    /// left to drift; until then the animated prefix is shown.
    pub fn visible_answer<'a>(&'a self, displayed: &'a str) -> &'a str {
        let full = self.authoritative.as_deref().unwrap_or(&self.answer_source);
        if displayed.len() >= full.len() {
            full
        } else {
            displayed
        }
    }

    /// Whether the `final` event has arrived.
    pub fn is_final(&self) -> bool {
        self.authoritative.is_some()
    }

    /// The authoritative answer, once known.
    pub fn final_answer(&self) -> Option<&str> {
        self.authoritative.as_deref()
    }

    /// Latest progress label; cleared by `final`.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Latest classification label.
    pub fn label(&self) -> Option<f64> {
        self.label
    }

    /// Latest explanation.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The query the server actually searched with.
    pub fn rewritten_question(&self) -> Option<&str> {
        self.rewritten_question.as_deref()
    }

    /// Side-channel fields of the final event.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Retrieved documents listed by the final event, if any.
    pub fn documents(&self) -> Option<&Vec<Value>> {
        self.extra.get("documents").and_then(Value::as_array)
    }

    /// Tokens folded into the preview.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Events of kinds this client does not know.
    pub fn unrecognized_count(&self) -> usize {
        self.unrecognized
    }
}
