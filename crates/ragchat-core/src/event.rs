use serde_json::{Map, Value};

/// Events demultiplexed from a streamed assistant response.
///
/// Each record of the response body is a JSON object with a `type`
/// discriminator. Only [`StreamEvent::Token`] is an append signal; every other
/// text-bearing kind carries a whole replacement value and must never be
/// concatenated.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An incremental fragment of the answer.
    Token {
        /// Text to append to the answer.
        text: String,
    },

    /// A transient progress label; each one replaces the previous.
    Status {
        /// The new progress label.
        text: String,
    },

    /// A classification output, e.g. `0` or `1`.
    Label {
        /// The label value.
        value: f64,
    },

    /// Replacement value of the explanatory field.
    Reason {
        /// The whole explanation.
        text: String,
    },

    /// Replacement value of the derived search query.
    RewrittenQuestion {
        /// The whole rewritten query.
        text: String,
    },

    /// Terminal event with the authoritative answer.
    ///
    /// `extra` holds every other field of the record, such as the list of
    /// retrieved documents.
    Final {
        /// The complete answer.
        answer: String,
        /// Remaining fields of the record.
        extra: Map<String, Value>,
    },

    /// A well-formed object of a kind this client does not know.
    Other(Value),
}

impl StreamEvent {
    /// Classifies a parsed JSON record.
    ///
    /// Records with an unknown `type`, or a known `type` whose payload field
    /// is missing or ill-typed, are passed through as [`StreamEvent::Other`].
    pub fn from_value(value: Value) -> Self {
        let known = match value.get("type").and_then(Value::as_str) {
            Some("token") => text_field(&value).map(|text| Self::Token { text }),
            Some("status") => text_field(&value).map(|text| Self::Status { text }),
            Some("reason") => text_field(&value).map(|text| Self::Reason { text }),
            Some("rewritten_question") => {
                text_field(&value).map(|text| Self::RewrittenQuestion { text })
            }
            Some("label") => value
                .get("value")
                .or_else(|| value.get("label"))
                .and_then(Value::as_f64)
                .map(|value| Self::Label { value }),
            Some("final") => value.get("answer").and_then(Value::as_str).map(|answer| {
                let extra = value
                    .as_object()
                    .map(|obj| {
                        obj.iter()
                            .filter(|(k, _)| k.as_str() != "type" && k.as_str() != "answer")
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                Self::Final {
                    answer: answer.to_string(),
                    extra,
                }
            }),
            _ => None,
        };

        known.unwrap_or(Self::Other(value))
    }

    /// The wire discriminator of this event.
    ///
    /// Opaque events report their own `type` field, or `""` when absent.
    pub fn kind(&self) -> &str {
        match self {
            Self::Token { .. } => "token",
            Self::Status { .. } => "status",
            Self::Label { .. } => "label",
            Self::Reason { .. } => "reason",
            Self::RewrittenQuestion { .. } => "rewritten_question",
            Self::Final { .. } => "final",
            Self::Other(value) => value.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }

    /// Whether this event's text is appended to what came before.
    pub fn is_append(&self) -> bool {
        matches!(self, Self::Token { .. })
    }

    /// Whether this event ends the stream.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final { .. })
    }
}

/// Text payload of a text-bearing record: `content`, falling back to `text`.
fn text_field(value: &Value) -> Option<String> {
    value
        .get("content")
        .or_else(|| value.get("text"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_reads_content_field() {
        let evt = StreamEvent::from_value(json!({"type": "token", "content": "Hel"}));
        assert_eq!(evt, StreamEvent::Token { text: "Hel".into() });
        assert!(evt.is_append());
    }

    #[test]
    fn test_token_falls_back_to_text_field() {
        let evt = StreamEvent::from_value(json!({"type": "token", "text": "lo"}));
        assert_eq!(evt, StreamEvent::Token { text: "lo".into() });
    }

    #[test]
    fn test_replacement_kinds_are_not_append() {
        for kind in ["status", "reason", "rewritten_question"] {
            let evt = StreamEvent::from_value(json!({"type": kind, "content": "x"}));
            assert_eq!(evt.kind(), kind);
            assert!(!evt.is_append());
        }
    }

    #[test]
    fn test_label_value() {
        let evt = StreamEvent::from_value(json!({"type": "label", "value": 1}));
        assert_eq!(evt, StreamEvent::Label { value: 1.0 });
        let evt = StreamEvent::from_value(json!({"type": "label", "label": 0}));
        assert_eq!(evt, StreamEvent::Label { value: 0.0 });
    }

    #[test]
    fn test_final_collects_extra_fields() {
        let evt = StreamEvent::from_value(json!({
            "type": "final",
            "answer": "Paris",
            "documents": [{"id": "d1"}],
        }));
        match evt {
            StreamEvent::Final { answer, extra } => {
                assert_eq!(answer, "Paris");
                assert_eq!(extra.len(), 1);
                assert_eq!(extra["documents"][0]["id"], "d1");
            }
            other => panic!("expected final, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_passes_through() {
        let raw = json!({"type": "sources_ready", "count": 3});
        let evt = StreamEvent::from_value(raw.clone());
        assert_eq!(evt.kind(), "sources_ready");
        assert_eq!(evt, StreamEvent::Other(raw));
    }

    #[test]
    fn test_known_kind_with_bad_payload_passes_through() {
        let raw = json!({"type": "token", "content": 42});
        assert_eq!(StreamEvent::from_value(raw.clone()), StreamEvent::Other(raw));

        let raw = json!({"type": "final"});
        assert_eq!(StreamEvent::from_value(raw.clone()), StreamEvent::Other(raw));
    }

    #[test]
    fn test_missing_type_has_empty_kind() {
        let evt = StreamEvent::from_value(json!({"content": "x"}));
        assert_eq!(evt.kind(), "");
        assert!(!evt.is_final());
    }
}
