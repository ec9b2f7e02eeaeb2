//! Conversation data model: messages and their streamed parts.
//!
//! A conversation is an append-only list of messages. A message is an ordered
//! list of typed parts; assistant parts grow while a response streams and are
//! frozen when the stream ends. The wire form tags each part with a `"type"`
//! field; anything we don't recognize folds into [`Part::Unknown`] so a newer
//! server can never crash an older renderer.

use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One typed fragment of a streamed message.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Prose text. May arrive as successive deltas that the view concatenates.
    Text { text: String },
    /// Marker that the model began a new internal step. No payload.
    StepStart,
    /// The model decided to call a named tool with the given arguments.
    ToolInvocation { tool_name: String, args: Value },
    /// Outcome of a tool invocation, correlated by position and tool name.
    ToolResult {
        tool_name: String,
        result: Value,
        is_error: bool,
    },
    /// Catch-all for part shapes this build doesn't know about.
    Unknown { raw: Value },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text { text: s.into() }
    }

    /// Wire tag for this part. `Unknown` reports whatever tag the raw payload
    /// carried, or `"unknown"` if it had none.
    pub fn tag(&self) -> &str {
        match self {
            Part::Text { .. } => "text",
            Part::StepStart => "step-start",
            Part::ToolInvocation { .. } => "tool-invocation",
            Part::ToolResult { .. } => "tool-result",
            Part::Unknown { raw } => raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    /// Parse a part from its wire JSON. Never fails: unrecognized tags and
    /// malformed payloads become [`Part::Unknown`] carrying the raw value.
    pub fn from_value(v: Value) -> Self {
        match v.get("type").and_then(Value::as_str) {
            Some("text") => match v.get("text").and_then(Value::as_str) {
                Some(text) => Part::Text {
                    text: text.to_string(),
                },
                None => Part::Unknown { raw: v },
            },
            Some("step-start") => Part::StepStart,
            Some("tool-invocation") => match v.get("toolName").and_then(Value::as_str) {
                Some(name) => Part::ToolInvocation {
                    tool_name: name.to_string(),
                    args: v.get("args").cloned().unwrap_or(Value::Null),
                },
                None => Part::Unknown { raw: v },
            },
            Some("tool-result") => match v.get("toolName").and_then(Value::as_str) {
                Some(name) => Part::ToolResult {
                    tool_name: name.to_string(),
                    result: v.get("result").cloned().unwrap_or(Value::Null),
                    is_error: v.get("isError").and_then(Value::as_bool).unwrap_or(false),
                },
                None => Part::Unknown { raw: v },
            },
            _ => Part::Unknown { raw: v },
        }
    }

    /// Wire JSON for this part. `Unknown` echoes its raw payload verbatim so
    /// unrecognized parts survive a round trip unchanged.
    pub fn to_value(&self) -> Value {
        match self {
            Part::Text { text } => json!({ "type": "text", "text": text }),
            Part::StepStart => json!({ "type": "step-start" }),
            Part::ToolInvocation { tool_name, args } => json!({
                "type": "tool-invocation",
                "toolName": tool_name,
                "args": args,
            }),
            Part::ToolResult {
                tool_name,
                result,
                is_error,
            } => json!({
                "type": "tool-result",
                "toolName": tool_name,
                "result": result,
                "isError": is_error,
            }),
            Part::Unknown { raw } => raw.clone(),
        }
    }
}

impl Serialize for Part {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Part::from_value)
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    /// A user message carries exactly one text part, fixed at creation.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// An assistant message starts empty; parts are appended as they stream in.
    pub fn assistant() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            parts: Vec::new(),
        }
    }

    /// Concatenated text content across all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl<'de> Deserialize<'de> for Message {
    /// Accepts the canonical `{id, role, parts}` shape, but also normalizes a
    /// flat `text` or `content` string into a one-element text parts list so
    /// the renderer only ever sees one shape.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;

        let id = v
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

        let role = match v.get("role").and_then(Value::as_str) {
            Some("user") => Role::User,
            Some("assistant") => Role::Assistant,
            other => {
                return Err(D::Error::custom(format!(
                    "unsupported message role: {other:?}"
                )))
            }
        };

        let parts = match v.get("parts").and_then(Value::as_array) {
            Some(raw) if !raw.is_empty() => {
                raw.iter().cloned().map(Part::from_value).collect()
            }
            _ => {
                let flat = v
                    .get("text")
                    .or_else(|| v.get("content"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                vec![Part::text(flat)]
            }
        };

        Ok(Message { id, role, parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_part_round_trips() {
        let part = Part::text("hello");
        let wire = serde_json::to_value(&part).unwrap();
        assert_eq!(wire, json!({"type": "text", "text": "hello"}));
        assert_eq!(Part::from_value(wire), part);
    }

    #[test]
    fn tool_parts_round_trip() {
        let inv = Part::ToolInvocation {
            tool_name: "db".to_string(),
            args: json!({"query": "SELECT 1"}),
        };
        let res = Part::ToolResult {
            tool_name: "db".to_string(),
            result: json!({"rows": []}),
            is_error: false,
        };
        for part in [inv, res] {
            assert_eq!(Part::from_value(part.to_value()), part);
        }
    }

    #[test]
    fn unknown_tag_is_preserved_verbatim() {
        let wire = json!({"type": "future-tag", "payload": {"x": 1}});
        let part = Part::from_value(wire.clone());
        assert_eq!(part, Part::Unknown { raw: wire.clone() });
        assert_eq!(part.to_value(), wire);
        assert_eq!(part.tag(), "future-tag");
    }

    #[test]
    fn malformed_known_tag_degrades_to_unknown() {
        // A "text" part without a text field must not be misread as empty text.
        let wire = json!({"type": "text", "txet": "typo"});
        assert!(matches!(Part::from_value(wire), Part::Unknown { .. }));
    }

    #[test]
    fn message_deserializes_canonical_shape() {
        let msg: Message = serde_json::from_value(json!({
            "id": "m1",
            "role": "assistant",
            "parts": [
                {"type": "step-start"},
                {"type": "text", "text": "hi"},
            ],
        }))
        .unwrap();
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.parts, vec![Part::StepStart, Part::text("hi")]);
    }

    #[test]
    fn flat_text_normalizes_to_single_part() {
        for field in ["text", "content"] {
            let msg: Message = serde_json::from_value(json!({
                "id": "m1",
                "role": "user",
                field: "show me sales",
            }))
            .unwrap();
            assert_eq!(msg.parts, vec![Part::text("show me sales")]);
        }
    }

    #[test]
    fn unsupported_role_is_rejected() {
        let result: Result<Message, _> =
            serde_json::from_value(json!({"id": "m1", "role": "system", "text": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn conversation_round_trip_preserves_part_order() {
        let original = vec![
            Message::user("what sold best?"),
            Message {
                id: "a1".to_string(),
                role: Role::Assistant,
                parts: vec![
                    Part::StepStart,
                    Part::ToolInvocation {
                        tool_name: "schema".to_string(),
                        args: json!({"query": ""}),
                    },
                    Part::ToolResult {
                        tool_name: "schema".to_string(),
                        result: json!("products, sales"),
                        is_error: false,
                    },
                    Part::text("Laptops."),
                    Part::Unknown {
                        raw: json!({"type": "v2-annotation", "data": [1, 2]}),
                    },
                ],
            },
        ];

        let wire = serde_json::to_value(&original).unwrap();
        let back: Vec<Message> = serde_json::from_value(wire).unwrap();
        assert_eq!(back, original);
    }
}
