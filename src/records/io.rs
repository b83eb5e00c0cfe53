// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Step input/output values.
//!
//! A step's input and output are either a plain string, a single chat
//! message, or a homogeneous list of strings, messages or documents. Values
//! coming from arbitrary callers go through [`StepIO::from_json`], which
//! rejects anything that is not losslessly representable as JSON in one of
//! those shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;

// ============================================================================
// Messages
// ============================================================================

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
    Function,
    Developer,
    Agent,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
            MessageRole::Function => "function",
            MessageRole::Developer => "developer",
            MessageRole::Agent => "agent",
        }
    }
}

/// A tool invocation requested by an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw argument payload as produced by the model.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// Create a message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a tool result message answering the given tool call.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(MessageRole::Tool, content)
        }
    }

    /// Attach tool calls to this message.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Scalar metadata value attached to a retrieved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

/// A document returned by a retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    pub content: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Step IO
// ============================================================================

/// Input or output of a step.
///
/// An empty list carries no element type and always reads back as
/// `Texts(vec![])`. Span constructors re-normalize it to the list kind the
/// span expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepIO {
    Text(String),
    Message(Message),
    Texts(Vec<String>),
    Messages(Vec<Message>),
    Documents(Vec<Document>),
}

impl StepIO {
    /// Build a value from anything serializable, validating its shape.
    ///
    /// Accepts a string, a message object (`role` + `content`), or a
    /// homogeneous array of strings, messages or documents.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ValidationError> {
        let value = serde_json::to_value(value)?;
        Self::from_value("value", value)
    }

    /// Validate an already-materialized JSON value, naming `field` in errors.
    pub fn from_value(field: &str, value: serde_json::Value) -> Result<Self, ValidationError> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(StepIO::Text(s)),
            Value::Object(_) => serde_json::from_value::<Message>(value)
                .map(StepIO::Message)
                .map_err(|_| ValidationError::shape(field, "object that is not a message")),
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    let texts = items
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect();
                    return Ok(StepIO::Texts(texts));
                }
                let array = Value::Array(items);
                if let Ok(messages) = serde_json::from_value::<Vec<Message>>(array.clone()) {
                    return Ok(StepIO::Messages(messages));
                }
                serde_json::from_value::<Vec<Document>>(array)
                    .map(StepIO::Documents)
                    .map_err(|_| ValidationError::shape(field, "heterogeneous list"))
            }
            Value::Null => Err(ValidationError::shape(field, "null")),
            Value::Bool(_) => Err(ValidationError::shape(field, "boolean")),
            Value::Number(_) => Err(ValidationError::shape(field, "number")),
        }
    }

    /// String form used when an output is copied up the tree.
    ///
    /// Text is returned verbatim; every other shape is its JSON encoding.
    pub fn to_text(&self) -> String {
        match self {
            StepIO::Text(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StepIO::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for an empty string or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            StepIO::Text(s) => s.is_empty(),
            StepIO::Message(_) => false,
            StepIO::Texts(v) => v.is_empty(),
            StepIO::Messages(v) => v.is_empty(),
            StepIO::Documents(v) => v.is_empty(),
        }
    }

    /// Normalize into a message list for LLM spans.
    ///
    /// Bare strings become messages with `default_role`; documents are not a
    /// valid LLM payload.
    pub fn into_messages(self, field: &str, default_role: MessageRole) -> Result<Vec<Message>, ValidationError> {
        match self {
            StepIO::Text(s) => Ok(vec![Message::new(default_role, s)]),
            StepIO::Message(m) => Ok(vec![m]),
            StepIO::Texts(v) => Ok(v.into_iter().map(|s| Message::new(default_role, s)).collect()),
            StepIO::Messages(v) => Ok(v),
            StepIO::Documents(_) => Err(ValidationError::shape(field, "document list")),
        }
    }

    /// Normalize into a document list for retriever spans.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            StepIO::Text(s) => vec![Document::new(s)],
            StepIO::Message(m) => vec![Document::new(m.content)],
            StepIO::Texts(v) => v.into_iter().map(Document::new).collect(),
            StepIO::Messages(v) => v.into_iter().map(|m| Document::new(m.content)).collect(),
            StepIO::Documents(v) => v,
        }
    }
}

impl Default for StepIO {
    fn default() -> Self {
        StepIO::Text(String::new())
    }
}

impl From<&str> for StepIO {
    fn from(s: &str) -> Self {
        StepIO::Text(s.to_string())
    }
}

impl From<String> for StepIO {
    fn from(s: String) -> Self {
        StepIO::Text(s)
    }
}

impl From<Message> for StepIO {
    fn from(m: Message) -> Self {
        StepIO::Message(m)
    }
}

impl From<Vec<String>> for StepIO {
    fn from(v: Vec<String>) -> Self {
        StepIO::Texts(v)
    }
}

impl From<Vec<Message>> for StepIO {
    fn from(v: Vec<Message>) -> Self {
        StepIO::Messages(v)
    }
}

impl From<Vec<Document>> for StepIO {
    fn from(v: Vec<Document>) -> Self {
        StepIO::Documents(v)
    }
}
