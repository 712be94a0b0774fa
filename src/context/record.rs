//! Context record: typed, identified metadata attached to events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type name of the sentinel substituted for failed resolutions
pub const ERROR_CONTEXT_TYPE: &str = "ErrorContext";

/// Type name of the global context describing the tracked application
pub const APPLICATION_CONTEXT_TYPE: &str = "ApplicationContext";

/// Message carried by an [`ERROR_CONTEXT_TYPE`] context when a deferred value times out
pub const TIMEOUT_MESSAGE: &str = "timeout";

const ERROR_CONTEXT_ID: &str = "error";
const MESSAGE_ATTRIBUTE: &str = "message";

/// An immutable context record.
///
/// Serialized flat: `{"_type": "...", "id": "...", ...attributes}`. Whether a
/// context is global or part of a location stack is decided by where it is
/// placed on the event, not by the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "_type")]
    type_name: String,
    id: String,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl Context {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Attach a type-specific attribute. `_type` and `id` are reserved and ignored.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "_type" && key != "id" {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Sentinel context recording why a value could not be resolved.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ERROR_CONTEXT_TYPE, ERROR_CONTEXT_ID)
            .with_attribute(MESSAGE_ATTRIBUTE, message.into())
    }

    pub fn application(application_id: impl Into<String>) -> Self {
        Self::new(APPLICATION_CONTEXT_TYPE, application_id)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn is_error(&self) -> bool {
        self.type_name == ERROR_CONTEXT_TYPE
    }

    /// Message of an error context, `None` for any other context.
    pub fn error_message(&self) -> Option<&str> {
        if !self.is_error() {
            return None;
        }
        self.attribute(MESSAGE_ATTRIBUTE).and_then(Value::as_str)
    }

    /// `Type:id` rendering used in location paths and diagnostics.
    pub fn path_segment(&self) -> String {
        format!("{}:{}", self.type_name, self.id)
    }

    /// True when both records share type name and id.
    pub fn same_identity(&self, other: &Context) -> bool {
        self.type_name == other.type_name && self.id == other.id
    }
}
