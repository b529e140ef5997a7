//! Outbound reply payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user-facing rejection sent back to the context an event came from.
///
/// Produced either from a configured error message matching a handler
/// failure, or from a configured message for an eligibility rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// The configured message text, possibly containing `{param}` placeholders.
    pub text: String,
    /// Structured parameters attached to the originating failure.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Rejection {
    /// Creates a rejection without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Map::new(),
        }
    }

    /// Creates a rejection carrying the given parameters.
    pub fn with_params(text: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }

    /// Renders the text, substituting `{name}` placeholders with parameters.
    ///
    /// String parameters are inserted verbatim; other values use their JSON
    /// representation. Placeholders without a matching parameter are kept.
    /// Inserted values are never scanned for placeholders themselves.
    pub fn render(&self) -> String {
        let mut rendered = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                rest = &rest[open..];
                break;
            };

            let key = &after[..close];
            if key.contains('{') {
                rendered.push('{');
                rest = after;
                continue;
            }
            match self.params.get(key) {
                Some(Value::String(s)) => rendered.push_str(s),
                Some(other) => rendered.push_str(&other.to_string()),
                None => {
                    rendered.push('{');
                    rendered.push_str(key);
                    rendered.push('}');
                }
            }
            rest = &after[close + 1..];
        }

        rendered.push_str(rest);
        rendered
    }
}

/// A single autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Label shown to the user.
    pub name: String,
    /// Value submitted when the suggestion is picked.
    pub value: Value,
}

impl Choice {
    /// Creates a suggestion.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
