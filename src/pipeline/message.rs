// SPDX-License-Identifier: MIT

//! Per-invocation message envelope
//!
//! A `Message` carries a JSON payload, opaque headers owned by stages and
//! engine-owned properties through a flow. The engine reads and writes exactly
//! one property, [`CHOICE_MATCH_KEY`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ExchangeError;

/// Property holding the successor ids picked by the last choice stage
pub const CHOICE_MATCH_KEY: &str = "routeflow.choice-match";

/// Delimiter between node ids inside the choice match value
pub const MATCH_DELIMITER: char = ',';

/// Mutable carrier of payload and metadata through a flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    created_at: DateTime<Utc>,
    body: Value,
    #[serde(default)]
    headers: HashMap<String, Value>,
    #[serde(default)]
    properties: HashMap<String, Value>,
    #[serde(skip)]
    error: Option<ExchangeError>,
}

impl Message {
    /// Create a message with the given payload
    pub fn new(body: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            body,
            headers: HashMap::new(),
            properties: HashMap::new(),
            error: None,
        }
    }

    /// Builder-style header setter
    pub fn with_header(mut self, name: impl Into<String>, value: Value) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: Value) {
        self.headers.insert(name.into(), value);
    }

    pub fn headers(&self) -> &HashMap<String, Value> {
        &self.headers
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    /// Raw choice match value, if a choice stage picked a branch
    pub fn choice_match(&self) -> Option<&str> {
        let value = self.properties.get(CHOICE_MATCH_KEY)?;
        value.as_str()
    }

    /// Choice match split into successor ids; absent or empty means none
    pub fn choice_targets(&self) -> Vec<&str> {
        self.choice_match()
            .map(|raw| {
                raw.split(MATCH_DELIMITER)
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_choice_match(&mut self, key: impl Into<String>) {
        self.properties
            .insert(CHOICE_MATCH_KEY.to_string(), Value::String(key.into()));
    }

    pub fn clear_choice_match(&mut self) {
        self.properties.remove(CHOICE_MATCH_KEY);
    }

    pub fn error(&self) -> Option<&ExchangeError> {
        self.error.as_ref()
    }

    /// Attach an error; a later failure replaces an earlier one
    pub fn set_error(&mut self, error: ExchangeError) {
        self.error = Some(error);
    }

    pub fn take_error(&mut self) -> Option<ExchangeError> {
        self.error.take()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Look up a value by dot path.
    ///
    /// `headers.<name>.<field>` reads a header, `body.<field>` reads the
    /// payload, and any other path is resolved against the payload object.
    pub fn resolve_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;

        let mut current = match first {
            "headers" | "header" => self.headers.get(parts.next()?)?,
            "body" => &self.body,
            _ => self.body.get(first)?,
        };
        for part in parts {
            current = match current {
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}
