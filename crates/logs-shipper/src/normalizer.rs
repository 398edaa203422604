// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion of raw log events into canonical log lines.
//!
//! Every raw event must be an object with an opaque `id` (string or number),
//! an integer `timestamp` and a string `message`. Anything else is a
//! [`ShipperError::RecordType`] and aborts the invocation.
//!
//! In [`FormatMode::StructuredJson`], a message holding a JSON object is
//! flattened into the line. Messages that are not JSON objects are shipped
//! verbatim, so normalization itself never fails on message content.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use crate::decoder::LogBatchDocument;
use crate::error::ShipperError;

/// How the `message` of a log event is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FormatMode {
    /// Messages are opaque strings.
    #[default]
    Plain,
    /// Messages holding a JSON object are merged into the line.
    StructuredJson,
}

impl FromStr for FormatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "text" | "plain" => Ok(FormatMode::Plain),
            "json" => Ok(FormatMode::StructuredJson),
            other => Err(format!(
                "unknown log format '{other}', expected 'text' or 'json'"
            )),
        }
    }
}

/// A validated log event.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// Opaque identifier, a JSON string or number.
    pub id: Value,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub message: String,
}

impl LogRecord {
    /// Validates the shape of the raw event at position `index`.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ShipperError> {
        let record_type_error = |reason: &str| ShipperError::RecordType {
            index,
            reason: reason.to_string(),
        };

        let Some(object) = value.as_object() else {
            return Err(record_type_error(&format!(
                "is not an object (found {})",
                json_type_name(value)
            )));
        };

        let id = match object.get("id") {
            Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
            Some(_) => return Err(record_type_error("has an id that is not a string or number")),
            None => return Err(record_type_error("has no id")),
        };

        let timestamp = match object.get("timestamp") {
            Some(timestamp) => timestamp
                .as_i64()
                .ok_or_else(|| record_type_error("has a timestamp that is not an integer"))?,
            None => return Err(record_type_error("has no timestamp")),
        };

        let message = match object.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(_) => return Err(record_type_error("has a message that is not a string")),
            None => return Err(record_type_error("has no message")),
        };

        Ok(LogRecord {
            id,
            timestamp,
            message,
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One JSON object destined for the bulk listener.
///
/// `id` and `timestamp` always hold the values of the source record.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalLine(Map<String, Value>);

impl CanonicalLine {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl fmt::Display for CanonicalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Map keys are strings, so compact serialization is infallible.
        let line = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&line)
    }
}

/// Turns log records into canonical lines.
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    format_mode: FormatMode,
    include_source_metadata: bool,
}

impl Normalizer {
    #[must_use]
    pub fn new(format_mode: FormatMode, include_source_metadata: bool) -> Self {
        Normalizer {
            format_mode,
            include_source_metadata,
        }
    }

    /// Builds the canonical line of a single record.
    #[must_use]
    pub fn normalize(&self, record: LogRecord) -> CanonicalLine {
        let mut fields = Map::new();

        match self.format_mode {
            FormatMode::Plain => {
                fields.insert("message".to_string(), Value::String(record.message));
            }
            FormatMode::StructuredJson => match serde_json::from_str::<Value>(&record.message) {
                Ok(Value::Object(payload)) => fields.extend(payload),
                _ => {
                    fields.insert("message".to_string(), Value::String(record.message));
                }
            },
        }

        // Inserted last so a structured payload can't override them
        fields.insert("id".to_string(), record.id);
        fields.insert("timestamp".to_string(), Value::from(record.timestamp));

        CanonicalLine(fields)
    }

    /// Validates and normalizes every event of the document, in order.
    ///
    /// Stops at the first malformed event.
    pub fn normalize_all(
        &self,
        document: &LogBatchDocument,
    ) -> Result<Vec<CanonicalLine>, ShipperError> {
        let mut lines = Vec::with_capacity(document.log_events.len());
        for (index, value) in document.log_events.iter().enumerate() {
            let record = LogRecord::from_value(index, value)?;
            let mut line = self.normalize(record);
            if self.include_source_metadata {
                add_source_metadata(&mut line, document);
            }
            lines.push(line);
        }
        debug!(
            "Normalized {} log events from {}/{}",
            lines.len(),
            document.log_group,
            document.log_stream
        );
        Ok(lines)
    }
}

fn add_source_metadata(line: &mut CanonicalLine, document: &LogBatchDocument) {
    for (key, value) in [
        ("logGroup", &document.log_group),
        ("logStream", &document.log_stream),
        ("owner", &document.owner),
    ] {
        line.0
            .entry(key)
            .or_insert_with(|| Value::String(value.clone()));
    }
}
