// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoding of CloudWatch Logs subscription envelopes.
//!
//! CloudWatch delivers a batch of log events as base64 text wrapping a gzip
//! stream, which in turn holds the JSON [`LogBatchDocument`]:
//!
//! ```text
//! {"awslogs": {"data": "H4sIAAAA..."}}
//!                        │
//!                        v  base64
//!                   gzip stream
//!                        │
//!                        v  gunzip
//!   {"logGroup": ..., "logEvents": [{"id": ..., "timestamp": ..., "message": ...}]}
//! ```
//!
//! Log events are kept as raw JSON values here. Checking their shape is the
//! job of the normalizer, so a malformed event is reported with its index.

use std::io::Read;

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use serde_json::Value;

use crate::constants::CONTROL_MESSAGE;
use crate::error::FormatError;

/// Invocation event as handed over by the serverless runtime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub awslogs: Option<AwsLogs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsLogs {
    #[serde(default)]
    pub data: Option<String>,
}

/// The decompressed batch of log events.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogBatchDocument {
    #[serde(default)]
    pub log_group: String,
    #[serde(default)]
    pub log_stream: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub subscription_filters: Vec<String>,
    pub log_events: Vec<Value>,
}

impl LogBatchDocument {
    /// Returns true for the reachability check CloudWatch sends when a
    /// subscription is created. It carries no log data worth shipping.
    #[must_use]
    pub fn is_control_message(&self) -> bool {
        self.message_type == CONTROL_MESSAGE
    }
}

/// Extracts `awslogs.data` from the envelope and decodes it.
pub fn decode_envelope(envelope: &Envelope) -> Result<LogBatchDocument, FormatError> {
    let data = envelope
        .awslogs
        .as_ref()
        .and_then(|awslogs| awslogs.data.as_deref())
        .ok_or(FormatError::MissingData)?;
    decode(data)
}

/// Decodes base64 text of a gzip-compressed JSON log batch.
pub fn decode(data: &str) -> Result<LogBatchDocument, FormatError> {
    let compressed = STANDARD.decode(data.trim())?;

    let mut json = Vec::new();
    MultiGzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;

    let document: Value = serde_json::from_slice(&json)?;
    if !document
        .get("logEvents")
        .is_some_and(|log_events| log_events.is_array())
    {
        return Err(FormatError::MissingLogEvents);
    }

    Ok(serde_json::from_value(document)?)
}
