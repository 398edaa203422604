// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Grouping of canonical log lines into bulk payloads.
//!
//! A bulk payload is newline-delimited JSON: the serialized lines joined by
//! `\n`. Lines are accumulated greedily, in order, until the next line would
//! push the payload past either limit:
//!
//! 1. **Size limit**: serialized payload bytes, separators included
//! 2. **Count limit**: lines per payload
//!
//! Lines are never split or dropped. A line that alone exceeds the size limit
//! is shipped in a payload of its own.

use tracing::warn;

use crate::constants;
use crate::normalizer::CanonicalLine;

/// One HTTP request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkPayload {
    body: Vec<u8>,
    line_count: usize,
}

impl BulkPayload {
    fn with_capacity(capacity: usize) -> Self {
        BulkPayload {
            body: Vec::with_capacity(capacity),
            line_count: 0,
        }
    }

    fn push(&mut self, line: &str) {
        if self.line_count > 0 {
            self.body.push(b'\n');
        }
        self.body.extend_from_slice(line.as_bytes());
        self.line_count += 1;
    }

    /// Size of the payload once `line` is appended.
    fn len_with(&self, line: &str) -> usize {
        let separator = usize::from(self.line_count > 0);
        self.body.len() + separator + line.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

/// Splits lines into bulk payloads bounded by size and line count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Batcher {
    max_payload_bytes: usize,
    max_payload_lines: usize,
}

impl Default for Batcher {
    fn default() -> Self {
        Batcher {
            max_payload_bytes: constants::MAX_CONTENT_SIZE_BYTES,
            max_payload_lines: constants::MAX_BATCH_ENTRIES_SIZE,
        }
    }
}

impl Batcher {
    /// A line limit of zero is treated as one line per payload.
    #[must_use]
    pub fn new(max_payload_bytes: usize, max_payload_lines: usize) -> Self {
        Batcher {
            max_payload_bytes,
            max_payload_lines: max_payload_lines.max(1),
        }
    }

    #[must_use]
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    #[must_use]
    pub fn max_payload_lines(&self) -> usize {
        self.max_payload_lines
    }

    /// Partitions `lines` into payloads, preserving order.
    ///
    /// Every line lands in exactly one payload. The partition only depends on
    /// the input and the limits.
    #[must_use]
    pub fn batch(&self, lines: &[CanonicalLine]) -> Vec<BulkPayload> {
        let mut payloads = Vec::new();
        let mut current = BulkPayload::with_capacity(self.initial_capacity(lines.len()));

        for line in lines {
            let line = line.to_string();

            let full = current.line_count >= self.max_payload_lines
                || current.len_with(&line) > self.max_payload_bytes;
            if full && !current.is_empty() {
                payloads.push(std::mem::replace(
                    &mut current,
                    BulkPayload::with_capacity(self.initial_capacity(lines.len())),
                ));
            }

            if line.len() > self.max_payload_bytes {
                warn!(
                    "Log line of {} bytes exceeds the {} bytes payload limit, shipping it alone",
                    line.len(),
                    self.max_payload_bytes
                );
            }
            current.push(&line);
        }

        if !current.is_empty() {
            payloads.push(current);
        }
        payloads
    }

    fn initial_capacity(&self, line_count: usize) -> usize {
        // Rough guess that avoids reserving the full limit for tiny batches
        self.max_payload_bytes.min(line_count.saturating_mul(256))
    }
}
