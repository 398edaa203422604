// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits and defaults for bulk log delivery.
//!
//! The payload limits bound a single POST request to the bulk listener. Both
//! limits apply independently: a payload is closed as soon as either one
//! would be exceeded by the next line.

/// Maximum serialized size of one bulk payload, in bytes (5MB).
///
/// A single line larger than this is still shipped, alone in its own payload.
pub const MAX_CONTENT_SIZE_BYTES: usize = 5 * 1_024 * 1_024;

/// Maximum number of log lines in one bulk payload.
pub const MAX_BATCH_ENTRIES_SIZE: usize = 1_000;

/// HTTP attempts per payload before giving up on a 5xx or transport error.
pub const FLUSH_RETRY_COUNT: u32 = 3;

/// Base delay of the exponential backoff between attempts, in milliseconds.
pub const RETRY_BACKOFF_BASE_MS: u64 = 100;

/// Upper bound of a single backoff delay, in milliseconds.
pub const RETRY_BACKOFF_MAX_MS: u64 = 2_000;

/// Timeout of each POST request, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Content type of the newline-delimited JSON body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// `messageType` of a regular batch of log events.
pub const DATA_MESSAGE: &str = "DATA_MESSAGE";

/// `messageType` CloudWatch uses to check that the destination is reachable.
pub const CONTROL_MESSAGE: &str = "CONTROL_MESSAGE";
