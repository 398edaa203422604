// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One shipping invocation, from envelope to delivered payloads.
//!
//! ```text
//!   Start → Decoded → Normalized → Batched → Delivering → Success
//!     │        │                                 │
//!     └────────┴──────────── Failed ─────────────┘
//! ```
//!
//! The first failure ends the invocation. Payloads are delivered one after
//! another, in order, so lines reach the listener in their original order and
//! nothing after a failed payload is sent.

use std::fmt;

use tracing::{debug, error, info};

use crate::batcher::Batcher;
use crate::config::Config;
use crate::decoder::{self, Envelope, LogBatchDocument};
use crate::error::ShipperError;
use crate::normalizer::Normalizer;
use crate::shipper::Shipper;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Decoded,
    Normalized,
    Batched,
    Delivering,
    Success,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a successful invocation did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InvocationSummary {
    pub records: usize,
    pub payloads: usize,
    /// HTTP requests made, retries included
    pub attempts: u32,
}

/// Decode, normalize, batch and deliver, wired for one configuration.
///
/// Holds no per-invocation state, so a single instance can serve concurrent
/// invocations.
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    batcher: Batcher,
    shipper: Shipper,
}

impl Pipeline {
    #[must_use]
    pub fn new(normalizer: Normalizer, batcher: Batcher, shipper: Shipper) -> Self {
        Pipeline {
            normalizer,
            batcher,
            shipper,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Pipeline::new(
            Normalizer::new(config.format_mode, config.include_source_metadata),
            Batcher::new(config.max_payload_bytes, config.max_payload_lines),
            Shipper::from_config(config),
        )
    }

    /// Runs the invocation for an event envelope.
    pub async fn handle(&self, envelope: &Envelope) -> Result<InvocationSummary, ShipperError> {
        let result = match decoder::decode_envelope(envelope) {
            Ok(document) => {
                transition(PipelineState::Start, PipelineState::Decoded);
                self.deliver_document(&document).await
            }
            Err(e) => Err(e.into()),
        };
        finish(result)
    }

    /// Runs the invocation for the base64 `awslogs.data` payload.
    pub async fn run(&self, data: &str) -> Result<InvocationSummary, ShipperError> {
        let result = match decoder::decode(data) {
            Ok(document) => {
                transition(PipelineState::Start, PipelineState::Decoded);
                self.deliver_document(&document).await
            }
            Err(e) => Err(e.into()),
        };
        finish(result)
    }

    async fn deliver_document(
        &self,
        document: &LogBatchDocument,
    ) -> Result<InvocationSummary, ShipperError> {
        if document.is_control_message() {
            info!("Received CloudWatch control message, nothing to ship");
            return Ok(InvocationSummary::default());
        }

        let lines = self.normalizer.normalize_all(document)?;
        transition(PipelineState::Decoded, PipelineState::Normalized);

        let payloads = self.batcher.batch(&lines);
        transition(PipelineState::Normalized, PipelineState::Batched);
        debug!(
            "Split {} lines into {} payloads",
            lines.len(),
            payloads.len()
        );

        transition(PipelineState::Batched, PipelineState::Delivering);
        let mut summary = InvocationSummary {
            records: lines.len(),
            ..Default::default()
        };
        for (index, payload) in payloads.iter().enumerate() {
            let outcome = self.shipper.ship(payload).await;
            summary.attempts += outcome.attempts();
            outcome.into_result(index)?;
            summary.payloads += 1;
        }

        Ok(summary)
    }
}

fn transition(from: PipelineState, to: PipelineState) {
    debug!("Pipeline {} -> {}", from, to);
}

fn finish(
    result: Result<InvocationSummary, ShipperError>,
) -> Result<InvocationSummary, ShipperError> {
    match &result {
        Ok(summary) => {
            transition(PipelineState::Delivering, PipelineState::Success);
            info!(
                "Shipped {} records in {} payloads ({} requests)",
                summary.records, summary.payloads, summary.attempts
            );
        }
        Err(e) => {
            debug!("Pipeline -> {}", PipelineState::Failed);
            error!(kind = e.kind(), "Invocation failed: {}", e);
        }
    }
    result
}
