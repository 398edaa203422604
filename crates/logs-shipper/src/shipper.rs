// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of bulk payloads to the listener with bounded retry.
//!
//! ```text
//!   BulkPayload
//!       │
//!       v
//!   ┌─────────────┐
//!   │  HTTP POST  │ <─────────────┐
//!   └──────┬──────┘               │
//!          │                      │
//!          v                      │
//!   ┌─────────────┐  5xx/network  │
//!   │   Status?   │ ── backoff ───┘  (until attempts are exhausted)
//!   └──────┬──────┘
//!          │ 2xx → Delivered
//!          │ 4xx → PermanentFailure (no retry)
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, warn};

use crate::batcher::BulkPayload;
use crate::config::{Config, Endpoint};
use crate::constants::NDJSON_CONTENT_TYPE;
use crate::error::ShipperError;
use crate::http::get_client;

/// How many times a payload is attempted and how long to wait in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Up to N attempts, no delay.
    Immediate(u32),
    /// Up to N attempts, fixed delay in milliseconds.
    LinearBackoff(u32, u64),
    /// Up to `attempts` attempts; the delay doubles from `base_ms` and is
    /// capped at `max_ms`, with full jitter.
    ExponentialBackoff {
        attempts: u32,
        base_ms: u64,
        max_ms: u64,
    },
}

impl RetryStrategy {
    /// Total attempts, never less than one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        let attempts = match self {
            RetryStrategy::Immediate(attempts)
            | RetryStrategy::LinearBackoff(attempts, _)
            | RetryStrategy::ExponentialBackoff { attempts, .. } => *attempts,
        };
        attempts.max(1)
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::Immediate(_) => Duration::ZERO,
            RetryStrategy::LinearBackoff(_, delay_ms) => Duration::from_millis(*delay_ms),
            RetryStrategy::ExponentialBackoff {
                base_ms, max_ms, ..
            } => {
                let cap = Self::exponential_cap(*base_ms, *max_ms, attempt);
                if cap == 0 {
                    return Duration::ZERO;
                }
                Duration::from_millis(rand::thread_rng().gen_range(0..=cap))
            }
        }
    }

    fn exponential_cap(base_ms: u64, max_ms: u64, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(32);
        base_ms.saturating_mul(1_u64 << exponent).min(max_ms)
    }
}

/// Result of delivering one payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        attempts: u32,
    },
    /// The listener refused the payload; retrying won't help.
    PermanentFailure {
        status: u16,
        body: String,
        attempts: u32,
    },
    /// Every attempt failed with a 5xx or a transport error. `status` is
    /// `None` when the last attempt got no response at all.
    TransientFailureExhausted {
        status: Option<u16>,
        body: String,
        attempts: u32,
    },
}

impl DeliveryOutcome {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts }
            | DeliveryOutcome::PermanentFailure { attempts, .. }
            | DeliveryOutcome::TransientFailureExhausted { attempts, .. } => *attempts,
        }
    }

    /// Maps failures to the error of payload number `payload`.
    pub fn into_result(self, payload: usize) -> Result<u32, ShipperError> {
        match self {
            DeliveryOutcome::Delivered { attempts } => Ok(attempts),
            DeliveryOutcome::PermanentFailure { status, body, .. } => {
                Err(ShipperError::PermanentDelivery {
                    payload,
                    status,
                    body,
                })
            }
            DeliveryOutcome::TransientFailureExhausted {
                status,
                body,
                attempts,
            } => Err(ShipperError::TransientDelivery {
                payload,
                status,
                body,
                attempts,
            }),
        }
    }
}

/// Posts bulk payloads to a single listener endpoint.
#[derive(Debug, Clone)]
pub struct Shipper {
    client: reqwest::Client,
    endpoint: Endpoint,
    retry_strategy: RetryStrategy,
}

impl Shipper {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: Endpoint, retry_strategy: RetryStrategy) -> Self {
        Shipper {
            client,
            endpoint,
            retry_strategy,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Shipper::new(
            get_client(config),
            config.endpoint.clone(),
            config.retry_strategy(),
        )
    }

    fn create_request(&self, body: Vec<u8>) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint.bulk_url())
            .query(&[
                ("token", self.endpoint.token.as_str()),
                ("type", self.endpoint.log_type.as_str()),
            ])
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(body)
    }

    /// Delivers one payload, retrying 5xx responses and transport errors.
    pub async fn ship(&self, payload: &BulkPayload) -> DeliveryOutcome {
        let max_attempts = self.retry_strategy.attempts();
        let mut attempts = 0;

        loop {
            let time = Instant::now();
            attempts += 1;
            let resp = self.create_request(payload.as_bytes().to_vec()).send().await;
            let elapsed = time.elapsed();

            let (status, body) = match resp {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        debug!(
                            "Shipped {} lines ({} bytes) in {} ms after {} attempts",
                            payload.line_count(),
                            payload.len(),
                            elapsed.as_millis(),
                            attempts
                        );
                        return DeliveryOutcome::Delivered { attempts };
                    }

                    let body = resp.text().await.unwrap_or_default();
                    if !status.is_server_error() {
                        error!(
                            "{}: Listener rejected payload, not retrying: {:?}",
                            status, body
                        );
                        return DeliveryOutcome::PermanentFailure {
                            status: status.as_u16(),
                            body,
                            attempts,
                        };
                    }
                    (Some(status.as_u16()), body)
                }
                Err(e) => (None, e.to_string()),
            };

            if attempts >= max_attempts {
                error!(
                    "Failed to ship payload after {} ms and {} attempts: {:?} {}",
                    elapsed.as_millis(),
                    attempts,
                    status,
                    body
                );
                return DeliveryOutcome::TransientFailureExhausted {
                    status,
                    body,
                    attempts,
                };
            }

            let delay = self.retry_strategy.delay(attempts);
            warn!(
                "Attempt {} of {} failed ({:?} {}), retrying in {} ms",
                attempts,
                max_attempts,
                status,
                body,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}
