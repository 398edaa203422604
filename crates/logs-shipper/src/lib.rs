// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships CloudWatch Logs subscription batches to a bulk HTTP log listener.
//!
//! An invocation flows through [`decoder`], [`normalizer`], [`batcher`] and
//! [`shipper`], wired together by [`pipeline::Pipeline`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batcher;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod http;
pub mod logger;
pub mod normalizer;
pub mod pipeline;
pub mod shipper;
