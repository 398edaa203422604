// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client used to reach the bulk listener.

use core::time::Duration;
use std::error::Error;

use tracing::error;

use crate::config::Config;

/// Creates the HTTP client from the shipper configuration.
///
/// An invalid proxy URL is logged and the client falls back to a direct
/// connection, so a misconfigured proxy never stops log delivery outright.
#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(config: &Config, allow_proxy: bool) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.https_proxy {
            let proxy = reqwest::Proxy::https(https_uri.clone())?;
            client = client.proxy(proxy);
        }
    }

    Ok(client.build()?)
}
