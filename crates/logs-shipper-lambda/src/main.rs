// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::{debug, error, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use logs_shipper::{config::Config, decoder::Envelope, logger::Formatter, pipeline::Pipeline};

#[tokio::main]
pub async fn main() -> Result<(), Error> {
    let config = Config::new();

    // A broken configuration is still reported at the default level
    let env_filter = match &config {
        Ok(config) => config.log_filter(),
        Err(_) => Config::default().log_filter(),
    };

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_ansi(false)
        .event_format(Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Error loading logs shipper configuration: {e}");
            return Err(e.into());
        }
    };
    debug!(
        "Shipping {:?} logs as type {} to {}",
        config.format_mode, config.endpoint.log_type, config.endpoint.url
    );

    let pipeline = Pipeline::from_config(&config);
    let pipeline = &pipeline;

    run(service_fn(move |event: LambdaEvent<Envelope>| async move {
        handle(pipeline, event).await
    }))
    .await
}

async fn handle(pipeline: &Pipeline, event: LambdaEvent<Envelope>) -> Result<(), Error> {
    let span = info_span!("invocation", request_id = %event.context.request_id);
    pipeline.handle(&event.payload).instrument(span).await?;
    Ok(())
}
