// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tracing formatter for the shipper's own diagnostics.
//!
//! The function's own output ends up in CloudWatch next to the logs it ships,
//! so every line carries a fixed prefix that is easy to filter on:
//!
//! ```text
//! LOGS_SHIPPER | LEVEL | [span_name{span_fields}:] message {event_fields}
//! ```

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

pub const LOG_PREFIX: &str = "LOGS_SHIPPER";

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "{LOG_PREFIX} | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                // Populated by the fmt layer on span creation
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_format_with_span_and_fields() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .with_ansi(false)
            .event_format(Formatter)
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("invocation", request_id = "abc");
            let _guard = span.enter();
            tracing::info!(payloads = 2, "Shipped");
            tracing::debug!("not printed");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.starts_with("LOGS_SHIPPER | INFO | invocation{"));
        assert!(output.contains("request_id"));
        assert!(output.ends_with("}: Shipped payloads=2\n"));
        assert!(!output.contains("not printed"));
    }
}
