// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// The inbound envelope could not be turned into a log batch document.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("envelope has no awslogs.data field")]
    MissingData,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid gzip payload: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has no logEvents sequence")]
    MissingLogEvents,
}

/// Errors that abort a shipping invocation.
///
/// None of them is retried by the pipeline itself; the invoking runtime decides
/// whether to re-invoke.
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    #[error("FormatError: {0}")]
    Format(#[from] FormatError),

    #[error("RecordTypeError: log event {index} {reason}")]
    RecordType { index: usize, reason: String },

    #[error("PermanentDeliveryError: payload {payload} rejected with status {status}: {body}")]
    PermanentDelivery {
        payload: usize,
        status: u16,
        body: String,
    },

    #[error(
        "TransientDeliveryError: payload {payload} failed after {attempts} attempts (last status {status:?}): {body}"
    )]
    TransientDelivery {
        payload: usize,
        status: Option<u16>,
        body: String,
        attempts: u32,
    },
}

impl ShipperError {
    /// Class name of the error, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ShipperError::Format(_) => "FormatError",
            ShipperError::RecordType { .. } => "RecordTypeError",
            ShipperError::PermanentDelivery { .. } => "PermanentDeliveryError",
            ShipperError::TransientDelivery { .. } => "TransientDeliveryError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ShipperError::RecordType {
            index: 3,
            reason: "is not an object".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "RecordTypeError: log event 3 is not an object"
        );
    }

    #[test]
    fn test_format_error_wraps_source() {
        let error: ShipperError = FormatError::MissingLogEvents.into();
        assert_eq!(
            error.to_string(),
            "FormatError: document has no logEvents sequence"
        );
        assert_eq!(error.kind(), "FormatError");
    }

    #[test]
    fn test_error_kinds() {
        let permanent = ShipperError::PermanentDelivery {
            payload: 0,
            status: 400,
            body: "bad request".into(),
        };
        let transient = ShipperError::TransientDelivery {
            payload: 1,
            status: None,
            body: "connection refused".into(),
            attempts: 3,
        };
        assert_eq!(permanent.kind(), "PermanentDeliveryError");
        assert_eq!(transient.kind(), "TransientDeliveryError");
        assert!(transient.to_string().contains("after 3 attempts"));
    }
}
