//! Output plane selection.
//!
//! The `Accept` header routes a request to one of three output shapes. All
//! planes share the type system, authorization filters and cursor format;
//! only the serializer differs.

use fraiseql_error::{ProtocolError, Result};

/// Request output plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// Nested JSON graph (default).
    Json,
    /// Arrow IPC stream of declared record batches.
    Arrow,
    /// Arrow IPC file format.
    ArrowFile,
    /// CDC event stream (SSE / WebSocket delivery).
    Delta,
}

impl Plane {
    /// Select the plane for an `Accept` header value.
    ///
    /// A missing header and the wildcard default to JSON. Explicitly
    /// unsupported media types fail rather than silently degrade.
    pub fn from_accept(accept: Option<&str>) -> Result<Self> {
        let Some(accept) = accept else {
            return Ok(Self::Json);
        };
        let accept = accept.trim();
        if accept.is_empty() {
            return Ok(Self::Json);
        }

        // First acceptable media range wins; parameters are ignored.
        for part in accept.split(',') {
            let media = part.split(';').next().unwrap_or("").trim();
            match media {
                "application/json" | "*/*" | "application/*" | "application/graphql-response+json" => {
                    return Ok(Self::Json)
                },
                "application/x-arrow" => return Ok(Self::Arrow),
                "application/vnd.apache.arrow.file" => return Ok(Self::ArrowFile),
                "application/vnd.apache.arrow.stream" => return Ok(Self::Arrow),
                "text/event-stream" => return Ok(Self::Delta),
                _ => {},
            }
        }

        Err(ProtocolError::UnsupportedAccept {
            accept: accept.to_string(),
        }
        .into())
    }

    /// Content-Type of responses on this plane.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Arrow => "application/vnd.apache.arrow.stream",
            Self::ArrowFile => "application/vnd.apache.arrow.file",
            Self::Delta => "text/event-stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_json() {
        assert_eq!(Plane::from_accept(None).expect("routes"), Plane::Json);
        assert_eq!(Plane::from_accept(Some("*/*")).expect("routes"), Plane::Json);
        assert_eq!(
            Plane::from_accept(Some("application/json")).expect("routes"),
            Plane::Json
        );
    }

    #[test]
    fn test_arrow_planes() {
        assert_eq!(
            Plane::from_accept(Some("application/x-arrow")).expect("routes"),
            Plane::Arrow
        );
        assert_eq!(
            Plane::from_accept(Some("application/vnd.apache.arrow.file")).expect("routes"),
            Plane::ArrowFile
        );
    }

    #[test]
    fn test_event_stream_is_delta() {
        assert_eq!(
            Plane::from_accept(Some("text/event-stream")).expect("routes"),
            Plane::Delta
        );
    }

    #[test]
    fn test_quality_parameters_ignored() {
        assert_eq!(
            Plane::from_accept(Some("application/x-arrow;q=0.9, application/json;q=0.1"))
                .expect("routes"),
            Plane::Arrow
        );
    }

    #[test]
    fn test_unsupported_accept_rejected() {
        let err = Plane::from_accept(Some("text/html")).expect_err("rejects");
        assert_eq!(err.error_code(), "UNSUPPORTED_ACCEPT");
    }
}
