//! Observability: W3C trace propagation and span helpers.
//!
//! Metrics are plain `tracing` events with well-known targets; a subscriber
//! turns them into whatever backend is wired up. Audit hooks live in
//! [`crate::audit`].

use serde::{Deserialize, Serialize};

/// W3C Trace Context (`traceparent` header) for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// 16-byte trace id, lowercase hex.
    pub trace_id: String,

    /// 8-byte parent span id, lowercase hex.
    pub span_id: String,

    /// Sampled flag from the incoming request.
    pub sampled: bool,
}

impl TraceContext {
    /// Parse a `traceparent` header (`00-<32hex>-<16hex>-<2hex>`).
    ///
    /// Returns `None` for anything malformed; callers fall back to
    /// [`TraceContext::generate`].
    #[must_use]
    pub fn parse(traceparent: &str) -> Option<Self> {
        let mut parts = traceparent.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;

        if version != "00" || parts.next().is_some() {
            return None;
        }
        if trace_id.len() != 32 || !is_lower_hex(trace_id) || trace_id.bytes().all(|b| b == b'0') {
            return None;
        }
        if span_id.len() != 16 || !is_lower_hex(span_id) || span_id.bytes().all(|b| b == b'0') {
            return None;
        }
        if flags.len() != 2 || !is_lower_hex(flags) {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id:  span_id.to_string(),
            sampled:  u8::from_str_radix(flags, 16).is_ok_and(|f| f & 0x01 == 0x01),
        })
    }

    /// Generate a fresh trace context (new trace id, new span id, sampled).
    #[must_use]
    pub fn generate() -> Self {
        let trace = uuid::Uuid::new_v4().simple().to_string();
        let span = &uuid::Uuid::new_v4().simple().to_string()[..16];
        Self {
            trace_id: trace,
            span_id:  span.to_string(),
            sampled:  true,
        }
    }

    /// Child context: same trace, fresh span id.
    #[must_use]
    pub fn child(&self) -> Self {
        let span = &uuid::Uuid::new_v4().simple().to_string()[..16];
        Self {
            trace_id: self.trace_id.clone(),
            span_id:  span.to_string(),
            sampled:  self.sampled,
        }
    }

    /// Render the `traceparent` header for outbound propagation.
    #[must_use]
    pub fn to_header(&self) -> String {
        format!(
            "00-{}-{}-{:02x}",
            self.trace_id,
            self.span_id,
            u8::from(self.sampled)
        )
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
