//! Delta plane: SSE delivery of the CDC event stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use fraiseql_core::delta::ChangeLogReader;
use fraiseql_core::runtime::{GraphQLRequest, RequestContext};
use fraiseql_error::{FraiseQLError, ProtocolError};

use crate::routes::error_response;
use crate::state::AppState;

/// Poll cadence when the change log is idle.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Build the SSE response for a delta-plane request.
///
/// The tenant comes from `x-tenant-id`; `variables.afterSequence` resumes
/// from a known position. The stream is ordered by sequence number and runs
/// until the client disconnects (dropping the stream cancels the poll).
pub fn delta_response(
    state: &AppState,
    request: &GraphQLRequest,
    headers: &HeaderMap,
    ctx: RequestContext,
) -> Response {
    let sanitization = state.config.error_sanitization;

    let Some(tenant) = headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
    else {
        let err: FraiseQLError = ProtocolError::MalformedQuery {
            message: "delta subscriptions require an x-tenant-id header".to_string(),
        }
        .into();
        return error_response(&err, sanitization);
    };

    let after_sequence = request
        .variables
        .as_ref()
        .and_then(|v| v.get("afterSequence"))
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);

    let reader = Arc::new(ChangeLogReader::new(Arc::clone(&state.adapter), None));

    let stream = futures::stream::unfold(
        (reader, tenant, after_sequence, ctx),
        |(reader, tenant, mut sequence, ctx)| async move {
            loop {
                match reader.poll(&tenant, sequence, &ctx).await {
                    Ok(events) if events.is_empty() => {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    },
                    Ok(events) => {
                        // Hand the batch over one poll at a time; the last
                        // event advances the floor.
                        sequence = events.last().map_or(sequence, |e| e.sequence_number);
                        let payload: Vec<String> = events
                            .iter()
                            .filter_map(|e| e.to_json().ok())
                            .collect();
                        let event = Event::default().data(payload.join("\n"));
                        return Some((
                            Ok::<Event, Infallible>(event),
                            (reader, tenant, sequence, ctx),
                        ));
                    },
                    Err(err) => {
                        tracing::warn!(
                            target: "fraiseql::delta",
                            error = %err,
                            "change log poll failed; ending stream"
                        );
                        return None;
                    },
                }
            }
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
