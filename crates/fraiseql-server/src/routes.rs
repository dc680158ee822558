//! HTTP routes.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fraiseql_core::graphql::parse_query;
use fraiseql_core::observability::TraceContext;
use fraiseql_core::runtime::{GraphQLRequest, Plane, RequestContext};
use fraiseql_error::graphql::GraphQLError;
use fraiseql_error::{AuthorizationError, FraiseQLError, ProtocolError};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::delta_stream::delta_response;
use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", post(graphql))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "schema_hash": state.schema.schema_hash,
        "target": state.schema.target,
    }))
}

async fn graphql(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    let sanitization = state.config.error_sanitization;

    // Plane selection comes first; an unsupported Accept never executes.
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    let plane = match Plane::from_accept(accept) {
        Ok(plane) => plane,
        Err(err) => return error_response(&err, sanitization),
    };

    if let Err(wait_ms) = state.limiter.check() {
        let err: FraiseQLError = AuthorizationError::RateLimited {
            retry_after_ms: Some(wait_ms),
        }
        .into();
        return error_response(&err, sanitization);
    }

    let ctx = request_context(&state, &headers);
    tracing::debug!(
        target: "fraiseql::server",
        trace_id = %ctx.trace.trace_id,
        plane = ?plane,
        "graphql request"
    );

    match plane {
        Plane::Json => match state.executor.execute(&request, &ctx).await {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, Plane::Json.content_type())],
                body.into_bytes(),
            )
                .into_response(),
            Err(err) => error_response(&err, sanitization),
        },
        Plane::Arrow | Plane::ArrowFile => arrow_response(&state, &request, &ctx, plane).await,
        Plane::Delta => delta_response(&state, &request, &headers, ctx),
    }
}

/// Arrow plane: the query's root field names the declared projection.
async fn arrow_response(
    state: &AppState,
    request: &GraphQLRequest,
    ctx: &RequestContext,
    plane: Plane,
) -> Response {
    let sanitization = state.config.error_sanitization;

    let projection_name = match request.query.as_deref().map(parse_query) {
        Some(Ok(document)) => document
            .operations
            .first()
            .and_then(|op| op.selections.first())
            .map(|field| field.name.clone()),
        Some(Err(err)) => return error_response(&err, sanitization),
        None => None,
    };
    let Some(projection_name) = projection_name else {
        let err: FraiseQLError = ProtocolError::MalformedQuery {
            message: "arrow requests name a declared projection as the root field".to_string(),
        }
        .into();
        return error_response(&err, sanitization);
    };

    let Some(projection) = state.schema.arrow_projection(&projection_name) else {
        let err: FraiseQLError = ProtocolError::MalformedQuery {
            message: format!("no arrow projection named '{projection_name}'"),
        }
        .into();
        return error_response(&err, sanitization);
    };

    let encoded = match plane {
        Plane::ArrowFile => state.arrow.execute_file(projection, ctx).await,
        _ => state.arrow.execute_stream(projection, ctx).await,
    };
    match encoded {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, plane.content_type())],
            body,
        )
            .into_response(),
        Err(err) => error_response(&err, sanitization),
    }
}

/// Build the per-request context from transport headers.
fn request_context(state: &AppState, headers: &HeaderMap) -> RequestContext {
    let trace = headers
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .and_then(TraceContext::parse)
        .map_or_else(TraceContext::generate, |incoming| incoming.child());

    let mut ctx = RequestContext::new().with_timeout(state.config.request_timeout());
    ctx.trace = trace;

    if let Some(tenant) = headers.get("x-tenant-id").and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_tenant(tenant);
    }
    ctx
}

/// Shape any error as a GraphQL error body with the right HTTP status.
pub(crate) fn error_response(
    err: &FraiseQLError,
    sanitization: fraiseql_error::SanitizationLevel,
) -> Response {
    let entry = GraphQLError::from_error(err, sanitization);
    let body = serde_json::json!({
        "data": serde_json::Value::Null,
        "errors": [entry],
    });
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}
