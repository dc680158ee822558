//! # FraiseQL Server
//!
//! Axum HTTP surface over the compiled execution pipeline.
//!
//! One endpoint, `POST /graphql`; the `Accept` header routes the request to
//! the JSON, Arrow or Delta plane. Responses from the JSON plane are the
//! response builder's bytes untouched; Arrow responses are IPC bodies;
//! Delta responses are SSE event streams over the change log.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

mod delta_stream;
mod rate_limit;
mod routes;
mod state;

pub use rate_limit::RateLimiter;
pub use routes::router;
pub use state::AppState;
