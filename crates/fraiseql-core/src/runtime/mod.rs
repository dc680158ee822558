//! Query execution runtime.
//!
//! One pipeline, no mode branching: compiled template → database → response
//! builder. Behaviors that used to be runtime toggles are compile-time facts
//! (operator availability, Arrow projections) or request-scoped Accept
//! routing (plane selection).

mod context;
mod cursor;
mod executor;
mod plane;
mod where_binding;

pub use context::RequestContext;
pub use cursor::KeysetCursor;
pub use executor::{Executor, GraphQLRequest, PersistedQueryExtension, RequestExtensions};
pub use plane::Plane;
pub use where_binding::render_where;
