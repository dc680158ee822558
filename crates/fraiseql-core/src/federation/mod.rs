//! Federation entity resolution.
//!
//! `_entities(representations)` calls are grouped by `__typename` and
//! dispatched to the strategy the compiler fixed for each type:
//!
//! - **Local**: ordered batch template against the local view.
//! - **PeerDatabase**: the same compiled SQL over a pooled connection to a
//!   peer database. No HTTP hop.
//! - **HttpSubgraph**: one batched `_entities` GraphQL request per subgraph
//!   with timeout, bounded jittered retries and a per-subgraph circuit
//!   breaker.
//!
//! Result positions correspond to representation positions; failures become
//! `null` at their position with an error whose path pinpoints the index.

mod http;
mod representation;
mod resolver;

pub use http::{HttpSubgraphClient, SubgraphClientConfig};
pub use representation::EntityRepresentation;
pub use resolver::{EntityResolver, ResolvedEntities};
