//! Database capability manifests.
//!
//! A capability manifest is the static, per-target declaration of which
//! filter operators a database can render and how. One JSON file per target
//! is checked into the repository under `manifests/`; the compiler loads the
//! manifest once per run and intersects it with each field's scalar family.
//!
//! Adding a database target is exactly: add a manifest file + one dialect
//! renderer (see [`crate::sql`]). No other component changes.

mod manifest;

pub use manifest::{CapabilityManifest, OperatorSpec, ScalarFamily, ValueShape};
