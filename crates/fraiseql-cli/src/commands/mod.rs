//! CLI subcommands.

pub mod compile;
