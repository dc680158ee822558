//! FraiseQL CLI - schema compilation tools.
//!
//! Compiles schema IR documents (emitted by the authoring layers) into
//! content-addressed `*.compiled.json` artifacts for the runtime.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// FraiseQL CLI - compile GraphQL schemas to SQL execution artifacts.
#[derive(Parser)]
#[command(name = "fraiseql")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema IR document into a CompiledSchema artifact
    Compile {
        /// Input schema IR file path
        #[arg(value_name = "SCHEMA_IR")]
        input: String,

        /// Database target (postgres, mysql, sqlite)
        #[arg(long, value_name = "TARGET")]
        target: String,

        /// Output artifact path
        #[arg(short, long, value_name = "OUTPUT", default_value = "schema.compiled.json")]
        output: String,

        /// Validate only, don't write the artifact
        #[arg(long)]
        check: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let outcome = match cli.command {
        Commands::Compile {
            input,
            target,
            output,
            check,
        } => commands::compile::run(&input, &target, &output, check),
    };

    match outcome {
        Ok(()) => {},
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        },
    }
}
