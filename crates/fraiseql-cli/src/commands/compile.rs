//! `fraiseql compile` - IR document → CompiledSchema artifact.

use std::path::Path;

use fraiseql_core::capability::CapabilityManifest;
use fraiseql_core::compiler;
use fraiseql_core::ir::SchemaIr;
use fraiseql_error::Result;

/// Run the compile command.
///
/// Exit contract: `Ok` means the artifact was produced (or, with `check`,
/// that the IR validates); the caller maps `Err` to a non-zero exit with
/// the diagnostic on stderr. `UnsupportedOperator` diagnostics carry the
/// target's suggestion list.
pub fn run(input: &str, target: &str, output: &str, check: bool) -> Result<()> {
    let ir_text = std::fs::read_to_string(input)?;
    let ir = SchemaIr::from_json(&ir_text)?;
    let manifest = CapabilityManifest::load(target)?;

    let compiled = compiler::compile(&ir, &manifest, target)?;

    if check {
        println!(
            "✓ schema validates for target '{target}' ({} types, {} templates, hash {})",
            compiled.types.len(),
            compiled.templates.len(),
            &compiled.schema_hash[..12],
        );
        return Ok(());
    }

    compiled.to_file(Path::new(output))?;
    println!(
        "✓ wrote {output} ({} types, {} templates, hash {})",
        compiled.types.len(),
        compiled.templates.len(),
        &compiled.schema_hash[..12],
    );
    Ok(())
}
