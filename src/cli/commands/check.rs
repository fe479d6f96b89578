//! check command - Bootstrap the metamodel and run full verification
//!
//! Verification always runs here, whatever `[bootstrap] verify` says.

use anyhow::{bail, Context as _, Result};
use serde::Serialize;

use super::{load_config, Context};
use crate::core::verify::{verify_registry, VerifyResult};
use crate::ui::output;

#[derive(Debug, Serialize)]
struct CheckOutput {
    repository: String,
    classes: usize,
    properties: usize,
    #[serde(flatten)]
    result: VerifyResult,
}

/// Verify the configured metamodel. Fails if any check fails.
pub fn check(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let registry = config
        .build_registry()
        .context("failed to bootstrap metamodel")?;
    let result = verify_registry(&registry);

    let summary = CheckOutput {
        repository: registry.repository_id().to_string(),
        classes: registry.class_count(),
        properties: registry.property_count(),
        result,
    };

    if ctx.json {
        output::json(&summary)?;
    } else if summary.result.ok {
        output::print(
            format!(
                "ok: repository {} with {} classes and {} properties",
                summary.repository, summary.classes, summary.properties
            ),
            ctx.verbosity,
        );
    } else {
        for err in &summary.result.errors {
            output::error(err);
        }
    }

    if !summary.result.ok {
        bail!(
            "verification failed with {} error(s)",
            summary.result.errors.len()
        );
    }
    Ok(())
}
