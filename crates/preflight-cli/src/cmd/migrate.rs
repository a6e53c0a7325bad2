use std::path::Path;

use anyhow::Context;

use preflight_core::{MigrationSession, Settings};

use crate::output::print_json;

pub fn run(
    settings: &Settings,
    kube_context: Option<String>,
    file: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let payload = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read migration payload {}", file.display()))?;

    let ctl = super::connect(kube_context)?;

    if !json {
        println!(
            "Applying migration to '{}' ({} bytes, selector {})",
            settings.namespace,
            payload.len(),
            settings.selector
        );
    }

    let report = MigrationSession::new(&ctl, settings, &payload).run()?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "✓ migration applied via pod {} in {:.1}s",
            report.pod, report.elapsed_secs
        );
    }
    Ok(())
}
