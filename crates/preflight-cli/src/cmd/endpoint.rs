use anyhow::anyhow;

use preflight_core::{ClusterChecks, Settings};

use crate::output::print_json;

pub fn run(settings: &Settings, kube_context: Option<String>, json: bool) -> anyhow::Result<()> {
    let ctl = super::connect(kube_context)?;
    let obs = ClusterChecks::new(&ctl, settings).endpoint_observation()?;

    if json {
        print_json(&obs)?;
    } else if let Some(address) = &obs.detail {
        println!("{address}");
    }

    if obs.is_ready() {
        Ok(())
    } else {
        Err(anyhow!(
            "no resolvable endpoint for selector '{}' ({})",
            settings.selector,
            obs.phase
        ))
    }
}
