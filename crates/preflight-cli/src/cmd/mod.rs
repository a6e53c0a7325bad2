pub mod endpoint;
pub mod migrate;
pub mod verify;

use anyhow::Context;
use kubectl_driver::Kubectl;

/// Locate kubectl and pin it to the requested context.
pub(crate) fn connect(kube_context: Option<String>) -> anyhow::Result<Kubectl> {
    let ctl = Kubectl::discover().context("kubectl is required for cluster queries")?;
    Ok(ctl.with_context(kube_context))
}
