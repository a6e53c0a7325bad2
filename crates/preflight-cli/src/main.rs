mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use preflight_core::Settings;

#[derive(Parser)]
#[command(
    name = "preflight",
    about = "Verify cluster deployment readiness and run gated schema migrations",
    version,
    propagate_version = true
)]
struct Cli {
    /// Target namespace (overrides the settings file)
    #[arg(long, global = true, env = "PREFLIGHT_NAMESPACE")]
    namespace: Option<String>,

    /// Label selector for the deployment's resources
    #[arg(long, global = true)]
    selector: Option<String>,

    /// Settings file (YAML); omitted fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// kubeconfig context to pin all kubectl invocations to
    #[arg(long, global = true)]
    kube_context: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify readiness: pods, storage claims, service endpoint, database
    Verify {
        /// Poll pods to readiness before checking the other classes
        #[arg(long)]
        wait: bool,
    },

    /// Apply a schema-migration payload through the deployment's pod,
    /// gated on readiness
    Migrate {
        /// SQL payload streamed to the remote interpreter
        #[arg(long)]
        file: PathBuf,
    },

    /// Print the deployment's resolved in-cluster endpoint
    Endpoint,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let result = dispatch(cli);

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let settings = resolve_settings(&cli)?;
    let kube_context = cli.kube_context.clone();

    match cli.command {
        Commands::Verify { wait } => cmd::verify::run(&settings, kube_context, wait, cli.json),
        Commands::Migrate { file } => cmd::migrate::run(&settings, kube_context, &file, cli.json),
        Commands::Endpoint => cmd::endpoint::run(&settings, kube_context, cli.json),
    }
}

/// Settings file first, CLI flags on top. Defaults cover everything else,
/// so runs with no flags target the conventional deployment.
fn resolve_settings(cli: &Cli) -> anyhow::Result<Settings> {
    use anyhow::Context;

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(namespace) = &cli.namespace {
        settings.namespace = namespace.clone();
    }
    if let Some(selector) = &cli.selector {
        settings.selector = selector.clone();
    }
    Ok(settings)
}
