use anyhow::anyhow;

use kubectl_driver::ClusterCtl;
use preflight_core::{aggregate, ClusterChecks, HealthVerdict, Observation, Settings};

use crate::output::{print_json, print_table};

/// How many table names to show in the human report.
const SAMPLE_TABLES: usize = 5;

// ─── Report shapes ────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct ClassReport {
    healthy: bool,
    total: usize,
    ready: usize,
    not_ready: Vec<Observation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(serde::Serialize)]
struct EndpointReport {
    healthy: bool,
    phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(serde::Serialize)]
struct DatabaseReport {
    connected: bool,
    tables: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sample: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(serde::Serialize)]
struct VerifyReport {
    namespace: String,
    selector: String,
    pods: ClassReport,
    claims: ClassReport,
    endpoint: EndpointReport,
    /// Absent when pods were not ready — probing the database through a
    /// pending pod would only time out.
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<DatabaseReport>,
    healthy: bool,
}

// ─── Command ──────────────────────────────────────────────────────────────

pub fn run(
    settings: &Settings,
    kube_context: Option<String>,
    wait: bool,
    json: bool,
) -> anyhow::Result<()> {
    let ctl = super::connect(kube_context)?;
    let checks = ClusterChecks::new(&ctl, settings);

    let pods = class_report(if wait {
        checks.wait_for_pods()
    } else {
        checks.pod_observations().map(aggregate)
    });
    let claims = class_report(checks.claim_observations().map(aggregate));
    let endpoint = endpoint_report(&checks);
    let database = if pods.healthy {
        Some(database_report(&checks))
    } else {
        None
    };

    let healthy = pods.healthy
        && claims.healthy
        && endpoint.healthy
        && database.as_ref().is_some_and(|db| db.connected);

    let report = VerifyReport {
        namespace: settings.namespace.clone(),
        selector: settings.selector.clone(),
        pods,
        claims,
        endpoint,
        database,
        healthy,
    };

    if json {
        print_json(&report)?;
    } else {
        print_human(&report);
    }

    if report.healthy {
        Ok(())
    } else {
        Err(anyhow!("deployment is not ready"))
    }
}

// ─── Report assembly ──────────────────────────────────────────────────────

fn class_report(outcome: preflight_core::Result<HealthVerdict>) -> ClassReport {
    match outcome {
        Ok(verdict) => ClassReport {
            healthy: verdict.healthy(),
            total: verdict.total,
            ready: verdict.ready,
            not_ready: verdict.not_ready,
            error: None,
        },
        Err(e) => ClassReport {
            healthy: false,
            total: 0,
            ready: 0,
            not_ready: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

fn endpoint_report<C: ClusterCtl>(checks: &ClusterChecks<C>) -> EndpointReport {
    match checks.endpoint_observation() {
        Ok(obs) => EndpointReport {
            healthy: obs.is_ready(),
            phase: obs.phase,
            address: obs.detail,
            error: None,
        },
        Err(e) => EndpointReport {
            healthy: false,
            phase: "Error".to_owned(),
            address: None,
            error: Some(e.to_string()),
        },
    }
}

fn database_report<C: ClusterCtl>(checks: &ClusterChecks<C>) -> DatabaseReport {
    let failed = |detail: String| DatabaseReport {
        connected: false,
        tables: 0,
        sample: Vec::new(),
        error: Some(detail),
    };

    match checks.locate_pod() {
        Err(e) => failed(e.to_string()),
        Ok(None) => failed("no pod to probe through".to_owned()),
        Ok(Some(pod)) => match checks.table_listing(&pod) {
            Err(e) => failed(e.to_string()),
            Ok(tables) => DatabaseReport {
                connected: true,
                tables: tables.len(),
                sample: tables.into_iter().take(SAMPLE_TABLES).collect(),
                error: None,
            },
        },
    }
}

// ─── Human output ─────────────────────────────────────────────────────────

fn print_human(report: &VerifyReport) {
    println!(
        "Namespace: {} (selector {})",
        report.namespace, report.selector
    );

    print_class("Pods", "running", &report.pods);
    print_class("Storage", "bound", &report.claims);

    match (&report.endpoint.error, &report.endpoint.address) {
        (Some(e), _) => println!("Endpoint: ERROR — {e}"),
        (None, Some(address)) => println!("Endpoint: {address}"),
        (None, None) => println!("Endpoint: not resolved ({})", report.endpoint.phase),
    }

    match &report.database {
        None => println!("Database: skipped (pods not ready)"),
        Some(db) => match &db.error {
            Some(e) => println!("Database: ERROR — {e}"),
            None => {
                println!("Database: {} table(s)", db.tables);
                for table in &db.sample {
                    println!("  ✓ {table}");
                }
            }
        },
    }

    if report.healthy {
        println!("\n✓ deployment is ready");
    } else {
        println!("\n✗ deployment is not ready");
    }
}

fn print_class(label: &str, ready_word: &str, class: &ClassReport) {
    match &class.error {
        Some(e) => println!("{label}: ERROR — {e}"),
        None => {
            println!("{label}: {}/{} {ready_word}", class.ready, class.total);
            if !class.not_ready.is_empty() {
                let rows: Vec<Vec<String>> = class
                    .not_ready
                    .iter()
                    .map(|obs| vec![obs.name.clone(), obs.phase.clone()])
                    .collect();
                print_table(&["NAME", "PHASE"], &rows, 2);
            }
        }
    }
}
