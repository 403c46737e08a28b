use capquote_core::config::{AppConfig, LoadOptions, TableSourceKind};
use capquote_core::domain::specification::QuoteSpecification;
use capquote_db::connect_with_config;
use serde::Serialize;

use crate::commands::{open_engine, runtime, Failure};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_database_connectivity(&config));
            checks.push(check_price_tables(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["database_connectivity", "price_tables"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    if config.pricing.source != TableSourceKind::Database {
        return DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Skipped,
            details: "price tables are not read from the database".to_string(),
        };
    }

    let result = runtime().map_err(|(_, message, _)| message).and_then(|runtime| {
        runtime.block_on(async {
            let pool = connect_with_config(&config.database)
                .await
                .map_err(|error| format!("failed to connect to database: {error}"))?;
            pool.close().await;
            Ok::<(), String>(())
        })
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

/// Loads the configured tables and prices the default specification end to end.
fn check_price_tables(config: &AppConfig) -> DoctorCheck {
    let result = runtime().and_then(|runtime| {
        runtime.block_on(async {
            let (engine, pool) = open_engine(config).await?;
            let quote = engine
                .quote(&QuoteSpecification::default())
                .await
                .map_err(|error| (error.error_class(), error.to_string(), 5u8))?;
            if let Some(pool) = pool {
                pool.close().await;
            }
            let catalog = engine.catalog().await.map_err(|error| {
                (error.error_class(), error.to_string(), 5u8)
            })?;
            let source = catalog.source().to_string();
            Ok::<_, Failure>((catalog.len(), source, quote.per_unit_cost))
        })
    });

    match result {
        Ok((count, source, per_unit)) => DoctorCheck {
            name: "price_tables",
            status: CheckStatus::Pass,
            details: format!(
                "{count} tables from {source}; default cap prices at {per_unit} per unit"
            ),
        },
        Err((error_class, message, _)) => DoctorCheck {
            name: "price_tables",
            status: CheckStatus::Fail,
            details: format!("{error_class}: {message}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
