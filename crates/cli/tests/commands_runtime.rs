use std::env;
use std::sync::{Mutex, OnceLock};

use capquote_cli::commands::quote::QuoteArgs;
use capquote_cli::commands::{migrate, quote, seed, tables};
use capquote_core::cpq::repository::FilePriceTableSource;
use capquote_core::domain::price_table::ItemType;
use capquote_core::estimate::EstimateMode;
use rust_decimal::Decimal;
use serde_json::Value;

fn reference_order() -> QuoteArgs {
    QuoteArgs {
        quantity: Some(150),
        fabric: Some("Polyester".to_string()),
        logos: vec!["Laser Cut:Large::Front".to_string()],
        delivery: Some("Regular Delivery".to_string()),
        ..QuoteArgs::default()
    }
}

#[test]
fn quote_prices_the_reference_order_from_builtin_tables() {
    with_env(&[("CAPQUOTE_PRICING_SOURCE", "builtin")], || {
        let result = quote::run(reference_order());
        assert_eq!(result.exit_code, 0, "expected a priced quote: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["success"], true);
        assert_eq!(decimal(&payload["estimate"]["subtotal"]), Decimal::new(119_400, 2));
        assert_eq!(decimal(&payload["estimate"]["perUnit"]), Decimal::new(796, 2));
    });
}

#[test]
fn quote_rejects_a_zero_quantity() {
    with_env(&[], || {
        let result = quote::run(QuoteArgs { quantity: Some(0), ..QuoteArgs::default() });
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
    });
}

#[test]
fn ai_mode_reads_the_quantity_from_the_description() {
    with_env(&[], || {
        let result = quote::run(QuoteArgs {
            description: Some("we need 288 caps in navy".to_string()),
            mode: EstimateMode::Ai,
            ..QuoteArgs::default()
        });
        assert_eq!(result.exit_code, 0, "expected a priced quote: {}", result.output);
        assert_eq!(parse_payload(&result.output)["estimate"]["spec"]["quantity"], 288);
    });
}

#[test]
fn invalid_config_fails_before_any_work() {
    with_env(&[("CAPQUOTE_PRICING_SOURCE", "spreadsheet")], || {
        let result = quote::run(reference_order());
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("CAPQUOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn seeded_database_serves_table_listings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("cli.db").display());

    with_env(&[("CAPQUOTE_DATABASE_URL", &url), ("CAPQUOTE_PRICING_SOURCE", "database")], || {
        let seeded = seed::run(None);
        assert_eq!(seeded.exit_code, 0, "expected seed success: {}", seeded.output);
        assert_eq!(parse_payload(&seeded.output)["status"], "ok");

        let listed = tables::list(Some(ItemType::Product));
        assert_eq!(listed.exit_code, 0, "expected listing: {}", listed.output);
        let payload = parse_payload(&listed.output);
        assert_eq!(payload["source"], "sqlite");
        let rows = payload["tables"].as_array().expect("tables array");
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|row| row["item_type"] == "product"));
    });
}

#[test]
fn exported_tables_parse_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tables.toml");

    with_env(&[], || {
        let result = tables::export(Some(path.clone()));
        assert_eq!(result.exit_code, 0, "expected export success: {}", result.output);

        let raw = std::fs::read_to_string(&path).expect("exported file");
        let parsed = FilePriceTableSource::parse(&raw, "export").expect("parse export");
        assert!(parsed.len() > 100);
    });
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().and_then(|raw| raw.parse().ok()).expect("decimal string")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CAPQUOTE_DATABASE_URL",
        "CAPQUOTE_DATABASE_MAX_CONNECTIONS",
        "CAPQUOTE_DATABASE_TIMEOUT_SECS",
        "CAPQUOTE_SERVER_BIND_ADDRESS",
        "CAPQUOTE_SERVER_PORT",
        "CAPQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CAPQUOTE_PRICING_SOURCE",
        "CAPQUOTE_PRICING_TABLES_PATH",
        "CAPQUOTE_PRICING_CACHE_CAPACITY",
        "CAPQUOTE_PRICING_CACHE_TTL_SECS",
        "CAPQUOTE_PRICING_BATCH_CONCURRENCY",
        "CAPQUOTE_PRICING_BATCH_MAX_ITEMS",
        "CAPQUOTE_LOGGING_LEVEL",
        "CAPQUOTE_LOGGING_FORMAT",
        "CAPQUOTE_LOG_LEVEL",
        "CAPQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
