use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use capquote_core::cpq::QuoteEngine;
use capquote_db::DbPool;
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    engine: Arc<QuoteEngine>,
    db_pool: Option<DbPool>,
}

impl HealthState {
    pub fn new(engine: Arc<QuoteEngine>, db_pool: Option<DbPool>) -> Self {
        Self { engine, db_pool }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub price_tables: HealthCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<HealthCheck>,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Ready when a table snapshot is loaded and, if configured, the database answers.
/// Stale tables still serve quotes, so they report `degraded` with a 200.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let price_tables = price_table_check(&state.engine);
    let database = match &state.db_pool {
        Some(pool) => Some(database_check(pool).await),
        None => None,
    };

    let unavailable = price_tables.status == "unavailable"
        || database.as_ref().is_some_and(|check| check.status != "ready");
    let degraded = price_tables.status != "ready";

    let payload = HealthResponse {
        status: if unavailable {
            "unavailable"
        } else if degraded {
            "degraded"
        } else {
            "ready"
        },
        price_tables,
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if unavailable { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::OK };
    (status_code, Json(payload))
}

fn price_table_check(engine: &QuoteEngine) -> HealthCheck {
    let repository = engine.repository();
    match repository.snapshot() {
        Some(catalog) if repository.is_stale() => HealthCheck {
            status: "degraded",
            detail: format!(
                "serving last known good tables v{} from {}; latest refresh failed",
                catalog.version(),
                catalog.source()
            ),
        },
        Some(catalog) => HealthCheck {
            status: "ready",
            detail: format!(
                "{} tables v{} from {}",
                catalog.len(),
                catalog.version(),
                catalog.source()
            ),
        },
        None => HealthCheck {
            status: "unavailable",
            detail: format!("no price tables loaded from {}", repository.source_name()),
        },
    }
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use capquote_core::cpq::repository::{InMemoryPriceTableSource, PriceTableRepository};
    use capquote_core::cpq::{EngineSettings, QuoteEngine};
    use capquote_db::connect_with_settings;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_is_ready_with_loaded_tables() {
        let engine = QuoteEngine::builtin(EngineSettings::default()).await.expect("engine");
        let (status, Json(payload)) =
            health(State(HealthState::new(Arc::new(engine), None))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert!(payload.database.is_none());
    }

    #[tokio::test]
    async fn health_is_unavailable_before_any_table_load() {
        let repository = PriceTableRepository::new(
            Arc::new(InMemoryPriceTableSource::new(Vec::new())),
            Default::default(),
        );
        let engine = QuoteEngine::new(Arc::new(repository), EngineSettings::default());
        let (status, Json(payload)) =
            health(State(HealthState::new(Arc::new(engine), None))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.price_tables.status, "unavailable");
    }

    #[tokio::test]
    async fn closed_database_reports_unavailable() {
        let engine = QuoteEngine::builtin(EngineSettings::default()).await.expect("engine");
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        pool.close().await;

        let (status, Json(payload)) =
            health(State(HealthState::new(Arc::new(engine), Some(pool)))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.database.map(|check| check.status), Some("degraded"));
    }
}
