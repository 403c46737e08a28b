use capquote_db::{connect_with_config, migrations};

use crate::commands::{execute, CommandResult, Failure};

pub fn run() -> CommandResult {
    execute("migrate", |config| async move {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<_, Failure>(CommandResult::success("migrate", "applied pending migrations"))
    })
}
