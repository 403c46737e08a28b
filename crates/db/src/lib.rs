pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod seed;
pub mod source;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use repositories::{RepositoryError, SqlPriceTableSource};
pub use seed::{seed_default_tables, seed_tables, SeedReport};
pub use source::{open_table_source, OpenedSource, SourceError};
