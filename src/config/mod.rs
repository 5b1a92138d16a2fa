/// Profile database connection, table creation and schema migrations
pub mod database;

/// Application settings loaded from `stockbook.toml` and the environment
pub mod settings;
