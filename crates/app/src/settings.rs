//! Handles settings for the application. Configuration is read from
//! `duesbook.toml` (or the file given with `--config`) and from
//! `DUESBOOK__*` environment variables, e.g. `DUESBOOK__APP__LEVEL=debug`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! sqlite = "duesbook.db"   # or: database = "memory"
//!
//! [club]
//! identity = "treasurer"
//! ```
use config::{
    Config, ConfigError, Environment, File,
    builder::{ConfigBuilder, DefaultState},
};
use serde::Deserialize;

const DEFAULT_FILE: &str = "duesbook";
const ENV_PREFIX: &str = "DUESBOOK";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct Club {
    pub identity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Option<Database>,
    #[serde(default)]
    pub club: Club,
}

impl Settings {
    /// Load settings from `path`, or from `duesbook.toml` when no path is
    /// given. An explicit path must exist; the default file is optional.
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        Self::load(
            Config::builder()
                .add_source(file)
                .add_source(Environment::with_prefix(ENV_PREFIX).separator("__")),
        )
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .set_default("app.level", "info")?
            .build()?
            .try_deserialize()
    }
}
