//! Database configuration
//!
//! `user`, `password` and `db` are required; everything else has a default.
//! Keys match the `[database]` table of the scribe config file.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::{OrmError, Result};

/// Which driver the pool talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn default_port(self) -> u16 {
        match self {
            Backend::Mysql => 3306,
            Backend::Postgres => 5432,
            Backend::Sqlite => 0,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Mysql => "mysql",
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
        })
    }
}

impl FromStr for Backend {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Backend::Mysql),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(OrmError::config(format!("unknown backend '{}'", other))),
        }
    }
}

/// What to do when a save/update/remove touches other than one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowCountPolicy {
    /// Log a warning and carry on
    #[default]
    Warn,
    /// Return [`OrmError::RowCountMismatch`]
    Error,
}

/// Validated connection pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawDbConfig")]
pub struct DbConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database name; the file path for SQLite
    pub db: String,
    pub charset: String,
    /// Default write mode for [`crate::Database::execute`]
    pub autocommit: bool,
    pub maxsize: u32,
    pub minsize: u32,
    pub acquire_timeout_secs: u64,
    pub strict_row_counts: bool,
}

/// Wire form with every key optional, so absence can be reported by name.
#[derive(Debug, Default, Deserialize)]
struct RawDbConfig {
    backend: Option<Backend>,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    db: Option<String>,
    charset: Option<String>,
    autocommit: Option<bool>,
    maxsize: Option<u32>,
    minsize: Option<u32>,
    acquire_timeout_secs: Option<u64>,
    strict_row_counts: Option<bool>,
}

impl TryFrom<RawDbConfig> for DbConfig {
    type Error = OrmError;

    fn try_from(raw: RawDbConfig) -> Result<Self> {
        let backend = raw.backend.unwrap_or_default();
        let config = Self {
            backend,
            host: raw.host.unwrap_or_else(|| "localhost".to_string()),
            port: raw.port.unwrap_or_else(|| backend.default_port()),
            user: raw.user.ok_or(OrmError::MissingConfigKey { key: "user" })?,
            password: raw
                .password
                .ok_or(OrmError::MissingConfigKey { key: "password" })?,
            db: raw.db.ok_or(OrmError::MissingConfigKey { key: "db" })?,
            charset: raw.charset.unwrap_or_else(|| "utf8".to_string()),
            autocommit: raw.autocommit.unwrap_or(true),
            maxsize: raw.maxsize.unwrap_or(10),
            minsize: raw.minsize.unwrap_or(1),
            acquire_timeout_secs: raw.acquire_timeout_secs.unwrap_or(30),
            strict_row_counts: raw.strict_row_counts.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }
}

impl DbConfig {
    /// Config with the required keys and defaults for the rest.
    pub fn new(user: impl Into<String>, password: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            backend: Backend::Mysql,
            host: "localhost".to_string(),
            port: Backend::Mysql.default_port(),
            user: user.into(),
            password: password.into(),
            db: db.into(),
            charset: "utf8".to_string(),
            autocommit: true,
            maxsize: 10,
            minsize: 1,
            acquire_timeout_secs: 30,
            strict_row_counts: false,
        }
    }

    /// SQLite file config; credentials are unused by the driver.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            port: 0,
            ..Self::new("sqlite", "sqlite", path)
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: RawDbConfig = toml::from_str(s)?;
        Self::try_from(raw)
    }

    /// Build from an already-parsed TOML table, e.g. `[database]`.
    pub fn from_toml_value(value: toml::Value) -> Result<Self> {
        let raw: RawDbConfig = value.try_into()?;
        Self::try_from(raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.maxsize == 0 {
            return Err(OrmError::config("maxsize must be at least 1"));
        }
        if self.minsize > self.maxsize {
            return Err(OrmError::config(format!(
                "minsize ({}) exceeds maxsize ({})",
                self.minsize, self.maxsize
            )));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn row_count_policy(&self) -> RowCountPolicy {
        if self.strict_row_counts {
            RowCountPolicy::Error
        } else {
            RowCountPolicy::Warn
        }
    }

    /// MySQL connect options; credentials are passed as-is, never URL-parsed.
    pub fn mysql_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.db)
            .charset(&self.charset)
    }

    pub fn postgres_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.db)
    }

    /// SQLite file at `db`, created when missing.
    pub fn sqlite_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.db)
            .create_if_missing(true)
    }

    /// Connection target for logs: URL form, percent-encoded, password masked.
    pub fn redacted_url(&self) -> String {
        let user = urlencoding::encode(&self.user);
        let db = urlencoding::encode(&self.db);
        match self.backend {
            Backend::Mysql => format!(
                "mysql://{}:***@{}:{}/{}?charset={}",
                user, self.host, self.port, db, self.charset
            ),
            Backend::Postgres => format!(
                "postgres://{}:***@{}:{}/{}",
                user, self.host, self.port, db
            ),
            Backend::Sqlite => format!("sqlite://{}", self.db),
        }
    }
}
