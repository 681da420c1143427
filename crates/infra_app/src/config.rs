//! Database connection settings from the environment.

use std::env;

use tokio_postgres::Config;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PORT: u16 = 5432;

/// Connection settings. Missing values are only reported when a connection
/// is attempted, so the service can start and answer health checks before
/// the database is reachable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbOptions {
    pub host: Option<String>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: u16,
}

impl DbOptions {
    pub fn new(host: impl Into<String>, name: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            name: Some(name.into()),
            user: Some(user.into()),
            password: None,
            port: DEFAULT_PORT,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Read `DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASSWORD` and `DB_PORT`.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`DbOptions::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("DB_PORT is not a port number: {:?}", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: lookup("DB_HOST"),
            name: lookup("DB_NAME"),
            user: lookup("DB_USER"),
            password: lookup("DB_PASSWORD"),
            port,
        })
    }

    /// Driver configuration. Host, database and user are required.
    pub fn pg_config(&self) -> AppResult<Config> {
        let required = |value: &Option<String>, var: &str| {
            value
                .clone()
                .ok_or_else(|| AppError::Config(format!("{} is not set", var)))
        };

        let mut config = Config::new();
        config
            .host(&required(&self.host, "DB_HOST")?)
            .dbname(&required(&self.name, "DB_NAME")?)
            .user(&required(&self.user, "DB_USER")?)
            .port(self.port);
        if let Some(password) = &self.password {
            config.password(password);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let options = DbOptions::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_NAME", "appdb"),
            ("DB_USER", "postres"),
            ("DB_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(
            options,
            DbOptions::new("db.internal", "appdb", "postres").with_password("secret")
        );
        assert_eq!(options.port, 5432);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = DbOptions::from_lookup(lookup(&[("DB_PORT", "postgres")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_values_fail_only_on_connect() {
        let options = DbOptions::from_lookup(lookup(&[("DB_HOST", "db")])).unwrap();
        let err = options.pg_config().unwrap_err();
        assert!(err.to_string().contains("DB_NAME"));
    }

    #[test]
    fn test_pg_config() {
        let config = DbOptions::new("db", "appdb", "postres").with_port(6543).pg_config().unwrap();
        assert_eq!(config.get_dbname(), Some("appdb"));
        assert_eq!(config.get_user(), Some("postres"));
        assert_eq!(config.get_ports(), &[6543]);
    }
}
