//! Process settings from command-line flags and environment variables

use clap::Parser;
use covariate_api::TableRef;
use sqlx::postgres::PgConnectOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "covariate-server", version, about = "Serve the census covariates API")]
pub struct Settings {
    /// Grid configuration file (JSON with `levels` and `grids`)
    #[arg(long, env = "GRID_CONFIG_PATH")]
    pub grid_config: PathBuf,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:2112")]
    pub bind_addr: SocketAddr,

    /// Full connection URL; takes precedence over the individual DB_* settings
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[arg(long, env = "DB_NAME", default_value = "postgres")]
    pub db_name: String,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub db_max_connections: u32,

    /// Schema holding the variables table
    #[arg(long, env = "DB_SCHEMA", default_value = "public")]
    pub db_schema: String,

    /// Name of the variables table
    #[arg(long, env = "VARIABLES_TABLE", default_value = "variables")]
    pub table: String,

    /// Region catalog endpoint returning `{grid_id, resolution}` entries
    #[arg(long, env = "REGION_CATALOG_URL")]
    pub region_catalog_url: String,

    #[arg(long, env = "REGION_CATALOG_TIMEOUT_MS", default_value_t = 5000)]
    pub region_catalog_timeout_ms: u64,

    /// Seconds a fetched region catalog may be reused; 0 disables caching
    #[arg(long, env = "GRID_CACHE_TTL_SECS", default_value_t = 0)]
    pub grid_cache_ttl_secs: u64,
}

impl Settings {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match &self.database_url {
            Some(url) => url.parse(),
            None => Ok(PgConnectOptions::new()
                .host(&self.db_host)
                .port(self.db_port)
                .database(&self.db_name)
                .username(&self.db_user)
                .password(&self.db_password)),
        }
    }

    pub fn table(&self) -> TableRef {
        TableRef::new(&self.db_schema, &self.table)
    }

    pub fn region_catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.region_catalog_timeout_ms)
    }

    pub fn grid_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.grid_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Settings {
        let mut arguments = vec![
            "covariate-server",
            "--grid-config",
            "grids.json",
            "--region-catalog-url",
            "http://regions.local/grids",
            "--db-host",
            "db.internal",
            "--db-port",
            "6543",
            "--db-name",
            "census",
            "--db-user",
            "reader",
        ];
        arguments.extend_from_slice(extra);
        Settings::try_parse_from(arguments).unwrap()
    }

    #[test]
    fn test_connect_options_from_parts() {
        let settings = parse(&["--bind-addr", "127.0.0.1:9000"]);
        assert_eq!(settings.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());

        // DATABASE_URL may be set in the environment running the tests
        let settings = Settings {
            database_url: None,
            ..settings
        };
        let options = settings.connect_options().unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("census"));
        assert_eq!(options.get_username(), "reader");
    }

    #[test]
    fn test_database_url_takes_precedence() {
        let settings = parse(&["--database-url", "postgres://u:p@other:1/d"]);
        let options = settings.connect_options().unwrap();
        assert_eq!(options.get_host(), "other");
        assert_eq!(options.get_database(), Some("d"));
    }

    #[test]
    fn test_table_and_durations() {
        let settings = parse(&[
            "--db-schema",
            "censo",
            "--table",
            "covariables",
            "--region-catalog-timeout-ms",
            "250",
            "--grid-cache-ttl-secs",
            "30",
        ]);

        assert_eq!(settings.table(), TableRef::new("censo", "covariables"));
        assert_eq!(settings.region_catalog_timeout(), Duration::from_millis(250));
        assert_eq!(settings.grid_cache_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_grid_config_is_required() {
        let result = Settings::try_parse_from(["covariate-server", "--region-catalog-url", "http://x"]);
        if std::env::var_os("GRID_CONFIG_PATH").is_none() {
            assert!(result.is_err());
        }
    }
}
