use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "NESTWALL_";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub wall: WallSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Clone)]
pub struct AuthSettings {
    /// Empty means a random secret per process; tokens die with a restart.
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct WallSettings {
    pub max_comment_length: usize,
    /// Minimum seconds between two comments of the same user, 0 disables.
    pub post_cooldown_secs: i64,
    pub page_size: i64,
}

impl Default for WallSettings {
    fn default() -> Self {
        Self {
            max_comment_length: 2000,
            post_cooldown_secs: 0,
            page_size: 50,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::build(&run_mode, collect_env_vars(std::env::vars()))
    }

    fn build(run_mode: &str, env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let env_json = serde_json::to_string(&env_map)
            .map_err(|e| ConfigError::Message(format!("environment not serializable: {}", e)))?;

        let s = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.cors_origins", "*")?
            .set_default("database.url", "sqlite://data/nestwall.db")?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.token_ttl_minutes", 60)?
            .set_default("wall.max_comment_length", 2000)?
            .set_default("wall.post_cooldown_secs", 0)?
            .set_default("wall.page_size", 50)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }
}

/// `NESTWALL_AUTH__JWT_SECRET=x` becomes `auth.jwt_secret = x`.
fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
