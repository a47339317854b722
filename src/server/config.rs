use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Environment variables override the config file when prefixed with this.
pub const ENV_PREFIX: &str = "RFIDPI_";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// When set, reset/shutdown/restart require `Authorization: Bearer <token>`.
    #[serde(default)]
    pub admin_token: Option<String>,

    #[serde(default = "default_restart_command")]
    pub restart_command: String,

    #[serde(default = "default_shutdown_command")]
    pub shutdown_command: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    bind_address: Option<String>,
    port: Option<u16>,
    database_path: Option<String>,
    log_dir: Option<String>,
    admin_token: Option<String>,
    restart_command: Option<String>,
    shutdown_command: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

// The reader driver posts scans to this port.
fn default_port() -> u16 {
    5000
}

fn default_database_path() -> String {
    "rfidpi.db".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_restart_command() -> String {
    "sudo shutdown -r now".to_string()
}

fn default_shutdown_command() -> String {
    "sudo shutdown -h now".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            database_path: default_database_path(),
            log_dir: default_log_dir(),
            admin_token: None,
            restart_command: default_restart_command(),
            shutdown_command: default_shutdown_command(),
        }
    }
}

fn read_file_config(config_path: Option<&str>) -> Result<PartialServerConfig, String> {
    let Some(path_str) = config_path else {
        return Ok(PartialServerConfig::default());
    };
    let path = Path::new(path_str);
    if !path.exists() {
        return Ok(PartialServerConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = read_file_config(config_path)?;

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::prefixed(ENV_PREFIX)
            .from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        Ok(Self::merge(env_config, file_config))
    }

    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Self {
        ServerConfig {
            bind_address: env_config.bind_address.or(file_config.bind_address)
                .unwrap_or_else(default_bind_address),
            port: env_config.port.or(file_config.port)
                .unwrap_or_else(default_port),
            database_path: env_config.database_path.or(file_config.database_path)
                .unwrap_or_else(default_database_path),
            log_dir: env_config.log_dir.or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            admin_token: env_config.admin_token.or(file_config.admin_token)
                .filter(|token| !token.trim().is_empty()),
            restart_command: env_config.restart_command.or(file_config.restart_command)
                .unwrap_or_else(default_restart_command),
            shutdown_command: env_config.shutdown_command.or(file_config.shutdown_command)
                .unwrap_or_else(default_shutdown_command),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| format!("Invalid bind address {}:{}: {e}", self.bind_address, self.port))
    }
}
