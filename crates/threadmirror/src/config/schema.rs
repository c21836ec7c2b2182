use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub platform: PlatformConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub user_agent: String,
    pub username: String,
}

/// Names of the environment variables holding credentials. The values
/// themselves never appear in config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

fn default_client_id_env() -> String {
    "THREADMIRROR_CLIENT_ID".to_string()
}

fn default_client_secret_env() -> String {
    "THREADMIRROR_CLIENT_SECRET".to_string()
}

fn default_password_env() -> String {
    "THREADMIRROR_PASSWORD".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
            password_env: default_password_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// One is picked at random for the top of each posted reply.
    #[serde(default)]
    pub taglines: Vec<String>,
    #[serde(default)]
    pub footer: String,
    #[serde(default = "default_error_msg")]
    pub error_msg: String,
}

fn default_error_msg() -> String {
    "Something went wrong, sorry about that.".to_string()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            taglines: Vec::new(),
            footer: String::new(),
            error_msg: default_error_msg(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Configured path, or the canonical per-user location; falls back to
    /// the working directory when no home directory exists.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(crate::db::default_database_path)
            .unwrap_or_else(|| PathBuf::from("threadmirror.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_pass_limit")]
    pub pass_limit: usize,
}

fn default_pass_limit() -> usize {
    crate::scheduler::PASS_LIMIT
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pass_limit: default_pass_limit(),
        }
    }
}
