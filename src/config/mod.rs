use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config, read_config_from};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    #[serde(default)]
    storage: Storage,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_session_ttl_hours")]
    session_ttl_hours: i64,
    #[serde(default = "default_session_sweep_interval_secs")]
    session_sweep_interval_secs: u64,
    #[serde(default = "default_session_cache_ttl_secs")]
    session_cache_ttl_secs: u64,
    admin_username: Option<String>,
    admin_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    #[serde(default = "default_storage_root")]
    root: String,
    #[serde(default = "default_public_url")]
    public_url: String,
    #[serde(default = "default_max_upload_bytes")]
    max_upload_bytes: usize,
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_session_sweep_interval_secs() -> u64 {
    300
}

fn default_session_cache_ttl_secs() -> u64 {
    30
}

fn default_storage_root() -> String {
    String::from("uploads")
}

fn default_public_url() -> String {
    String::from("/api/v1/storage")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            public_url: default_public_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    Self::from_slice(&bytes)
                };

                match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        let config: Self = toml::from_slice(bytes)?;
        Ok(config)
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    #[inline]
    pub fn session_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    #[inline]
    pub fn session_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_cache_ttl_secs)
    }

    /// Credentials of the account created on start-up when it does not exist yet.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

impl Storage {
    #[inline]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[inline]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    #[inline]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}
