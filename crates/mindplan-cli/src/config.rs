//! Configuration file management for mindplan.
//!
//! Provides a TOML-based config file at `~/.config/mindplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mindplan_core::TreeValidation;
use mindplan_core::llm::LlmConfig;
use mindplan_db::config::DbConfig;

pub const API_KEY_ENV: &str = "AI_API_KEY";
pub const BASE_URL_ENV: &str = "AI_API_BASE_URL";
pub const MODEL_ENV: &str = "AI_MODEL";
pub const SERVER_URL_ENV: &str = "MINDPLAN_SERVER_URL";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Reject malformed plans instead of falling back to the goal.
    #[serde(default)]
    pub strict_validation: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    /// Base URL the client commands talk to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the mindplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/mindplan` or `~/.config/mindplan`,
/// also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("mindplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mindplan")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file may hold an API key, so it is made owner-only on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct MindplanConfig {
    pub db_config: DbConfig,
    pub llm_config: LlmConfig,
    pub validation: TreeValidation,
    pub server_url: String,
}

impl MindplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `MINDPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - AI key, base URL and model: `AI_*` env > `[ai]` section > provider defaults.
    ///   A missing key is not an error here; plan generation reports it.
    /// - Server URL: `cli_server_url` > `MINDPLAN_SERVER_URL` > `server.url` > `DEFAULT_SERVER_URL`
    pub fn resolve(cli_db_url: Option<&str>, cli_server_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();
        let ai = file_config.as_ref().map(|c| &c.ai);

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = env_nonempty(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let defaults = LlmConfig::default();
        let llm_config = LlmConfig {
            api_key: env_nonempty(API_KEY_ENV).or_else(|| ai.and_then(|a| a.api_key.clone())),
            base_url: env_nonempty(BASE_URL_ENV)
                .or_else(|| ai.and_then(|a| a.base_url.clone()))
                .unwrap_or(defaults.base_url),
            model: env_nonempty(MODEL_ENV)
                .or_else(|| ai.and_then(|a| a.model.clone()))
                .unwrap_or(defaults.model),
        };

        let validation = if ai.is_some_and(|a| a.strict_validation) {
            TreeValidation::Strict
        } else {
            TreeValidation::Lenient
        };

        let server_url = cli_server_url
            .map(str::to_string)
            .or_else(|| env_nonempty(SERVER_URL_ENV))
            .or_else(|| file_config.as_ref().and_then(|c| c.server.url.clone()))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        Ok(Self {
            db_config: DbConfig::new(db_url),
            llm_config,
            validation,
            server_url,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point `XDG_CONFIG_HOME` at a temp dir for the duration of `f`.
    fn with_config_home<T>(f: impl FnOnce(&std::path::Path) -> T) -> T {
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let result = f(tmp.path());

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        result
    }

    fn clear_env() {
        for name in [
            DbConfig::ENV_VAR,
            API_KEY_ENV,
            BASE_URL_ENV,
            MODEL_ENV,
            SERVER_URL_ENV,
        ] {
            unsafe { std::env::remove_var(name) };
        }
    }

    fn sample_config() -> ConfigFile {
        ConfigFile {
            database: DatabaseSection {
                url: "postgresql://filehost:5432/filedb".to_string(),
            },
            ai: AiSection {
                api_key: Some("sk-file".to_string()),
                base_url: Some("http://llm.local/v1".to_string()),
                model: Some("file-model".to_string()),
                strict_validation: true,
            },
            server: ServerSection {
                url: Some("http://filehost:4000".to_string()),
            },
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        with_config_home(|home| {
            save_config(&sample_config()).unwrap();
            assert!(home.join("mindplan/config.toml").exists());

            let loaded = load_config().unwrap();
            assert_eq!(loaded.database.url, "postgresql://filehost:5432/filedb");
            assert_eq!(loaded.ai.model.as_deref(), Some("file-model"));
            assert!(loaded.ai.strict_validation);
        });
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        with_config_home(|_| {
            save_config(&sample_config()).unwrap();
            let meta = std::fs::metadata(config_path()).unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        });
    }

    #[test]
    fn minimal_file_parses_with_defaults() {
        let cfg: ConfigFile =
            toml::from_str("[database]\nurl = \"postgresql://x:5432/y\"\n").unwrap();
        assert!(cfg.ai.api_key.is_none());
        assert!(!cfg.ai.strict_validation);
        assert!(cfg.server.url.is_none());
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        clear_env();
        let config = with_config_home(|_| MindplanConfig::resolve(None, None).unwrap());

        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.llm_config.base_url, LlmConfig::DEFAULT_BASE_URL);
        assert_eq!(config.llm_config.model, LlmConfig::DEFAULT_MODEL);
        assert!(config.llm_config.api_key.is_none());
        assert_eq!(config.validation, TreeValidation::Lenient);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn resolve_reads_config_file() {
        let _lock = lock_env();
        clear_env();
        let config = with_config_home(|_| {
            save_config(&sample_config()).unwrap();
            MindplanConfig::resolve(None, None).unwrap()
        });

        assert_eq!(config.db_config.database_url, "postgresql://filehost:5432/filedb");
        assert_eq!(config.llm_config.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.llm_config.base_url, "http://llm.local/v1");
        assert_eq!(config.validation, TreeValidation::Strict);
        assert_eq!(config.server_url, "http://filehost:4000");
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(API_KEY_ENV, "sk-env") };
        unsafe { std::env::set_var(MODEL_ENV, "env-model") };

        let config = with_config_home(|_| {
            save_config(&sample_config()).unwrap();
            MindplanConfig::resolve(None, None).unwrap()
        });
        clear_env();

        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.llm_config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm_config.model, "env-model");
        // Not overridden.
        assert_eq!(config.llm_config.base_url, "http://llm.local/v1");
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(SERVER_URL_ENV, "http://env:3000") };

        let config = with_config_home(|_| {
            MindplanConfig::resolve(Some("postgresql://cli:5432/clidb"), Some("http://cli:9000"))
                .unwrap()
        });
        clear_env();

        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
        assert_eq!(config.server_url, "http://cli:9000");
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("mindplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
