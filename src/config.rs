//! TOML configuration for the search engine, its backend and the HTTP service.
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::local::MAX_SHOTS;
use crate::database::MAX_INDEX_WIDTH;
use crate::errors::ConfigError;
use crate::labeling::{DEFAULT_LABEL_SEED, MAX_LABEL_WIDTH};

/// Upper bound on `backend.max_qubits`; a dense state of this width is already 16 GiB.
pub const MAX_SIMULATED_QUBITS: usize = 30;

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[search]` table.
    pub search: SearchConfig,
    /// `[backend]` table.
    pub backend: BackendConfig,
    /// `[service]` table.
    pub service: ServiceConfig,
}

/// Search sizing and behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Index register width `n`; collections are truncated to `2^n` items.
    pub index_width: usize,
    /// Label width `k`.
    pub label_width: usize,
    /// Seed mixed into every label digest.
    pub label_seed: u64,
    /// Assumed number of matching items `M`.
    pub expected_marked: usize,
    /// Use the exact, phase-matched variant of amplification.
    pub exact: bool,
    /// Shots per query; the modal outcome wins.
    pub shots: usize,
    /// Refuse collections in which two items share a label.
    pub reject_collisions: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_width: 3,
            label_width: 6,
            label_seed: DEFAULT_LABEL_SEED,
            expected_marked: 1,
            exact: true,
            shots: 1,
            reject_collisions: false,
        }
    }
}

/// Which backend executes circuits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process statevector simulation.
    #[default]
    Local,
    /// A backend server reached over HTTP.
    Remote,
}

/// Backend selection and the backend server's own settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Local simulation or a remote backend server.
    pub kind: BackendKind,
    /// `host:port` of the backend server.
    pub endpoint: String,
    /// Request and health check timeout in milliseconds.
    pub timeout_ms: u64,
    /// Seed for shot sampling. Unseeded backends draw from system entropy.
    pub rng_seed: Option<u64>,
    /// Widest circuit a local backend simulates.
    pub max_qubits: usize,
    /// Where the backend server writes its calibration record on startup.
    pub calibration_path: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            endpoint: "127.0.0.1:42069".to_string(),
            timeout_ms: 5_000,
            rng_seed: None,
            max_qubits: 24,
            calibration_path: PathBuf::from("qpu_data.json"),
        }
    }
}

impl BackendConfig {
    /// `timeout_ms` as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// HTTP service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on.
    pub http_bind: String,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_bind: "127.0.0.1:5000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Read, normalize and validate the config file at `path`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfig {
        path: path.to_path_buf(),
        source: err,
    })?;
    let mut cfg: Config = toml::from_str(&raw).map_err(|err| ConfigError::ParseConfig {
        path: path.to_path_buf(),
        source: err,
    })?;
    normalize(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

/// Check every value is in range.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let search = &cfg.search;
    let backend = &cfg.backend;
    if search.index_width == 0 || search.index_width > MAX_INDEX_WIDTH {
        return Err(invalid(format!(
            "search.index_width must be between 1 and {}.",
            MAX_INDEX_WIDTH
        )));
    }
    if search.label_width == 0 || search.label_width >= MAX_LABEL_WIDTH {
        return Err(invalid(format!(
            "search.label_width must be between 1 and {}.",
            MAX_LABEL_WIDTH - 1
        )));
    }
    if backend.max_qubits > MAX_SIMULATED_QUBITS {
        return Err(invalid(format!(
            "backend.max_qubits must be at most {}.",
            MAX_SIMULATED_QUBITS
        )));
    }
    let needed = search.index_width + search.label_width + 1;
    if needed > backend.max_qubits {
        return Err(invalid(format!(
            "search.index_width + search.label_width + 1 = {} exceeds backend.max_qubits = {}.",
            needed, backend.max_qubits
        )));
    }
    let capacity = 1usize << search.index_width;
    if search.expected_marked == 0 || search.expected_marked > capacity {
        return Err(invalid(format!(
            "search.expected_marked must be between 1 and 2^index_width = {}.",
            capacity
        )));
    }
    if search.shots == 0 || search.shots > MAX_SHOTS {
        return Err(invalid(format!(
            "search.shots must be between 1 and {}.",
            MAX_SHOTS
        )));
    }
    if backend.timeout_ms == 0 {
        return Err(invalid("backend.timeout_ms must be greater than zero."));
    }
    if backend.endpoint.is_empty() {
        return Err(invalid("backend.endpoint must be non-empty."));
    }
    if cfg.service.http_bind.is_empty() {
        return Err(invalid("service.http_bind must be non-empty."));
    }
    Ok(())
}

fn normalize(cfg: &mut Config) {
    cfg.backend.endpoint = cfg.backend.endpoint.trim().to_string();
    cfg.service.http_bind = cfg.service.http_bind.trim().to_string();
    if cfg.service.log_level.trim().is_empty() {
        cfg.service.log_level = ServiceConfig::default().log_level;
    }
}

fn invalid<S: Into<String>>(message: S) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file.");
        file.write_all(contents.as_bytes())
            .expect("Failed to write temp config.");
        file
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = write_config("");
        let cfg = load(file.path()).expect("Failed to load empty config.");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_overrides() {
        let file = write_config(
            r#"
[search]
index_width = 4
exact = false

[backend]
kind = "remote"
endpoint = " 10.0.0.2:42069 "
rng_seed = 17
"#,
        );
        let cfg = load(file.path()).expect("Failed to load config.");
        assert_eq!(cfg.search.index_width, 4);
        assert!(!cfg.search.exact);
        assert_eq!(cfg.search.label_width, 6);
        assert_eq!(cfg.backend.kind, BackendKind::Remote);
        assert_eq!(cfg.backend.endpoint, "10.0.0.2:42069");
        assert_eq!(cfg.backend.rng_seed, Some(17));
    }

    #[test]
    fn test_rejects_oversized_search() {
        let file = write_config("[search]\nindex_width = 12\nlabel_width = 20\n");
        assert!(matches!(
            load(file.path()),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_marked_count() {
        let mut cfg = Config::default();
        cfg.search.expected_marked = 9;
        assert!(validate(&cfg).is_err());
        cfg.search.expected_marked = 0;
        assert!(validate(&cfg).is_err());
        cfg.search.expected_marked = 8;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_rejects_shot_counts_out_of_range() {
        let mut cfg = Config::default();
        cfg.search.shots = 0;
        assert!(validate(&cfg).is_err());
        cfg.search.shots = MAX_SHOTS + 1;
        assert!(validate(&cfg).is_err());
        cfg.search.shots = MAX_SHOTS;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_parse_and_read_errors() {
        let file = write_config("[search\n");
        assert!(matches!(
            load(file.path()),
            Err(ConfigError::ParseConfig { .. })
        ));
        assert!(matches!(
            load(Path::new("/nonexistent/qsearch.toml")),
            Err(ConfigError::ReadConfig { .. })
        ));
    }
}
