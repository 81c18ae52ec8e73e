//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$SPAMSIFT_CONFIG` (environment variable)
//! 2. `~/.config/spamsift/config.toml` (Linux/macOS)
//!    `%APPDATA%\spamsift\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The loaded value is immutable: it is constructed once in `main` and
//! passed by reference into whatever needs it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Datasets the filter knows how to organise and parse.
pub const KNOWN_DATASETS: [&str; 3] = ["trec", "spamassassin", "personal"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Data directory layout.
    pub data: DataConfig,
    /// Classifier hyperparameters.
    pub model: ModelConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Body snippet length in summaries and the labelling session.
    pub snippet_chars: usize,
}

/// Data directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of the data tree (raw, raw_external, processed, labels).
    pub root: PathBuf,
}

/// Classifier hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Inverse regularization strength.
    pub c: f64,
    /// Optimiser iteration cap.
    pub max_iter: usize,
    /// Optimiser convergence tolerance.
    pub tol: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            snippet_chars: 500,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

/// All the filesystem locations belonging to one dataset.
///
/// `None` marks a location the dataset does not have (the personal
/// mailbox has no external download, the public corpora have no inbox).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    /// External raw data download folder.
    pub raw_external: Option<PathBuf>,
    /// Folder of raw ham `.eml` files.
    pub raw_ham: Option<PathBuf>,
    /// Folder of raw spam `.eml` files.
    pub raw_spam: Option<PathBuf>,
    /// Folder of raw inbox `.eml` files.
    pub raw_inbox: Option<PathBuf>,
    /// Processed table file.
    pub processed: Option<PathBuf>,
    /// Labels JSON file.
    pub labels: Option<PathBuf>,
}

impl DatasetPaths {
    /// The raw folders this dataset actually has, with their names.
    pub fn raw_folders(&self) -> Vec<&PathBuf> {
        [&self.raw_ham, &self.raw_spam, &self.raw_inbox]
            .into_iter()
            .filter_map(|p| p.as_ref())
            .collect()
    }
}

impl Config {
    /// Derive the filesystem layout for a named dataset.
    pub fn dataset_paths(&self, dataset: &str) -> DatasetPaths {
        let root = &self.data.root;
        let processed = Some(root.join("processed").join(format!("{dataset}_processed.tbl")));
        match dataset {
            "personal" => DatasetPaths {
                raw_external: None,
                raw_ham: None,
                raw_spam: Some(root.join("raw").join("personal_spam")),
                raw_inbox: Some(root.join("raw").join("personal_inbox")),
                processed,
                labels: Some(root.join("labels").join("personal_labels.json")),
            },
            _ => DatasetPaths {
                raw_external: Some(root.join("raw_external").join(dataset)),
                raw_ham: Some(root.join("raw").join(format!("{dataset}_ham"))),
                raw_spam: Some(root.join("raw").join(format!("{dataset}_spam"))),
                raw_inbox: None,
                processed,
                labels: None,
            },
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("SPAMSIFT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("spamsift").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.data.root, PathBuf::from("data"));
        assert_eq!(cfg.model.c, 1.0);
        assert_eq!(cfg.model.max_iter, 1000);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.data.root, cfg.data.root);
        assert_eq!(parsed.model.max_iter, cfg.model.max_iter);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[data]
root = "/srv/mail-data"

[model]
c = 0.5
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.data.root, PathBuf::from("/srv/mail-data"));
        assert_eq!(cfg.model.c, 0.5);
        // Other fields use defaults.
        assert_eq!(cfg.model.max_iter, 1000);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_personal_dataset_paths() {
        let cfg = Config::default();
        let paths = cfg.dataset_paths("personal");
        assert!(paths.raw_external.is_none());
        assert!(paths.raw_ham.is_none());
        assert_eq!(
            paths.raw_inbox,
            Some(PathBuf::from("data/raw/personal_inbox"))
        );
        assert!(paths.labels.is_some());
    }

    #[test]
    fn test_public_corpus_paths() {
        let cfg = Config::default();
        let paths = cfg.dataset_paths("trec");
        assert_eq!(
            paths.raw_external,
            Some(PathBuf::from("data/raw_external/trec"))
        );
        assert_eq!(paths.raw_ham, Some(PathBuf::from("data/raw/trec_ham")));
        assert_eq!(paths.raw_spam, Some(PathBuf::from("data/raw/trec_spam")));
        assert!(paths.raw_inbox.is_none());
        assert!(paths.labels.is_none());
    }
}
