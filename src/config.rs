//! Layered configuration.
//!
//! Uses Figment to merge built-in defaults, `quran-search.toml` (or an explicit
//! file), `quran-search.<env>.toml` and `QURAN_SEARCH_*` environment variables.
//! `__` separates nesting levels in variable names, so
//! `QURAN_SEARCH_ENGINE__BATCH_SIZE=200` sets `engine.batch_size`.

use crate::error::QuranSearchError;
use crate::paths::{get_data_dir, get_settings_db_path};
use crate::stream::{StreamOptions, DEFAULT_BATCH_SIZE, DEFAULT_FIRST_BATCH_SIZE};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "quran-search.toml";
const ENV_PREFIX: &str = "QURAN_SEARCH_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Defaults to the discovered data directory.
    pub data_dir: Option<PathBuf>,
    pub uthmani_file: String,
    pub simplified_file: String,
    /// Chapter names, one per line. Loaded when present.
    pub chapters_file: String,
    pub first_batch_size: usize,
    pub batch_size: usize,
    pub cache_capacity: usize,
    pub context_radius: u32,
    /// Defaults to `settings.db` in the data directory.
    pub history_db: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            uthmani_file: "uthmani.txt".to_string(),
            simplified_file: "simplified.txt".to_string(),
            chapters_file: "chapters.txt".to_string(),
            first_batch_size: DEFAULT_FIRST_BATCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            cache_capacity: 64,
            context_radius: 12,
            history_db: None,
        }
    }
}

impl EngineSettings {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(get_data_dir)
    }

    pub fn history_db(&self) -> PathBuf {
        self.history_db
            .clone()
            .unwrap_or_else(|| get_settings_db_path(&self.data_dir()))
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            first_batch_size: self.first_batch_size,
            batch_size: self.batch_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub bind: String,
    pub max_page_size: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Defaults {
    engine: EngineSettings,
    api: ApiSettings,
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load configuration. `path` replaces the default `quran-search.toml`.
    pub fn load(path: Option<&Path>) -> Result<Self, QuranSearchError> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let base = path.map_or_else(|| PathBuf::from(CONFIG_FILE), Path::to_path_buf);
        if path.is_some() && !base.exists() {
            return Err(QuranSearchError::Config(format!(
                "config file {} does not exist",
                base.display()
            )));
        }

        let figment = Figment::from(Serialized::defaults(Defaults::default()))
            .merge(Toml::file(&base))
            .merge(Toml::file(env_file(&base, &env_name)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = Self { figment };
        config.engine()?;
        config.api()?;
        tracing::debug!("Loaded configuration ({} environment)", env_name);
        Ok(config)
    }

    /// Defaults only, no files or environment.
    pub fn defaults() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(Defaults::default())),
        }
    }

    /// Layer an extra provider on top, e.g. command line overrides.
    pub fn merge<T: figment::Provider>(self, provider: T) -> Self {
        Self {
            figment: self.figment.merge(provider),
        }
    }

    pub fn get<T>(&self, key: &str) -> Result<T, QuranSearchError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| QuranSearchError::Config(format!("failed to get '{}': {}", key, e)))
    }

    pub fn engine(&self) -> Result<EngineSettings, QuranSearchError> {
        self.get("engine")
    }

    pub fn api(&self) -> Result<ApiSettings, QuranSearchError> {
        self.get("api")
    }
}

/// `quran-search.toml` -> `quran-search.<env>.toml`, next to the base file.
fn env_file(base: &Path, env_name: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("quran-search");
    base.with_file_name(format!("{}.{}.toml", stem, env_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::defaults();
        let engine = config.engine().unwrap();
        assert_eq!(engine, EngineSettings::default());
        assert_eq!(engine.stream_options(), StreamOptions::default());
        assert_eq!(config.api().unwrap().bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_file_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[engine]\nbatch_size = 25\ndata_dir = \"/srv/quran\"\n\n[api]\nmax_page_size = 10\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let engine = config.engine().unwrap();
        assert_eq!(engine.batch_size, 25);
        assert_eq!(engine.first_batch_size, DEFAULT_FIRST_BATCH_SIZE);
        assert_eq!(engine.data_dir(), PathBuf::from("/srv/quran"));
        assert_eq!(
            engine.history_db(),
            PathBuf::from("/srv/quran").join("settings.db")
        );
        assert_eq!(config.api().unwrap().max_page_size, 10);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(QuranSearchError::Config(_))));
    }

    #[test]
    fn test_invalid_value_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[engine]\nbatch_size = \"many\"\n").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(QuranSearchError::Config(_))
        ));
    }

    #[test]
    fn test_merge_overrides() {
        let config = Config::defaults().merge(Serialized::default("engine.cache_capacity", 3));
        assert_eq!(config.engine().unwrap().cache_capacity, 3);
    }

    #[test]
    fn test_env_file_name() {
        assert_eq!(
            env_file(Path::new("conf/quran-search.toml"), "prod"),
            PathBuf::from("conf/quran-search.prod.toml")
        );
    }
}
