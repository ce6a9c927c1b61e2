//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_CHUNKING__CHUNK_SIZE`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// LanceDB directory holding the collection.
    pub path: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub model_id: String,
    /// Local directory with `tokenizer.json`, `config.json` and the weights.
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub n_results: usize,
    pub candidate_n_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub root_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub store: StoreSettings,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
    pub source: SourceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings { path: "./nasdb_data".into(), table: "file_contents".into() },
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingSettings {
                model_id: "BM-K/KoSimCSE-roberta".into(),
                model_dir: None,
                max_len: 256,
                use_fake: false,
                fake_dim: 768,
            },
            search: SearchSettings { n_results: 5, candidate_n_results: 50 },
            source: SourceSettings { root_dir: ".".into() },
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.search.n_results == 0 {
            return Err(Error::InvalidConfig("search.n_results must be greater than 0".into()));
        }
        if self.search.candidate_n_results < self.search.n_results {
            return Err(Error::InvalidConfig(format!(
                "search.candidate_n_results ({}) must be >= search.n_results ({})",
                self.search.candidate_n_results, self.search.n_results
            )));
        }
        if self.embedding.max_len == 0 || self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.max_len and embedding.fake_dim must be greater than 0".into()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::warn!(env = other, "unknown RUST_ENV, using base configuration only"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_files() {
        Jail::expect_with(|_jail| {
            let settings = Config::load_for_env("test").expect("load").settings().expect("settings");
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn env_file_and_vars_layer_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[chunking]\nchunk_size = 400\nchunk_overlap = 40\n[store]\ntable = \"base\"\n")?;
            jail.create_file("config.prod.toml", "[store]\ntable = \"prod_table\"\n")?;
            jail.set_env("APP_CHUNKING__CHUNK_OVERLAP", "80");
            let config = Config::load_for_env("prod").expect("load");
            let settings = config.settings().expect("settings");
            assert_eq!(settings.chunking, ChunkingConfig { chunk_size: 400, chunk_overlap: 80 });
            assert_eq!(settings.store.table, "prod_table");
            assert_eq!(config.get::<usize>("search.n_results").expect("key"), 5);
            Ok(())
        });
    }

    #[test]
    fn invalid_chunking_fails_fast() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n")?;
            assert!(matches!(Config::load_for_env("test"), Err(Error::InvalidConfig(_))));
            Ok(())
        });
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/nasdb");
        assert_eq!(resolve_with_base(base, "data"), PathBuf::from("/srv/nasdb/data"));
        assert_eq!(resolve_with_base(base, "/var/lib/nasdb"), PathBuf::from("/var/lib/nasdb"));
    }
}
