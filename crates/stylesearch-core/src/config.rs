//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_SEARCH__MIN_SCORE=0.5`). Typed
//! settings sections fall back to their defaults when absent.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build from an inline TOML document; used by tests and embedders.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::string(toml)) };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Typed section with defaults filled in for missing keys.
    fn section<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if !self.figment.contains(key) { return Ok(T::default()); }
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Invalid '{}' section: {}", key, e)))
    }

    pub fn search(&self) -> Result<SearchSettings> { self.section("search") }

    pub fn catalog(&self) -> Result<CatalogSettings> { self.section("catalog") }

    pub fn embedding(&self) -> Result<EmbeddingSettings> { self.section("embedding") }

    fn validate(&self) -> Result<()> {
        let search = self.search()?;
        if search.default_limit == 0 || search.default_limit > search.max_limit {
            return Err(Error::InvalidConfig(format!(
                "search.default_limit must be within 1..={} (got {})",
                search.max_limit, search.default_limit
            )));
        }
        if !(0.0..=1.0).contains(&search.min_score) {
            return Err(Error::InvalidConfig(format!("search.min_score must be within [0, 1] (got {})", search.min_score)));
        }
        if search.scroll_limit == 0 {
            return Err(Error::InvalidConfig("search.scroll_limit must be positive".to_string()));
        }
        Ok(())
    }
}

/// Defaults applied by the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    pub min_score: f64,
    /// Maximum number of catalog records enumerated per index build.
    pub scroll_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            lexical_weight: 0.4,
            semantic_weight: 0.6,
            min_score: 0.3,
            scroll_limit: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub uri: String,
    pub table: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { uri: "./data/catalog".to_string(), table: "fashion_products".to_string() }
    }
}

impl CatalogSettings {
    pub fn resolved_uri(&self) -> PathBuf { expand_path(&self.uri) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: String,
    pub max_len: usize,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: "models/all-MiniLM-L6-v2".to_string(), max_len: 256, use_fake: false }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_use_defaults() {
        let config = Config::from_toml_str("").expect("config");
        assert_eq!(config.search().expect("search"), SearchSettings::default());
        assert_eq!(config.catalog().expect("catalog").table, "fashion_products");
        assert_eq!(config.embedding().expect("embedding").max_len, 256);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::from_toml_str("[search]\nmin_score = 0.5\nlexical_weight = 1.0\n").expect("config");
        let search = config.search().expect("search");
        assert!((search.min_score - 0.5).abs() < f64::EPSILON);
        assert!((search.lexical_weight - 1.0).abs() < f64::EPSILON);
        assert_eq!(search.max_limit, 100);
        assert_eq!(search.scroll_limit, 10_000);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let err = Config::from_toml_str("[search]\ndefault_limit = 500\n").err().expect("should fail");
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(Config::from_toml_str("[search]\nmin_score = 1.5\n").is_err());
    }

    #[test]
    fn catalog_uri_expands_env_vars() {
        std::env::set_var("STYLESEARCH_TEST_ROOT", "/srv/app");
        let settings = CatalogSettings { uri: "$STYLESEARCH_TEST_ROOT/catalog".to_string(), ..CatalogSettings::default() };
        assert_eq!(settings.resolved_uri(), PathBuf::from("/srv/app/catalog"));
    }

    #[test]
    fn generic_get_reads_nested_keys() {
        let config = Config::from_toml_str("[catalog]\ntable = \"sneakers\"\n").expect("config");
        let table: String = config.get("catalog.table").expect("table");
        assert_eq!(table, "sneakers");
        assert!(config.get::<String>("catalog.missing").is_err());
    }
}
