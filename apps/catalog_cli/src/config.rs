use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "catalog.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub seed_path: PathBuf,
    pub patch_path: Option<PathBuf>,
    pub log_filter: String,
    pub max_results: Option<usize>,
    /// Environment overrides that could not be parsed. Settings load before
    /// logging is installed, so the caller reports these afterwards.
    pub ignored_overrides: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed_path: PathBuf::from("./data/catalog_seed.json"),
            patch_path: None,
            log_filter: "warn".into(),
            max_results: None,
            ignored_overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    seed_path: Option<PathBuf>,
    patch_path: Option<PathBuf>,
    log_filter: Option<String>,
    max_results: Option<usize>,
}

/// Defaults, then the TOML file (if it exists), then environment overrides.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let raw = match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(_) if config_path.is_none() => None,
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to read config file '{}'", path.display())
            })
        }
    };

    let settings = settings_from_sources(raw.as_deref(), |key| std::env::var(key).ok())
        .with_context(|| format!("invalid config file '{}'", path.display()))?;
    Ok(settings)
}

fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.seed_path {
            settings.seed_path = v;
        }
        if let Some(v) = file_cfg.patch_path {
            settings.patch_path = Some(v);
        }
        if let Some(v) = file_cfg.log_filter {
            settings.log_filter = v;
        }
        if let Some(v) = file_cfg.max_results {
            settings.max_results = Some(v);
        }
    }

    if let Some(v) = env("CATALOG_SEED_PATH") {
        settings.seed_path = v.into();
    }
    if let Some(v) = env("APP__SEED_PATH") {
        settings.seed_path = v.into();
    }

    if let Some(v) = env("CATALOG_PATCH_PATH") {
        settings.patch_path = Some(v.into());
    }
    if let Some(v) = env("APP__PATCH_PATH") {
        settings.patch_path = Some(v.into());
    }

    if let Some(v) = env("CATALOG_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = env("APP__MAX_RESULTS") {
        match v.parse::<usize>() {
            Ok(parsed) => settings.max_results = Some(parsed),
            Err(err) => settings
                .ignored_overrides
                .push(format!("APP__MAX_RESULTS='{v}' is not a result count: {err}")),
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let settings = settings_from_sources(None, env_from(&[])).expect("settings");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = settings_from_sources(
            Some(
                r#"
                seed_path = "fixtures/seed.json"
                patch_path = "fixtures/patch.json"
                log_filter = "debug"
                max_results = 10
                "#,
            ),
            env_from(&[]),
        )
        .expect("settings");

        assert_eq!(settings.seed_path, PathBuf::from("fixtures/seed.json"));
        assert_eq!(settings.patch_path, Some(PathBuf::from("fixtures/patch.json")));
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.max_results, Some(10));
    }

    #[test]
    fn app_prefixed_env_wins_over_file_and_short_names() {
        let settings = settings_from_sources(
            Some(r#"seed_path = "from-file.json""#),
            env_from(&[
                ("CATALOG_SEED_PATH", "from-short-env.json"),
                ("APP__SEED_PATH", "from-app-env.json"),
                ("CATALOG_LOG", "info"),
                ("APP__MAX_RESULTS", "not-a-number"),
            ]),
        )
        .expect("settings");

        assert_eq!(settings.seed_path, PathBuf::from("from-app-env.json"));
        assert_eq!(settings.log_filter, "info");
        assert_eq!(settings.max_results, None);
        assert_eq!(settings.ignored_overrides.len(), 1);
        assert!(settings.ignored_overrides[0].starts_with("APP__MAX_RESULTS='not-a-number'"));
    }

    #[test]
    fn well_formed_max_results_override_is_not_reported() {
        let settings = settings_from_sources(
            Some("max_results = 10"),
            env_from(&[("APP__MAX_RESULTS", "25")]),
        )
        .expect("settings");

        assert_eq!(settings.max_results, Some(25));
        assert!(settings.ignored_overrides.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = settings_from_sources(Some("seed_file = \"x\""), env_from(&[]))
            .expect_err("unknown key");
        assert!(err.to_string().contains("seed_file"));
    }

    #[test]
    fn explicit_missing_config_path_is_an_error() {
        let suffix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let missing = std::env::temp_dir().join(format!("course_catalog_missing_{suffix}.toml"));

        let err = load_settings(Some(&missing)).expect_err("missing file");
        assert!(err.to_string().contains("failed to read config file"));
    }
}
