#![forbid(unsafe_code)]

use crate::model::DEFAULT_MAX_RESULTS;
use crate::transport::DEFAULT_API_BASE;
use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything the CLI needs besides the per-run filter options.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub api_base: String,
    pub max_results: usize,
    pub timeout: Duration,
    pub download_script: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub max_results: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub download_script: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
}

/// Overrides win over the process environment, which wins over the `.env` file.
pub fn resolve_api_settings(overrides: SettingsOverrides) -> Result<ApiSettings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_api_settings_with_overrides(&file_vars, env_var_string, overrides)
}

#[cfg(test)]
fn build_api_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<ApiSettings> {
    build_api_settings_with_overrides(file_vars, env_lookup, SettingsOverrides::default())
}

fn build_api_settings_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> Result<ApiSettings> {
    let api_key = non_blank(overrides.api_key)
        .or_else(|| lookup_value("YOUTUBE_API_KEY", file_vars, &env_lookup))
        .ok_or_else(|| anyhow!("YOUTUBE_API_KEY not set"))?;
    let api_base = non_blank(overrides.api_base)
        .or_else(|| lookup_value("YOUTUBE_API_BASE", file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    // Explicit overrides pass through untouched so the pipeline can reject a
    // zero cap; unusable values from the environment fall back to defaults.
    let max_results = overrides.max_results.unwrap_or_else(|| {
        lookup_value("TUBESORT_MAX_RESULTS", file_vars, &env_lookup)
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_RESULTS)
    });
    let timeout_secs = overrides
        .timeout_secs
        .filter(|value| *value > 0)
        .or_else(|| {
            lookup_value("TUBESORT_TIMEOUT_SECS", file_vars, &env_lookup)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|value| *value > 0)
        })
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let download_script = overrides.download_script.or_else(|| {
        lookup_value("TUBESORT_DOWNLOAD_SCRIPT", file_vars, &env_lookup).map(PathBuf::from)
    });

    Ok(ApiSettings {
        api_key,
        api_base,
        max_results,
        timeout: Duration::from_secs(timeout_secs),
        download_script,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn env_var_string(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| non_blank(file_vars.get(key).cloned()))
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    fn settings_from(contents: &str) -> ApiSettings {
        let cfg = make_config(contents);
        let vars = read_env_file(cfg.path()).unwrap();
        build_api_settings(&vars, |_| None).unwrap()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let settings = settings_from("YOUTUBE_API_KEY=\"abc\"\n");
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(settings.download_script.is_none());
    }

    #[test]
    fn missing_key_is_an_error() {
        let vars = read_env_file(make_config("TUBESORT_MAX_RESULTS=10\n").path()).unwrap();
        let err = build_api_settings(&vars, |_| None).unwrap_err();
        assert!(err.to_string().contains("YOUTUBE_API_KEY"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let vars = read_env_file(make_config("YOUTUBE_API_KEY=\"  \"\n").path()).unwrap();
        assert!(build_api_settings(&vars, |_| None).is_err());
    }

    #[test]
    fn reads_limits_and_script() {
        let settings = settings_from(
            "YOUTUBE_API_KEY=k\nTUBESORT_MAX_RESULTS=\"12\"\nTUBESORT_TIMEOUT_SECS=5\nTUBESORT_DOWNLOAD_SCRIPT=/opt/dl.sh\n",
        );
        assert_eq!(settings.max_results, 12);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.download_script, Some(PathBuf::from("/opt/dl.sh")));
    }

    #[test]
    fn invalid_or_zero_limits_fall_back_to_defaults() {
        let settings = settings_from(
            "YOUTUBE_API_KEY=k\nTUBESORT_MAX_RESULTS=\"nope\"\nTUBESORT_TIMEOUT_SECS=0\n",
        );
        assert_eq!(settings.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let settings = settings_from("YOUTUBE_API_KEY=k\nTUBESORT_MAX_RESULTS=0\n");
        assert_eq!(settings.max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn env_wins_over_file() {
        let vars = read_env_file(
            make_config("YOUTUBE_API_KEY=\"file-key\"\nYOUTUBE_API_BASE=http://file\n").path(),
        )
        .unwrap();
        let settings = build_api_settings(&vars, |key| {
            if key == "YOUTUBE_API_KEY" {
                Some("env-key".to_string())
            } else {
                None
            }
        })
        .unwrap();
        assert_eq!(settings.api_key, "env-key");
        assert_eq!(settings.api_base, "http://file");
    }

    #[test]
    fn overrides_win_over_env_and_file() {
        let mut vars = HashMap::new();
        vars.insert("YOUTUBE_API_KEY".to_string(), "file-key".to_string());
        vars.insert("TUBESORT_MAX_RESULTS".to_string(), "7".to_string());

        let overrides = SettingsOverrides {
            api_key: Some("flag-key".into()),
            api_base: Some("   ".into()),
            max_results: Some(3),
            timeout_secs: None,
            download_script: Some(PathBuf::from("/flag.sh")),
            env_path: None,
        };

        let settings = build_api_settings_with_overrides(
            &vars,
            |key| {
                if key == "YOUTUBE_API_BASE" {
                    Some("http://env".to_string())
                } else if key == "TUBESORT_MAX_RESULTS" {
                    Some("9".to_string())
                } else {
                    None
                }
            },
            overrides,
        )
        .unwrap();

        assert_eq!(settings.api_key, "flag-key");
        assert_eq!(settings.api_base, "http://env");
        assert_eq!(settings.max_results, 3);
        assert_eq!(settings.download_script, Some(PathBuf::from("/flag.sh")));
    }

    #[test]
    fn zero_cap_override_is_kept_for_validation() {
        let mut vars = HashMap::new();
        vars.insert("YOUTUBE_API_KEY".to_string(), "k".to_string());
        vars.insert("TUBESORT_MAX_RESULTS".to_string(), "7".to_string());

        let overrides = SettingsOverrides {
            max_results: Some(0),
            ..SettingsOverrides::default()
        };
        let settings = build_api_settings_with_overrides(&vars, |_| None, overrides).unwrap();
        assert_eq!(settings.max_results, 0);

        let config = crate::model::FilterSortConfig {
            max_results: settings.max_results,
            ..crate::model::FilterSortConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(crate::error::PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn read_env_file_handles_export_and_quotes() {
        let cfg = make_config(
            r#"
            export YOUTUBE_API_KEY="secret"
            YOUTUBE_API_BASE='http://localhost:8080/v3'
            TUBESORT_MAX_RESULTS =  "25"
            # comment
            INVALID_LINE
            "#,
        );
        let vars = read_env_file(cfg.path()).unwrap();
        assert_eq!(vars.get("YOUTUBE_API_KEY").unwrap(), "secret");
        assert_eq!(vars.get("YOUTUBE_API_BASE").unwrap(), "http://localhost:8080/v3");
        assert_eq!(vars.get("TUBESORT_MAX_RESULTS").unwrap(), "25");
        assert!(!vars.contains_key("INVALID_LINE"));
    }

    #[test]
    fn read_env_file_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_env_file(&dir.path().join("missing.env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn resolve_reads_explicit_env_path() {
        let cfg = make_config("YOUTUBE_API_KEY=\"from-file\"\nTUBESORT_MAX_RESULTS=4\n");
        let settings = resolve_api_settings(SettingsOverrides {
            api_key: Some("flag".into()),
            env_path: Some(cfg.path().to_path_buf()),
            ..SettingsOverrides::default()
        })
        .unwrap();
        assert_eq!(settings.api_key, "flag");
    }
}
