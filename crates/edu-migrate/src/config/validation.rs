//! Configuration validation.

use super::Config;
use crate::drivers::SslMode;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Stores and document
    if config.source.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.path is required".into()));
    }
    if config.export.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("export.path is required".into()));
    }
    if config.target.url_env.trim().is_empty() {
        return Err(MigrateError::Config("target.url_env is required".into()));
    }
    SslMode::parse(&config.target.ssl_mode)?;

    // Linker
    if config.linker.fallback_skill.trim().is_empty() {
        return Err(MigrateError::Config(
            "linker.fallback_skill is required".into(),
        ));
    }
    for (idx, rule) in config.linker.rules.iter().enumerate() {
        if rule.skill_pattern.trim().is_empty() || rule.category_terms.is_empty() {
            return Err(MigrateError::Config(format!(
                "linker.rules[{}] needs category_terms and a skill_pattern",
                idx
            )));
        }
        if rule.category_terms.iter().any(|t| t.trim().is_empty()) {
            return Err(MigrateError::Config(format!(
                "linker.rules[{}] has an empty category term",
                idx
            )));
        }
    }

    // Probe
    let url = reqwest::Url::parse(&config.probe.base_url).map_err(|e| {
        MigrateError::Config(format!(
            "probe.base_url '{}' is not a valid URL: {}",
            config.probe.base_url, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MigrateError::Config(format!(
            "probe.base_url must be http or https, got '{}'",
            url.scheme()
        )));
    }
    if config.probe.timeout_secs == 0 {
        return Err(MigrateError::Config(
            "probe.timeout_secs must be at least 1".into(),
        ));
    }
    if config.probe.quiz_timeout_secs == 0 {
        return Err(MigrateError::Config(
            "probe.quiz_timeout_secs must be at least 1".into(),
        ));
    }
    if let Some(page) = config.probe.pages.iter().find(|p| !p.starts_with('/')) {
        return Err(MigrateError::Config(format!(
            "probe.pages entries must start with '/', got '{}'",
            page
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_PROBE_URL;
    use crate::link::{LinkRule, TitleHash};
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_source_path() {
        let mut config = valid_config();
        config.source.path = PathBuf::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.target.ssl_mode = "always".to_string();
        let err = validate(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = valid_config();
        config.probe.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_base_url_must_parse() {
        let mut config = valid_config();
        config.probe.base_url = "not a url".to_string();
        assert!(validate(&config).is_err());

        config.probe.base_url = "ftp://example.com".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rule_without_terms() {
        let mut config = valid_config();
        config.linker.rules.push(LinkRule {
            category_terms: vec![],
            skill_pattern: "x".to_string(),
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let yaml = r#"
source:
  path: /srv/edu/local.db
linker:
  hash: crc32
probe:
  base_url: https://edu.example.com
  pages: ["/", "/skills"]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.path, PathBuf::from("/srv/edu/local.db"));
        assert_eq!(config.source.label, "local_database");
        assert_eq!(config.linker.hash, TitleHash::Crc32);
        assert_eq!(config.linker.rules.len(), 7);
        assert_eq!(config.probe.pages.len(), 2);
        assert_eq!(config.probe.timeout_secs, 10);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_env_overrides_win() {
        let config = Config::default().with_env_overrides(|name| match name {
            "EDU_SOURCE_PATH" => Some("/tmp/src.db".to_string()),
            "PGSSLMODE" => Some("disable".to_string()),
            n if n == ENV_PROBE_URL => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.source.path, PathBuf::from("/tmp/src.db"));
        assert_eq!(config.target.ssl_mode, "disable");
        assert_eq!(config.probe.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_target_url_required() {
        let config = Config::default();
        let err = config.target.resolve_url_with(|_| None).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("DATABASE_URL"));

        let url = config
            .target
            .resolve_url_with(|_| Some("postgres://u@h/db".to_string()))
            .unwrap();
        assert_eq!(url, "postgres://u@h/db");
    }
}
