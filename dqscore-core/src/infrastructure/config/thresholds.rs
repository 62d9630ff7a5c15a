// dqscore-core/src/infrastructure/config/thresholds.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::domain::config::{QualityConfig, ThresholdsFile};
use crate::error::DqError;
use crate::infrastructure::error::InfrastructureError;

pub const CONFIG_PATH_ENV: &str = "DQ_CONFIG_PATH";
pub const WARNING_SCORE_ENV: &str = "DQ_WARNING_SCORE";
pub const CRITICAL_SCORE_ENV: &str = "DQ_CRITICAL_SCORE";

const CANDIDATES: [&str; 2] = ["dq_thresholds.yaml", "dq_thresholds.yml"];

// --- DÉCOUVERTE ---

/// Explicit path, then `DQ_CONFIG_PATH`, then the default file names in `root`.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    root: &Path,
) -> Result<PathBuf, InfrastructureError> {
    resolve_with(explicit, root, |key| std::env::var(key).ok())
}

fn resolve_with(
    explicit: Option<&Path>,
    root: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, InfrastructureError> {
    let chosen = explicit
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_PATH_ENV).map(PathBuf::from));

    if let Some(path) = chosen {
        return if path.exists() {
            Ok(path)
        } else {
            Err(InfrastructureError::ConfigNotFound(path.display().to_string()))
        };
    }

    CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
        .ok_or_else(|| {
            InfrastructureError::ConfigNotFound(format!(
                "{} (checked {:?})",
                root.display(),
                CANDIDATES
            ))
        })
}

// --- CHARGEMENT ---

pub fn load_thresholds(path: &Path) -> Result<ThresholdsFile, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    let file: ThresholdsFile = serde_yaml::from_str(&content)?;
    Ok(file)
}

/// Load -> env overrides -> validate -> freeze.
#[instrument(skip(explicit, root))]
pub fn load_quality_config(explicit: Option<&Path>, root: &Path) -> Result<QualityConfig, DqError> {
    let path = resolve_config_path(explicit, root)?;
    info!(path = ?path, "Loading quality thresholds");

    let mut file = load_thresholds(&path)?;
    apply_env_overrides(&mut file, |key| std::env::var(key).ok())?;

    Ok(QualityConfig::freeze(file)?)
}

// Permet de faire: DQ_CRITICAL_SCORE=60 dqscore run ...
fn apply_env_overrides(
    file: &mut ThresholdsFile,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), InfrastructureError> {
    let parse = |key: &str, raw: String| match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InfrastructureError::ConfigError(format!(
            "{} must be a finite number, got '{}'",
            key, raw
        ))),
    };

    if let Some(raw) = env(WARNING_SCORE_ENV) {
        let new = parse(WARNING_SCORE_ENV, raw)?;
        info!(old = file.alerts.warning_score, new, "Overriding warning score via ENV");
        file.alerts.warning_score = new;
    }
    if let Some(raw) = env(CRITICAL_SCORE_ENV) {
        let new = parse(CRITICAL_SCORE_ENV, raw)?;
        info!(old = file.alerts.critical_score, new, "Overriding critical score via ENV");
        file.alerts.critical_score = new;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dimension::Dimension;
    use crate::domain::error::DomainError;
    use crate::domain::severity::Severity;
    use anyhow::Result;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
dimensions:
  completeness: { weight: 25 }
  volume: { weight: 20 }
  distribution: { weight: 20 }
  schema: { weight: 20 }
  referential: { weight: 15 }
severity_penalty: { LOW: 5, MEDIUM: 10, HIGH: 15 }
alerts: { warning_score: 90, critical_score: 70 }
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_and_freeze_sample() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("dq_thresholds.yaml"), SAMPLE)?;

        let path = resolve_with(None, dir.path(), no_env)?;
        let cfg = QualityConfig::freeze(load_thresholds(&path)?)?;
        assert_eq!(cfg.weight(Dimension::Referential), 15.0);
        assert_eq!(cfg.base_penalty(Severity::Medium), 10.0);
        assert_eq!(cfg.baseline_window_days(), 30);
        assert_eq!(cfg.noise().min_std_dev, 1e-3);
        Ok(())
    }

    #[test]
    fn test_discovery_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("dq_thresholds.yml"), SAMPLE)?;
        let from_env = dir.path().join("custom.yaml");
        fs::write(&from_env, SAMPLE)?;

        let found = resolve_with(None, dir.path(), no_env)?;
        assert!(found.ends_with("dq_thresholds.yml"));

        let env = |key: &str| (key == CONFIG_PATH_ENV).then(|| from_env.display().to_string());
        assert_eq!(resolve_with(None, dir.path(), env)?, from_env);

        let missing = dir.path().join("nope.yaml");
        let res = resolve_with(Some(&missing), dir.path(), no_env);
        assert!(matches!(res, Err(InfrastructureError::ConfigNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_missing_default_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let res = resolve_with(None, dir.path(), no_env);
        assert!(matches!(res, Err(InfrastructureError::ConfigNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_env_overrides_are_validated_after_apply() -> Result<()> {
        let mut file: ThresholdsFile = serde_yaml::from_str(SAMPLE)?;
        let env: HashMap<&str, &str> = HashMap::from([(CRITICAL_SCORE_ENV, "95")]);
        apply_env_overrides(&mut file, |k| env.get(k).map(|v| v.to_string()))?;
        assert_eq!(file.alerts.critical_score, 95.0);

        // critical above warning is rejected at freeze time
        let res = QualityConfig::freeze(file);
        assert!(matches!(res, Err(DomainError::ConfigurationError(_))));
        Ok(())
    }

    #[test]
    fn test_non_numeric_override_is_an_error() -> Result<()> {
        let mut file: ThresholdsFile = serde_yaml::from_str(SAMPLE)?;
        let res = apply_env_overrides(&mut file, |k| {
            (k == WARNING_SCORE_ENV).then(|| "high".to_string())
        });
        assert!(matches!(res, Err(InfrastructureError::ConfigError(_))));
        Ok(())
    }

    #[test]
    fn test_nan_override_is_an_error() -> Result<()> {
        for raw in ["NaN", "inf"] {
            let mut file: ThresholdsFile = serde_yaml::from_str(SAMPLE)?;
            let res = apply_env_overrides(&mut file, |k| {
                (k == CRITICAL_SCORE_ENV).then(|| raw.to_string())
            });
            assert!(matches!(res, Err(InfrastructureError::ConfigError(_))));
        }
        Ok(())
    }

    #[test]
    fn test_nan_in_yaml_fails_freeze() -> Result<()> {
        let yaml = SAMPLE.replace("critical_score: 70", "critical_score: .nan");
        let file: ThresholdsFile = serde_yaml::from_str(&yaml)?;
        assert!(matches!(
            QualityConfig::freeze(file),
            Err(DomainError::ConfigurationError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_penalty_fails_freeze() -> Result<()> {
        let yaml = SAMPLE.replace("HIGH: 15", "");
        let yaml = yaml.replace("MEDIUM: 10, ", "MEDIUM: 10");
        let file: ThresholdsFile = serde_yaml::from_str(&yaml)?;
        assert!(QualityConfig::freeze(file).is_err());
        Ok(())
    }
}
