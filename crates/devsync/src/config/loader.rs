use std::path::Path;

use crate::config::schema::DevSyncConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DevSyncConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<DevSyncConfig, ConfigError> {
    // An empty document means "all defaults".
    let config: DevSyncConfig = if content.trim().is_empty() {
        DevSyncConfig::default()
    } else {
        serde_yaml::from_str(content)?
    };

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &DevSyncConfig) -> Result<(), ConfigError> {
    if config.namespace.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "namespace must not be empty".to_string(),
        });
    }

    validate_bucket_name(&config.bucket.name)?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "timeoutSecs must be greater than zero".to_string(),
        });
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "pollIntervalMs must be greater than zero".to_string(),
        });
    }

    if config.poll_interval() >= config.timeout() {
        return Err(ConfigError::Validation {
            message: format!(
                "pollIntervalMs ({}) must be shorter than timeoutSecs ({})",
                config.poll_interval_ms, config.timeout_secs
            ),
        });
    }

    let names = &config.resources;
    for (field, value) in [
        ("resources.secret", &names.secret),
        ("resources.source", &names.source),
        ("resources.kustomization", &names.kustomization),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} must not be empty", field),
            });
        }
    }

    Ok(())
}

/// Checks the S3 bucket naming rules that matter for a dev bucket.
pub fn validate_bucket_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be between 3 and 63 characters long"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            "may only contain lowercase letters, digits, '-' and '.'",
        ));
    }

    let first = name.chars().next().unwrap_or('-');
    let last = name.chars().last().unwrap_or('-');
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(invalid("must start and end with a letter or digit"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.namespace, "flux-system");
        assert_eq!(config.bucket.name, "dev-bucket");
        assert_eq!(config.resources.kustomization, "dev-ks");
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
        assert_eq!(config.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r#"
namespace: dev
rootDir: /work/project
timeoutSecs: 60
pollIntervalMs: 500
bucket:
  name: my-bucket
  endpoint: http://minio.local:9000
  accessKey:
    envVar: MINIO_ACCESS_KEY
  secretKey:
    file: /run/secrets/minio
cluster:
  server: https://kube.local:6443
  token:
    file: ~/.kube/token
  insecureSkipTlsVerify: true
resources:
  kustomization: app-ks
logging:
  level: debug
  json: true
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.namespace, "dev");
        assert_eq!(config.bucket.name, "my-bucket");
        assert_eq!(
            config.bucket.access_key.env_var.as_deref(),
            Some("MINIO_ACCESS_KEY")
        );
        assert!(config.cluster.insecure_skip_tls_verify);
        assert_eq!(config.resources.kustomization, "app-ks");
        assert_eq!(config.resources.source, "dev-bucket");
        assert!(config.logging.json);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = load_config_from_str("timeoutSecs: 0\n");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_interval_must_be_shorter_than_timeout() {
        let result = load_config_from_str("timeoutSecs: 1\npollIntervalMs: 1000\n");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let result = load_config_from_str("namespace: ''\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_bucket_names() {
        assert!(validate_bucket_name("dev-bucket").is_ok());
        assert!(validate_bucket_name("a.b.c").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Dev-Bucket").is_err());
        assert!(validate_bucket_name("-bucket").is_err());
        assert!(validate_bucket_name("bucket_name").is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_config_from_str("namespace: [unclosed");
        assert!(matches!(result, Err(ConfigError::ParseYaml(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/devsync.yaml");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_serialized_defaults_only_carry_used_settings() {
        let yaml = serde_yaml::to_string(&DevSyncConfig::default()).unwrap();
        let keys: Vec<&str> = yaml
            .lines()
            .filter(|line| !line.starts_with(' '))
            .filter_map(|line| line.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec![
                "namespace",
                "rootDir",
                "timeoutSecs",
                "pollIntervalMs",
                "bucket",
                "cluster",
                "resources",
                "logging",
            ]
        );
    }
}
