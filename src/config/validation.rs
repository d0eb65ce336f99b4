use crate::config::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &str, message: String, suggestion: Option<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message,
            suggestion,
        });
    }

    fn warn(&mut self, field: &str, message: String) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message,
        });
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

/// Checks a loaded config. Errors make the config unusable; warnings do not.
pub fn validate_config(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::default();

    let level = config.logging.level.trim().to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        result.error(
            "logging.level",
            format!("Invalid log level: {level}"),
            Some(format!("Valid levels: {}", LOG_LEVELS.join(", "))),
        );
    }

    if config.store.lock_timeout_ms == 0 {
        result.error(
            "store.lock_timeout_ms",
            "Lock timeout must be positive".to_string(),
            Some("Use a value of at least 1 ms".to_string()),
        );
    }

    // The status blob's parent is created on first save, so a missing one is
    // only worth a warning.
    if let Some(path) = config.store.path.as_deref() {
        if path.is_dir() {
            result.error(
                "store.path",
                format!("Status file path is a directory: {}", path.display()),
                Some("Point store.path at a file, e.g. status.bin".to_string()),
            );
        } else if path.file_name().is_none() {
            result.error(
                "store.path",
                format!("Status file path has no file name: {}", path.display()),
                None,
            );
        } else if let Some(parent) = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty() && !parent.exists())
        {
            result.warn(
                "store.path",
                format!("Status directory will be created: {}", parent.display()),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = validate_config(&Config::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_config_reports_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let result = validate_config(&config);
        assert!(result.errors.iter().any(|err| err.field == "logging.level"));
    }

    #[test]
    fn test_validate_config_reports_zero_lock_timeout() {
        let mut config = Config::default();
        config.store.lock_timeout_ms = 0;
        let result = validate_config(&config);
        assert!(
            result
                .errors
                .iter()
                .any(|err| err.field == "store.lock_timeout_ms")
        );
    }

    #[test]
    fn test_validate_config_rejects_directory_store_path() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.path = Some(temp.path().to_path_buf());
        let result = validate_config(&config);
        assert!(result.errors.iter().any(|err| err.field == "store.path"));
    }

    #[test]
    fn test_validate_config_warns_on_missing_parent() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.path = Some(temp.path().join("not-yet").join("status.bin"));
        let result = validate_config(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|warn| warn.field == "store.path"));
    }
}
