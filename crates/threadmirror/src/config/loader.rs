use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::render::TEXT_DIVIDER;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let compiled =
        jsonschema::JSONSchema::compile(&schema).map_err(|e| ConfigError::Validation {
            message: format!("Failed to compile JSON schema: {}", e),
        })?;

    let result = compiled.validate(json_value);
    if let Err(errors) = result {
        let error_messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    // The divider rule delimits sections of posted replies and edit
    // reconciliation re-parses live bodies by it, so no configured text may
    // contain one.
    let divider_rule = TEXT_DIVIDER.trim();
    for tagline in &config.mirror.taglines {
        if tagline.contains(divider_rule) {
            return Err(ConfigError::Validation {
                message: format!("Tagline must not contain '{}': {}", divider_rule, tagline),
            });
        }
    }
    if config.mirror.footer.contains(divider_rule) {
        return Err(ConfigError::Validation {
            message: format!("Footer must not contain '{}'", divider_rule),
        });
    }

    if config.scheduler.pass_limit == 0 {
        return Err(ConfigError::Validation {
            message: "scheduler.pass_limit must be at least 1".to_string(),
        });
    }

    Ok(())
}
