use std::path::PathBuf;

use thiserror::Error;

use super::service::AppConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.host.trim().is_empty() {
        return Err(invalid("server.host", "must not be empty"));
    }
    if config.server.max_upload_bytes == 0 {
        return Err(invalid("server.max_upload_bytes", "must be at least 1"));
    }
    for origin in &config.server.cors_allowed_origins {
        if origin.trim().is_empty() {
            return Err(invalid(
                "server.cors_allowed_origins",
                "entries must not be empty",
            ));
        }
    }

    validate_non_empty("llm.base_url", &config.llm.base_url)?;
    validate_non_empty("llm.chat_model", &config.llm.chat_model)?;
    validate_non_empty("llm.embedding_model", &config.llm.embedding_model)?;
    if !config.llm.base_url.starts_with("http://") && !config.llm.base_url.starts_with("https://")
    {
        return Err(invalid("llm.base_url", "must be an http(s) URL"));
    }
    if let Some(temperature) = config.llm.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("{} is outside 0.0..=2.0", temperature),
            ));
        }
    }

    let rag = &config.rag;
    if rag.chunk_size == 0 {
        return Err(invalid("rag.chunk_size", "must be at least 1"));
    }
    if rag.chunk_overlap >= rag.chunk_size {
        return Err(invalid(
            "rag.chunk_overlap",
            format!(
                "{} must be smaller than chunk_size {}",
                rag.chunk_overlap, rag.chunk_size
            ),
        ));
    }
    if rag.top_k == 0 {
        return Err(invalid("rag.top_k", "must be at least 1"));
    }

    Ok(())
}

fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> &'static str {
        match err {
            ConfigError::Invalid { field, .. } => field,
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn defaults_are_valid() {
        validate_config(&AppConfig::default()).expect("defaults should validate");
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(field_of(err), "rag.chunk_overlap");
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut config = AppConfig::default();
        config.rag.top_k = 0;
        assert_eq!(field_of(validate_config(&config).unwrap_err()), "rag.top_k");
    }

    #[test]
    fn base_url_requires_scheme() {
        let mut config = AppConfig::default();
        config.llm.base_url = "localhost:11434".to_string();
        assert_eq!(field_of(validate_config(&config).unwrap_err()), "llm.base_url");
    }

    #[test]
    fn temperature_range_is_checked() {
        let mut config = AppConfig::default();
        config.llm.temperature = Some(3.5);
        assert_eq!(
            field_of(validate_config(&config).unwrap_err()),
            "llm.temperature"
        );
    }
}
