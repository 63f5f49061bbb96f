//! Config command handler

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;
    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;
    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;
    let config = store.load().await?;
    match read_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            read_value(&config, key).as_deref().unwrap_or(NOT_SET),
        );
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn ensure_known_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(invalid(
            key,
            format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        ))
    }
}

/// Validate `value` and store it under `key`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "max_duration" => config.max_duration = Some(parse_duration(key, value)?),
        "short_press" => config.short_press = Some(parse_duration(key, value)?),
        "cancel_ratio" => {
            let ratio = parse_number(key, value)?;
            if ratio <= 0.0 || ratio > 1.0 {
                return Err(invalid(key, "Value must be greater than 0 and at most 1"));
            }
            config.cancel_ratio = Some(ratio);
        }
        "surface_width" => {
            let width = parse_number(key, value)?;
            if width <= 0.0 {
                return Err(invalid(key, "Value must be a positive number of points"));
            }
            config.surface_width = Some(width);
        }
        "transcribe_url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(invalid(key, "Value must be an http:// or https:// URL"));
            }
            config.transcribe_url = Some(value.to_string());
        }
        "recordings_dir" => {
            if value.trim().is_empty() {
                return Err(invalid(key, "Value must be a directory path"));
            }
            config.recordings_dir = Some(PathBuf::from(value));
        }
        "log_level" => {
            EnvFilter::try_new(value).map_err(|e| invalid(key, e.to_string()))?;
            config.log_level = Some(value.to_string());
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "max_duration" => config.max_duration.clone(),
        "short_press" => config.short_press.clone(),
        "cancel_ratio" => config.cancel_ratio.map(|v| v.to_string()),
        "surface_width" => config.surface_width.map(|v| v.to_string()),
        "transcribe_url" => config.transcribe_url.clone(),
        "recordings_dir" => config
            .recordings_dir
            .as_ref()
            .map(|p| p.display().to_string()),
        "log_level" => config.log_level.clone(),
        _ => None,
    }
}

/// Normalized duration string, e.g. "90s" becomes "1m30s"
fn parse_duration(key: &str, value: &str) -> Result<String, ConfigError> {
    value
        .parse::<Duration>()
        .map(|d| d.to_string())
        .map_err(|e| invalid(key, e.to_string()))
}

fn parse_number(key: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(key, format!("'{}' is not a number", value)))
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}
