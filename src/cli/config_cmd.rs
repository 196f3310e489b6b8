//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, LocationConfig, PermissionsConfig};
use crate::domain::connection::Endpoint;
use crate::domain::error::ConfigError;

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
    check_key(key)?;

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
    check_key(key)?;

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
        let value = read_value(&config, key);
        presenter.key_value(key, value.as_deref().unwrap_or(NOT_SET));
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "endpoint" => {
            let endpoint: Endpoint = value.parse().map_err(|e| invalid(format!("{}", e)))?;
            config.endpoint = Some(endpoint.to_string());
        }
        "camera_command" => {
            if value.trim().is_empty() {
                return Err(invalid("Command must not be empty".to_string()));
            }
            config.camera_command = Some(value.trim().to_string());
        }
        "permissions.camera" | "permissions.microphone" | "permissions.location" => {
            let allowed = parse_bool(value)
                .map_err(|_| invalid("Value must be 'true' or 'false'".to_string()))?;
            let permissions = config.permissions.get_or_insert_with(PermissionsConfig::default);
            match key {
                "permissions.camera" => permissions.camera = Some(allowed),
                "permissions.microphone" => permissions.microphone = Some(allowed),
                _ => permissions.location = Some(allowed),
            }
        }
        "location.latitude" => {
            let latitude = parse_ranged(value, -90.0, 90.0).map_err(invalid)?;
            config
                .location
                .get_or_insert_with(LocationConfig::default)
                .latitude = Some(latitude);
        }
        "location.longitude" => {
            let longitude = parse_ranged(value, -180.0, 180.0).map_err(invalid)?;
            config
                .location
                .get_or_insert_with(LocationConfig::default)
                .longitude = Some(longitude);
        }
        "location.accuracy" => {
            let accuracy = parse_ranged(value, 0.0, f64::MAX).map_err(invalid)?;
            config
                .location
                .get_or_insert_with(LocationConfig::default)
                .accuracy = Some(accuracy);
        }
        _ => return Err(invalid("Unknown key".to_string())),
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    let permissions = config.permissions.as_ref();
    let location = config.location.as_ref();
    match key {
        "endpoint" => config.endpoint.clone(),
        "camera_command" => config.camera_command.clone(),
        "permissions.camera" => permissions.and_then(|p| p.camera).map(|b| b.to_string()),
        "permissions.microphone" => permissions
            .and_then(|p| p.microphone)
            .map(|b| b.to_string()),
        "permissions.location" => permissions.and_then(|p| p.location).map(|b| b.to_string()),
        "location.latitude" => location.and_then(|l| l.latitude).map(|v| v.to_string()),
        "location.longitude" => location.and_then(|l| l.longitude).map(|v| v.to_string()),
        "location.accuracy" => location.and_then(|l| l.accuracy).map(|v| v.to_string()),
        _ => None,
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

/// Parse a finite number within `[min, max]`
fn parse_ranged(value: &str, min: f64, max: f64) -> Result<f64, String> {
    let number: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !number.is_finite() || number < min || number > max {
        return Err(if max == f64::MAX {
            format!("{} must be at least {}", number, min)
        } else {
            format!("{} is outside [{}, {}]", number, min, max)
        });
    }
    Ok(number)
}
