//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::app_config::{LocationConfig, PublishConfig};
use crate::domain::error::ConfigError;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

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
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    let mut config = store.load().await?;

    match key {
        "api_key" => config.api_key = Some(value.to_string()),
        "encoder" => {
            if value != "wav" && value != "flac" {
                return Err(ConfigError::ValidationError {
                    key: key.to_string(),
                    message: "Value must be 'wav' or 'flac'".to_string(),
                });
            }
            config.encoder = Some(value.to_string());
        }
        "data_dir" => config.data_dir = Some(value.to_string()),
        "publish.repo" => {
            if !value.contains('/') {
                return Err(ConfigError::ValidationError {
                    key: key.to_string(),
                    message: "Value must be 'owner/repo'".to_string(),
                });
            }
            publish_section(&mut config).repo = Some(value.to_string());
        }
        "publish.branch" => publish_section(&mut config).branch = Some(value.to_string()),
        "location.gpsd_host" => location_section(&mut config).gpsd_host = Some(value.to_string()),
        "location.gpsd_port" => {
            let port = value.parse().map_err(|_| ConfigError::ValidationError {
                key: key.to_string(),
                message: "Value must be a port number".to_string(),
            })?;
            location_section(&mut config).gpsd_port = Some(port);
        }
        "location.min_movement_m" => {
            let meters: f64 = value.parse().map_err(|_| ConfigError::ValidationError {
                key: key.to_string(),
                message: "Value must be a distance in meters".to_string(),
            })?;
            if !(meters > 0.0) {
                return Err(ConfigError::ValidationError {
                    key: key.to_string(),
                    message: "Value must be positive".to_string(),
                });
            }
            location_section(&mut config).min_movement_m = Some(meters);
        }
        _ => unreachable!("validated above"),
    }

    store.save(&config).await?;
    presenter.success(&format!("Set {} = {}", key, value));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    let config = store.load().await?;
    let value = match key {
        "api_key" => config.api_key.map(|_| "<set>".to_string()),
        "encoder" => config.encoder,
        "data_dir" => config.data_dir,
        "publish.repo" => config.publish.as_ref().and_then(|p| p.repo.clone()),
        "publish.branch" => config.publish.as_ref().and_then(|p| p.branch.clone()),
        "location.gpsd_host" => config.location.as_ref().and_then(|l| l.gpsd_host.clone()),
        "location.gpsd_port" => config
            .location
            .as_ref()
            .and_then(|l| l.gpsd_port)
            .map(|p| p.to_string()),
        "location.min_movement_m" => config
            .location
            .as_ref()
            .and_then(|l| l.min_movement_m)
            .map(|m| m.to_string()),
        _ => unreachable!("validated above"),
    };

    match value {
        Some(value) => presenter.output(&value),
        None => presenter.info(&format!("{} is not set", key)),
    }
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    presenter.output(&format!(
        "api_key = {}",
        if config.api_key.is_some() { "<set>" } else { "<unset>" }
    ));
    presenter.output(&format!("encoder = {}", config.encoder_or_default()));
    presenter.output(&format!(
        "data_dir = {}",
        config.data_dir.as_deref().unwrap_or("<default>")
    ));
    presenter.output(&format!(
        "publish.repo = {}",
        config.publish_repo().unwrap_or("<unset>")
    ));
    presenter.output(&format!(
        "publish.branch = {}",
        config.publish_branch_or_default()
    ));
    presenter.output(&format!(
        "location.gpsd_host = {}",
        config.gpsd_host_or_default()
    ));
    presenter.output(&format!(
        "location.gpsd_port = {}",
        config.gpsd_port_or_default()
    ));
    presenter.output(&format!(
        "location.min_movement_m = {}",
        config.min_movement_or_default()
    ));
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().display().to_string());
    Ok(())
}

fn publish_section(config: &mut crate::domain::config::AppConfig) -> &mut PublishConfig {
    config.publish.get_or_insert_with(PublishConfig::default)
}

fn location_section(config: &mut crate::domain::config::AppConfig) -> &mut LocationConfig {
    config.location.get_or_insert_with(LocationConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::XdgConfigStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn set_and_get_nested_key() {
        let tmp = TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(tmp.path().join("config.toml"));
        let presenter = Presenter::new();

        handle_set(&store, &presenter, "publish.repo", "alice/saunters")
            .await
            .unwrap();
        let config = store.load().await.unwrap();
        assert_eq!(config.publish_repo(), Some("alice/saunters"));
    }

    #[tokio::test]
    async fn set_rejects_unknown_key() {
        let tmp = TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(tmp.path().join("config.toml"));
        let presenter = Presenter::new();

        assert!(matches!(
            handle_set(&store, &presenter, "bogus", "1").await.unwrap_err(),
            ConfigError::ValidationError { .. }
        ));
    }

    #[tokio::test]
    async fn set_validates_values() {
        let tmp = TempDir::new().unwrap();
        let store = XdgConfigStore::with_path(tmp.path().join("config.toml"));
        let presenter = Presenter::new();

        assert!(handle_set(&store, &presenter, "encoder", "mp3").await.is_err());
        assert!(handle_set(&store, &presenter, "location.gpsd_port", "nope")
            .await
            .is_err());
        assert!(
            handle_set(&store, &presenter, "location.min_movement_m", "-1")
                .await
                .is_err()
        );
        assert!(handle_set(&store, &presenter, "publish.repo", "norepo")
            .await
            .is_err());
    }
}
