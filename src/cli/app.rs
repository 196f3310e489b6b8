//! App runner for one-shot mode and shared setup

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::application::ports::ConfigStore;
use crate::application::{ChannelEvent, ChannelHub, ConnectionChannel, RelayCoordinator, RelayEvent};
use crate::domain::config::AppConfig;
use crate::domain::connection::{ConnectionState, Endpoint};
use crate::infrastructure::{WebSocketConnector, XdgConfigStore};

use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment variable overriding the configured endpoint
pub const ENDPOINT_ENV: &str = "FIELDLINK_ENDPOINT";

/// How long to wait for the close handshake on exit
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Open a hub on the WebSocket transport
pub fn connect_hub(endpoint: Endpoint) -> Arc<ChannelHub> {
    ChannelHub::new(endpoint, Arc::new(WebSocketConnector::new()))
}

/// Send one text message and print the replies received within `wait`
pub async fn run_send(config: &AppConfig, text: &str, wait: Duration) -> ExitCode {
    ExitCode::from(send_and_wait(config, text, wait).await)
}

async fn send_and_wait(config: &AppConfig, text: &str, wait: Duration) -> u8 {
    let presenter = Presenter::new();

    let endpoint = match config.endpoint_or_default() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            presenter.error(&e.to_string());
            return EXIT_USAGE_ERROR;
        }
    };

    let hub = connect_hub(endpoint.clone());
    let mut relay = RelayCoordinator::new(hub.acquire());

    if let Err(e) = relay.send_text(text) {
        presenter.error(&e.to_string());
        return EXIT_USAGE_ERROR;
    }

    let deadline = Instant::now() + wait;
    let mut opened = false;
    let code = loop {
        let event = match timeout_at(deadline, relay.next_event()).await {
            Ok(Some(event)) => event,
            Ok(None) => break EXIT_SUCCESS,
            Err(_) => {
                debug!("reply window elapsed");
                break EXIT_SUCCESS;
            }
        };

        match event {
            RelayEvent::Received(envelope) => presenter.incoming(&envelope),
            RelayEvent::Malformed { error, .. } => {
                presenter.warn(&format!("Ignored malformed message: {}", error))
            }
            RelayEvent::TransportError(reason) => {
                presenter.error(&format!("Connection to {} failed: {}", endpoint, reason));
                break EXIT_ERROR;
            }
            RelayEvent::Status(ConnectionState::Open) => opened = true,
            RelayEvent::Status(ConnectionState::Errored { .. }) => break EXIT_ERROR,
            RelayEvent::Status(state @ ConnectionState::Closed { .. }) => {
                presenter.connection_status(&state);
                break EXIT_SUCCESS;
            }
            RelayEvent::Status(_) => {}
        }
    };

    if code == EXIT_SUCCESS && !opened {
        presenter.error(&format!(
            "Connection to {} did not open within {}s; message not sent",
            endpoint,
            wait.as_secs()
        ));
        return EXIT_ERROR;
    }

    let channel = hub.current();
    drop(relay);
    if let Some(channel) = channel {
        wait_closed(&channel).await;
    }

    code
}

/// Give the close handshake a moment to finish after the last lease went
pub async fn wait_closed(channel: &ConnectionChannel) {
    let mut events = channel.subscribe();
    let closed = timeout(CLOSE_GRACE, async {
        while let Some(event) = events.recv().await {
            if matches!(event, ChannelEvent::Status(ref state) if state.is_terminal()) {
                return;
            }
        }
    })
    .await;
    if closed.is_err() {
        debug!("close handshake did not finish in time");
    }
}

/// Endpoint override from the environment
pub fn env_config() -> AppConfig {
    AppConfig {
        endpoint: env::var(ENDPOINT_ENV).ok().filter(|s| !s.trim().is_empty()),
        ..Default::default()
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %store.path().display(), error = %e, "ignoring config file");
            AppConfig::empty()
        }
    };

    merge_layers(file_config, env_config(), cli_config)
}

/// Merge: defaults < file < env < cli
fn merge_layers(file: AppConfig, env: AppConfig, cli: AppConfig) -> AppConfig {
    AppConfig::defaults().merge(file).merge(env).merge(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_endpoint(endpoint: &str) -> AppConfig {
        AppConfig {
            endpoint: Some(endpoint.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn later_layers_win() {
        let merged = merge_layers(
            with_endpoint("ws://file:1"),
            with_endpoint("ws://env:2"),
            with_endpoint("ws://cli:3"),
        );
        assert_eq!(merged.endpoint.as_deref(), Some("ws://cli:3"));

        let merged = merge_layers(
            with_endpoint("ws://file:1"),
            with_endpoint("ws://env:2"),
            AppConfig::empty(),
        );
        assert_eq!(merged.endpoint.as_deref(), Some("ws://env:2"));
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let merged = merge_layers(AppConfig::empty(), AppConfig::empty(), AppConfig::empty());
        assert_eq!(merged, AppConfig::defaults());
        assert_eq!(merged.endpoint_or_default().unwrap(), Endpoint::default());
    }

    #[tokio::test]
    async fn send_to_unreachable_endpoint_fails() {
        let config = with_endpoint("ws://127.0.0.1:1");
        let code = send_and_wait(&config, "hello", Duration::from_secs(5)).await;
        assert_eq!(code, EXIT_ERROR);
    }

    #[tokio::test]
    async fn send_rejects_blank_text() {
        let config = with_endpoint("ws://127.0.0.1:1");
        let code = send_and_wait(&config, "   ", Duration::from_secs(1)).await;
        assert_eq!(code, EXIT_USAGE_ERROR);
    }
}
