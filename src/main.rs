//! fieldlink CLI entry point

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use fieldlink::cli::{
    app::{load_merged_config, run_send, EXIT_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    logging::init_tracing,
    presenter::Presenter,
    session_app::run_session,
};
use fieldlink::domain::config::AppConfig;
use fieldlink::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();

    let cli_config = AppConfig {
        endpoint: cli.endpoint.clone(),
        ..Default::default()
    };

    match cli.command {
        Some(Commands::Config { action }) => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Some(Commands::Send { text, wait }) => {
            let config = load_merged_config(cli_config).await;
            run_send(&config, &text.join(" "), Duration::from_secs(wait)).await
        }
        None => {
            let config = load_merged_config(cli_config).await;
            run_session(config, cli.photo_source).await
        }
    }
}
