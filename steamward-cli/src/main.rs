//! Steamward command-line driver
//!
//! Exposes SteamCMD bootstrap, app info and app update as subcommands.

mod cli;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use steamward_core::{ProgressEvent, Settings, SteamCmdClient, SteamCmdError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    // a config file is read before logging starts so its `debug` applies
    let file_settings = args.config.as_deref().map(Settings::load_file).transpose()?;
    let debug = wants_debug(args.debug, file_settings.as_ref(), |key| std::env::var(key).ok());
    init_logging(debug);
    tracing::info!("Starting steamward v{}", steamward_core::VERSION);

    let mut settings = file_settings.unwrap_or_else(Settings::from_env);
    settings.debug = debug;
    settings.validate().context("Invalid settings")?;

    let client = SteamCmdClient::new(settings)?;
    let json = args.json;

    let result = match &args.command {
        cli::Commands::Bootstrap => client.bootstrap(|event| print_event(&event, json)).await,
        cli::Commands::Info { app_id } => client.app_info(*app_id).await.map(|info| {
            if json {
                print_json(&info);
            } else {
                let state = if info.installed { "installed" } else { "not installed" };
                println!("App {} is {}", info.id, state);
            }
        }),
        cli::Commands::Update(update) => client
            .update_app(update.app_id, &update.options(), |event| print_event(&event, json))
            .await
            .map(|summary| {
                if json {
                    print_json(&summary);
                } else if summary.is_up_to_date() {
                    println!("App is already up to date.");
                }
            }),
    };

    match result {
        Ok(()) => Ok(()),
        // mirror SteamCMD's own exit code so wrappers can branch on it
        Err(SteamCmdError::Domain(error)) => {
            tracing::error!(code = error.code, "{}", error.message);
            std::process::exit(error.code.clamp(1, 255));
        }
        Err(e) => Err(e.into()),
    }
}

/// Debug output is on if the flag, the environment or the config file asks for it.
fn wants_debug<F>(flag: bool, file: Option<&Settings>, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    flag || file.is_some_and(|settings| settings.debug) || steamward_core::config::debug_enabled(lookup)
}

fn init_logging(debug: bool) {
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    if debug {
        if let Ok(directive) = "steamward=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_event(event: &ProgressEvent, json: bool) {
    if json {
        print_json(event);
    } else {
        println!("{}{}", "  ".repeat(event.indent_level), event.message);
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!("Failed to serialize output: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_config_file_enables_debug() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("steamward.json");
        std::fs::write(&path, r#"{"debug":true}"#).unwrap();

        let file = Settings::load_file(&path).unwrap();
        assert!(wants_debug(false, Some(&file), no_env));
    }

    #[test]
    fn test_debug_sources() {
        let quiet = Settings::default();
        assert!(!wants_debug(false, None, no_env));
        assert!(!wants_debug(false, Some(&quiet), no_env));
        assert!(wants_debug(true, Some(&quiet), no_env));
        assert!(wants_debug(false, Some(&quiet), |key| {
            (key == "PW_DEBUG").then(|| "1".to_string())
        }));
    }
}
