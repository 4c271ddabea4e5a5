use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use steamward_core::{Platform, UpdateOptions};

#[derive(Parser, Debug)]
#[command(name = "steamward", version, about = "Supervise SteamCMD for a dedicated game server")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Read settings from a JSON file instead of STEAMCMD_* variables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print events and results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Log raw SteamCMD output (same as PW_DEBUG=1)
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install SteamCMD if missing and run it once
    Bootstrap,
    /// Report whether the app is fully installed
    Info {
        #[arg(long)]
        app_id: Option<u32>,
    },
    /// Install or update the app
    Update(UpdateArgs),
}

#[derive(ClapArgs, Debug)]
pub struct UpdateArgs {
    #[arg(long)]
    pub app_id: Option<u32>,

    /// Verify all installed files
    #[arg(long)]
    pub validate: bool,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub beta: Option<String>,

    #[arg(long)]
    pub beta_password: Option<String>,

    /// linux, macos or windows
    #[arg(long)]
    pub platform: Option<Platform>,

    /// 32 or 64
    #[arg(long, value_parser = parse_bitness)]
    pub bitness: Option<u8>,
}

fn parse_bitness(value: &str) -> Result<u8, String> {
    match value.trim() {
        "32" => Ok(32),
        "64" => Ok(64),
        other => Err(format!("expected 32 or 64, got {}", other)),
    }
}

impl UpdateArgs {
    pub fn options(&self) -> UpdateOptions {
        UpdateOptions {
            validate: self.validate.then_some(true),
            language: self.language.clone(),
            beta_name: self.beta.clone(),
            beta_password: self.beta_password.clone(),
            platform: self.platform,
            platform_bitness: self.bitness,
        }
    }
}
