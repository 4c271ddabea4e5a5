//! SteamCMD argument assembly.
//!
//! SteamCMD takes its script as `+`-prefixed command-line arguments. Every
//! invocation gets the same control directives in front unless the caller
//! already supplied one of the same kind, and always ends with one `quit`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::process::Command;

const QUIT: &str = "quit";

/// Value following `-betapassword`, quoted or bare.
static SECRET_VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(-betapassword\s+)(?:"[^"]*"|\S+)"#).expect("valid secret value regex")
});

const MASK: &str = "\"********\"";

/// Case-insensitive prefix check against the directive keyword.
fn starts_with_keyword(arg: &str, keyword: &str) -> bool {
    arg.len() >= keyword.len()
        && arg.is_char_boundary(keyword.len())
        && arg[..keyword.len()].eq_ignore_ascii_case(keyword)
}

fn contains_keyword(args: &[String], keyword: &str) -> bool {
    args.iter().any(|arg| starts_with_keyword(arg, keyword))
}

/// Trims, drops empties and strips a leading `+`.
fn normalize_arg(arg: &str) -> Option<String> {
    let trimmed = arg.trim();
    let bare = trimmed.strip_prefix('+').unwrap_or(trimmed).trim();
    (!bare.is_empty()).then(|| bare.to_string())
}

/// Joins `args` for logging with `-betapassword` values masked.
pub fn loggable_arguments<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| {
            SECRET_VALUE_RE
                .replace_all(arg.as_ref(), |caps: &Captures| format!("{}{}", &caps[1], MASK))
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the final `+`-prefixed argument list.
///
/// Pure: same inputs, same output, no I/O.
pub fn build_arguments<S: AsRef<str>>(
    base_args: &[S],
    username: &str,
    install_dir: &Path,
    auto_login: bool,
) -> Vec<String> {
    let args: Vec<String> = base_args
        .iter()
        .filter_map(|arg| normalize_arg(arg.as_ref()))
        .collect();

    let defaults = [
        ("@ShutdownOnFailedCommand", "@ShutdownOnFailedCommand 1".to_string(), true),
        ("@NoPromptForPassword", "@NoPromptForPassword 1".to_string(), true),
        ("api_logging", "api_logging 1 1".to_string(), true),
        (
            "force_install_dir",
            format!("force_install_dir \"{}\"", install_dir.display()),
            true,
        ),
        ("login", format!("login \"{}\"", username), auto_login),
    ];

    let mut result: Vec<String> = defaults
        .into_iter()
        .filter(|(keyword, _, wanted)| *wanted && !contains_keyword(&args, keyword))
        .map(|(_, directive, _)| directive)
        .collect();
    result.extend(args.into_iter().filter(|arg| !starts_with_keyword(arg, QUIT)));
    result.push(QUIT.to_string());

    result.into_iter().map(|arg| format!("+{}", arg)).collect()
}

/// Turns SteamCMD scripts into [`Command`]s for one installation.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    executable: PathBuf,
    working_dir: PathBuf,
    environment: BTreeMap<String, String>,
}

impl CommandBuilder {
    pub fn new(executable: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: working_dir.into(),
            environment: BTreeMap::new(),
        }
    }

    /// Adds a variable passed to every spawned SteamCMD.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn build<S: AsRef<str>>(
        &self,
        base_args: &[S],
        username: &str,
        install_dir: &Path,
        auto_login: bool,
    ) -> Command {
        Command::new(
            self.executable.clone(),
            build_arguments(base_args, username, install_dir, auto_login),
            self.working_dir.clone(),
            self.environment.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(args: &[&str], auto_login: bool) -> Vec<String> {
        build_arguments(args, "anonymous", Path::new("/data/server"), auto_login)
    }

    fn count_prefix(args: &[String], prefix: &str) -> usize {
        args.iter()
            .filter(|a| a.to_lowercase().starts_with(&prefix.to_lowercase()))
            .count()
    }

    #[test]
    fn test_defaults_and_quit() {
        let args = build(&["app_status 2394010"], true);
        assert_eq!(
            args,
            vec![
                "+@ShutdownOnFailedCommand 1",
                "+@NoPromptForPassword 1",
                "+api_logging 1 1",
                "+force_install_dir \"/data/server\"",
                "+login \"anonymous\"",
                "+app_status 2394010",
                "+quit",
            ]
        );
    }

    #[test]
    fn test_login_before_caller_args() {
        let args = build(&["app_info_update 1", "app_status 1"], true);
        let login = args.iter().position(|a| a.starts_with("+login")).unwrap();
        let first_caller = args.iter().position(|a| a == "+app_info_update 1").unwrap();
        assert_eq!(count_prefix(&args, "+login"), 1);
        assert!(login < first_caller);
        assert_eq!(args.last().map(String::as_str), Some("+quit"));
    }

    #[test]
    fn test_no_login_without_auto_login() {
        let args = build(&["help"], false);
        assert_eq!(count_prefix(&args, "+login"), 0);
        assert_eq!(args[args.len() - 2], "+help");
    }

    #[test]
    fn test_existing_directives_are_not_duplicated() {
        let args = build(
            &[
                "+LOGIN \"someone\"",
                "  force_install_dir /srv/game  ",
                "@shutdownonfailedcommand 0",
                "API_LOGGING 0 0",
            ],
            true,
        );
        assert_eq!(count_prefix(&args, "+login"), 1);
        assert_eq!(count_prefix(&args, "+force_install_dir"), 1);
        assert_eq!(count_prefix(&args, "+@ShutdownOnFailedCommand"), 1);
        assert_eq!(count_prefix(&args, "+api_logging"), 1);
        assert!(args.contains(&"+LOGIN \"someone\"".to_string()));
        assert!(args.contains(&"+force_install_dir /srv/game".to_string()));
        assert_eq!(args[0], "+@NoPromptForPassword 1");
    }

    #[test]
    fn test_quit_exactly_once_and_last() {
        let args = build(&["quit", "app_status 1", "+QUIT"], true);
        assert_eq!(count_prefix(&args, "+quit"), 1);
        assert_eq!(args.last().map(String::as_str), Some("+quit"));
    }

    #[test]
    fn test_inputs_are_trimmed_and_empty_dropped() {
        let args = build(&["", "   ", "+", " +help "], false);
        assert_eq!(args[args.len() - 2], "+help");
        assert!(args.iter().all(|a| a.starts_with('+') && a.len() > 1));
    }

    #[test]
    fn test_non_ascii_argument_does_not_panic() {
        let args = build(&["é"], false);
        assert!(args.contains(&"+é".to_string()));
    }

    #[test]
    fn test_builder_produces_command() {
        let builder = CommandBuilder::new("/home/steam/steamcmd/steamcmd.sh", "/home/steam/steamcmd")
            .with_env("HOME", "/home/steam");
        let command = builder.build(&["help"], "anonymous", Path::new("/data/server"), false);

        assert_eq!(command.executable(), Path::new("/home/steam/steamcmd/steamcmd.sh"));
        assert_eq!(command.working_dir(), Path::new("/home/steam/steamcmd"));
        assert_eq!(command.environment().get("HOME").map(String::as_str), Some("/home/steam"));
        assert_eq!(command.arguments().last().map(String::as_str), Some("+quit"));
    }

    #[test]
    fn test_loggable_arguments_mask_beta_password() {
        let args = build(
            &["app_update 1 -beta \"b\" -betapassword \"s3cret-pw\""],
            true,
        );
        let logged = loggable_arguments(&args);

        assert!(!logged.contains("s3cret-pw"), "{logged}");
        assert!(logged.contains("-beta \"b\" -betapassword \"********\""), "{logged}");
        assert!(logged.ends_with("+quit"));
    }

    #[test]
    fn test_loggable_arguments_mask_bare_value() {
        let logged = loggable_arguments(&["+app_update 1 -BetaPassword hunter2 -validate"]);
        assert_eq!(logged, "+app_update 1 -BetaPassword \"********\" -validate");
        assert_eq!(loggable_arguments(&["+login \"anonymous\""]), "+login \"anonymous\"");
    }
}
