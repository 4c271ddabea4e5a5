//! Immutable description of one subprocess invocation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Executable, arguments, working directory and extra environment.
///
/// Built once and never mutated; the supervisor only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    executable: PathBuf,
    arguments: Vec<String>,
    working_dir: PathBuf,
    environment: BTreeMap<String, String>,
}

impl Command {
    pub fn new(
        executable: impl Into<PathBuf>,
        arguments: Vec<String>,
        working_dir: impl Into<PathBuf>,
        environment: BTreeMap<String, String>,
    ) -> Self {
        Self {
            executable: executable.into(),
            arguments,
            working_dir: working_dir.into(),
            environment,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Variables set on top of the inherited environment.
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable.display())?;
        for arg in &self.arguments {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_arguments() {
        let command = Command::new(
            "/home/steam/steamcmd/steamcmd.sh",
            vec!["+login \"anonymous\"".into(), "+quit".into()],
            "/home/steam/steamcmd",
            BTreeMap::new(),
        );
        assert_eq!(
            command.to_string(),
            "/home/steam/steamcmd/steamcmd.sh +login \"anonymous\" +quit"
        );
        assert_eq!(command.arguments().len(), 2);
        assert!(command.environment().is_empty());
    }
}
