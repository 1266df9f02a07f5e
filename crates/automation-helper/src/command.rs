//! Launch configuration for helper processes.

use std::path::PathBuf;

/// How to start one helper process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    /// Executable path or command name.
    pub program: PathBuf,
    /// Arguments passed to the helper.
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
}

impl HelperCommand {
    /// Runs `program` without arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn builder_methods_work() {
        let command = HelperCommand::new("/opt/helpers/safari")
            .with_args(["--app", "Safari"])
            .with_working_dir("/var/empty");

        assert_eq!(command.program, PathBuf::from("/opt/helpers/safari"));
        assert_eq!(command.args, vec!["--app", "Safari"]);
        assert_eq!(command.working_dir, Some(PathBuf::from("/var/empty")));
    }
}
