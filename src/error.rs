//! Error types shared by every keystick component

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid device count, bad paths or a rejected config value
    #[error("configuration error: {0}")]
    Config(String),

    /// Open/read/write failure on a device file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A gadget-provider step failed
    #[error("gadget step '{step}' failed: {source}")]
    Gadget {
        step: GadgetStep,
        #[source]
        source: io::Error,
    },

    /// Capabilities could not be read (unlike "not a keyboard")
    #[error("failed to read capabilities of {}: {source}", path.display())]
    Classify {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn gadget(step: GadgetStep, source: io::Error) -> Self {
        Error::Gadget { step, source }
    }

    /// The gadget step this error came from, if any
    pub fn gadget_step(&self) -> Option<GadgetStep> {
        match self {
            Error::Gadget { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Individual steps of the gadget lifecycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GadgetStep {
    Connect,
    CreateGadget,
    CreateConfig,
    CreateFunction,
    BindFunction,
    Enable,
    OpenEndpoint,
    Disable,
    Remove,
    Disconnect,
}

impl GadgetStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect to gadget provider",
            Self::CreateGadget => "create gadget",
            Self::CreateConfig => "create configuration",
            Self::CreateFunction => "create HID function",
            Self::BindFunction => "bind function to configuration",
            Self::Enable => "enable gadget",
            Self::OpenEndpoint => "open report endpoint",
            Self::Disable => "disable gadget",
            Self::Remove => "remove gadget",
            Self::Disconnect => "release gadget provider",
        }
    }
}

impl fmt::Display for GadgetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gadget_error_names_step_and_diagnostic() {
        let err = Error::gadget(
            GadgetStep::Enable,
            io::Error::from_raw_os_error(16), // EBUSY
        );
        let msg = err.to_string();
        assert!(msg.contains("enable gadget"));
        assert!(msg.contains("os error 16"));
        assert_eq!(err.gadget_step(), Some(GadgetStep::Enable));
    }

    #[test]
    fn io_error_names_path() {
        let err = Error::io(
            "/dev/input/event3",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/dev/input/event3"));
        assert_eq!(err.gadget_step(), None);
    }

    #[test]
    fn step_labels_are_distinct() {
        let steps = [
            GadgetStep::Connect,
            GadgetStep::CreateGadget,
            GadgetStep::CreateConfig,
            GadgetStep::CreateFunction,
            GadgetStep::BindFunction,
            GadgetStep::Enable,
            GadgetStep::OpenEndpoint,
            GadgetStep::Disable,
            GadgetStep::Remove,
            GadgetStep::Disconnect,
        ];
        let labels: std::collections::HashSet<_> = steps.iter().map(|s| s.as_str()).collect();
        assert_eq!(labels.len(), steps.len());
    }

    #[test]
    fn config_error_display() {
        let err = Error::Config("device count 0 outside 1..=4".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: device count 0 outside 1..=4"
        );
    }
}
