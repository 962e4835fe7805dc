//! Lifecycle signals and worker states.

use serde::{Deserialize, Serialize};

/// Lifecycle signals a controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// A new controller version is being installed.
    Install,
    /// The controller version takes control of clients.
    Activate,
    /// A controlled client issued a request.
    Fetch,
}

impl Signal {
    /// All signals, in registration order.
    pub const ALL: [Signal; 3] = [Signal::Install, Signal::Activate, Signal::Fetch];

    /// Signal name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Fetch => "fetch",
        }
    }

    /// Whether the host must keep the context alive until the handler settles.
    pub fn is_extendable(&self) -> bool {
        matches!(self, Self::Install | Self::Activate)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// State of one controller version within a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Install handler is running.
    Installing,
    /// Installed and waiting for activation.
    Installed,
    /// Activate handler is running.
    Activating,
    /// In control of clients.
    Activated,
    /// Discarded, either after a failed install or when superseded.
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extendable_signals() {
        assert!(Signal::Install.is_extendable());
        assert!(Signal::Activate.is_extendable());
        assert!(!Signal::Fetch.is_extendable());
    }

    #[test]
    fn test_signal_serde_names() {
        assert_eq!(serde_json::to_string(&Signal::Install).unwrap(), "\"install\"");
        assert_eq!(Signal::Fetch.to_string(), "fetch");
    }
}
