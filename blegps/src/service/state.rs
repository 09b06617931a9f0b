//! Engine lifecycle state.

use std::fmt;

/// Which engine a state or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Advertises the local position.
    Broadcaster,
    /// Scans for positions and injects them locally.
    Receiver,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Broadcaster => f.write_str("broadcaster"),
            Role::Receiver => f.write_str("receiver"),
        }
    }
}

/// Lifecycle of one engine run.
///
/// ```text
/// Stopped -> Starting -> Running -> Stopping -> Stopped
///                \-> Stopped (start rejected)
/// ```
///
/// Timers and radio callbacks only act while `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl RunState {
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, RunState::Stopped)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Stopped => "stopped",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
