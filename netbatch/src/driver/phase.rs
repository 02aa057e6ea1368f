//! Run state machine.

use std::fmt;

use log::debug;

use super::report::RunStatus;

/// Where a run is in its lifecycle.
///
/// ```text
/// Idle -> Connecting -> (Unreachable | AuthFailed | ShellReady)
/// ShellReady -> Dispatching -> (Success | PartialFailure)
/// ```
///
/// A resolver miss goes straight from `Idle` to `AuthFailed`; a run cancelled
/// before a shell was opened ends as `Unreachable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Connecting,
    ShellReady,
    Dispatching,
    Unreachable,
    AuthFailed,
    Success,
    PartialFailure,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunPhase::Unreachable | RunPhase::AuthFailed | RunPhase::Success | RunPhase::PartialFailure
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Idle, AuthFailed)
                | (Idle, Unreachable)
                | (Connecting, Unreachable)
                | (Connecting, AuthFailed)
                | (Connecting, ShellReady)
                | (ShellReady, Dispatching)
                | (Dispatching, Success)
                | (Dispatching, PartialFailure)
        )
    }

    /// Move to `next`, logging the transition.
    pub(crate) fn advance(&mut self, next: RunPhase, device: &str) {
        debug_assert!(
            self.can_advance_to(next),
            "illegal run transition {} -> {}",
            self,
            next
        );
        debug!("{}: {} -> {}", device, self, next);
        *self = next;
    }
}

impl From<RunStatus> for RunPhase {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Connected => RunPhase::Dispatching,
            RunStatus::AuthFailed => RunPhase::AuthFailed,
            RunStatus::Unreachable => RunPhase::Unreachable,
            RunStatus::PartialFailure => RunPhase::PartialFailure,
            RunStatus::Success => RunPhase::Success,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut phase = RunPhase::Idle;
        for next in [
            RunPhase::Connecting,
            RunPhase::ShellReady,
            RunPhase::Dispatching,
            RunPhase::Success,
        ] {
            assert!(phase.can_advance_to(next));
            phase.advance(next, "r1");
        }
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_terminal_phases_have_no_successor() {
        let all = [
            RunPhase::Idle,
            RunPhase::Connecting,
            RunPhase::ShellReady,
            RunPhase::Dispatching,
            RunPhase::Unreachable,
            RunPhase::AuthFailed,
            RunPhase::Success,
            RunPhase::PartialFailure,
        ];
        for from in all.into_iter().filter(|p| p.is_terminal()) {
            assert!(all.iter().all(|&to| !from.can_advance_to(to)));
        }
    }

    #[test]
    fn test_cannot_dispatch_without_shell() {
        assert!(!RunPhase::Connecting.can_advance_to(RunPhase::Dispatching));
        assert!(!RunPhase::Idle.can_advance_to(RunPhase::Success));
        assert!(!RunPhase::Dispatching.can_advance_to(RunPhase::Unreachable));
    }

    #[test]
    fn test_cancelled_before_connect() {
        let mut phase = RunPhase::Idle;
        phase.advance(RunPhase::Unreachable, "r1");
        assert!(phase.is_terminal());
    }
}
