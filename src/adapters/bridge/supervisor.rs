//! Reconnect supervisor for the external bridge.
//!
//! ```text
//! Disconnected ──▶ Reconnecting ──▶ Connected
//!      ▲                │               │
//!      └────────────────┼───────────────┘
//!                       ▼
//!                    Stopped
//! ```
//!
//! Attempts are immediate. Only consecutive failures count against the
//! limit; a successful connect resets the count.

use std::fmt;

use crate::domain::foundation::StateMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// No live connection and no attempt in flight.
    Disconnected,
    /// Opening a connection.
    Reconnecting,
    Connected,
    /// Gave up or closed. Terminal.
    Stopped,
}

impl SupervisorState {
    pub fn as_str(self) -> &'static str {
        match self {
            SupervisorState::Disconnected => "disconnected",
            SupervisorState::Reconnecting => "reconnecting",
            SupervisorState::Connected => "connected",
            SupervisorState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for SupervisorState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SupervisorState::*;
        matches!(
            (self, target),
            (Disconnected, Reconnecting)
                | (Disconnected, Stopped)
                | (Reconnecting, Connected)
                | (Reconnecting, Stopped)
                | (Connected, Disconnected)
                | (Connected, Stopped)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SupervisorState::*;
        match self {
            Disconnected => vec![Reconnecting, Stopped],
            Reconnecting => vec![Connected, Stopped],
            Connected => vec![Disconnected, Stopped],
            Stopped => vec![],
        }
    }
}

/// What the bridge should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPlan {
    /// Try to connect now. `attempt` counts from 1 since the last success.
    Attempt { attempt: u32 },
    /// Stop trying; the host is considered unavailable.
    GiveUp { failed_attempts: u32 },
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSnapshot {
    pub state: SupervisorState,
    pub failed_attempts: u32,
    /// Successful connects, the first one included.
    pub connects: u64,
}

#[derive(Debug, Clone)]
pub struct ReconnectSupervisor {
    state: SupervisorState,
    limit: Option<u32>,
    failed_attempts: u32,
    connects: u64,
}

impl ReconnectSupervisor {
    /// `limit` caps consecutive failed attempts; `None` retries forever.
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            state: SupervisorState::Disconnected,
            limit,
            failed_attempts: 0,
            connects: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        SupervisorSnapshot {
            state: self.state,
            failed_attempts: self.failed_attempts,
            connects: self.connects,
        }
    }

    /// Decide whether to attempt a connection now.
    pub fn next_attempt(&mut self) -> ReconnectPlan {
        if self.state == SupervisorState::Stopped {
            return ReconnectPlan::GiveUp {
                failed_attempts: self.failed_attempts,
            };
        }
        if self.limit.is_some_and(|limit| self.failed_attempts >= limit) {
            self.move_to(SupervisorState::Stopped);
            return ReconnectPlan::GiveUp {
                failed_attempts: self.failed_attempts,
            };
        }
        if self.state != SupervisorState::Reconnecting {
            self.move_to(SupervisorState::Reconnecting);
        }
        ReconnectPlan::Attempt {
            attempt: self.failed_attempts + 1,
        }
    }

    pub fn mark_connected(&mut self) {
        self.move_to(SupervisorState::Connected);
        self.failed_attempts = 0;
        self.connects += 1;
    }

    pub fn mark_failed(&mut self) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
    }

    pub fn mark_disconnected(&mut self) {
        self.move_to(SupervisorState::Disconnected);
    }

    pub fn stop(&mut self) {
        if self.state != SupervisorState::Stopped {
            self.move_to(SupervisorState::Stopped);
        }
    }

    fn move_to(&mut self, target: SupervisorState) {
        match self.state.transition_to(target) {
            Ok(next) => self.state = next,
            Err(e) => tracing::warn!(from = %self.state, to = %target, error = %e, "Ignoring supervisor transition"),
        }
    }
}
