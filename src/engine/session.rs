// ABOUTME: Bind state machine for a single SMPP session
// ABOUTME: Enforces CLOSED -> OPEN -> BOUND_* -> CLOSED and tracks last inbound activity

use crate::datatypes::BindType;
use crate::error::{SmppError, SmppResult};
use std::fmt;
use std::time::Instant;

/// SMPP v3.4 session states (section 2.2)
///
/// ```text
/// CLOSED → OPEN → BOUND_TX/BOUND_RX/BOUND_TRX → CLOSED
///            └──────────────────────────────────┘
/// ```
///
/// `CLOSED` is both initial and terminal for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    BoundTx,
    BoundRx,
    BoundTrx,
}

impl SessionState {
    pub fn bound_as(bind_type: BindType) -> Self {
        match bind_type {
            BindType::Transmitter => SessionState::BoundTx,
            BindType::Receiver => SessionState::BoundRx,
            BindType::Transceiver => SessionState::BoundTrx,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            SessionState::BoundTx | SessionState::BoundRx | SessionState::BoundTrx
        )
    }

    /// submit_sm and query_sm are legal in this state
    pub fn can_transmit(&self) -> bool {
        matches!(self, SessionState::BoundTx | SessionState::BoundTrx)
    }

    /// deliver_sm is legal in this state
    pub fn can_receive(&self) -> bool {
        matches!(self, SessionState::BoundRx | SessionState::BoundTrx)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Closed => "CLOSED",
            SessionState::Open => "OPEN",
            SessionState::BoundTx => "BOUND_TX",
            SessionState::BoundRx => "BOUND_RX",
            SessionState::BoundTrx => "BOUND_TRX",
        };
        f.write_str(name)
    }
}

/// The engine's one session: state, requested role and last inbound activity
#[derive(Debug)]
pub struct BindSession {
    state: SessionState,
    bind_type: BindType,
    last_activity: Option<Instant>,
}

impl BindSession {
    pub fn new(bind_type: BindType) -> Self {
        Self {
            state: SessionState::Closed,
            bind_type,
            last_activity: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bind_type(&self) -> BindType {
        self.bind_type
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Transport connected
    pub fn open(&mut self, now: Instant) -> SmppResult<()> {
        self.transition(SessionState::Closed, SessionState::Open)?;
        self.last_activity = Some(now);
        Ok(())
    }

    /// Successful bind response received
    pub fn bound(&mut self) -> SmppResult<SessionState> {
        let target = SessionState::bound_as(self.bind_type);
        self.transition(SessionState::Open, target)?;
        Ok(target)
    }

    /// Unbind, bind failure or disconnect. Legal from every state.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::debug!(from = %self.state, "session closed");
        }
        self.state = SessionState::Closed;
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> SmppResult<()> {
        if self.state != from {
            return Err(SmppError::InvalidState(format!(
                "cannot move to {} from {}",
                to, self.state
            )));
        }
        tracing::debug!(from = %from, to = %to, "session state change");
        self.state = to;
        Ok(())
    }
}
