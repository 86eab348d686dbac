// ABOUTME: Matches inbound responses to outstanding requests by sequence number
// ABOUTME: Each pending request holds a oneshot result slot that is settled exactly once

use super::timer::TimerId;
use crate::codec::Pdu;
use crate::datatypes::{CommandId, CommandStatus};
use crate::error::{SmppError, SmppResult};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, warn};

/// A response matched to the request it answers
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub sequence_number: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    /// message_id of submit_sm_resp and query_sm_resp
    pub message_id: Option<String>,
    pub pdu: Pdu,
}

impl Response {
    pub fn from_pdu(pdu: Pdu) -> Option<Self> {
        let command_id = CommandId::try_from(pdu.command_id()).ok()?;
        let message_id = match &pdu {
            Pdu::SubmitSmResp(resp) => Some(resp.message_id.clone()),
            Pdu::QuerySmResp(resp) => Some(resp.message_id.clone()),
            _ => None,
        };
        Some(Self {
            sequence_number: pdu.sequence_number(),
            command_id,
            command_status: pdu.command_status(),
            message_id,
            pdu,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.command_status.is_ok()
    }
}

/// The caller's side of a pending request
///
/// Resolves once: with the matching response, or with an error when the
/// request times out or the connection goes away.
#[derive(Debug)]
pub struct PendingResponse {
    sequence_number: u32,
    rx: oneshot::Receiver<SmppResult<Response>>,
}

impl PendingResponse {
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Non-blocking check for a result; `None` while still pending
    pub fn try_take(&mut self) -> Option<SmppResult<Response>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(SmppError::ConnectionClosed)),
        }
    }
}

impl Future for PendingResponse {
    type Output = SmppResult<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(SmppError::ConnectionClosed)))
    }
}

#[derive(Debug)]
struct PendingRequest {
    command_id: CommandId,
    issued_at: Instant,
    slot: oneshot::Sender<SmppResult<Response>>,
    timer: Option<TimerId>,
}

impl PendingRequest {
    fn settle(self, result: SmppResult<Response>) -> Option<TimerId> {
        // The caller may have dropped its PendingResponse; nothing to do then
        let _ = self.slot.send(result);
        self.timer
    }
}

/// Outstanding requests keyed by sequence number
#[derive(Debug, Default)]
pub struct RequestResponseCorrelator {
    pending: HashMap<u32, PendingRequest>,
}

impl RequestResponseCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        sequence_number: u32,
        command_id: CommandId,
        issued_at: Instant,
    ) -> SmppResult<PendingResponse> {
        if self.pending.contains_key(&sequence_number) {
            return Err(SmppError::Sequence(format!(
                "sequence number {} is already pending",
                sequence_number
            )));
        }

        let (slot, rx) = oneshot::channel();
        self.pending.insert(
            sequence_number,
            PendingRequest {
                command_id,
                issued_at,
                slot,
                timer: None,
            },
        );
        Ok(PendingResponse {
            sequence_number,
            rx,
        })
    }

    /// Attach the response timeout timer of a registered request
    pub fn set_timer(&mut self, sequence_number: u32, timer: TimerId) {
        if let Some(request) = self.pending.get_mut(&sequence_number) {
            request.timer = Some(timer);
        }
    }

    pub fn contains(&self, sequence_number: u32) -> bool {
        self.pending.contains_key(&sequence_number)
    }

    pub fn command_id(&self, sequence_number: u32) -> Option<CommandId> {
        self.pending.get(&sequence_number).map(|r| r.command_id)
    }

    pub fn issued_at(&self, sequence_number: u32) -> Option<Instant> {
        self.pending.get(&sequence_number).map(|r| r.issued_at)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Settle the request a response PDU answers.
    ///
    /// Returns `None` when nothing was pending for the sequence number or
    /// the response type does not answer the pending request; such
    /// responses are dropped. Otherwise returns the request's timer, if
    /// any, for the caller to cancel.
    pub fn resolve(&mut self, response: Response) -> Option<Option<TimerId>> {
        let sequence_number = response.sequence_number;
        let Some(request) = self.pending.get(&sequence_number) else {
            debug!(
                sequence_number,
                command_id = ?response.command_id,
                "dropping response with no pending request"
            );
            return None;
        };

        let answers = response.command_id == CommandId::GenericNack
            || request.command_id.response_id() == Some(response.command_id);
        if !answers {
            warn!(
                sequence_number,
                expected = ?request.command_id.response_id(),
                actual = ?response.command_id,
                "response type does not match pending request, dropping"
            );
            return None;
        }

        self.pending
            .remove(&sequence_number)
            .map(|request| request.settle(Ok(response)))
    }

    /// Fail one pending request
    pub fn fail(&mut self, sequence_number: u32, error: SmppError) -> Option<Option<TimerId>> {
        self.pending
            .remove(&sequence_number)
            .map(|request| request.settle(Err(error)))
    }

    /// Fail a request when its response timer fires, unless that timer has
    /// been superseded
    pub fn expire(&mut self, sequence_number: u32, timer: TimerId) -> bool {
        let current = self
            .pending
            .get(&sequence_number)
            .is_some_and(|request| request.timer == Some(timer));
        if current {
            warn!(sequence_number, "request timed out");
            self.fail(sequence_number, SmppError::Timeout);
        }
        current
    }

    /// Fail everything still pending, returning the timers to cancel
    pub fn fail_all<F>(&mut self, mut error: F) -> Vec<TimerId>
    where
        F: FnMut() -> SmppError,
    {
        if !self.pending.is_empty() {
            debug!(count = self.pending.len(), "failing pending requests");
        }
        self.pending
            .drain()
            .filter_map(|(_, request)| request.settle(Err(error())))
            .collect()
    }
}
