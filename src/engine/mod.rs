// ABOUTME: Sans-IO SMPP ESME protocol engine composing framing, bind state, keep-alive and correlation
// ABOUTME: Every input (bytes, timer expiry, API call) is a method call processed to completion

//! The protocol engine.
//!
//! [`SmppEngine`] owns exactly one connection's worth of state and never
//! performs I/O itself: encoded PDUs go out through a [`Transport`], timers
//! are requested from a [`Scheduler`], and whoever drives the engine feeds
//! it received bytes ([`SmppEngine::data_received`]) and timer expiries
//! ([`SmppEngine::timer_fired`]). Driving every input through `&mut self`
//! serialises state changes; the tokio driver in [`crate::client`] routes
//! all events through one queue to a single task that owns the engine.

mod correlator;
mod handler;
mod keepalive;
mod session;
mod splitter;
mod timer;
mod transport;

pub use correlator::{PendingResponse, RequestResponseCorrelator, Response};
pub use handler::{EsmeHandler, NoopHandler};
pub use keepalive::{KeepAliveMonitor, KeepAliveStatus, KeepAliveTick};
pub use session::{BindSession, SessionState};
pub use splitter::{
    LongMessageStrategy, MAX_SEGMENTS, MessageSegment, MessageSplitter, SAR_CHUNK_SIZE,
    UDH_CHUNK_SIZE, segment,
};
pub use timer::{ManualScheduler, Scheduler, TimerId, TimerKind};
pub use transport::Transport;

use crate::codec::{Encodable, Pdu, PduRegistry};
use crate::config::EngineConfig;
use crate::datatypes::{
    BindRequest, BindResponse, CommandId, CommandStatus, DeliverSm, DeliverSmResponse,
    EnquireLink, EnquireLinkResponse, GenericNack, QuerySm, SubmitSm, Unbind, UnbindResponse,
};
use crate::error::{BindError, SmppError, SmppResult};
use crate::framer::StreamFramer;
use crate::sequence::SequenceAllocator;
use crate::types::SmsMessage;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Attempts at drawing a sequence number that is not locally pending before
/// giving up; only reachable after the shared counter wraps
const SEQUENCE_ATTEMPTS: usize = 16;

/// SMPP client protocol engine for one connection
pub struct SmppEngine<T: Transport, S: Scheduler> {
    config: EngineConfig,
    session: BindSession,
    framer: StreamFramer,
    registry: PduRegistry,
    correlator: RequestResponseCorrelator,
    keepalive: KeepAliveMonitor,
    splitter: MessageSplitter,
    sequence: Arc<dyn SequenceAllocator>,
    handler: Box<dyn EsmeHandler>,
    transport: T,
    scheduler: S,
    bind_timer: Option<TimerId>,
    bind_sequence: Option<u32>,
    connected: bool,
    unbinding: bool,
}

impl<T: Transport, S: Scheduler> SmppEngine<T, S> {
    pub fn new(
        config: EngineConfig,
        transport: T,
        scheduler: S,
        sequence: Arc<dyn SequenceAllocator>,
        handler: Box<dyn EsmeHandler>,
    ) -> Self {
        Self {
            session: BindSession::new(config.credentials.bind_type),
            framer: StreamFramer::with_max_pdu_size(config.max_pdu_size),
            registry: PduRegistry::new(),
            correlator: RequestResponseCorrelator::new(),
            keepalive: KeepAliveMonitor::new(config.enquire_link_interval),
            splitter: MessageSplitter::new(config.long_message_strategy),
            sequence,
            handler,
            transport,
            scheduler,
            bind_timer: None,
            bind_sequence: None,
            connected: false,
            unbinding: false,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_bound(&self) -> bool {
        self.session.state().is_bound()
    }

    /// When the last PDU was received from the SMSC
    pub fn last_activity(&self) -> Option<Instant> {
        self.session.last_activity()
    }

    pub fn keepalive_status(&self) -> KeepAliveStatus {
        self.keepalive.status()
    }

    pub fn pending_requests(&self) -> usize {
        self.correlator.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The transport connected: open the session and send the bind request
    /// built from the configured credentials.
    ///
    /// The returned response resolves once the session is bound, or fails
    /// with [`SmppError::Bind`] when the SMSC rejects the bind or the bind
    /// timeout elapses. A bind that cannot be encoded or written closes the
    /// connection and is returned as an error here.
    pub fn connection_made(&mut self) -> SmppResult<PendingResponse> {
        let now = self.scheduler.now();
        self.session.open(now)?;
        self.connected = true;
        self.unbinding = false;
        match self.bind() {
            Ok(pending) => Ok(pending),
            Err(e) => {
                warn!(error = %e, "cannot send bind request, disconnecting");
                self.disconnect();
                Err(e)
            }
        }
    }

    /// Send the configured bind request and start the bind timer.
    /// Only legal while the session is open and no bind is in flight.
    fn bind(&mut self) -> SmppResult<PendingResponse> {
        if self.state() != SessionState::Open || self.bind_sequence.is_some() {
            return Err(SmppError::InvalidState(format!(
                "cannot bind in state {}",
                self.state()
            )));
        }

        let credentials = &self.config.credentials;
        let mut bind = BindRequest {
            command_status: CommandStatus::Ok,
            sequence_number: 0,
            bind_type: credentials.bind_type,
            system_id: credentials.system_id.clone(),
            password: credentials.password.clone(),
            system_type: credentials.system_type.clone(),
            interface_version: credentials.interface_version,
            addr_ton: credentials.addr_ton,
            addr_npi: credentials.addr_npi,
            address_range: credentials.address_range.clone(),
        };
        let command_id = bind.bind_type.request_command_id();
        let pending = self.send_request(command_id, |seq| {
            bind.sequence_number = seq;
            Pdu::Bind(bind)
        })?;

        info!(
            system_id = %self.config.credentials.system_id,
            bind_type = ?self.config.credentials.bind_type,
            sequence_number = pending.sequence_number(),
            "bind sent"
        );
        self.bind_sequence = Some(pending.sequence_number());
        self.bind_timer = Some(
            self.scheduler
                .schedule(TimerKind::BindTimeout, self.config.bind_timeout),
        );
        Ok(pending)
    }

    /// Submit a message, split per the configured long message strategy.
    /// Returns the sequence numbers of the PDUs sent, in order.
    pub fn submit_sm(&mut self, message: &SmsMessage) -> SmppResult<Vec<u32>> {
        Ok(self
            .submit_sm_tracked(message)?
            .iter()
            .map(PendingResponse::sequence_number)
            .collect())
    }

    /// Like [`SmppEngine::submit_sm`], returning one pending response per PDU
    pub fn submit_sm_tracked(&mut self, message: &SmsMessage) -> SmppResult<Vec<PendingResponse>> {
        self.ensure_can_transmit("submit_sm")?;

        let template = SubmitSm {
            service_type: message.options.service_type.clone(),
            source_addr_ton: message.options.source_ton,
            source_addr_npi: message.options.source_npi,
            source_addr: message.from.clone(),
            dest_addr_ton: message.options.dest_ton,
            dest_addr_npi: message.options.dest_npi,
            destination_addr: message.to.clone(),
            protocol_id: message.options.protocol_id,
            priority_flag: message.options.priority,
            schedule_delivery_time: message.options.schedule_delivery_time.clone(),
            validity_period: message.options.validity_period.clone(),
            registered_delivery: message.options.registered_delivery,
            data_coding: message.options.data_coding,
            ..Default::default()
        };

        let pdus = self
            .splitter
            .split(&template, &message.content, rand::random::<u16>())?;

        // Encode everything up front so an invalid field never leaves a
        // partially sent multipart message behind
        for pdu in &pdus {
            pdu.to_bytes()?;
        }

        let mut pending = Vec::with_capacity(pdus.len());
        for mut pdu in pdus {
            pending.push(self.send_request(CommandId::SubmitSm, |seq| {
                pdu.sequence_number = seq;
                Pdu::SubmitSm(Box::new(pdu))
            })?);
        }
        debug!(
            to = %message.to,
            segments = pending.len(),
            "submit_sm sent"
        );
        Ok(pending)
    }

    pub fn query_sm(&mut self, message_id: &str, source_addr: &str) -> SmppResult<PendingResponse> {
        self.ensure_can_transmit("query_sm")?;
        let mut query = QuerySm::new(0, message_id, source_addr);
        query.to_bytes()?;
        self.send_request(CommandId::QuerySm, |seq| {
            query.sequence_number = seq;
            Pdu::QuerySm(query)
        })
    }

    /// Send unbind. The session stays up until the transport is closed;
    /// keep-alive stops once the unbind_resp arrives.
    pub fn unbind(&mut self) -> SmppResult<PendingResponse> {
        if !self.connected || !self.is_bound() {
            return Err(SmppError::InvalidState(format!(
                "cannot unbind in state {}",
                self.state()
            )));
        }
        let pending = self.send_request(CommandId::Unbind, |seq| Pdu::Unbind(Unbind::new(seq)))?;
        self.unbinding = true;
        info!(sequence_number = pending.sequence_number(), "unbind sent");
        Ok(pending)
    }

    /// Raw bytes from the transport
    pub fn data_received(&mut self, data: &[u8]) {
        if !self.connected {
            debug!(bytes = data.len(), "ignoring data on a closed session");
            return;
        }

        self.framer.extend(data);
        loop {
            let frame = match self.framer.next_pdu() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "unframeable input, disconnecting");
                    self.disconnect();
                    break;
                }
            };

            let pdu = match self.registry.decode(&frame) {
                Ok(pdu) => pdu,
                Err(e) => {
                    warn!(error = %e, "undecodable PDU, disconnecting");
                    self.disconnect();
                    break;
                }
            };

            self.dispatch(pdu);
            if !self.connected {
                break;
            }
        }
    }

    /// A timer requested from the scheduler expired
    pub fn timer_fired(&mut self, id: TimerId, kind: TimerKind) {
        match kind {
            TimerKind::BindTimeout => {
                if self.bind_timer != Some(id) {
                    return;
                }
                self.bind_timer = None;
                warn!(timeout = ?self.config.bind_timeout, "no bind response, disconnecting");
                if let Some(seq) = self.bind_sequence.take() {
                    self.correlator
                        .fail(seq, SmppError::Bind(BindError::Timeout));
                }
                self.disconnect();
            }
            TimerKind::EnquireLink => {
                if self.keepalive.timer() == Some(id) {
                    self.keepalive_tick();
                }
            }
            TimerKind::ResponseTimeout(seq) => {
                self.correlator.expire(seq, id);
            }
        }
    }

    /// The transport went away underneath us
    pub fn connection_lost(&mut self) {
        if self.connected {
            info!("connection lost");
        }
        self.teardown(false);
    }

    /// Force the connection closed. Idempotent.
    pub fn disconnect(&mut self) {
        self.teardown(true);
    }

    fn teardown(&mut self, close_transport: bool) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.unbinding = false;

        if let Some(timer) = self.bind_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.bind_sequence = None;
        if let Some(timer) = self.keepalive.stop() {
            self.scheduler.cancel(timer);
        }
        for timer in self.correlator.fail_all(|| SmppError::ConnectionClosed) {
            self.scheduler.cancel(timer);
        }

        self.session.close();
        self.framer.clear();
        if close_transport {
            self.transport.lose_connection();
        }
    }

    fn ensure_can_transmit(&self, operation: &str) -> SmppResult<()> {
        if !self.connected || !self.state().can_transmit() || self.unbinding {
            return Err(SmppError::InvalidState(format!(
                "{} not allowed in state {}{}",
                operation,
                self.state(),
                if self.unbinding { " (unbinding)" } else { "" }
            )));
        }
        Ok(())
    }

    fn next_sequence(&mut self) -> SmppResult<u32> {
        for _ in 0..SEQUENCE_ATTEMPTS {
            let seq = self.sequence.next()?;
            if !self.correlator.contains(seq) && self.keepalive.outstanding() != Some(seq) {
                return Ok(seq);
            }
            debug!(sequence_number = seq, "skipping sequence number still in use");
        }
        Err(SmppError::Sequence(
            "no free sequence number available".to_string(),
        ))
    }

    /// Allocate a sequence number, record the pending request, then write
    fn send_request<F>(&mut self, command_id: CommandId, build: F) -> SmppResult<PendingResponse>
    where
        F: FnOnce(u32) -> Pdu,
    {
        let seq = self.next_sequence()?;
        let bytes = build(seq).to_bytes()?;

        let now = self.scheduler.now();
        let pending = self.correlator.register(seq, command_id, now)?;
        if let Some(timeout) = self.config.response_timeout {
            let timer = self
                .scheduler
                .schedule(TimerKind::ResponseTimeout(seq), timeout);
            self.correlator.set_timer(seq, timer);
        }

        self.write(bytes)?;
        Ok(pending)
    }

    fn write(&mut self, bytes: Bytes) -> SmppResult<()> {
        if let Err(e) = self.transport.write(bytes) {
            warn!(error = %e, "transport write failed, disconnecting");
            self.disconnect();
            return Err(e);
        }
        Ok(())
    }

    fn respond(&mut self, pdu: Pdu) {
        match pdu.to_bytes() {
            Ok(bytes) => {
                let _ = self.write(bytes);
            }
            Err(e) => warn!(error = %e, "failed to encode response"),
        }
    }

    fn keepalive_tick(&mut self) {
        match self.keepalive.on_tick() {
            KeepAliveTick::Idle => {}
            KeepAliveTick::Expired { .. } => self.disconnect(),
            KeepAliveTick::Ping => {
                let seq = match self.next_sequence() {
                    Ok(seq) => seq,
                    Err(e) => {
                        warn!(error = %e, "cannot allocate enquire_link sequence, disconnecting");
                        self.disconnect();
                        return;
                    }
                };
                let bytes = match EnquireLink::new(seq).to_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "cannot encode enquire_link, disconnecting");
                        self.disconnect();
                        return;
                    }
                };
                if self.write(bytes).is_err() {
                    return;
                }
                let next = self
                    .scheduler
                    .schedule(TimerKind::EnquireLink, self.keepalive.interval());
                self.keepalive.ping_sent(seq, Some(next));
            }
        }
    }

    fn dispatch(&mut self, pdu: Pdu) {
        let now = self.scheduler.now();
        self.session.touch(now);
        debug!(
            command_id = format_args!("{:#010x}", pdu.command_id()),
            sequence_number = pdu.sequence_number(),
            status = ?pdu.command_status(),
            "received PDU"
        );

        match pdu {
            Pdu::BindResp(resp) => self.on_bind_response(resp),
            Pdu::EnquireLink(req) => {
                self.respond(Pdu::EnquireLinkResp(EnquireLinkResponse::new(
                    req.sequence_number,
                )));
            }
            Pdu::EnquireLinkResp(resp) => {
                self.keepalive.pong(resp.sequence_number);
                self.handler.on_enquire_link_response(resp.sequence_number);
            }
            Pdu::Unbind(req) => {
                info!(sequence_number = req.sequence_number, "SMSC requested unbind");
                self.respond(Pdu::UnbindResp(UnbindResponse::new(req.sequence_number)));
            }
            Pdu::UnbindResp(ref resp) => {
                let seq = resp.sequence_number;
                self.handler.on_unbind_response(seq);
                if self.correlator.command_id(seq) == Some(CommandId::Unbind) {
                    if let Some(timer) = self.keepalive.stop() {
                        self.scheduler.cancel(timer);
                    }
                }
                self.resolve(pdu);
            }
            Pdu::SubmitSmResp(ref resp) => {
                self.handler.on_submit_response(
                    resp.sequence_number,
                    &resp.message_id,
                    resp.command_status,
                );
                self.resolve(pdu);
            }
            Pdu::QuerySmResp(_) => self.resolve(pdu),
            Pdu::GenericNack(ref nack) => {
                warn!(
                    sequence_number = nack.sequence_number,
                    status = ?nack.command_status,
                    "generic_nack received"
                );
                if self.bind_sequence == Some(nack.sequence_number) {
                    let status = match nack.command_status {
                        CommandStatus::Ok => CommandStatus::BindFailed,
                        status => status,
                    };
                    let resp =
                        BindResponse::error(self.session.bind_type(), nack.sequence_number, status);
                    self.on_bind_response(resp);
                } else {
                    self.resolve(pdu);
                }
            }
            Pdu::DeliverSm(deliver) => self.on_deliver_sm(&deliver),
            Pdu::Unknown {
                command_id,
                sequence_number,
                ..
            } => {
                if !CommandId::is_response_id(command_id) {
                    self.respond(Pdu::GenericNack(GenericNack::error(
                        sequence_number,
                        CommandStatus::InvalidCommandId,
                    )));
                }
            }
            Pdu::Bind(_) | Pdu::SubmitSm(_) | Pdu::QuerySm(_) => {
                warn!(
                    command_id = format_args!("{:#010x}", pdu.command_id()),
                    "SMSC-bound request received by ESME, rejecting"
                );
                self.respond(Pdu::GenericNack(GenericNack::error(
                    pdu.sequence_number(),
                    CommandStatus::InvalidCommandId,
                )));
            }
            Pdu::DeliverSmResp(_) => {
                debug!("unexpected deliver_sm_resp, dropping");
            }
        }
    }

    fn resolve(&mut self, pdu: Pdu) {
        let Some(response) = Response::from_pdu(pdu) else {
            return;
        };
        if let Some(Some(timer)) = self.correlator.resolve(response) {
            self.scheduler.cancel(timer);
        }
    }

    fn on_bind_response(&mut self, resp: BindResponse) {
        if self.bind_sequence != Some(resp.sequence_number) {
            debug!(
                sequence_number = resp.sequence_number,
                "dropping bind response with no pending bind"
            );
            return;
        }
        if resp.bind_type != self.session.bind_type() && resp.command_status.is_ok() {
            warn!(
                expected = ?self.session.bind_type(),
                actual = ?resp.bind_type,
                "bind response for a different bind type, dropping"
            );
            return;
        }

        self.bind_sequence = None;
        if let Some(timer) = self.bind_timer.take() {
            self.scheduler.cancel(timer);
        }

        let seq = resp.sequence_number;
        if !resp.command_status.is_ok() {
            warn!(status = ?resp.command_status, "bind rejected, disconnecting");
            if let Some(Some(timer)) = self
                .correlator
                .fail(seq, SmppError::Bind(BindError::Rejected(resp.command_status)))
            {
                self.scheduler.cancel(timer);
            }
            self.disconnect();
            return;
        }

        let state = match self.session.bound() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "unexpected bind response");
                return;
            }
        };
        info!(
            state = %state,
            smsc = %resp.system_id,
            "bound"
        );
        self.resolve(Pdu::BindResp(resp));

        self.keepalive.start();
        self.keepalive_tick();
    }

    fn on_deliver_sm(&mut self, deliver: &DeliverSm) {
        let seq = deliver.sequence_number;
        let status = if self.state().can_receive() {
            self.handler.on_deliver(seq, deliver)
        } else {
            warn!(
                sequence_number = seq,
                state = %self.state(),
                "deliver_sm in a state that cannot receive"
            );
            CommandStatus::IncorrectBindStatus
        };
        self.respond(Pdu::DeliverSmResp(DeliverSmResponse::new(seq, status)));
    }
}

impl<T: Transport, S: Scheduler> std::fmt::Debug for SmppEngine<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmppEngine")
            .field("state", &self.state())
            .field("connected", &self.connected)
            .field("pending", &self.correlator.len())
            .field("keepalive", &self.keepalive.status())
            .finish()
    }
}
