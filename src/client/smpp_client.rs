// ABOUTME: Async client handle plus the engine task that serialises every session event
// ABOUTME: Connect binds before returning; all later calls are forwarded through the event queue

use super::io::{ChannelTransport, Command, Event, TokioScheduler, read_loop, write_loop};
use crate::codec::Pdu;
use crate::config::EngineConfig;
use crate::datatypes::QuerySmResponse;
use crate::engine::{EsmeHandler, KeepAliveStatus, SessionState, SmppEngine};
use crate::error::{SmppError, SmppResult};
use crate::sequence::SequenceAllocator;
use crate::types::SmsMessage;
use std::sync::Arc;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type TokioEngine = SmppEngine<ChannelTransport, TokioScheduler>;

/// Handle to a bound SMPP session running in a background task
///
/// Dropping the handle disconnects the session.
#[derive(Debug)]
pub struct SmppClient {
    events: mpsc::UnboundedSender<Event>,
}

impl SmppClient {
    /// Connect to `addr` and bind with the configured credentials.
    ///
    /// Returns once the session is bound. Fails with [`SmppError::Bind`] if
    /// the SMSC rejects the bind or does not answer within the bind timeout.
    pub async fn connect<A, H>(
        addr: A,
        config: EngineConfig,
        handler: H,
        sequence: Arc<dyn SequenceAllocator>,
    ) -> SmppResult<Self>
    where
        A: ToSocketAddrs,
        H: EsmeHandler + 'static,
    {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        let (read_half, write_half) = socket.into_split();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(write_half, outbound_rx, events_tx.clone()));
        let reader = tokio::spawn(read_loop(read_half, events_tx.clone()));

        let mut engine = SmppEngine::new(
            config,
            ChannelTransport::new(outbound_tx),
            TokioScheduler::new(events_tx.clone()),
            sequence,
            Box::new(handler),
        );
        let bind = engine.connection_made()?;
        tokio::spawn(run_engine(engine, events_rx, reader));

        bind.await?;
        Ok(Self { events: events_tx })
    }

    async fn request<R, F>(&self, command: F) -> SmppResult<R>
    where
        F: FnOnce(oneshot::Sender<R>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(Event::Command(command(reply)))
            .map_err(|_| SmppError::ConnectionClosed)?;
        rx.await.map_err(|_| SmppError::ConnectionClosed)
    }

    /// Submit a message without waiting for the SMSC. Returns the sequence
    /// numbers of the submit_sm PDUs sent, in order.
    pub async fn submit_sm(&self, message: SmsMessage) -> SmppResult<Vec<u32>> {
        let pending = self
            .request(|reply| Command::Submit { message, reply })
            .await??;
        Ok(pending.iter().map(|p| p.sequence_number()).collect())
    }

    /// Submit a message and wait for every submit_sm_resp. Returns the
    /// message ids assigned by the SMSC, one per PDU.
    pub async fn send_sms(&self, message: &SmsMessage) -> SmppResult<Vec<String>> {
        let message = message.clone();
        let pending = self
            .request(|reply| Command::Submit { message, reply })
            .await??;

        let mut message_ids = Vec::with_capacity(pending.len());
        for response in pending {
            let response = response.await?;
            if !response.is_ok() {
                return Err(SmppError::Protocol(response.command_status));
            }
            message_ids.push(response.message_id.unwrap_or_default());
        }
        Ok(message_ids)
    }

    pub async fn query_sm(&self, message_id: &str, source_addr: &str) -> SmppResult<QuerySmResponse> {
        let message_id = message_id.to_string();
        let source_addr = source_addr.to_string();
        let pending = self
            .request(|reply| Command::Query {
                message_id,
                source_addr,
                reply,
            })
            .await??;

        let response = pending.await?;
        match response.pdu {
            Pdu::QuerySmResp(resp) if resp.command_status.is_ok() => Ok(resp),
            _ => Err(SmppError::Protocol(response.command_status)),
        }
    }

    /// Unbind and close the connection once the SMSC acknowledges
    pub async fn unbind(&self) -> SmppResult<()> {
        let pending = self.request(|reply| Command::Unbind { reply }).await??;
        let response = pending.await;
        self.disconnect().await;

        let response = response?;
        if !response.is_ok() {
            return Err(SmppError::Protocol(response.command_status));
        }
        Ok(())
    }

    /// Close the connection without unbinding. Pending requests fail with
    /// [`SmppError::ConnectionClosed`].
    pub async fn disconnect(&self) {
        let _ = self
            .request(|reply| Command::Disconnect { reply: Some(reply) })
            .await;
    }

    /// Session state; `Closed` once the background task has stopped
    pub async fn state(&self) -> SessionState {
        self.request(|reply| Command::Status { reply })
            .await
            .map(|(state, _)| state)
            .unwrap_or(SessionState::Closed)
    }

    pub async fn keepalive_status(&self) -> SmppResult<KeepAliveStatus> {
        self.request(|reply| Command::Status { reply })
            .await
            .map(|(_, status)| status)
    }

    /// Wait until the session ends, for whatever reason
    pub async fn closed(&self) {
        self.events.closed().await;
    }
}

impl Drop for SmppClient {
    fn drop(&mut self) {
        let _ = self
            .events
            .send(Event::Command(Command::Disconnect { reply: None }));
    }
}

async fn run_engine(
    mut engine: TokioEngine,
    mut events: mpsc::UnboundedReceiver<Event>,
    reader: JoinHandle<()>,
) {
    while let Some(event) = events.recv().await {
        match event {
            Event::Data(bytes) => engine.data_received(&bytes),
            Event::Closed => engine.connection_lost(),
            Event::Timer(id, kind) => engine.timer_fired(id, kind),
            Event::Command(command) => handle_command(&mut engine, command),
        }

        if engine.state() == SessionState::Closed {
            break;
        }
    }

    engine.disconnect();
    reader.abort();
    info!("session ended");
}

fn handle_command(engine: &mut TokioEngine, command: Command) {
    match command {
        Command::Submit { message, reply } => {
            let _ = reply.send(engine.submit_sm_tracked(&message));
        }
        Command::Query {
            message_id,
            source_addr,
            reply,
        } => {
            let _ = reply.send(engine.query_sm(&message_id, &source_addr));
        }
        Command::Unbind { reply } => {
            let _ = reply.send(engine.unbind());
        }
        Command::Disconnect { reply } => {
            debug!("disconnect requested");
            engine.disconnect();
            if let Some(reply) = reply {
                let _ = reply.send(());
            }
        }
        Command::Status { reply } => {
            let _ = reply.send((engine.state(), engine.keepalive_status()));
        }
    }
}
