// ABOUTME: Tokio plumbing between a TCP socket and the engine's single event queue
// ABOUTME: Reader and writer tasks, a channel-backed Transport and a tokio-timer Scheduler

use crate::engine::{KeepAliveStatus, PendingResponse, Scheduler, SessionState, TimerId, TimerKind, Transport};
use crate::error::{SmppError, SmppResult};
use crate::types::SmsMessage;
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Everything the engine task reacts to, in arrival order
#[derive(Debug)]
pub(crate) enum Event {
    Data(Bytes),
    Closed,
    Timer(TimerId, TimerKind),
    Command(Command),
}

/// API calls forwarded from [`super::SmppClient`]
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        message: SmsMessage,
        reply: oneshot::Sender<SmppResult<Vec<PendingResponse>>>,
    },
    Query {
        message_id: String,
        source_addr: String,
        reply: oneshot::Sender<SmppResult<PendingResponse>>,
    },
    Unbind {
        reply: oneshot::Sender<SmppResult<PendingResponse>>,
    },
    Disconnect {
        reply: Option<oneshot::Sender<()>>,
    },
    Status {
        reply: oneshot::Sender<(SessionState, KeepAliveStatus)>,
    },
}

#[derive(Debug)]
pub(crate) enum Outbound {
    Pdu(Bytes),
    Close,
}

/// Transport that hands encoded PDUs to the writer task
#[derive(Debug)]
pub(crate) struct ChannelTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelTransport {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn write(&mut self, data: Bytes) -> SmppResult<()> {
        self.tx
            .send(Outbound::Pdu(data))
            .map_err(|_| SmppError::ConnectionClosed)
    }

    fn lose_connection(&mut self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

/// Scheduler backed by tokio timers; expiries arrive as [`Event::Timer`]
#[derive(Debug)]
pub(crate) struct TokioScheduler {
    events: mpsc::UnboundedSender<Event>,
    next_id: u64,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub(crate) fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            events,
            next_id: 0,
            timers: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&mut self, kind: TimerKind, after: Duration) -> TimerId {
        self.timers.retain(|_, handle| !handle.is_finished());

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(Event::Timer(id, kind));
        });
        self.timers.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

/// Forward socket input to the engine until EOF or error
pub(crate) async fn read_loop(mut stream: OwnedReadHalf, events: mpsc::UnboundedSender<Event>) {
    // Default to a 4KB read buffer
    let mut buffer = BytesMut::with_capacity(4 * 1024);
    loop {
        buffer.reserve(4 * 1024);
        match stream.read_buf(&mut buffer).await {
            Ok(0) => {
                debug!("connection closed by peer");
                let _ = events.send(Event::Closed);
                return;
            }
            Ok(_) => {
                if events.send(Event::Data(buffer.split().freeze())).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "read failed");
                let _ = events.send(Event::Closed);
                return;
            }
        }
    }
}

/// Write queued PDUs until told to close or the queue is dropped
pub(crate) async fn write_loop(
    stream: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut stream = BufWriter::new(stream);
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Pdu(bytes) => {
                let result = async {
                    stream.write_all(&bytes).await?;
                    stream.flush().await
                }
                .await;
                if let Err(e) = result {
                    warn!(error = %e, "write failed");
                    let _ = events.send(Event::Closed);
                    return;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = stream.shutdown().await;
}
