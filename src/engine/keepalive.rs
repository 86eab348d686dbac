// ABOUTME: Keep-alive supervision for bound SMPP sessions using enquire_link
// ABOUTME: A ping still unanswered when the next tick fires marks the connection dead

use super::timer::TimerId;
use std::time::Duration;
use tracing::{debug, warn};

/// Keep-alive status information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeepAliveStatus {
    /// Whether the monitor is running (session bound)
    pub running: bool,
    /// Sequence number of the enquire_link awaiting its response
    pub outstanding: Option<u32>,
    /// Total enquire_link PDUs sent
    pub total_pings: u32,
    /// Total enquire_link_resp PDUs received
    pub total_pongs: u32,
}

/// Decision taken on a keep-alive tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveTick {
    /// Send a new enquire_link and schedule the next tick
    Ping,
    /// The previous enquire_link went unanswered for a whole interval
    Expired { sequence_number: u32 },
    /// Not running, nothing to do
    Idle,
}

/// Drives periodic enquire_link PDUs while the session is bound.
///
/// The monitor owns the decisions; the engine owns the I/O. On every tick
/// the engine asks [`KeepAliveMonitor::on_tick`] what to do, sends the PDU
/// itself and reports the sequence number and next timer back with
/// [`KeepAliveMonitor::ping_sent`].
///
/// # Example
///
/// ```rust
/// use smpp_esme::engine::{KeepAliveMonitor, KeepAliveTick};
/// use std::time::Duration;
///
/// let mut monitor = KeepAliveMonitor::new(Duration::from_secs(30));
/// monitor.start();
/// assert_eq!(monitor.on_tick(), KeepAliveTick::Ping);
/// monitor.ping_sent(2, None);
///
/// // No response before the next tick
/// assert_eq!(
///     monitor.on_tick(),
///     KeepAliveTick::Expired { sequence_number: 2 }
/// );
/// ```
#[derive(Debug)]
pub struct KeepAliveMonitor {
    interval: Duration,
    running: bool,
    outstanding: Option<u32>,
    timer: Option<TimerId>,
    total_pings: u32,
    total_pongs: u32,
}

impl KeepAliveMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: false,
            outstanding: None,
            timer: None,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self) {
        debug!(interval = ?self.interval, "starting keep-alive");
        self.running = true;
        self.outstanding = None;
    }

    /// Stop the monitor, handing back the pending tick timer for cancellation
    pub fn stop(&mut self) -> Option<TimerId> {
        if self.running {
            debug!(
                pings = self.total_pings,
                pongs = self.total_pongs,
                "stopping keep-alive"
            );
        }
        self.running = false;
        self.outstanding = None;
        self.timer.take()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The timer the next tick is scheduled on
    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    pub fn outstanding(&self) -> Option<u32> {
        self.outstanding
    }

    pub fn on_tick(&mut self) -> KeepAliveTick {
        self.timer = None;
        if !self.running {
            return KeepAliveTick::Idle;
        }
        match self.outstanding {
            Some(sequence_number) => {
                warn!(sequence_number, "enquire_link unanswered, connection presumed dead");
                KeepAliveTick::Expired { sequence_number }
            }
            None => KeepAliveTick::Ping,
        }
    }

    pub fn ping_sent(&mut self, sequence_number: u32, next_tick: Option<TimerId>) {
        self.outstanding = Some(sequence_number);
        self.timer = next_tick;
        self.total_pings += 1;
        debug!(sequence_number, "enquire_link sent");
    }

    /// Record an enquire_link_resp. Any response clears the missed state;
    /// returns whether it answered the most recent ping.
    pub fn pong(&mut self, sequence_number: u32) -> bool {
        self.total_pongs += 1;
        let matched = self.outstanding == Some(sequence_number);
        if !matched {
            debug!(
                sequence_number,
                outstanding = ?self.outstanding,
                "enquire_link_resp for an older ping"
            );
        }
        self.outstanding = None;
        matched
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.running,
            outstanding: self.outstanding,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
        }
    }
}
