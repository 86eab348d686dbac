//! SMPP v3.4 ESME client.
//!
//! The crate is split into a sans-IO protocol core and a tokio driver:
//!
//! - [`codec`], [`datatypes`] and [`framer`] turn bytes into typed PDUs
//!   and back.
//! - [`engine::SmppEngine`] runs one session: bind, keep-alive,
//!   request/response correlation, long message splitting and inbound
//!   `deliver_sm` handling. It writes through a [`engine::Transport`] and
//!   asks a [`engine::Scheduler`] for timers, so it can be driven by a test
//!   clock as easily as by tokio.
//! - [`client::SmppClient`] owns a TCP connection and drives the engine.
//!
//! # Examples
//!
//! ```rust,no_run
//! use smpp_esme::{BindCredentials, EngineConfig, NoopHandler, SharedSequence, SmppClient, SmsMessage};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::builder(BindCredentials::transceiver("system_id", "password"))
//!         .enquire_link_interval(Duration::from_secs(30))
//!         .send_long_messages(true)
//!         .build()?;
//!
//!     let client = SmppClient::connect(
//!         "localhost:2775",
//!         config,
//!         NoopHandler,
//!         Arc::new(SharedSequence::new()),
//!     )
//!     .await?;
//!
//!     let sms = SmsMessage::builder()
//!         .to("1234567890")
//!         .from("0987654321")
//!         .text("Hello, World!")
//!         .with_delivery_receipt()
//!         .build()?;
//!     let message_ids = client.send_sms(&sms).await?;
//!     println!("Message sent with ID: {:?}", message_ids);
//!
//!     client.unbind().await?;
//!     Ok(())
//! }
//! ```

mod macros;

pub mod client;
pub mod codec;
pub mod config;
pub mod datatypes;
pub mod engine;
pub mod error;
pub mod framer;
pub mod sequence;
pub mod types;

#[cfg(test)]
mod tests;

pub use codec::{CodecError, Decodable, Encodable, Pdu, PduHeader, PduRegistry};
pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use engine::{EsmeHandler, LongMessageStrategy, NoopHandler, SessionState, SmppEngine};
pub use error::{BindError, SmppError, SmppResult};
pub use framer::StreamFramer;
pub use sequence::{SequenceAllocator, SharedSequence};
pub use types::{BindCredentials, SmsMessage, SmsOptions};

pub use client::SmppClient;
