// ABOUTME: Tokio network driver that runs the protocol engine over a TCP connection
// ABOUTME: Exposes an async SMPP client handle for submitting, querying and unbinding

//! SMPP Client Module
//!
//! [`SmppClient`] connects to an SMSC, binds, and then keeps the session
//! alive in a background task. Socket input, timer expiries and API calls
//! all flow through one event queue consumed by the single task that owns
//! the [`SmppEngine`](crate::engine::SmppEngine), so session state is never
//! touched concurrently.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_esme::{BindCredentials, EngineConfig, NoopHandler, SharedSequence, SmsMessage};
//! use smpp_esme::client::SmppClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::builder(BindCredentials::transmitter("system_id", "password"))
//!     .send_multipart_udh(true)
//!     .build()?;
//!
//! let client = SmppClient::connect(
//!     "localhost:2775",
//!     config,
//!     NoopHandler,
//!     Arc::new(SharedSequence::new()),
//! )
//! .await?;
//!
//! let message = SmsMessage::new("123456789", "987654321", "Hello!");
//! let message_ids = client.send_sms(&message).await?;
//! println!("submitted as {:?}", message_ids);
//!
//! client.unbind().await?;
//! # Ok(())
//! # }
//! ```

mod io;
mod smpp_client;

pub use smpp_client::SmppClient;
