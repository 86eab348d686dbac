// ABOUTME: Engine configuration with a fluent builder and construction-time validation
// ABOUTME: Rejects conflicting long message strategies and out of range timers

use crate::codec::MAX_PDU_SIZE;
use crate::engine::LongMessageStrategy;
use crate::macros::builder_setters;
use crate::types::BindCredentials;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ENQUIRE_LINK_INTERVAL: Duration = Duration::from_secs(55);

/// Errors raised while building an [`EngineConfig`]. Never raised at runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// More than one long message strategy was enabled. Names are listed in
    /// declaration order.
    #[error("The following parameters are mutually exclusive: {}", .0.join(", "))]
    MutuallyExclusive(Vec<&'static str>),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Validated engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub credentials: BindCredentials,
    /// How long to wait for a bind response before disconnecting
    pub bind_timeout: Duration,
    /// Keepalive tick; an enquire_link unanswered by the next tick is fatal
    pub enquire_link_interval: Duration,
    /// Fail individual requests that stay unanswered this long
    pub response_timeout: Option<Duration>,
    /// How to submit messages too long for a single short_message field
    pub long_message_strategy: Option<LongMessageStrategy>,
    /// Largest inbound PDU accepted by the framer
    pub max_pdu_size: u32,
}

impl EngineConfig {
    pub fn builder(credentials: BindCredentials) -> EngineConfigBuilder {
        EngineConfigBuilder::new(credentials)
    }
}

/// Fluent builder for [`EngineConfig`]
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    credentials: BindCredentials,
    bind_timeout: Duration,
    enquire_link_interval: Duration,
    response_timeout: Option<Duration>,
    send_long_messages: bool,
    send_multipart_sar: bool,
    send_multipart_udh: bool,
    max_pdu_size: u32,
}

impl EngineConfigBuilder {
    pub fn new(credentials: BindCredentials) -> Self {
        Self {
            credentials,
            bind_timeout: DEFAULT_BIND_TIMEOUT,
            enquire_link_interval: DEFAULT_ENQUIRE_LINK_INTERVAL,
            response_timeout: None,
            send_long_messages: false,
            send_multipart_sar: false,
            send_multipart_udh: false,
            max_pdu_size: MAX_PDU_SIZE,
        }
    }

    builder_setters! {
        bind_timeout: Duration,
        enquire_link_interval: Duration,
        response_timeout: Option<Duration>,
        send_long_messages: bool,
        send_multipart_sar: bool,
        send_multipart_udh: bool,
        max_pdu_size: u32,
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let enabled: Vec<&'static str> = [
            ("send_long_messages", self.send_long_messages),
            ("send_multipart_sar", self.send_multipart_sar),
            ("send_multipart_udh", self.send_multipart_udh),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect();

        if enabled.len() > 1 {
            return Err(ConfigError::MutuallyExclusive(enabled));
        }

        let long_message_strategy = if self.send_long_messages {
            Some(LongMessageStrategy::MessagePayload)
        } else if self.send_multipart_sar {
            Some(LongMessageStrategy::MultipartSar)
        } else if self.send_multipart_udh {
            Some(LongMessageStrategy::MultipartUdh)
        } else {
            None
        };

        check_nonzero("bind_timeout", self.bind_timeout)?;
        check_nonzero("enquire_link_interval", self.enquire_link_interval)?;
        if let Some(timeout) = self.response_timeout {
            check_nonzero("response_timeout", timeout)?;
        }
        if !(16..=MAX_PDU_SIZE).contains(&self.max_pdu_size) {
            return Err(ConfigError::InvalidField {
                field: "max_pdu_size",
                reason: format!("must be between 16 and {}", MAX_PDU_SIZE),
            });
        }

        Ok(EngineConfig {
            credentials: self.credentials,
            bind_timeout: self.bind_timeout,
            enquire_link_interval: self.enquire_link_interval,
            response_timeout: self.response_timeout,
            long_message_strategy,
            max_pdu_size: self.max_pdu_size,
        })
    }
}

fn check_nonzero(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidField {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
