// ABOUTME: Long-running SMPP client demo that binds, keeps the link alive and logs deliveries
// ABOUTME: Optionally submits a message on an interval until the run duration elapses

//! # Long-Running SMPP Client
//!
//! Binds as a transceiver and stays connected, relying on the engine's
//! enquire_link keep-alive to detect a dead link. Inbound deliver_sm PDUs,
//! delivery receipts included, are logged as they arrive.
//!
//! ## Usage
//!
//! ```bash
//! # Keep-alive only
//! cargo run --example long_running_client -- --system-id test --password secret
//!
//! # With periodic SMS sending, split with UDH when long
//! cargo run --example long_running_client -- \
//!   --system-id test --password secret \
//!   --to 123456789 --from 987654321 \
//!   --sms-interval 120 --multipart-udh
//! ```

use argh::FromArgs;
use smpp_esme::datatypes::{CommandStatus, DeliverSm};
use smpp_esme::{BindCredentials, EngineConfig, EsmeHandler, SharedSequence, SmppClient, SmsMessage};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Long-running SMPP client with keep-alive
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname or IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u32>,

    /// enquire_link interval in seconds (default: 55)
    #[argh(option)]
    enquire_link_interval: Option<u64>,

    /// how long to run the client in seconds (default: 300)
    #[argh(option)]
    run_duration: Option<u64>,

    /// interval between SMS sends in seconds (default: 60)
    #[argh(option)]
    sms_interval: Option<u64>,

    /// split long messages with a UDH concatenation header
    #[argh(switch)]
    multipart_udh: bool,

    /// the recipient telephone number (no SMS sent if not provided)
    #[argh(option, short = 't')]
    to: Option<String>,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: Option<String>,
}

struct LoggingHandler;

impl EsmeHandler for LoggingHandler {
    fn on_submit_response(&mut self, sequence_number: u32, message_id: &str, status: CommandStatus) {
        info!(sequence_number, message_id, ?status, "submit_sm_resp");
    }

    fn on_deliver(&mut self, sequence_number: u32, pdu: &DeliverSm) -> CommandStatus {
        if pdu.is_delivery_receipt() {
            info!(
                sequence_number,
                receipted_message_id = ?pdu.receipted_message_id(),
                "delivery receipt"
            );
        } else {
            info!(
                sequence_number,
                from = %pdu.source_addr,
                text = %String::from_utf8_lossy(pdu.content()),
                "message received"
            );
        }
        CommandStatus::Ok
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let run_duration = Duration::from_secs(cli_args.run_duration.unwrap_or(300));
    let sms_interval = Duration::from_secs(cli_args.sms_interval.unwrap_or(60));

    let credentials = BindCredentials::transceiver(
        cli_args.system_id.unwrap_or_default(),
        cli_args.password.unwrap_or_default(),
    );
    let mut config = EngineConfig::builder(credentials).send_multipart_udh(cli_args.multipart_udh);
    if let Some(secs) = cli_args.enquire_link_interval {
        config = config.enquire_link_interval(Duration::from_secs(secs));
    }
    let config = config.build()?;

    info!("Connecting to {host}:{port}");
    let client = SmppClient::connect(
        format!("{host}:{port}"),
        config,
        LoggingHandler,
        Arc::new(SharedSequence::new()),
    )
    .await
    .map_err(|e| {
        error!("Connect failed: {e}");
        e
    })?;
    info!("Bound as {}", client.state().await);

    let message = match (cli_args.to, cli_args.from) {
        (Some(to), Some(from)) => Some(SmsMessage::new(
            to,
            from,
            "Periodic message from the long-running client",
        )),
        _ => None,
    };

    let mut ticker = interval(sms_interval);
    let deadline = sleep(run_duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Run duration elapsed");
                break;
            }
            _ = client.closed() => {
                warn!("Session ended unexpectedly");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Some(message) = &message {
                    match client.send_sms(message).await {
                        Ok(ids) => info!("Message accepted as {:?}", ids),
                        Err(e) => warn!("Send failed: {e}"),
                    }
                }
                if let Ok(status) = client.keepalive_status().await {
                    info!(
                        pings = status.total_pings,
                        pongs = status.total_pongs,
                        "keep-alive"
                    );
                }
            }
        }
    }

    client.unbind().await?;
    info!("Unbound cleanly");
    Ok(())
}
