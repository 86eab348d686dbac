// ABOUTME: One-shot demo that binds as a transmitter, submits a message and queries its state
// ABOUTME: Exercises the long message strategies from the command line

use argh::FromArgs;
use smpp_esme::{BindCredentials, EngineConfig, NoopHandler, SharedSequence, SmppClient, SmsMessage};
use std::error::Error;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Send a single SMS through an SMSC
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: String,

    /// the password
    #[argh(option)]
    password: String,

    /// SMSC address (default: localhost:2775)
    #[argh(option)]
    addr: Option<String>,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the sender address
    #[argh(option, short = 'f')]
    from: String,

    /// long message strategy: payload, udh or sar
    #[argh(option)]
    long: Option<String>,

    /// query the message state after submitting
    #[argh(switch, short = 'q')]
    query: bool,

    /// the message text
    #[argh(positional)]
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let long = args.long.as_deref();
    let config = EngineConfig::builder(BindCredentials::transmitter(args.system_id, args.password))
        .send_long_messages(long == Some("payload"))
        .send_multipart_udh(long == Some("udh"))
        .send_multipart_sar(long == Some("sar"))
        .build()?;

    let addr = args.addr.unwrap_or_else(|| "localhost:2775".to_owned());
    let client = SmppClient::connect(addr, config, NoopHandler, Arc::new(SharedSequence::new())).await?;

    let message = SmsMessage::builder()
        .to(args.to)
        .from(args.from.clone())
        .text(args.message)
        .with_delivery_receipt()
        .build()?;
    let message_ids = client.send_sms(&message).await?;
    info!("Submitted as {:?}", message_ids);

    if args.query {
        for message_id in &message_ids {
            let status = client.query_sm(message_id, &args.from).await?;
            info!(
                message_id = %status.message_id,
                state = ?status.state(),
                final_date = %status.final_date,
                "query_sm"
            );
        }
    }

    client.unbind().await?;
    Ok(())
}
