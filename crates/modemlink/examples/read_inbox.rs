//! Read and print all stored messages.
//!
//! Lists every message in the selected storage, with concatenated
//! multi-part messages reassembled into whole texts. Pass `--delete` to
//! remove each message after printing it.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p modemlink --example read_inbox -- /dev/ttyUSB2
//! cargo run -p modemlink --example read_inbox -- /dev/ttyUSB2 --delete
//! ```

use modemlink::{MessageStatus, ModemBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB2".to_owned());
    let delete = args.next().as_deref() == Some("--delete");

    println!("Connecting to modem on {port}...");
    let modem = ModemBuilder::new().serial_port(&port).connect().await?;

    let messages = modem.list_messages(MessageStatus::All).await?;
    if messages.is_empty() {
        println!("No stored messages.");
    }

    for message in &messages {
        let when = message
            .timestamp
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "-".to_owned());
        println!(
            "[{}] {} ({} segment{}):",
            when,
            message.sender,
            message.segments.len(),
            if message.segments.len() == 1 { "" } else { "s" },
        );
        println!("  {}\n", message.text);

        if delete {
            modem.delete(message).await?;
        }
    }

    modem.disconnect().await?;
    Ok(())
}
