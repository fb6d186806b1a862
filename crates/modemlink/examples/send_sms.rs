//! Send an SMS from the command line.
//!
//! Connects to a modem, runs the boot sequence, and sends one message.
//! Long texts are split into concatenated segments automatically, and text
//! outside the GSM 7-bit alphabet is widened to UCS-2.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p modemlink --example send_sms -- /dev/ttyUSB2 +31628870634 "hello there"
//! ```

use modemlink::ModemBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB2".to_owned());
    let destination = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: send_sms <port> <destination> <text>"))?;
    let text = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: send_sms <port> <destination> <text>"))?;

    println!("Connecting to modem on {port}...");
    let modem = ModemBuilder::new().serial_port(&port).connect().await?;

    println!(
        "Connected: {} (IMEI {})",
        modem.model().await.unwrap_or_else(|| "unknown".into()),
        modem.serial_number().await.unwrap_or_else(|| "unknown".into()),
    );

    let confirmations = modem.send_message(&destination, &text).await?;
    println!(
        "Message sent to {destination} in {} segment{}.",
        confirmations.len(),
        if confirmations.len() == 1 { "" } else { "s" },
    );

    modem.disconnect().await?;
    Ok(())
}
