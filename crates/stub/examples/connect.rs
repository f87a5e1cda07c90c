//! Example showing a simulated card answering commands through a reader

use cardstub::{StubPluginFactoryBuilder, StubSmartCard};
use cardstub_core::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cardstub=trace")),
        )
        .init();

    // A contactless card answering a few payment commands
    let card = StubSmartCard::builder()
        .with_power_on_data(hex::decode("3B8880010000000000718100F9")?)
        .with_protocol("ISO_14443_4")
        .with_simulated_command(
            "00A404000E325041592E5359532E4444463031(00)?",
            "6F10840E325041592E5359532E44444630319000",
        )
        .with_simulated_command("80A80000.*", "7704820219809000")
        .with_simulated_command("80CA9F17.*", "9F170103 9000")
        .build()?;

    let plugin = StubPluginFactoryBuilder::builder()
        .with_stub_reader("Stub Reader 0", true, Some(card))
        .build()
        .plugin();

    let Some(reader) = plugin.search_reader("Stub Reader 0") else {
        println!("No reader found!");
        return Ok(());
    };

    println!("Using reader: {}", reader.name());
    println!("Card power-on data: {}", reader.power_on_data()?);
    reader.open_physical_channel();

    let commands = [
        ("SELECT PPSE", "00A404000E325041592E5359532E444446303100"),
        ("GPO", "80A8000002830000"),
        ("GET DATA - PIN try counter", "80CA9F1700"),
        ("READ RECORD", "00B2010C00"),
    ];

    for (name, command) in commands {
        println!("\nSending {name}: {command}");
        match reader.transmit_apdu(&hex::decode(command)?) {
            Ok(response) => println!("Response: {}", hex::encode_upper(&response)),
            Err(e) => println!("Error: {e}"),
        }
    }

    reader.close_physical_channel();
    Ok(())
}
