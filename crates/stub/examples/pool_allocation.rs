//! Example showing readers allocated from a pool by group reference

use std::sync::Arc;

use cardstub::{StubPoolPluginFactoryBuilder, StubSmartCard};
use cardstub_core::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cardstub=debug")),
        )
        .init();

    let sam = StubSmartCard::builder()
        .with_power_on_data(hex::decode("3B3F9600805A4880C1205017AEC11A3E829000")?)
        .with_protocol("ISO_7816_3")
        .with_apdu_response_provider(|request: &str| {
            // Any GET CHALLENGE returns eight bytes of zeros
            if request.starts_with("0084") {
                "00000000000000009000".to_string()
            } else {
                "6D00".to_string()
            }
        })
        .build()?;

    let pool = StubPoolPluginFactoryBuilder::builder()
        .with_stub_reader("SAM_A", "sam-reader-1", Some(Arc::clone(&sam)))
        .with_stub_reader("SAM_A", "sam-reader-2", Some(sam))
        .with_stub_reader("SAM_B", "sam-reader-3", None)
        .build()
        .pool_plugin();

    println!("Groups: {:?}", pool.reader_group_references());

    let first = pool.allocate_reader("SAM_A")?;
    let second = pool.allocate_reader("SAM_A")?;
    println!("Allocated {} and {}", first.name(), second.name());

    match pool.allocate_reader("SAM_A") {
        Ok(reader) => println!("Unexpected allocation of {}", reader.name()),
        Err(e) => println!("Third allocation failed: {e}"),
    }

    let challenge = first.transmit_apdu(&[0x00, 0x84, 0x00, 0x00, 0x08])?;
    println!("Challenge: {}", hex::encode_upper(&challenge));

    pool.release_reader(Some(&*first))?;
    println!("Released {}", first.name());
    println!("Allocated again: {}", pool.allocate_reader("SAM_A")?.name());

    pool.unplug_pool_readers("SAM_A");
    println!("Remaining readers: {:?}", pool.search_available_reader_names());
    Ok(())
}
