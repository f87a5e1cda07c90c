//! Example showing reader and card events reported by a monitor

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use cardstub::event::{card_event_channel, reader_event_channel};
use cardstub::{StubMonitor, StubPlugin, StubSmartCard};
use cardstub_core::{ConfigurableReaderSpi, PluginSpi};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let plugin = Arc::new(StubPlugin::new("StubPlugin", &[], 50));
    let monitor = StubMonitor::new(Arc::clone(&plugin));

    let (reader_tx, reader_rx) = reader_event_channel();
    let (card_tx, card_rx) = card_event_channel();
    monitor.start_channel(reader_tx, card_tx)?;

    let card = StubSmartCard::builder()
        .with_power_on_data([0x3B, 0x02, 0x14, 0x50])
        .with_protocol("ISO_7816_3")
        .build()?;

    let reader = plugin.plug_reader("Stub Reader 0", false, None);
    plugin.plug_reader("Stub Reader 1", true, None);
    sleep(Duration::from_millis(200));

    reader.activate_protocol("ISO_7816_3");
    reader.insert_card(Some(card))?;
    sleep(Duration::from_millis(200));

    reader.remove_card();
    plugin.unplug_reader("Stub Reader 1");
    sleep(Duration::from_millis(200));
    monitor.stop();

    println!("Reader events:");
    for event in reader_rx.try_iter() {
        println!("  {event}");
    }
    println!("Card events:");
    for event in card_rx.try_iter() {
        println!("  {event}");
    }

    println!("Readers still plugged: {:?}", plugin.search_available_reader_names());
    Ok(())
}
