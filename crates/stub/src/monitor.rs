//! Host-side monitoring of a plugin
//!
//! A [`StubMonitor`] compares successive snapshots of a plugin's readers and
//! reports what changed, either on demand through [`StubMonitor::poll`] or
//! from a background thread ticking every monitoring cycle of the plugin.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use cardstub_core::{ChannelReaderSpi, Error, PluginSpi, ReaderSpi, Result};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::event::{
    CardEvent, CardEventHandler, CardEventSender, ReaderEvent, ReaderEventHandler,
    ReaderEventSender,
};

/// Last seen state of every reader: power-on data of the inserted card, if any
type Snapshot = BTreeMap<String, Option<String>>;

/// Monitor for reader and card events of a plugin
#[derive(Debug)]
pub struct StubMonitor<P> {
    /// Plugin being observed
    plugin: Arc<P>,
    /// Whether the background thread is running
    running: Arc<AtomicBool>,
    /// Previously seen readers and cards (to avoid duplicates)
    previous_states: Arc<Mutex<Snapshot>>,
}

impl<P> StubMonitor<P>
where
    P: PluginSpi + 'static,
{
    /// Create a monitor; nothing is reported until the first poll
    pub fn new(plugin: Arc<P>) -> Self {
        Self {
            plugin,
            running: Arc::new(AtomicBool::new(false)),
            previous_states: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Whether the background thread is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one monitoring cycle synchronously
    pub fn poll(&self) -> (Vec<ReaderEvent>, Vec<CardEvent>) {
        let mut states = self.previous_states.lock();
        check_changes(self.plugin.as_ref(), &mut states)
    }

    /// Start monitoring on a background thread
    ///
    /// Each cycle reports reader events before card events, then sleeps for
    /// the plugin monitoring cycle (at least one millisecond).
    ///
    /// # Errors
    /// Returns an error if the monitor is already running.
    pub fn start<R, C>(&self, mut reader_handler: R, mut card_handler: C) -> Result<()>
    where
        R: ReaderEventHandler + Send + 'static,
        C: CardEventHandler + Send + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::message("Monitor is already running"));
        }

        let plugin = Arc::clone(&self.plugin);
        let running = Arc::clone(&self.running);
        let previous_states = Arc::clone(&self.previous_states);
        let cycle = Duration::from_millis(plugin.monitoring_cycle_duration().max(1));

        debug!(plugin = plugin.name(), ?cycle, "Starting monitor");
        thread::spawn(move || {
            while running.load(Ordering::Acquire) {
                let (reader_events, card_events) = {
                    let mut states = previous_states.lock();
                    check_changes(plugin.as_ref(), &mut states)
                };

                for event in reader_events {
                    reader_handler.handle_event(event);
                }
                for event in card_events {
                    card_handler.handle_event(event);
                }

                thread::sleep(cycle);
            }
            debug!(plugin = plugin.name(), "Monitor stopped");
        });

        Ok(())
    }

    /// Start monitoring, sending events to channels
    ///
    /// # Errors
    /// Returns an error if the monitor is already running.
    pub fn start_channel(
        &self,
        reader_sender: ReaderEventSender,
        card_sender: CardEventSender,
    ) -> Result<()> {
        self.start(
            move |event: ReaderEvent| {
                let _ = reader_sender.send(event);
            },
            move |event: CardEvent| {
                let _ = card_sender.send(event);
            },
        )
    }

    /// Stop monitoring; the thread exits at the end of its current cycle
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl<P> Drop for StubMonitor<P> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Diff one snapshot of the plugin readers against the previous one
///
/// The reader list is taken once so that reader and card events of a cycle
/// describe the same set of readers.
fn check_changes<P: PluginSpi>(
    plugin: &P,
    states: &mut Snapshot,
) -> (Vec<ReaderEvent>, Vec<CardEvent>) {
    let readers = plugin.search_available_readers();
    let current_names: Vec<String> = readers
        .iter()
        .map(|reader| reader.name().to_string())
        .collect();

    (
        check_reader_changes(&current_names, states),
        check_card_changes(&readers, states),
    )
}

fn check_reader_changes(current_names: &[String], states: &mut Snapshot) -> Vec<ReaderEvent> {
    let mut events = Vec::new();

    // Find new readers
    for name in current_names {
        if !states.contains_key(name) {
            events.push(ReaderEvent::Added(name.clone()));
            states.insert(name.clone(), None);
        }
    }

    // Find removed readers
    let removed: Vec<String> = states
        .keys()
        .filter(|&name| !current_names.contains(name))
        .cloned()
        .collect();
    for name in removed {
        states.remove(&name);
        events.push(ReaderEvent::Removed(name));
    }

    events
}

fn check_card_changes<R: ChannelReaderSpi>(
    readers: &[Arc<R>],
    states: &mut Snapshot,
) -> Vec<CardEvent> {
    let mut events = Vec::new();

    for reader in readers {
        let name = reader.name().to_string();
        let current = if reader.check_card_presence() {
            reader.power_on_data().ok()
        } else {
            None
        };
        let previous = states.get(&name).cloned().flatten();

        match (&previous, &current) {
            // Card inserted, or a different card swapped in
            (_, Some(power_on_data)) if previous.as_ref() != Some(power_on_data) => {
                trace!(reader = %name, power_on_data = %power_on_data, "Card inserted");
                events.push(CardEvent::Inserted {
                    reader: name.clone(),
                    power_on_data: power_on_data.clone(),
                });
            }
            (Some(_), None) => {
                trace!(reader = %name, "Card removed");
                events.push(CardEvent::Removed {
                    reader: name.clone(),
                });
            }
            _ => {}
        }

        states.insert(name, current);
    }

    events
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crossbeam_channel::RecvTimeoutError;

    use super::*;
    use crate::card::StubSmartCard;
    use crate::event::{card_event_channel, reader_event_channel};
    use crate::plugin::StubPlugin;
    use crate::reader::StubReader;

    /// Plugs a reader right after the first lookup of the reader list returns
    #[derive(Debug)]
    struct PlugDuringLookup {
        inner: StubPlugin,
        plugged: AtomicBool,
    }

    impl PlugDuringLookup {
        fn plug_once(&self) {
            if !self.plugged.swap(true, Ordering::SeqCst) {
                self.inner.plug_reader("late", false, Some(card(&[0x3B, 0x07])));
            }
        }
    }

    impl PluginSpi for PlugDuringLookup {
        type Reader = StubReader;

        fn name(&self) -> &str {
            self.inner.name()
        }

        fn monitoring_cycle_duration(&self) -> u64 {
            0
        }

        fn search_available_reader_names(&self) -> Vec<String> {
            let names = self.inner.search_available_reader_names();
            self.plug_once();
            names
        }

        fn search_available_readers(&self) -> Vec<Arc<StubReader>> {
            let readers = self.inner.search_available_readers();
            self.plug_once();
            readers
        }

        fn search_reader(&self, name: &str) -> Option<Arc<StubReader>> {
            self.inner.search_reader(name)
        }
    }

    fn card(power_on_data: &[u8]) -> Arc<StubSmartCard> {
        StubSmartCard::builder()
            .with_power_on_data(power_on_data)
            .with_protocol("ISO_14443_4")
            .build()
            .unwrap()
    }

    #[test]
    fn test_poll_reports_changes_once() {
        let plugin = Arc::new(StubPlugin::new("StubPlugin", &[], 0));
        let monitor = StubMonitor::new(Arc::clone(&plugin));
        assert_eq!(monitor.poll(), (vec![], vec![]));

        let reader = plugin.plug_reader("reader1", true, Some(card(&[0x3B, 0x01])));
        let (readers, cards) = monitor.poll();
        assert_eq!(readers, vec![ReaderEvent::Added("reader1".to_string())]);
        assert_eq!(
            cards,
            vec![CardEvent::Inserted {
                reader: "reader1".to_string(),
                power_on_data: "3B01".to_string(),
            }]
        );
        assert_eq!(monitor.poll(), (vec![], vec![]));

        reader.remove_card();
        assert_eq!(
            monitor.poll().1,
            vec![CardEvent::Removed {
                reader: "reader1".to_string()
            }]
        );

        plugin.unplug_reader("reader1");
        assert_eq!(
            monitor.poll().0,
            vec![ReaderEvent::Removed("reader1".to_string())]
        );
    }

    #[test]
    fn test_reader_plugged_during_a_cycle_is_reported() {
        let plugin = Arc::new(PlugDuringLookup {
            inner: StubPlugin::new("StubPlugin", &[], 0),
            plugged: AtomicBool::new(false),
        });
        let monitor = StubMonitor::new(Arc::clone(&plugin));

        let mut reader_events = Vec::new();
        let mut card_events = Vec::new();
        for _ in 0..3 {
            let (readers, cards) = monitor.poll();
            reader_events.extend(readers);
            card_events.extend(cards);
        }

        assert_eq!(reader_events, vec![ReaderEvent::Added("late".to_string())]);
        assert_eq!(
            card_events,
            vec![CardEvent::Inserted {
                reader: "late".to_string(),
                power_on_data: "3B07".to_string(),
            }]
        );
    }

    #[test]
    fn test_poll_reports_swapped_card() {
        let plugin = Arc::new(StubPlugin::new("StubPlugin", &[], 0));
        let monitor = StubMonitor::new(Arc::clone(&plugin));

        plugin.plug_reader("reader1", false, Some(card(&[0x3B, 0x01])));
        monitor.poll();

        // Replugging with another card under the same name
        plugin.plug_reader("reader1", false, Some(card(&[0x3B, 0x02])));
        let (readers, cards) = monitor.poll();
        assert!(readers.is_empty());
        assert_eq!(cards.len(), 1);
        assert!(matches!(
            &cards[0],
            CardEvent::Inserted { power_on_data, .. } if power_on_data == "3B02"
        ));
    }

    #[test]
    fn test_background_monitor_sends_events() {
        let plugin = Arc::new(StubPlugin::new("StubPlugin", &[], 1));
        let monitor = StubMonitor::new(Arc::clone(&plugin));
        let (reader_tx, reader_rx) = reader_event_channel();
        let (card_tx, card_rx) = card_event_channel();

        monitor.start_channel(reader_tx.clone(), card_tx.clone()).unwrap();
        assert!(monitor.is_running());
        assert!(monitor.start_channel(reader_tx, card_tx).is_err());

        plugin.plug_reader("reader1", false, Some(card(&[0x3B])));

        let timeout = Duration::from_secs(5);
        assert_eq!(
            reader_rx.recv_timeout(timeout).unwrap(),
            ReaderEvent::Added("reader1".to_string())
        );
        assert_eq!(card_rx.recv_timeout(timeout).unwrap().reader(), "reader1");

        monitor.stop();
        assert!(!monitor.is_running());

        // The thread drops its senders once it has exited
        let deadline = Instant::now() + timeout;
        loop {
            match reader_rx.recv_timeout(Duration::from_millis(10)) {
                Err(RecvTimeoutError::Disconnected) => break,
                _ => assert!(Instant::now() < deadline),
            }
        }
    }
}
