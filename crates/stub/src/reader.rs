//! Simulated card reader

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use cardstub_core::{
    ChannelReaderSpi, ConfigurableReaderSpi, Error, ObservableReaderSpi, ReaderSpi, Result,
};
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::card::StubSmartCard;

/// Tick of the wait-for-removal loop
const CARD_REMOVAL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mutable part of a reader
#[derive(Debug)]
struct ReaderState {
    /// Protocols a card may use to be inserted
    activated_protocols: BTreeSet<String>,
    /// Inserted card
    card: Option<Arc<StubSmartCard>>,
}

/// Simulated reader holding at most one [`StubSmartCard`]
#[derive(Debug)]
pub struct StubReader {
    /// Name of the reader
    name: String,
    /// Whether the reader is contactless
    contactless: bool,
    /// Activated protocols and inserted card
    state: Mutex<ReaderState>,
    /// Cleared to interrupt a pending wait for card removal
    continue_wait_for_card_removal: AtomicBool,
}

impl StubReader {
    /// Create a reader, optionally with a card already inserted
    ///
    /// No protocol is activated, so a card removed from the reader is only
    /// accepted again once its protocol has been activated.
    pub fn new(
        name: impl Into<String>,
        contactless: bool,
        card: Option<Arc<StubSmartCard>>,
    ) -> Self {
        Self {
            name: name.into(),
            contactless,
            state: Mutex::new(ReaderState {
                activated_protocols: BTreeSet::new(),
                card,
            }),
            continue_wait_for_card_removal: AtomicBool::new(false),
        }
    }

    /// Insert `card` into the reader
    ///
    /// The card is ignored when a card is already inserted or when its
    /// protocol is not activated.
    ///
    /// # Errors
    /// Returns an invalid argument error if no card is given.
    pub fn insert_card(&self, card: Option<Arc<StubSmartCard>>) -> Result<()> {
        let card = card.ok_or_else(|| Error::invalid_argument("smart card must not be null"))?;

        let mut state = self.state.lock();
        if state.card.is_some() {
            warn!(reader = %self.name, "Cannot insert a card, one is already inserted");
            return Ok(());
        }
        if !state.activated_protocols.contains(card.protocol()) {
            trace!(
                reader = %self.name,
                protocol = card.protocol(),
                "Cannot insert a card, its protocol is not activated"
            );
            return Ok(());
        }

        trace!(reader = %self.name, card = %card, "Inserting card");
        state.card = Some(card);
        Ok(())
    }

    /// Remove the inserted card, closing its physical channel
    pub fn remove_card(&self) {
        let mut state = self.state.lock();
        if let Some(card) = state.card.take() {
            trace!(reader = %self.name, "Removing card");
            card.close_physical_channel();
        }
    }

    /// Inserted card, if any
    pub fn smart_card(&self) -> Option<Arc<StubSmartCard>> {
        self.state.lock().card.clone()
    }

    /// Activated protocols in ascending order
    pub fn activated_protocols(&self) -> Vec<String> {
        self.state.lock().activated_protocols.iter().cloned().collect()
    }
}

impl ReaderSpi for StubReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_contactless(&self) -> bool {
        self.contactless
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ChannelReaderSpi for StubReader {
    fn open_physical_channel(&self) {
        if let Some(card) = &self.state.lock().card {
            card.open_physical_channel();
        }
    }

    fn close_physical_channel(&self) {
        if let Some(card) = &self.state.lock().card {
            card.close_physical_channel();
        }
    }

    fn is_physical_channel_open(&self) -> bool {
        self.state
            .lock()
            .card
            .as_ref()
            .is_some_and(|card| card.is_physical_channel_open())
    }

    fn check_card_presence(&self) -> bool {
        self.state.lock().card.is_some()
    }

    fn power_on_data(&self) -> Result<String> {
        self.state
            .lock()
            .card
            .as_ref()
            .map(|card| hex::encode_upper(card.power_on_data()))
            .ok_or_else(|| Error::card_io(format!("No card inserted in reader {}", self.name)))
    }

    fn do_transmit_apdu(&self, apdu: &[u8]) -> Result<Bytes> {
        let card = self
            .smart_card()
            .ok_or_else(|| Error::card_io("No card available."))?;
        card.process_apdu(apdu)
    }
}

impl ConfigurableReaderSpi for StubReader {
    fn is_protocol_supported(&self, _protocol: &str) -> bool {
        true
    }

    fn activate_protocol(&self, protocol: &str) {
        self.state
            .lock()
            .activated_protocols
            .insert(protocol.to_string());
    }

    fn deactivate_protocol(&self, protocol: &str) {
        self.state.lock().activated_protocols.remove(protocol);
    }

    fn is_current_protocol(&self, protocol: &str) -> bool {
        self.state
            .lock()
            .card
            .as_ref()
            .is_some_and(|card| !card.protocol().is_empty() && card.protocol() == protocol)
    }
}

impl ObservableReaderSpi for StubReader {
    fn on_start_detection(&self) {
        trace!(reader = %self.name, "Detection started");
    }

    fn on_stop_detection(&self) {
        trace!(reader = %self.name, "Detection stopped");
    }

    fn card_insertion_monitoring_sleep_duration(&self) -> u64 {
        0
    }

    fn card_removal_monitoring_sleep_duration(&self) -> u64 {
        0
    }

    fn wait_for_card_removal_during_processing(&self) -> Result<()> {
        self.continue_wait_for_card_removal
            .store(true, Ordering::Release);

        while self.check_card_presence()
            && self.continue_wait_for_card_removal.load(Ordering::Acquire)
        {
            thread::sleep(CARD_REMOVAL_POLL_INTERVAL);
        }

        if self.continue_wait_for_card_removal.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::task_cancelled(format!(
                "Wait for card removal on reader {} was cancelled",
                self.name
            )))
        }
    }

    fn stop_wait_for_card_removal_during_processing(&self) {
        self.continue_wait_for_card_removal
            .store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTOCOL: &str = "ISO_14443_4";

    fn card() -> Arc<StubSmartCard> {
        StubSmartCard::builder()
            .with_power_on_data([0x3B, 0x88])
            .with_protocol(PROTOCOL)
            .with_simulated_command("00A4.*", "9000")
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_reader_with_card_activates_nothing() {
        let reader = StubReader::new("reader", true, Some(card()));
        assert!(reader.check_card_presence());
        assert!(reader.is_current_protocol(PROTOCOL));
        assert!(reader.activated_protocols().is_empty());
        assert_eq!(reader.name(), "reader");
        assert!(reader.is_contactless());
    }

    #[test]
    fn test_reinserting_initial_card_needs_activated_protocol() {
        let card = card();
        let reader = StubReader::new("reader", false, Some(Arc::clone(&card)));

        reader.remove_card();
        reader.insert_card(Some(Arc::clone(&card))).unwrap();
        assert!(!reader.check_card_presence());

        reader.activate_protocol(PROTOCOL);
        reader.insert_card(Some(card)).unwrap();
        assert!(reader.check_card_presence());
    }

    #[test]
    fn test_insert_card_needs_a_card() {
        let reader = StubReader::new("reader", false, None);
        let error = reader.insert_card(None).unwrap_err();
        assert!(error.is_invalid_argument());
    }

    #[test]
    fn test_insert_card_needs_activated_protocol() {
        let reader = StubReader::new("reader", false, None);

        reader.insert_card(Some(card())).unwrap();
        assert!(!reader.check_card_presence());

        reader.activate_protocol(PROTOCOL);
        reader.insert_card(Some(card())).unwrap();
        assert!(reader.check_card_presence());
    }

    #[test]
    fn test_insert_card_keeps_the_inserted_one() {
        let first = card();
        let reader = StubReader::new("reader", false, Some(Arc::clone(&first)));

        reader.insert_card(Some(card())).unwrap();
        assert!(Arc::ptr_eq(&reader.smart_card().unwrap(), &first));
    }

    #[test]
    fn test_remove_card_closes_channel() {
        let card = card();
        let reader = StubReader::new("reader", false, Some(Arc::clone(&card)));

        reader.open_physical_channel();
        assert!(reader.is_physical_channel_open());

        reader.remove_card();
        assert!(!card.is_physical_channel_open());
        assert!(!reader.check_card_presence());
        assert!(!reader.is_physical_channel_open());

        // No-op without a card
        reader.remove_card();
        reader.open_physical_channel();
        reader.close_physical_channel();
    }

    #[test]
    fn test_transmit_apdu() {
        let reader = StubReader::new("reader", false, None);
        assert!(reader.transmit_apdu(&[0x00, 0xA4]).unwrap_err().is_card_io());

        reader.activate_protocol(PROTOCOL);
        reader.insert_card(Some(card())).unwrap();
        let response = reader.transmit_apdu(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!(response.as_ref(), &[0x90, 0x00]);
    }

    #[test]
    fn test_power_on_data() {
        let reader = StubReader::new("reader", false, None);
        assert!(reader.power_on_data().unwrap_err().is_card_io());

        let reader = StubReader::new("reader", false, Some(card()));
        assert_eq!(reader.power_on_data().unwrap(), "3B88");
    }

    #[test]
    fn test_protocols() {
        let reader = StubReader::new("reader", false, None);
        assert!(reader.is_protocol_supported("anything"));
        assert!(!reader.is_current_protocol(PROTOCOL));

        reader.activate_protocol("A");
        reader.activate_protocol("B");
        reader.deactivate_protocol("A");
        reader.deactivate_protocol("C");
        assert_eq!(reader.activated_protocols(), vec!["B".to_string()]);
    }

    #[test]
    fn test_monitoring_sleep_durations() {
        let reader = StubReader::new("reader", false, None);
        assert_eq!(reader.card_insertion_monitoring_sleep_duration(), 0);
        assert_eq!(reader.card_removal_monitoring_sleep_duration(), 0);
    }

    #[test]
    fn test_wait_for_card_removal_returns_when_removed() {
        let reader = Arc::new(StubReader::new("reader", false, Some(card())));

        let remover = Arc::clone(&reader);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remover.remove_card();
        });

        reader.wait_for_card_removal_during_processing().unwrap();
        handle.join().unwrap();
        assert!(!reader.check_card_presence());
    }

    #[test]
    fn test_wait_for_card_removal_without_card() {
        let reader = StubReader::new("reader", false, None);
        reader.wait_for_card_removal_during_processing().unwrap();
    }

    #[test]
    fn test_wait_for_card_removal_can_be_stopped() {
        let reader = Arc::new(StubReader::new("reader", false, Some(card())));

        let waiter = Arc::clone(&reader);
        let handle = thread::spawn(move || waiter.wait_for_card_removal_during_processing());

        // Keep stopping until the waiter has started and observed the flag
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(20));
            reader.stop_wait_for_card_removal_during_processing();
        }

        let error = handle.join().unwrap().unwrap_err();
        assert!(matches!(error, Error::TaskCancelled(_)));
        assert!(reader.check_card_presence());
    }
}
