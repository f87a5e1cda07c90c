//! Capability traits implemented by simulated readers
//!
//! A host framework sees a reader through several narrow contracts rather than
//! one large interface. A concrete reader type implements each capability it
//! offers:
//!
//! - [`ReaderSpi`]: identity (name, contactless flag) and unregistration
//! - [`ChannelReaderSpi`]: physical channel management and APDU exchange
//! - [`ConfigurableReaderSpi`]: protocol activation
//! - [`ObservableReaderSpi`]: card detection hooks used by host monitoring

use core::any::Any;
use core::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::Result;

/// Base contract of every reader known to a plugin
pub trait ReaderSpi: Send + Sync + fmt::Debug {
    /// Name of the reader, unique within its plugin
    fn name(&self) -> &str;

    /// Whether the reader is contactless
    fn is_contactless(&self) -> bool;

    /// Called by the host when the reader is unregistered
    fn on_unregister(&self) {}

    /// Access the concrete reader type, used to validate handles coming back
    /// from the host
    fn as_any(&self) -> &dyn Any;
}

/// Readers able to open a physical channel and exchange APDUs
pub trait ChannelReaderSpi: ReaderSpi {
    /// Open the physical channel with the inserted card, if any
    fn open_physical_channel(&self);

    /// Close the physical channel with the inserted card, if any
    fn close_physical_channel(&self);

    /// Whether a card is inserted and its physical channel is open
    fn is_physical_channel_open(&self) -> bool;

    /// Whether a card is currently inserted
    fn check_card_presence(&self) -> bool;

    /// Power-on data of the inserted card as an upper-case hex string
    ///
    /// Callers must check [`check_card_presence`](Self::check_card_presence)
    /// first; without a card this returns a card I/O error.
    fn power_on_data(&self) -> Result<String>;

    /// Send an APDU to the inserted card and return its response
    fn transmit_apdu(&self, apdu: &[u8]) -> Result<Bytes> {
        trace!(reader = self.name(), apdu = %hex::encode_upper(apdu), "Transmitting APDU");
        let result = self.do_transmit_apdu(apdu);
        match &result {
            Ok(response) => {
                trace!(
                    reader = self.name(),
                    response = %hex::encode_upper(response),
                    "Received APDU response"
                );
            }
            Err(e) => {
                debug!(reader = self.name(), error = %e, "Error during APDU transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_apdu
    /// This is the method that concrete readers should override
    fn do_transmit_apdu(&self, apdu: &[u8]) -> Result<Bytes>;
}

/// Readers whose supported protocols can be configured by the host
pub trait ConfigurableReaderSpi: ReaderSpi {
    /// Whether the reader recognises the given protocol identifier
    fn is_protocol_supported(&self, protocol: &str) -> bool;

    /// Allow cards using `protocol` to be inserted
    fn activate_protocol(&self, protocol: &str);

    /// Stop accepting cards using `protocol`
    fn deactivate_protocol(&self, protocol: &str);

    /// Whether the inserted card uses `protocol`
    fn is_current_protocol(&self, protocol: &str) -> bool;
}

/// Readers that can be observed by a host monitoring loop
pub trait ObservableReaderSpi: ReaderSpi {
    /// Called when the host starts card detection
    fn on_start_detection(&self);

    /// Called when the host stops card detection
    fn on_stop_detection(&self);

    /// Sleep duration in milliseconds between two card insertion checks
    fn card_insertion_monitoring_sleep_duration(&self) -> u64;

    /// Sleep duration in milliseconds between two card removal checks
    fn card_removal_monitoring_sleep_duration(&self) -> u64;

    /// Block until the inserted card is removed
    ///
    /// Returns a task cancelled error if
    /// [`stop_wait_for_card_removal_during_processing`](Self::stop_wait_for_card_removal_during_processing)
    /// is called before the card goes away.
    fn wait_for_card_removal_during_processing(&self) -> Result<()>;

    /// Interrupt a pending [`wait_for_card_removal_during_processing`](Self::wait_for_card_removal_during_processing)
    fn stop_wait_for_card_removal_during_processing(&self);
}
