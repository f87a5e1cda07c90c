//! Simulated smart card
//!
//! A [`StubSmartCard`] answers APDUs either from a table of simulated
//! commands or from an [`ApduResponseProvider`]. Table keys are regular
//! expressions matched against the whole upper-case hex rendering of the
//! request, so one entry can serve a family of commands:
//!
//! ```
//! use cardstub::StubSmartCard;
//!
//! # fn main() -> cardstub_core::Result<()> {
//! let card = StubSmartCard::builder()
//!     .with_power_on_data([0x3B, 0x00])
//!     .with_protocol("ISO_14443_4")
//!     .with_simulated_command("00A40400.*", "9000")
//!     .build()?;
//!
//! let response = card.process_apdu(&[0x00, 0xA4, 0x04, 0x00, 0x02, 0x3F, 0x00])?;
//! assert_eq!(response.as_ref(), &[0x90, 0x00]);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use cardstub_core::{Error, Result};
use regex::{Regex, RegexBuilder};
use tracing::trace;

use crate::spi::ApduResponseProvider;

/// A simulated command: a request pattern and the response it produces
#[derive(Debug, Clone)]
struct SimulatedCommand {
    pattern: String,
    matcher: Regex,
    response: Bytes,
}

impl SimulatedCommand {
    fn compile(pattern: &str, response: &str) -> Result<Self> {
        let matcher = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                Error::configuration(format!("Invalid simulated command '{pattern}': {e}"))
            })?;
        let response = hex::decode(response).map_err(|e| {
            Error::configuration(format!(
                "Invalid response '{response}' for simulated command '{pattern}': {e}"
            ))
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            response: Bytes::from(response),
        })
    }
}

/// Where a card takes its responses from
#[derive(Clone)]
enum ResponseSource {
    /// Simulated commands in ascending pattern order
    Table(Vec<SimulatedCommand>),
    /// External provider, the table is never consulted
    Provider(Arc<dyn ApduResponseProvider>),
}

impl fmt::Debug for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(commands) => f
                .debug_list()
                .entries(commands.iter().map(|c| &c.pattern))
                .finish(),
            Self::Provider(_) => f.write_str("ApduResponseProvider"),
        }
    }
}

/// Simulated smart card
#[derive(Debug)]
pub struct StubSmartCard {
    /// Data reported when the card is powered (ATR)
    power_on_data: Bytes,
    /// Protocol used to communicate with the card
    protocol: String,
    /// Whether the physical channel is open
    physical_channel_open: AtomicBool,
    /// Responses to APDUs
    source: ResponseSource,
}

impl StubSmartCard {
    /// Start building a card
    pub fn builder() -> Builder<PowerOnDataStep> {
        Builder::new()
    }

    /// Power-on data of the card
    pub fn power_on_data(&self) -> &[u8] {
        &self.power_on_data
    }

    /// Protocol of the card
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Whether the physical channel is open
    pub fn is_physical_channel_open(&self) -> bool {
        self.physical_channel_open.load(Ordering::Acquire)
    }

    /// Open the physical channel
    pub fn open_physical_channel(&self) {
        self.physical_channel_open.store(true, Ordering::Release);
    }

    /// Close the physical channel
    pub fn close_physical_channel(&self) {
        self.physical_channel_open.store(false, Ordering::Release);
    }

    /// Number of simulated commands in the card table
    pub fn simulated_command_count(&self) -> usize {
        match &self.source {
            ResponseSource::Table(commands) => commands.len(),
            ResponseSource::Provider(_) => 0,
        }
    }

    /// Whether responses come from an [`ApduResponseProvider`]
    pub const fn has_response_provider(&self) -> bool {
        matches!(self.source, ResponseSource::Provider(_))
    }

    /// Compute the response to `apdu`
    ///
    /// An empty APDU yields an empty response. Otherwise the request is
    /// rendered as upper-case hex and handed to the provider, or matched
    /// against the simulated commands in ascending pattern order.
    ///
    /// # Errors
    /// Returns a card I/O error naming the request when nothing answers it,
    /// or when the provider answers with something that is not hex.
    pub fn process_apdu(&self, apdu: &[u8]) -> Result<Bytes> {
        if apdu.is_empty() {
            return Ok(Bytes::new());
        }

        let hex_apdu = hex::encode_upper(apdu);

        match &self.source {
            ResponseSource::Provider(provider) => {
                let response: String = provider
                    .response_from_request(&hex_apdu)
                    .split_whitespace()
                    .collect();
                if !response.is_empty() {
                    let bytes = hex::decode(&response).map_err(|e| {
                        Error::card_io(format!(
                            "Invalid response '{response}' provided for request {hex_apdu}: {e}"
                        ))
                    })?;
                    return Ok(Bytes::from(bytes));
                }
            }
            ResponseSource::Table(commands) => {
                if let Some(command) = commands.iter().find(|c| c.matcher.is_match(&hex_apdu)) {
                    trace!(
                        apdu = %hex_apdu,
                        pattern = %command.pattern,
                        "Matched simulated command"
                    );
                    return Ok(command.response.clone());
                }
            }
        }

        Err(Error::card_io(format!(
            "No response available for this request: {hex_apdu}"
        )))
    }
}

impl fmt::Display for StubSmartCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StubSmartCard {{ power_on_data: {}, protocol: {}, channel_open: {}, ",
            hex::encode_upper(&self.power_on_data),
            self.protocol,
            self.is_physical_channel_open(),
        )?;
        if self.has_response_provider() {
            write!(f, "responses: provider }}")
        } else {
            write!(f, "commands: {} }}", self.simulated_command_count())
        }
    }
}

/// First builder step: power-on data is expected
#[derive(Debug)]
pub struct PowerOnDataStep;

/// Second builder step: the card protocol is expected
#[derive(Debug)]
pub struct ProtocolStep;

/// Third builder step: simulated commands or a response provider may be set
#[derive(Debug)]
pub struct CommandStep;

/// At least one simulated command was set, more may follow
#[derive(Debug)]
pub struct SimulatedCommandStep;

/// A response provider was set, only `build` remains
#[derive(Debug)]
pub struct BuildStep;

/// Step-by-step builder of a [`StubSmartCard`]
///
/// The type parameter records which step the builder is at, so that
/// power-on data is always set before the protocol, and the protocol before
/// the response source. A card may be built with neither simulated commands
/// nor a provider; it then fails every non-empty APDU.
pub struct Builder<S> {
    power_on_data: Vec<u8>,
    protocol: String,
    commands: BTreeMap<String, String>,
    provider: Option<Arc<dyn ApduResponseProvider>>,
    _step: PhantomData<S>,
}

impl<S> fmt::Debug for Builder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("power_on_data", &hex::encode_upper(&self.power_on_data))
            .field("protocol", &self.protocol)
            .field("commands", &self.commands)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

impl<S> Builder<S> {
    fn into_step<T>(self) -> Builder<T> {
        Builder {
            power_on_data: self.power_on_data,
            protocol: self.protocol,
            commands: self.commands,
            provider: self.provider,
            _step: PhantomData,
        }
    }

    fn insert_command(&mut self, command: &str, response: &str) {
        let command: String = command.split_whitespace().collect();
        let response: String = response.split_whitespace().collect();
        self.commands.insert(command, response);
    }

    fn finish(self) -> Result<Arc<StubSmartCard>> {
        if self.protocol.is_empty() {
            return Err(Error::configuration("card protocol must not be empty"));
        }

        let source = match self.provider {
            Some(provider) => ResponseSource::Provider(provider),
            None => ResponseSource::Table(
                self.commands
                    .iter()
                    .map(|(command, response)| SimulatedCommand::compile(command, response))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        Ok(Arc::new(StubSmartCard {
            power_on_data: Bytes::from(self.power_on_data),
            protocol: self.protocol,
            physical_channel_open: AtomicBool::new(false),
            source,
        }))
    }
}

impl Builder<PowerOnDataStep> {
    const fn new() -> Self {
        Self {
            power_on_data: Vec::new(),
            protocol: String::new(),
            commands: BTreeMap::new(),
            provider: None,
            _step: PhantomData,
        }
    }

    /// Set the data reported by the card when powered
    pub fn with_power_on_data(
        mut self,
        power_on_data: impl Into<Vec<u8>>,
    ) -> Builder<ProtocolStep> {
        self.power_on_data = power_on_data.into();
        self.into_step()
    }
}

impl Builder<ProtocolStep> {
    /// Set the protocol of the card
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Builder<CommandStep> {
        self.protocol = protocol.into();
        self.into_step()
    }
}

impl Builder<CommandStep> {
    /// Add a simulated command
    ///
    /// `command` is a regular expression matched against the whole hex
    /// request, `response` the hex response. Spaces are ignored in both.
    /// Matching ignores case, so `00a4.*` and `00A4.*` are equivalent even
    /// though requests are always rendered in upper case.
    pub fn with_simulated_command(
        mut self,
        command: &str,
        response: &str,
    ) -> Builder<SimulatedCommandStep> {
        self.insert_command(command, response);
        self.into_step()
    }

    /// Delegate every response to `provider`
    pub fn with_apdu_response_provider<P>(mut self, provider: P) -> Builder<BuildStep>
    where
        P: ApduResponseProvider + 'static,
    {
        self.provider = Some(Arc::new(provider));
        self.into_step()
    }

    /// Build a card without any response source
    ///
    /// # Errors
    /// Returns a configuration error if the protocol is empty.
    pub fn build(self) -> Result<Arc<StubSmartCard>> {
        self.finish()
    }
}

impl Builder<SimulatedCommandStep> {
    /// Add another simulated command
    ///
    /// Matching rules are those of the first simulated command, case
    /// included. A command equal to one already added replaces it.
    pub fn with_simulated_command(mut self, command: &str, response: &str) -> Self {
        self.insert_command(command, response);
        self
    }

    /// Build the card
    ///
    /// # Errors
    /// Returns a configuration error if the protocol is empty, a command is
    /// not a valid regular expression or a response is not valid hex.
    pub fn build(self) -> Result<Arc<StubSmartCard>> {
        self.finish()
    }
}

impl Builder<BuildStep> {
    /// Build the card
    ///
    /// # Errors
    /// Returns a configuration error if the protocol is empty.
    pub fn build(self) -> Result<Arc<StubSmartCard>> {
        self.finish()
    }
}
