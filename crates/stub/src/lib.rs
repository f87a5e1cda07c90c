//! Simulated smart card readers for exercising card terminal hosts
//!
//! This crate implements the contracts of `cardstub-core` with readers and
//! cards that live entirely in memory, so a host framework can be tested
//! without hardware.
//!
//! - [`StubSmartCard`]: a card answering APDUs from a table of regular
//!   expressions or from an [`ApduResponseProvider`]
//! - [`StubReader`]: a reader holding at most one card
//! - [`StubPlugin`]: a registry of readers plugged and unplugged at runtime
//! - [`StubPoolPlugin`]: a registry whose readers are allocated by group
//! - [`StubMonitor`]: reports reader and card changes of any plugin
//!
//! # Examples
//!
//! ```
//! use cardstub::{StubPluginFactoryBuilder, StubSmartCard};
//! use cardstub_core::prelude::*;
//!
//! # fn main() -> cardstub_core::Result<()> {
//! let card = StubSmartCard::builder()
//!     .with_power_on_data(hex::decode("3B8880010000000000718100F9").unwrap())
//!     .with_protocol("ISO_14443_4")
//!     .with_simulated_command("00A4040005AABBCCDDEE", "6A82")
//!     .build()?;
//!
//! let factory = StubPluginFactoryBuilder::builder()
//!     .with_stub_reader("reader1", true, Some(card))
//!     .build();
//! let plugin = factory.plugin();
//!
//! let reader = plugin.search_reader("reader1").unwrap();
//! reader.open_physical_channel();
//! let response = reader.transmit_apdu(&hex::decode("00A4040005AABBCCDDEE").unwrap())?;
//! assert_eq!(response.as_ref(), &[0x6A, 0x82]);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod card;
mod config;
pub mod event;
mod factory;
mod monitor;
mod plugin;
mod pool;
mod reader;
mod spi;

pub use card::{
    BuildStep, Builder, CommandStep, PowerOnDataStep, ProtocolStep, SimulatedCommandStep,
    StubSmartCard,
};
pub use config::{StubPoolReaderConfiguration, StubReaderConfiguration};
pub use event::{CardEvent, ReaderEvent};
pub use factory::{
    StubPluginFactory, StubPluginFactoryBuilder, StubPoolPluginFactory,
    StubPoolPluginFactoryBuilder,
};
pub use monitor::StubMonitor;
pub use plugin::{STUB_PLUGIN_NAME, StubPlugin};
pub use pool::{STUB_POOL_PLUGIN_NAME, StubPoolPlugin};
pub use reader::StubReader;
pub use spi::ApduResponseProvider;
