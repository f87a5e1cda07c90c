//! Core traits and types for simulated smart card readers
//!
//! This crate provides the contracts a host card-terminal framework uses to
//! talk to a reader plugin, independently of how readers are implemented.
//!
//! ## Overview
//!
//! - [`reader`]: narrow capability traits implemented by a reader
//!   (identity, channel and APDU exchange, protocol configuration,
//!   observation hooks)
//! - [`plugin`]: reader registries, pool allocation and plugin factories
//! - [`Error`]: the error type shared by all operations
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::Bytes;

pub mod plugin;
pub mod reader;

// Core error types
mod error;
pub use error::{Error, Result, ResultExt};

pub use plugin::{
    COMMON_API_VERSION, PLUGIN_API_VERSION, PluginFactorySpi, PluginSpi, PoolPluginFactorySpi,
    PoolPluginSpi,
};
pub use reader::{ChannelReaderSpi, ConfigurableReaderSpi, ObservableReaderSpi, ReaderSpi};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, Error, Result, ResultExt,
        plugin::{PluginFactorySpi, PluginSpi, PoolPluginFactorySpi, PoolPluginSpi},
        reader::{ChannelReaderSpi, ConfigurableReaderSpi, ObservableReaderSpi, ReaderSpi},
    };
}
