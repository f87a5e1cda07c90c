//! Plugin and plugin factory contracts
//!
//! A plugin exposes a registry of readers to the host. Pool plugins add
//! allocation: the host borrows a reader from a group and hands it back when
//! done.

use core::fmt;
use std::sync::Arc;

use crate::Result;
use crate::reader::{ChannelReaderSpi, ReaderSpi};

/// Version of the plugin API implemented by this crate
pub const PLUGIN_API_VERSION: &str = "2.0";

/// Version of the common API implemented by this crate
pub const COMMON_API_VERSION: &str = "2.0";

/// Registry of readers exposed to the host
pub trait PluginSpi: Send + Sync + fmt::Debug {
    /// Concrete reader type managed by the plugin
    type Reader: ChannelReaderSpi;

    /// Name of the plugin
    fn name(&self) -> &str;

    /// Sleep time in milliseconds between two host monitoring cycles
    fn monitoring_cycle_duration(&self) -> u64;

    /// Names of every reader currently plugged
    fn search_available_reader_names(&self) -> Vec<String>;

    /// Every reader currently plugged
    fn search_available_readers(&self) -> Vec<Arc<Self::Reader>>;

    /// Look up a reader by name
    fn search_reader(&self, name: &str) -> Option<Arc<Self::Reader>>;

    /// Called by the host when the plugin is unregistered
    fn on_unregister(&self) {}
}

/// Plugin whose readers are allocated to callers on demand
pub trait PoolPluginSpi: PluginSpi {
    /// Group reference of every pool reader, one entry per reader
    fn reader_group_references(&self) -> Vec<String>;

    /// Allocate an unused reader from `group_reference`, or from the whole
    /// pool when `group_reference` is empty
    fn allocate_reader(&self, group_reference: &str) -> Result<Arc<Self::Reader>>;

    /// Give an allocated reader back to the pool
    fn release_reader(&self, reader: Option<&dyn ReaderSpi>) -> Result<()>;
}

/// Factory handed to the host to create a [`PluginSpi`]
pub trait PluginFactorySpi: Send + Sync + fmt::Debug {
    /// Plugin type produced by the factory
    type Plugin: PluginSpi;

    /// Version of the plugin API the factory was built against
    fn plugin_api_version(&self) -> &str {
        PLUGIN_API_VERSION
    }

    /// Version of the common API the factory was built against
    fn common_api_version(&self) -> &str {
        COMMON_API_VERSION
    }

    /// Name of the plugin to be created
    fn plugin_name(&self) -> &str;

    /// Create a new plugin instance
    fn plugin(&self) -> Self::Plugin;
}

/// Factory handed to the host to create a [`PoolPluginSpi`]
pub trait PoolPluginFactorySpi: Send + Sync + fmt::Debug {
    /// Pool plugin type produced by the factory
    type Plugin: PoolPluginSpi;

    /// Version of the plugin API the factory was built against
    fn plugin_api_version(&self) -> &str {
        PLUGIN_API_VERSION
    }

    /// Version of the common API the factory was built against
    fn common_api_version(&self) -> &str {
        COMMON_API_VERSION
    }

    /// Name of the pool plugin to be created
    fn pool_plugin_name(&self) -> &str;

    /// Create a new pool plugin instance
    fn pool_plugin(&self) -> Self::Plugin;
}
