//! Factories handed to a host to create stub plugins

use std::sync::Arc;

use cardstub_core::{PluginFactorySpi, PoolPluginFactorySpi};

use crate::card::StubSmartCard;
use crate::config::{StubPoolReaderConfiguration, StubReaderConfiguration};
use crate::plugin::{STUB_PLUGIN_NAME, StubPlugin};
use crate::pool::{STUB_POOL_PLUGIN_NAME, StubPoolPlugin};

/// Builder of a [`StubPluginFactory`]
#[derive(Debug, Clone, Default)]
pub struct StubPluginFactoryBuilder {
    readers: Vec<StubReaderConfiguration>,
    monitoring_cycle_duration: u64,
}

impl StubPluginFactoryBuilder {
    /// Create a builder without readers and a zero monitoring cycle
    pub fn builder() -> Self {
        Self::default()
    }

    /// Add a reader plugged when the plugin is created
    pub fn with_stub_reader(
        mut self,
        name: impl Into<String>,
        contactless: bool,
        card: Option<Arc<StubSmartCard>>,
    ) -> Self {
        self.readers.push(StubReaderConfiguration {
            name: name.into(),
            contactless,
            card,
        });
        self
    }

    /// Set the monitoring cycle of the plugin, in milliseconds
    pub const fn with_monitoring_cycle_duration(mut self, duration: u64) -> Self {
        self.monitoring_cycle_duration = duration;
        self
    }

    /// Build the factory
    pub fn build(self) -> StubPluginFactory {
        StubPluginFactory {
            readers: self.readers,
            monitoring_cycle_duration: self.monitoring_cycle_duration,
        }
    }
}

/// Creates [`StubPlugin`] instances
#[derive(Debug, Clone)]
pub struct StubPluginFactory {
    readers: Vec<StubReaderConfiguration>,
    monitoring_cycle_duration: u64,
}

impl PluginFactorySpi for StubPluginFactory {
    type Plugin = StubPlugin;

    fn plugin_name(&self) -> &str {
        STUB_PLUGIN_NAME
    }

    fn plugin(&self) -> StubPlugin {
        StubPlugin::new(STUB_PLUGIN_NAME, &self.readers, self.monitoring_cycle_duration)
    }
}

/// Builder of a [`StubPoolPluginFactory`]
#[derive(Debug, Clone, Default)]
pub struct StubPoolPluginFactoryBuilder {
    readers: Vec<StubPoolReaderConfiguration>,
    monitoring_cycle_duration: u64,
}

impl StubPoolPluginFactoryBuilder {
    /// Create a builder without readers and a zero monitoring cycle
    pub fn builder() -> Self {
        Self::default()
    }

    /// Add a reader of `group_reference` plugged when the pool is created
    pub fn with_stub_reader(
        mut self,
        group_reference: impl Into<String>,
        name: impl Into<String>,
        card: Option<Arc<StubSmartCard>>,
    ) -> Self {
        self.readers.push(StubPoolReaderConfiguration {
            group_reference: group_reference.into(),
            name: name.into(),
            card,
        });
        self
    }

    /// Set the monitoring cycle of the pool, in milliseconds
    pub const fn with_monitoring_cycle_duration(mut self, duration: u64) -> Self {
        self.monitoring_cycle_duration = duration;
        self
    }

    /// Build the factory
    pub fn build(self) -> StubPoolPluginFactory {
        StubPoolPluginFactory {
            readers: self.readers,
            monitoring_cycle_duration: self.monitoring_cycle_duration,
        }
    }
}

/// Creates [`StubPoolPlugin`] instances
#[derive(Debug, Clone)]
pub struct StubPoolPluginFactory {
    readers: Vec<StubPoolReaderConfiguration>,
    monitoring_cycle_duration: u64,
}

impl PoolPluginFactorySpi for StubPoolPluginFactory {
    type Plugin = StubPoolPlugin;

    fn pool_plugin_name(&self) -> &str {
        STUB_POOL_PLUGIN_NAME
    }

    fn pool_plugin(&self) -> StubPoolPlugin {
        StubPoolPlugin::new(
            STUB_POOL_PLUGIN_NAME,
            &self.readers,
            self.monitoring_cycle_duration,
        )
    }
}
