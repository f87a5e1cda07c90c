//! Registry of simulated readers

use std::collections::BTreeMap;
use std::sync::Arc;

use cardstub_core::PluginSpi;
use parking_lot::RwLock;
use tracing::debug;

use crate::card::StubSmartCard;
use crate::config::StubReaderConfiguration;
use crate::reader::StubReader;

/// Name of the plugin created by [`StubPluginFactory`](crate::StubPluginFactory)
pub const STUB_PLUGIN_NAME: &str = "StubPlugin";

/// Plugin exposing simulated readers plugged and unplugged at runtime
#[derive(Debug)]
pub struct StubPlugin {
    /// Name of the plugin
    name: String,
    /// Sleep time between two host monitoring cycles, in milliseconds
    monitoring_cycle_duration: u64,
    /// Plugged readers by name
    readers: RwLock<BTreeMap<String, Arc<StubReader>>>,
}

impl StubPlugin {
    /// Create a plugin and plug the configured readers in order
    pub fn new(
        name: impl Into<String>,
        readers: &[StubReaderConfiguration],
        monitoring_cycle_duration: u64,
    ) -> Self {
        let plugin = Self {
            name: name.into(),
            monitoring_cycle_duration,
            readers: RwLock::new(BTreeMap::new()),
        };

        for configuration in readers {
            plugin.plug_reader(
                &configuration.name,
                configuration.contactless,
                configuration.card.clone(),
            );
        }

        plugin
    }

    /// Plug a reader, replacing any reader with the same name
    pub fn plug_reader(
        &self,
        name: &str,
        contactless: bool,
        card: Option<Arc<StubSmartCard>>,
    ) -> Arc<StubReader> {
        let reader = Arc::new(StubReader::new(name, contactless, card));
        debug!(plugin = %self.name, reader = name, contactless, "Plugging reader");
        self.readers
            .write()
            .insert(name.to_string(), Arc::clone(&reader));
        reader
    }

    /// Unplug a reader, doing nothing if no reader has this name
    pub fn unplug_reader(&self, name: &str) {
        if self.readers.write().remove(name).is_some() {
            debug!(plugin = %self.name, reader = name, "Unplugged reader");
        }
    }

    /// Number of plugged readers
    pub fn reader_count(&self) -> usize {
        self.readers.read().len()
    }
}

impl PluginSpi for StubPlugin {
    type Reader = StubReader;

    fn name(&self) -> &str {
        &self.name
    }

    fn monitoring_cycle_duration(&self) -> u64 {
        self.monitoring_cycle_duration
    }

    fn search_available_reader_names(&self) -> Vec<String> {
        self.readers.read().keys().cloned().collect()
    }

    fn search_available_readers(&self) -> Vec<Arc<StubReader>> {
        self.readers.read().values().cloned().collect()
    }

    fn search_reader(&self, name: &str) -> Option<Arc<StubReader>> {
        self.readers.read().get(name).cloned()
    }
}
