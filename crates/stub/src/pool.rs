//! Pool of simulated readers allocated by group reference
//!
//! Every pool reader belongs to a group. A caller asks for any free reader of
//! a group, or of the whole pool, uses it, then hands it back:
//!
//! ```
//! use cardstub::StubPoolPlugin;
//! use cardstub_core::{PoolPluginSpi, ReaderSpi};
//!
//! # fn main() -> cardstub_core::Result<()> {
//! let pool = StubPoolPlugin::new("StubPoolPlugin", &[], 0);
//! pool.plug_pool_reader("group1", "reader1", None);
//!
//! let reader = pool.allocate_reader("group1")?;
//! assert!(pool.allocate_reader("group1").is_err());
//!
//! pool.release_reader(Some(&*reader))?;
//! assert!(pool.allocate_reader("group1").is_ok());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use cardstub_core::{Error, PluginSpi, PoolPluginSpi, ReaderSpi, Result};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::card::StubSmartCard;
use crate::config::StubPoolReaderConfiguration;
use crate::plugin::StubPlugin;
use crate::reader::StubReader;

/// Name of the plugin created by
/// [`StubPoolPluginFactory`](crate::StubPoolPluginFactory)
pub const STUB_POOL_PLUGIN_NAME: &str = "StubPoolPlugin";

/// Group and allocation bookkeeping, guarded as one unit
#[derive(Debug, Default)]
struct PoolState {
    /// Group reference of every pool reader
    reader_to_group: BTreeMap<String, String>,
    /// Names of the allocated readers
    allocated: BTreeSet<String>,
}

/// Plugin allocating simulated readers to callers
#[derive(Debug)]
pub struct StubPoolPlugin {
    /// Registry holding the readers
    plugin: StubPlugin,
    /// Held for the whole of each pool operation
    state: Mutex<PoolState>,
}

impl StubPoolPlugin {
    /// Create a pool and plug the configured readers in order
    pub fn new(
        name: impl Into<String>,
        readers: &[StubPoolReaderConfiguration],
        monitoring_cycle_duration: u64,
    ) -> Self {
        let pool = Self {
            plugin: StubPlugin::new(name, &[], monitoring_cycle_duration),
            state: Mutex::new(PoolState::default()),
        };

        for configuration in readers {
            pool.plug_pool_reader(
                &configuration.group_reference,
                &configuration.name,
                configuration.card.clone(),
            );
        }

        pool
    }

    /// Plug a contact reader into `group_reference`
    ///
    /// A reader with the same name is replaced and moved to the new group.
    /// Its allocation, if any, is kept.
    pub fn plug_pool_reader(
        &self,
        group_reference: &str,
        name: &str,
        card: Option<Arc<StubSmartCard>>,
    ) -> Arc<StubReader> {
        let mut state = self.state.lock();
        let reader = self.plugin.plug_reader(name, false, card);
        state
            .reader_to_group
            .insert(name.to_string(), group_reference.to_string());
        debug!(group = group_reference, reader = name, "Plugged pool reader");
        reader
    }

    /// Unplug a pool reader and forget its group and allocation
    pub fn unplug_pool_reader(&self, name: &str) {
        let mut state = self.state.lock();
        self.unplug_locked(&mut state, name);
    }

    /// Unplug every reader of `group_reference`
    pub fn unplug_pool_readers(&self, group_reference: &str) {
        let mut state = self.state.lock();
        let names: Vec<String> = state
            .reader_to_group
            .iter()
            .filter(|(_, group)| group.as_str() == group_reference)
            .map(|(name, _)| name.clone())
            .collect();

        debug!(group = group_reference, count = names.len(), "Unplugging pool readers");
        for name in &names {
            self.unplug_locked(&mut state, name);
        }
    }

    /// Whether the reader named `name` is currently allocated
    pub fn is_allocated(&self, name: &str) -> bool {
        self.state.lock().allocated.contains(name)
    }

    /// Number of allocated readers
    pub fn allocated_count(&self) -> usize {
        self.state.lock().allocated.len()
    }

    /// Group reference of the reader named `name`
    pub fn group_reference_of(&self, name: &str) -> Option<String> {
        self.state.lock().reader_to_group.get(name).cloned()
    }

    fn unplug_locked(&self, state: &mut PoolState, name: &str) {
        state.reader_to_group.remove(name);
        state.allocated.remove(name);
        self.plugin.unplug_reader(name);
    }
}

impl PluginSpi for StubPoolPlugin {
    type Reader = StubReader;

    fn name(&self) -> &str {
        self.plugin.name()
    }

    fn monitoring_cycle_duration(&self) -> u64 {
        self.plugin.monitoring_cycle_duration()
    }

    fn search_available_reader_names(&self) -> Vec<String> {
        self.plugin.search_available_reader_names()
    }

    fn search_available_readers(&self) -> Vec<Arc<StubReader>> {
        self.plugin.search_available_readers()
    }

    fn search_reader(&self, name: &str) -> Option<Arc<StubReader>> {
        self.plugin.search_reader(name)
    }

    fn on_unregister(&self) {
        self.plugin.on_unregister();
    }
}

impl PoolPluginSpi for StubPoolPlugin {
    fn reader_group_references(&self) -> Vec<String> {
        self.state.lock().reader_to_group.values().cloned().collect()
    }

    fn allocate_reader(&self, group_reference: &str) -> Result<Arc<StubReader>> {
        let mut state = self.state.lock();

        let candidates: Vec<String> = if group_reference.is_empty() {
            self.plugin.search_available_reader_names()
        } else {
            state
                .reader_to_group
                .iter()
                .filter(|(_, group)| group.as_str() == group_reference)
                .map(|(name, _)| name.clone())
                .collect()
        };

        let allocated = candidates
            .iter()
            .filter(|name| !state.allocated.contains(name.as_str()))
            .find_map(|name| self.plugin.search_reader(name));

        match allocated {
            Some(reader) => {
                state.allocated.insert(reader.name().to_string());
                debug!(group = group_reference, reader = reader.name(), "Allocated reader");
                Ok(reader)
            }
            None if group_reference.is_empty() => Err(Error::plugin_io(
                "No reader is available in the pool",
            )),
            None => Err(Error::plugin_io(format!(
                "No reader is available in the groupReference : {group_reference}"
            ))),
        }
    }

    fn release_reader(&self, reader: Option<&dyn ReaderSpi>) -> Result<()> {
        let reader =
            reader.ok_or_else(|| Error::invalid_argument("Can not release a null reader"))?;
        if reader.as_any().downcast_ref::<StubReader>().is_none() {
            return Err(Error::invalid_argument(
                "Can not release reader, Reader should be of type StubReader",
            ));
        }

        let mut state = self.state.lock();
        if state.allocated.remove(reader.name()) {
            debug!(reader = reader.name(), "Released reader");
        } else {
            trace!(reader = reader.name(), "Reader was not allocated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;

    #[derive(Debug)]
    struct ForeignReader;

    impl ReaderSpi for ForeignReader {
        fn name(&self) -> &str {
            "reader1"
        }

        fn is_contactless(&self) -> bool {
            false
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn pool() -> StubPoolPlugin {
        StubPoolPlugin::new(
            STUB_POOL_PLUGIN_NAME,
            &[
                StubPoolReaderConfiguration::new("group1", "reader1"),
                StubPoolReaderConfiguration::new("group1", "reader2"),
                StubPoolReaderConfiguration::new("group2", "reader3"),
            ],
            0,
        )
    }

    #[test]
    fn test_allocate_in_group_until_exhausted() {
        let pool = pool();

        let first = pool.allocate_reader("group1").unwrap();
        let second = pool.allocate_reader("group1").unwrap();
        assert_ne!(first.name(), second.name());
        assert_eq!(pool.allocated_count(), 2);

        let error = pool.allocate_reader("group1").unwrap_err();
        assert!(error.is_plugin_io());
        assert!(error.to_string().contains("group1"));
        assert_eq!(pool.allocated_count(), 2);

        // Other groups are untouched
        assert_eq!(pool.allocate_reader("group2").unwrap().name(), "reader3");
    }

    #[test]
    fn test_allocate_in_unknown_group_fails() {
        let pool = pool();
        let error = pool.allocate_reader("group3").unwrap_err();
        assert_eq!(
            error,
            Error::plugin_io("No reader is available in the groupReference : group3")
        );
    }

    #[test]
    fn test_allocate_from_whole_pool() {
        let pool = pool();
        for _ in 0..3 {
            pool.allocate_reader("").unwrap();
        }
        let error = pool.allocate_reader("").unwrap_err();
        assert!(error.is_plugin_io());
        assert!(error.to_string().contains("pool"));
    }

    #[test]
    fn test_release_makes_reader_available() {
        let pool = pool();
        let reader = pool.allocate_reader("group2").unwrap();
        assert!(pool.is_allocated("reader3"));

        pool.release_reader(Some(&*reader)).unwrap();
        assert!(!pool.is_allocated("reader3"));
        assert_eq!(pool.allocate_reader("group2").unwrap().name(), "reader3");
    }

    #[test]
    fn test_release_rejects_invalid_handles() {
        let pool = pool();
        pool.allocate_reader("group1").unwrap();

        assert!(pool.release_reader(None).unwrap_err().is_invalid_argument());

        let error = pool.release_reader(Some(&ForeignReader)).unwrap_err();
        assert_eq!(
            error,
            Error::invalid_argument("Can not release reader, Reader should be of type StubReader")
        );
        assert!(pool.is_allocated("reader1"));
    }

    #[test]
    fn test_release_non_allocated_reader_is_noop() {
        let pool = pool();
        let reader = pool.search_reader("reader1").unwrap();
        pool.release_reader(Some(&*reader)).unwrap();
        assert_eq!(pool.allocated_count(), 0);

        // The reader does not need to be plugged
        let stray = StubReader::new("stray", false, None);
        pool.release_reader(Some(&stray)).unwrap();
    }

    #[test]
    fn test_unplug_pool_reader_forgets_allocation() {
        let pool = pool();
        pool.allocate_reader("group2").unwrap();

        pool.unplug_pool_reader("reader3");
        assert!(!pool.is_allocated("reader3"));
        assert!(pool.group_reference_of("reader3").is_none());
        assert!(pool.search_reader("reader3").is_none());

        // Unknown names are ignored
        pool.unplug_pool_reader("unknown");
        assert_eq!(pool.search_available_reader_names().len(), 2);
    }

    #[test]
    fn test_unplug_pool_readers_removes_group() {
        let pool = pool();
        pool.allocate_reader("group1").unwrap();

        pool.unplug_pool_readers("group1");
        assert_eq!(pool.search_available_reader_names(), vec!["reader3"]);
        assert_eq!(pool.reader_group_references(), vec!["group2"]);
        assert_eq!(pool.allocated_count(), 0);

        pool.unplug_pool_readers("group1");
        assert_eq!(pool.search_available_reader_names(), vec!["reader3"]);
    }

    #[test]
    fn test_reader_group_references_has_one_entry_per_reader() {
        let pool = pool();
        let mut groups = pool.reader_group_references();
        groups.sort();
        assert_eq!(groups, vec!["group1", "group1", "group2"]);
    }

    #[test]
    fn test_replug_moves_group_and_keeps_allocation() {
        let pool = pool();
        pool.allocate_reader("group1").unwrap();
        assert!(pool.is_allocated("reader1"));

        pool.plug_pool_reader("group2", "reader1", None);
        assert_eq!(pool.group_reference_of("reader1").as_deref(), Some("group2"));
        assert!(pool.is_allocated("reader1"));
    }

    #[test]
    fn test_pool_readers_are_contact_readers() {
        let pool = pool();
        assert!(
            pool.search_available_readers()
                .iter()
                .all(|reader| !reader.is_contactless())
        );
    }

    #[test]
    fn test_delegates_to_registry() {
        let pool = StubPoolPlugin::new(STUB_POOL_PLUGIN_NAME, &[], 15);
        assert_eq!(pool.name(), STUB_POOL_PLUGIN_NAME);
        assert_eq!(pool.monitoring_cycle_duration(), 15);
        assert!(pool.search_available_readers().is_empty());
        pool.on_unregister();
    }
}
