//! Events reported while monitoring a plugin

pub mod callback;
pub use callback::*;

pub mod channel;
pub use channel::*;

use derive_more::Display;

/// Events related to card insertion/removal
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum CardEvent {
    /// Card was inserted into a reader
    #[display("card inserted in {reader} ({power_on_data})")]
    Inserted {
        /// Reader name
        reader: String,
        /// Power-on data of the inserted card, upper-case hex
        power_on_data: String,
    },
    /// Card was removed from a reader
    #[display("card removed from {reader}")]
    Removed {
        /// Reader name
        reader: String,
    },
}

/// Events related to readers being plugged or unplugged
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ReaderEvent {
    /// Reader was plugged into the plugin
    #[display("reader added: {_0}")]
    Added(String),
    /// Reader was unplugged from the plugin
    #[display("reader removed: {_0}")]
    Removed(String),
}

impl CardEvent {
    /// Name of the reader the event happened on
    pub fn reader(&self) -> &str {
        match self {
            Self::Inserted { reader, .. } | Self::Removed { reader } => reader,
        }
    }
}

impl ReaderEvent {
    /// Name of the reader the event is about
    pub fn reader(&self) -> &str {
        match self {
            Self::Added(reader) | Self::Removed(reader) => reader,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let inserted = CardEvent::Inserted {
            reader: "reader1".to_string(),
            power_on_data: "3B00".to_string(),
        };
        assert_eq!(inserted.to_string(), "card inserted in reader1 (3B00)");
        assert_eq!(inserted.reader(), "reader1");

        let removed = ReaderEvent::Removed("reader2".to_string());
        assert_eq!(removed.to_string(), "reader removed: reader2");
        assert_eq!(removed.reader(), "reader2");
    }
}
