//! Reader configurations used to populate plugins at creation

use std::sync::Arc;

use crate::card::StubSmartCard;

/// Configuration of a reader plugged into a [`StubPlugin`](crate::StubPlugin)
#[derive(Debug, Clone)]
pub struct StubReaderConfiguration {
    /// Name of the reader
    pub name: String,

    /// Whether the reader is contactless
    pub contactless: bool,

    /// Card inserted when the reader is plugged
    pub card: Option<Arc<StubSmartCard>>,
}

impl StubReaderConfiguration {
    /// Create a configuration for an empty contact reader
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contactless: false,
            card: None,
        }
    }

    /// Set whether the reader is contactless
    pub const fn with_contactless(mut self, contactless: bool) -> Self {
        self.contactless = contactless;
        self
    }

    /// Set the card inserted when the reader is plugged
    pub fn with_card(mut self, card: Arc<StubSmartCard>) -> Self {
        self.card = Some(card);
        self
    }
}

/// Configuration of a reader plugged into a
/// [`StubPoolPlugin`](crate::StubPoolPlugin)
///
/// Pool readers are never contactless.
#[derive(Debug, Clone)]
pub struct StubPoolReaderConfiguration {
    /// Group the reader belongs to
    pub group_reference: String,

    /// Name of the reader
    pub name: String,

    /// Card inserted when the reader is plugged
    pub card: Option<Arc<StubSmartCard>>,
}

impl StubPoolReaderConfiguration {
    /// Create a configuration for an empty reader of `group_reference`
    pub fn new(group_reference: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_reference: group_reference.into(),
            name: name.into(),
            card: None,
        }
    }

    /// Set the card inserted when the reader is plugged
    pub fn with_card(mut self, card: Arc<StubSmartCard>) -> Self {
        self.card = Some(card);
        self
    }
}
