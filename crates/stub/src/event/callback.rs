//! Callback-based event handling

use super::{CardEvent, ReaderEvent};

/// Receives card events from a monitor
pub trait CardEventHandler {
    /// Handle a card event
    fn handle_event(&mut self, event: CardEvent);
}

/// Receives reader events from a monitor
pub trait ReaderEventHandler {
    /// Handle a reader event
    fn handle_event(&mut self, event: ReaderEvent);
}

impl<F> CardEventHandler for F
where
    F: FnMut(CardEvent),
{
    fn handle_event(&mut self, event: CardEvent) {
        self(event);
    }
}

impl<F> ReaderEventHandler for F
where
    F: FnMut(ReaderEvent),
{
    fn handle_event(&mut self, event: ReaderEvent) {
        self(event);
    }
}
