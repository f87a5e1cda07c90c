//! Extension points implemented by users of the stub plugin

/// Source of APDU responses computed at runtime
///
/// A card configured with a provider hands every request to it instead of
/// looking up its simulated command table. Requests and responses are
/// hexadecimal strings without spaces. Returning an empty string means the
/// provider has no answer, which the card reports as a card I/O error.
pub trait ApduResponseProvider: Send + Sync {
    /// Provide the response to `apdu_request`
    fn response_from_request(&self, apdu_request: &str) -> String;
}

// Implement the provider for closures
impl<F> ApduResponseProvider for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn response_from_request(&self, apdu_request: &str) -> String {
        self(apdu_request)
    }
}
