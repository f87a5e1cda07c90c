//! Core error type for simulated reader operations
//!
//! This module provides the error type shared by every crate of the stub
//! plugin. All failures surface synchronously to the caller, carrying a
//! message that names the offending reader, group or request.

/// Result type alias for stub plugin operations
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Core error type that encompasses all possible errors of the stub plugin
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// A required argument was missing or of the wrong kind
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Communication with a simulated card failed
    #[error("Card I/O error: {0}")]
    CardIo(String),

    /// A plugin level operation could not be served
    #[error("Plugin I/O error: {0}")]
    PluginIo(String),

    /// A cooperative task was cancelled before it completed
    #[error("Task cancelled: {0}")]
    TaskCancelled(String),

    /// A builder was given inconsistent or malformed input
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },

    /// Generic dynamic error with string message
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new card I/O error
    pub fn card_io<S: Into<String>>(message: S) -> Self {
        Self::CardIo(message.into())
    }

    /// Create a new plugin I/O error
    pub fn plugin_io<S: Into<String>>(message: S) -> Self {
        Self::PluginIo(message.into())
    }

    /// Create a new task cancelled error
    pub fn task_cancelled<S: Into<String>>(message: S) -> Self {
        Self::TaskCancelled(message.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new error with a dynamic message
    pub fn message<S: Into<String>>(message: S) -> Self {
        Self::Message(message.into())
    }

    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Strip any context layers and return the innermost error
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error (ignoring context) is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.root(), Self::InvalidArgument(_))
    }

    /// Whether this error (ignoring context) is a card I/O error
    pub fn is_card_io(&self) -> bool {
        matches!(self.root(), Self::CardIo(_))
    }

    /// Whether this error (ignoring context) is a plugin I/O error
    pub fn is_plugin_io(&self) -> bool {
        matches!(self.root(), Self::PluginIo(_))
    }
}

/// Extension trait for Result with stub plugin errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T, Error>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn context<S: Into<String>>(self, context: S) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}
