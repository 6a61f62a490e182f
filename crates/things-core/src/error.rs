//! Registry error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// This type is commonly used as a source error in structured error types,
/// providing a way to wrap any error that implements the standard `Error`
/// trait while maintaining Send and Sync bounds for multi-threaded contexts.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur in registry operations.
///
/// This is a closed enumeration: every failure the repository, cache, or
/// service layer reports carries exactly one of these kinds. Retry policy
/// and logging belong to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Input thing fails basic structural validity (e.g. empty identifier).
    MalformedEntity,
    /// Requested identifier/key/owner combination does not exist.
    NotFound,
    /// A uniqueness constraint (identifier or key) would be violated.
    Conflict,
    /// Persisted metadata could not be decoded back into the semantic map.
    ScanMetadata,
    /// Generic read failure from the backing medium, distinct from absence.
    SelectEntity,
    /// The channel-connection consultation failed or was indeterminate.
    EntityConnected,
}

/// A structured error type for registry operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new malformed entity error.
    pub fn malformed_entity() -> Self {
        Self::new(ErrorKind::MalformedEntity)
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new conflict error.
    pub fn conflict() -> Self {
        Self::new(ErrorKind::Conflict)
    }

    /// Creates a new metadata scan error.
    pub fn scan_metadata() -> Self {
        Self::new(ErrorKind::ScanMetadata)
    }

    /// Creates a new entity select error.
    pub fn select_entity() -> Self {
        Self::new(ErrorKind::SelectEntity)
    }

    /// Creates a new connection check error.
    pub fn entity_connected() -> Self {
        Self::new(ErrorKind::EntityConnected)
    }

    /// Returns whether this error is of the given kind.
    #[inline]
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Returns whether this error indicates a missing entity.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.is_kind(ErrorKind::NotFound)
    }

    /// Returns whether this error indicates a uniqueness conflict.
    #[inline]
    pub fn is_conflict(&self) -> bool {
        self.is_kind(ErrorKind::Conflict)
    }

    /// Returns whether this error indicates malformed input.
    #[inline]
    pub fn is_malformed_entity(&self) -> bool {
        self.is_kind(ErrorKind::MalformedEntity)
    }

    /// Returns whether this error is correctable by the caller.
    ///
    /// Malformed input and conflicts map to client-correctable responses at
    /// the API boundary; scan/select/connection errors indicate
    /// infrastructure trouble.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::MalformedEntity | ErrorKind::NotFound | ErrorKind::Conflict
        )
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_message() {
        let err = Error::not_found().with_message("thing missing");
        assert!(err.to_string().contains("thing missing"));
        assert!(err.is_not_found());
    }

    #[test]
    fn error_kind_predicates() {
        assert!(Error::conflict().is_conflict());
        assert!(Error::malformed_entity().is_malformed_entity());
        assert!(!Error::select_entity().is_client_error());
        assert!(Error::conflict().is_client_error());
    }

    #[test]
    fn error_kind_names_are_snake_case() {
        assert_eq!(ErrorKind::MalformedEntity.as_ref(), "malformed_entity");
        assert_eq!(ErrorKind::EntityConnected.as_ref(), "entity_connected");
    }
}
