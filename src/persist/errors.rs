use thiserror::Error;

/// Result alias for bridge operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors raised by the form-store bridge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// Key-based attach named a slice the store does not hold.
    #[error("slice `{path}` is missing from store `{store}`")]
    MissingSlice { path: String, store: String },

    /// A reset was requested before `attach` or after `destroy`.
    #[error("bridge is not attached to a form")]
    NotAttached,
}
