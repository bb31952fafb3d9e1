/// Errors returned by the checked operations of the set and by
/// [`ResizePolicy::new`](crate::policy::ResizePolicy::new).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The value has no well-defined equality (it does not compare equal to
    /// itself), so it can never be found again once stored.
    #[error("value is not equal to itself and cannot be stored in a set")]
    InvalidValue,
    /// The resize policy cannot keep at least one empty slot in the table.
    #[error("invalid resize policy: {0}")]
    InvalidPolicy(&'static str),
    /// The requested capacity does not fit in `usize`.
    #[error("capacity overflow")]
    CapacityOverflow,
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
