//! Legacy status codes.
//!
//! Every fallible operation returns a [`Result`](crate::Result). The facade in
//! [`crate::api`] additionally records the outcome of its most recent call in a
//! per-thread slot so callers ported from a status-code API can keep polling
//! [`last_status`].

use std::cell::Cell;
use std::fmt;

/// Closed set of status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Last call succeeded.
    #[default]
    None,
    /// Allocation failed.
    ErrNotEnoughMemory,
    /// File does not exist.
    ErrFileNotFound,
    /// No driver recognised the file.
    ErrUnknownFormat,
    /// Mesh geometry mismatch or invalid mesh argument.
    ErrIncompatibleMesh,
    /// Malformed input.
    ErrInvalidData,
    /// Dataset mismatch or invalid dataset argument.
    ErrIncompatibleDataset,
    /// Dataset group mismatch or invalid group argument.
    ErrIncompatibleDatasetGroup,
    /// Driver not registered.
    ErrMissingDriver,
    /// Driver lacks the requested capability.
    ErrMissingDriverCapability,
    /// Writing failed.
    ErrFailToWriteToDisk,
}

impl Status {
    /// Whether this status reports a failure.
    pub fn is_error(self) -> bool {
        self != Status::None
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::None => "None",
            Status::ErrNotEnoughMemory => "Err_NotEnoughMemory",
            Status::ErrFileNotFound => "Err_FileNotFound",
            Status::ErrUnknownFormat => "Err_UnknownFormat",
            Status::ErrIncompatibleMesh => "Err_IncompatibleMesh",
            Status::ErrInvalidData => "Err_InvalidData",
            Status::ErrIncompatibleDataset => "Err_IncompatibleDataset",
            Status::ErrIncompatibleDatasetGroup => "Err_IncompatibleDatasetGroup",
            Status::ErrMissingDriver => "Err_MissingDriver",
            Status::ErrMissingDriverCapability => "Err_MissingDriverCapability",
            Status::ErrFailToWriteToDisk => "Err_FailToWriteToDisk",
        };
        f.write_str(text)
    }
}

thread_local! {
    static LAST_STATUS: Cell<Status> = const { Cell::new(Status::None) };
}

/// Status of the most recent facade call on this thread.
pub fn last_status() -> Status {
    LAST_STATUS.with(Cell::get)
}

pub(crate) fn record<T>(result: crate::Result<T>) -> crate::Result<T> {
    let status = match &result {
        Ok(_) => Status::None,
        Err(err) => err.status(),
    };
    LAST_STATUS.with(|slot| slot.set(status));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeshdalError;

    #[test]
    fn record_overwrites_previous_status() {
        let failed: crate::Result<()> = Err(MeshdalError::missing_driver("nope"));
        assert!(record(failed).is_err());
        assert_eq!(last_status(), Status::ErrMissingDriver);

        assert!(record(Ok(1)).is_ok());
        assert_eq!(last_status(), Status::None);
        assert!(!last_status().is_error());
    }

    #[test]
    fn display_uses_legacy_names() {
        assert_eq!(Status::ErrIncompatibleMesh.to_string(), "Err_IncompatibleMesh");
    }
}
