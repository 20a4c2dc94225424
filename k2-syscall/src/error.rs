//! Syscall error codes
//!
//! Every syscall returns a signed word in x0: non-negative for success,
//! a negative code from this table for failure. [`check_result`] is the
//! single place the raw convention is interpreted.

use core::fmt;

/// Error codes returned by the kernel.
///
/// The discriminants are the ABI values; they never change meaning once
/// assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum SyscallError {
    /// Not an error.
    Ok = 0,
    /// The CPtr did not resolve to a capability.
    InvalidCap = -1,
    /// The capability lacks the rights for this operation.
    NoRights = -2,
    /// An argument was malformed or out of range.
    InvalidArg = -3,
    /// The destination slot already holds a capability.
    SlotOccupied = -4,
    /// The source slot is empty.
    EmptySlot = -5,
    /// The capability's object type does not match the operation.
    TypeMismatch = -6,
    /// The untyped region cannot fit the requested objects.
    NoMemory = -7,
    /// A non-blocking operation found nothing to do.
    WouldBlock = -8,
    /// The capability was revoked while in use.
    Revoked = -9,
    /// The kernel was built without this feature.
    NotSupported = -10,
    /// The object is in the wrong state for this operation.
    InvalidState = -11,
    /// A size or count argument exceeds a kernel limit.
    Range = -12,
    /// The syscall number itself is unknown.
    InvalidSyscall = -13,
}

impl SyscallError {
    /// Raw ABI value.
    #[inline]
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }

    /// Check if this represents success.
    #[inline]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if this represents failure.
    #[inline]
    #[must_use]
    pub const fn is_err(self) -> bool {
        !self.is_ok()
    }

    /// Decode a raw ABI value. Returns `None` for values outside the table.
    #[must_use]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            -1 => Some(Self::InvalidCap),
            -2 => Some(Self::NoRights),
            -3 => Some(Self::InvalidArg),
            -4 => Some(Self::SlotOccupied),
            -5 => Some(Self::EmptySlot),
            -6 => Some(Self::TypeMismatch),
            -7 => Some(Self::NoMemory),
            -8 => Some(Self::WouldBlock),
            -9 => Some(Self::Revoked),
            -10 => Some(Self::NotSupported),
            -11 => Some(Self::InvalidState),
            -12 => Some(Self::Range),
            -13 => Some(Self::InvalidSyscall),
            _ => None,
        }
    }

    /// Human-readable name for this error.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::InvalidCap => "InvalidCap",
            Self::NoRights => "NoRights",
            Self::InvalidArg => "InvalidArg",
            Self::SlotOccupied => "SlotOccupied",
            Self::EmptySlot => "EmptySlot",
            Self::TypeMismatch => "TypeMismatch",
            Self::NoMemory => "NoMemory",
            Self::WouldBlock => "WouldBlock",
            Self::Revoked => "Revoked",
            Self::NotSupported => "NotSupported",
            Self::InvalidState => "InvalidState",
            Self::Range => "Range",
            Self::InvalidSyscall => "InvalidSyscall",
        }
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result type for syscalls. The success value defaults to the raw
/// non-negative return word.
pub type SyscallResult<T = i64> = Result<T, SyscallError>;

/// Interpret a raw return word.
///
/// Non-negative values are success; negative values decode through the
/// error table, with unrecognised codes collapsing to
/// [`SyscallError::InvalidSyscall`] rather than panicking.
#[inline]
pub fn check_result(value: i64) -> SyscallResult {
    if value >= 0 {
        Ok(value)
    } else {
        Err(SyscallError::from_i64(value).unwrap_or(SyscallError::InvalidSyscall))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_round_trip() {
        let errors = [
            SyscallError::InvalidCap,
            SyscallError::NoRights,
            SyscallError::WouldBlock,
            SyscallError::InvalidSyscall,
        ];
        for err in errors {
            assert_eq!(SyscallError::from_i64(err.as_i64()), Some(err));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(SyscallError::from_i64(-999), None);
        assert_eq!(SyscallError::from_i64(1), None);
    }

    #[test]
    fn test_check_result() {
        assert_eq!(check_result(0), Ok(0));
        assert_eq!(check_result(42), Ok(42));
        assert_eq!(check_result(-8), Err(SyscallError::WouldBlock));
        assert_eq!(check_result(-999), Err(SyscallError::InvalidSyscall));
    }

    #[test]
    fn test_ok_predicates() {
        assert!(SyscallError::Ok.is_ok());
        assert!(!SyscallError::Ok.is_err());
        assert!(SyscallError::NoMemory.is_err());
    }
}
