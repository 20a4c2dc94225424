//! Interrupt server errors

use core::fmt;

use k2_syscall::SyscallError;

/// Errors from interrupt server operations.
#[must_use = "interrupt server errors must be handled"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqServerError {
    /// A node was created with an empty badge mask.
    InvalidBadgeMask,
    /// The interrupt line number is out of range.
    InvalidLine,
    /// The line is already registered.
    AlreadyRegistered,
    /// The line is not registered.
    NotRegistered,
    /// Every badge bit in the node's mask is taken.
    NodeFull,
    /// The server cannot accept more registrations.
    ServerFull,
    /// A forwarded message named a worker that does not exist.
    UnknownThread,
    /// The kernel rejected an invocation.
    Syscall(SyscallError),
}

impl IrqServerError {
    /// Short description of the error.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidBadgeMask => "badge mask has no usable bits",
            Self::InvalidLine => "interrupt line out of range",
            Self::AlreadyRegistered => "interrupt line already registered",
            Self::NotRegistered => "interrupt line not registered",
            Self::NodeFull => "no free badge bit in node",
            Self::ServerFull => "server at capacity",
            Self::UnknownThread => "unknown worker thread index",
            Self::Syscall(_) => "kernel invocation failed",
        }
    }
}

impl fmt::Display for IrqServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syscall(err) => write!(f, "kernel invocation failed: {}", err),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl From<SyscallError> for IrqServerError {
    fn from(err: SyscallError) -> Self {
        Self::Syscall(err)
    }
}

/// Result type for interrupt server operations.
pub type IrqServerResult<T> = Result<T, IrqServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_syscall_error() {
        let err: IrqServerError = SyscallError::NoMemory.into();
        assert_eq!(err, IrqServerError::Syscall(SyscallError::NoMemory));
    }

    #[test]
    fn test_as_str_is_total() {
        let errors = [
            IrqServerError::InvalidBadgeMask,
            IrqServerError::NodeFull,
            IrqServerError::Syscall(SyscallError::InvalidCap),
        ];
        for err in errors {
            assert!(!err.as_str().is_empty());
        }
    }
}
