//! K2 syscall ABI and kernel access seam
//!
//! Everything userland needs to talk to the kernel: the syscall number and
//! error tables, the register-only IPC message layout, and the
//! [`KernelOps`] trait higher layers program against.
//!
//! The trait is the interesting part. Libraries like the interrupt server
//! never invoke the kernel directly; they take a `KernelOps`
//! implementation, which keeps them testable on a host with a scripted
//! stand-in. The real implementation, [`invoke::SysKernel`], lives behind
//! the `userspace` feature and binds the aarch64 `svc` ABI.
//!
//! # ABI summary
//!
//! - x7 carries the syscall number, x0-x5 the arguments
//! - x0 returns the result; negative values are [`SyscallError`] codes
//! - receive paths deliver the payload in x1-x3 and the badge in x6

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

// Module declarations
mod error;
mod message;
mod numbers;
pub mod ops;

#[cfg(all(feature = "userspace", target_arch = "aarch64"))]
pub mod invoke;

// Re-exports for convenient access
pub use error::{SyscallError, SyscallResult, check_result};
pub use message::{Delivery, IpcMessage, MSG_REGS};
pub use numbers::Syscall;
pub use ops::KernelOps;
