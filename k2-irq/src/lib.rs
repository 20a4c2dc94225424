//! K2 Interrupt Server
//!
//! Userland interrupt delivery built on badged notifications. A hardware
//! line is bound to a notification with a single badge bit; the kernel
//! masks the line when it fires and signals the notification, and the
//! handler unmasks it by acknowledging once the device has been serviced.
//! Because badge bits accumulate by OR, one notification multiplexes up
//! to [`Badge::BITS`](k2_cap::Badge) lines, and one wait reports every
//! line that fired since the last.
//!
//! # Layers
//!
//! The crate is arranged in three layers, each usable on its own:
//!
//! 1. [`IrqServerNode`]: a set of lines on one notification, serviced by
//!    whichever thread waits on it.
//! 2. [`IrqServerThread`]: a node plus a dedicated worker thread, which
//!    either runs callbacks itself ([`DispatchMode::Direct`]) or forwards
//!    badge words over an endpoint ([`DispatchMode::Forward`]).
//! 3. [`IrqServer`]: a growable collection of forwarding threads behind a
//!    single endpoint, so one receive loop serves interrupts and ordinary
//!    IPC side by side via [`IrqServer::wait_for_irq`].
//!
//! Everything is written against [`KernelOps`](k2_syscall::KernelOps), so
//! the same logic runs over the real kernel or a scripted one in tests.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

mod allocator;
mod error;
mod node;
mod server;
mod thread;

#[cfg(test)]
mod mock;

pub use allocator::BadgeAllocator;
pub use error::{IrqServerError, IrqServerResult};
pub use node::{IrqCallback, IrqContext, IrqServerNode};
pub use server::{Capacity, IrqServer, WaitOutcome};
pub use thread::{DispatchMode, IrqServerThread};
