//! K2 capability vocabulary
//!
//! Shared plain-data types for K2 userland: the words and markers every
//! crate that talks to the kernel agrees on. Nothing here invokes the
//! kernel; this crate only makes the ABI's values safe to pass around.
//!
//! # Overview
//!
//! A **capability** is an unforgeable token naming a kernel object together
//! with access rights. Userland refers to its capabilities by [`CPtr`]:
//! slot indices in the thread's root capability node, encoded into the high
//! bits of a word. The kernel resolves the CPtr on every invocation, so a
//! stale or forged value fails there, not here.
//!
//! # Core Types
//!
//! - [`Badge`]: the 64-bit word notification signals OR together; single-bit
//!   badges identify interrupt sources
//! - [`CPtr`]: typed capability pointer, parameterised by the expected
//!   object marker from [`objects`]
//! - [`CapRights`]: read/write/grant/grant-reply permission mask
//! - [`objects::ObjectKind`]: retype discriminants for creating objects
//!   out of untyped memory
//!
//! # Object Types
//!
//! | Category | Types |
//! |----------|-------|
//! | Memory | [`Untyped`], [`Frame`], [`VSpace`] |
//! | IPC | [`Endpoint`], [`Notification`] |
//! | Execution | [`CNodeObj`], [`Tcb`] |
//! | Interrupts | [`IrqHandler`], [`IrqControl`] |
//!
//! [`Untyped`]: objects::Untyped
//! [`Frame`]: objects::Frame
//! [`VSpace`]: objects::VSpace
//! [`Endpoint`]: objects::Endpoint
//! [`Notification`]: objects::Notification
//! [`CNodeObj`]: objects::CNodeObj
//! [`Tcb`]: objects::Tcb
//! [`IrqHandler`]: objects::IrqHandler
//! [`IrqControl`]: objects::IrqControl

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

// Module declarations
mod badge;
mod cptr;
pub mod objects;
mod rights;

// Re-exports for convenient access
pub use badge::{Badge, BadgeBits};
pub use cptr::{CPtr, RawCPtr};
pub use objects::{CapObjectType, IrqLine, MAX_IRQ_LINE, ObjectKind};
pub use rights::CapRights;
