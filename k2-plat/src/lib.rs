//! K2 Platform Support
//!
//! The platform-facing odds and ends a K2 userland needs before real
//! drivers exist:
//!
//! - [`console`]: global debug console with a bring-up state machine and
//!   a kernel-character-I/O failsafe, plus [`print!`]/[`println!`].
//! - [`logger`]: `log` facade backend writing through the console.
//! - [`pmem`]: physical memory region descriptions and the fixed table
//!   they travel in.
//!
//! No UART or SoC driver lives here; hardware consoles plug in through
//! [`console::CharDevice`].

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod console;
pub mod logger;
pub mod pmem;

pub use console::{CharDevice, ConsoleError, DebugConsole, SetupState};
pub use pmem::{MAX_PMEM_REGIONS, PmemKind, PmemList, PmemRegion};
