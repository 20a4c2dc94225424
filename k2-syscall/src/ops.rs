//! Kernel access seam
//!
//! [`KernelOps`] is the complete set of kernel services the higher layers
//! consume. The interrupt server and platform glue define their logic
//! against this trait; [`SysKernel`](crate::invoke::SysKernel) provides the
//! real syscall-backed implementation, and tests provide scripted ones.
//! Capability bookkeeping (which slot, which radix) stays on the
//! implementation's side of the seam.

use alloc::boxed::Box;

use k2_cap::{Badge, CPtr, IrqLine, RawCPtr};
use k2_cap::objects::{Endpoint, IrqHandler, Notification, Tcb};

use crate::error::SyscallResult;
use crate::message::{Delivery, IpcMessage};

/// Kernel services available to userland libraries.
///
/// Implementations are shared across threads (`Send + Sync`) and take
/// `&self`: interior bookkeeping is the implementation's concern.
pub trait KernelOps: Send + Sync {
    // === Object creation ===

    /// Create a notification object, returning its capability.
    fn create_notification(&self) -> SyscallResult<CPtr<Notification>>;

    /// Create an endpoint object, returning its capability.
    fn create_endpoint(&self) -> SyscallResult<CPtr<Endpoint>>;

    /// Mint an IRQ handler capability for a hardware interrupt line.
    fn create_irq_handler(&self, line: IrqLine) -> SyscallResult<CPtr<IrqHandler>>;

    // === Interrupt plumbing ===

    /// Bind an IRQ handler to a notification.
    ///
    /// Once bound, the line firing signals the notification with `badge`
    /// and the kernel masks the line until it is acknowledged.
    fn bind_irq(
        &self,
        handler: CPtr<IrqHandler>,
        notification: CPtr<Notification>,
        badge: Badge,
    ) -> SyscallResult<()>;

    /// Acknowledge an interrupt, unmasking its line.
    fn ack_irq(&self, handler: CPtr<IrqHandler>) -> SyscallResult<()>;

    /// Clear an IRQ handler's notification binding.
    fn clear_irq(&self, handler: CPtr<IrqHandler>) -> SyscallResult<()>;

    // === Capability management ===

    /// Delete the capability a slot holds, emptying the slot.
    fn delete_cap(&self, slot: RawCPtr) -> SyscallResult<()>;

    // === Notifications ===

    /// Block until the notification is signalled; returns and clears the
    /// accumulated badge word.
    fn wait(&self, notification: CPtr<Notification>) -> SyscallResult<Badge>;

    /// Non-blocking wait. Returns [`Badge::NONE`] when nothing is pending.
    fn poll(&self, notification: CPtr<Notification>) -> SyscallResult<Badge>;

    /// Signal a notification.
    fn signal(&self, notification: CPtr<Notification>) -> SyscallResult<()>;

    // === Endpoints ===

    /// Send a message to an endpoint, blocking until received.
    fn send(&self, endpoint: CPtr<Endpoint>, message: IpcMessage) -> SyscallResult<()>;

    /// Receive a message from an endpoint, blocking until one arrives.
    fn recv(&self, endpoint: CPtr<Endpoint>) -> SyscallResult<Delivery>;

    // === Threads ===

    /// Spawn a thread running `entry` at the given priority.
    ///
    /// The name is for diagnostics only. Returns the new thread's TCB
    /// capability.
    fn spawn_thread(
        &self,
        name: &'static str,
        priority: u8,
        entry: Box<dyn FnOnce() + Send>,
    ) -> SyscallResult<CPtr<Tcb>>;

    // === Debug ===

    /// Write one character to the kernel debug console.
    fn debug_putchar(&self, byte: u8) -> SyscallResult<()>;
}
