//! Capability object types
//!
//! Marker types for the kernel objects userland holds capabilities to. The
//! marker trait is sealed so only the types defined here can parameterise a
//! [`CPtr`](crate::CPtr); the kernel enforces the real typing, the markers
//! keep userland honest at compile time.
//!
//! [`ObjectKind`] carries the same vocabulary as runtime values for the
//! retype operation, which turns untyped memory into typed objects.

use core::fmt;

/// Marker trait for capability object types.
///
/// Sealed: only the types in this module implement it.
///
/// # Associated Constants
///
/// - `NAME`: human-readable name for debugging and logging
/// - `SUPPORTS_BADGE`: whether capabilities of this type can be minted
///   with a badge (endpoints and notifications only)
pub trait CapObjectType: private::Sealed + Copy + Clone + 'static {
    /// Human-readable name for debugging and logging.
    const NAME: &'static str;

    /// Whether this object type supports badging.
    const SUPPORTS_BADGE: bool = false;
}

/// Sealed trait module to prevent external implementations.
mod private {
    pub trait Sealed {}
}

// -- Memory Objects

/// Untyped memory capability.
///
/// Raw physical memory, the root of all memory authority. Retyping carves
/// typed objects out of it; the kernel tracks the watermark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Untyped;

impl private::Sealed for Untyped {}
impl CapObjectType for Untyped {
    const NAME: &'static str = "Untyped";
}

/// Memory frame capability: one mappable physical page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Frame;

impl private::Sealed for Frame {}
impl CapObjectType for Frame {
    const NAME: &'static str = "Frame";
}

/// Virtual address space root capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VSpace;

impl private::Sealed for VSpace {}
impl CapObjectType for VSpace {
    const NAME: &'static str = "VSpace";
}

// -- IPC Objects

/// Endpoint capability.
///
/// A synchronous IPC rendezvous: senders and receivers block until both
/// sides arrive. Badged endpoint capabilities identify senders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint;

impl private::Sealed for Endpoint {}
impl CapObjectType for Endpoint {
    const NAME: &'static str = "Endpoint";
    const SUPPORTS_BADGE: bool = true;
}

/// Notification capability.
///
/// A word of state signalled asynchronously: each signal ORs the sender's
/// badge into the word, and a wait drains it. The interrupt path delivers
/// through these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Notification;

impl private::Sealed for Notification {}
impl CapObjectType for Notification {
    const NAME: &'static str = "Notification";
    const SUPPORTS_BADGE: bool = true;
}

// -- Execution Objects

/// CNode (capability node) capability: a table of capability slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CNodeObj;

impl private::Sealed for CNodeObj {}
impl CapObjectType for CNodeObj {
    const NAME: &'static str = "CNode";
}

/// Thread control block capability.
///
/// Register context, scheduling parameters, and the thread's capability
/// space and address space bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tcb;

impl private::Sealed for Tcb {}
impl CapObjectType for Tcb {
    const NAME: &'static str = "TCB";
}

// -- Interrupt Objects

/// IRQ handler capability.
///
/// Authority over one hardware interrupt line: bind it to a notification
/// (with a badge), acknowledge deliveries, clear the binding. The kernel
/// masks the line when it fires and unmasks on acknowledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IrqHandler;

impl private::Sealed for IrqHandler {}
impl CapObjectType for IrqHandler {
    const NAME: &'static str = "IRQHandler";
}

/// IRQ control capability.
///
/// Root authority to mint [`IrqHandler`] capabilities, one per line. The
/// initial task receives the single instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IrqControl;

impl private::Sealed for IrqControl {}
impl CapObjectType for IrqControl {
    const NAME: &'static str = "IRQControl";
}

// -- Null Object Type (for untyped CPtrs)

/// Untyped marker for generic capability pointers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NullObj;

impl private::Sealed for NullObj {}
impl CapObjectType for NullObj {
    const NAME: &'static str = "Null";
}

// -- Retype discriminants

/// Object kind discriminants for the retype operation.
///
/// The values are part of the kernel ABI; gaps correspond to object kinds
/// this userland never retypes directly (page tables, ASID pools, and the
/// like).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum ObjectKind {
    /// Untyped memory.
    Untyped = 1,
    /// Memory frame.
    Frame = 2,
    /// Virtual address space root.
    VSpace = 8,
    /// Synchronous endpoint.
    Endpoint = 11,
    /// Asynchronous notification.
    Notification = 12,
    /// Capability node.
    CNode = 14,
    /// Thread control block.
    Tcb = 15,
}

impl ObjectKind {
    /// Human-readable name for this object kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Untyped => "Untyped",
            Self::Frame => "Frame",
            Self::VSpace => "VSpace",
            Self::Endpoint => "Endpoint",
            Self::Notification => "Notification",
            Self::CNode => "CNode",
            Self::Tcb => "TCB",
        }
    }

    /// Raw ABI discriminant.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self as u64
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// -- Interrupt lines

/// Hardware interrupt line number (GIC INTID).
pub type IrqLine = u32;

/// Highest valid interrupt line. INTIDs 1020-1023 are reserved by the
/// interrupt controller architecture.
pub const MAX_IRQ_LINE: IrqLine = 1019;
