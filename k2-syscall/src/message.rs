//! IPC message layout
//!
//! Endpoint IPC carries a label word plus [`MSG_REGS`] data words, all in
//! registers; there is no in-memory message buffer. The receiver
//! additionally sees the sender's badge, delivered out of band by the
//! kernel, which is how a server tells its own wakeups from foreign
//! clients sharing the endpoint.

use k2_cap::Badge;

/// Number of data registers an IPC message carries.
pub const MSG_REGS: usize = 3;

/// One IPC message: a label and its data words.
///
/// The label is protocol-defined; the kernel transports it untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct IpcMessage {
    /// Protocol label, transported untouched.
    pub label: u64,
    /// Data words.
    pub regs: [u64; MSG_REGS],
}

impl IpcMessage {
    /// Create a message from a label and data words.
    #[inline]
    #[must_use]
    pub const fn new(label: u64, regs: [u64; MSG_REGS]) -> Self {
        Self { label, regs }
    }

    /// Create a message with a label and zeroed data words.
    #[inline]
    #[must_use]
    pub const fn with_label(label: u64) -> Self {
        Self {
            label,
            regs: [0; MSG_REGS],
        }
    }
}

/// One received IPC: the message plus the sender's badge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Badge of the capability the sender invoked.
    pub badge: Badge,
    /// The message itself.
    pub message: IpcMessage,
}

impl Delivery {
    /// Create a delivery record.
    #[inline]
    #[must_use]
    pub const fn new(badge: Badge, message: IpcMessage) -> Self {
        Self { badge, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_with_label() {
        let msg = IpcMessage::with_label(7);
        assert_eq!(msg.label, 7);
        assert_eq!(msg.regs, [0; MSG_REGS]);
    }

    #[test]
    fn test_delivery_carries_badge() {
        let delivery = Delivery::new(Badge::bit(3), IpcMessage::new(1, [10, 20, 30]));
        assert_eq!(delivery.badge, Badge::bit(3));
        assert_eq!(delivery.message.regs[1], 20);
    }
}
