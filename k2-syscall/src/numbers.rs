//! Syscall numbers
//!
//! The syscall number travels in x7; arguments in x0-x5. The numbering is
//! grouped by subsystem with gaps left for kernel-internal calls this
//! userland never issues.

/// Syscall numbers for the K2 kernel ABI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum Syscall {
    // === IPC ===
    /// Send a message to an endpoint (blocking).
    Send = 0,
    /// Receive a message from an endpoint (blocking).
    Recv = 1,

    // === Scheduling and notifications ===
    /// Yield the remainder of the time slice.
    Yield = 6,
    /// Signal a notification (never blocks).
    Signal = 7,
    /// Wait on a notification (blocking).
    Wait = 8,
    /// Poll a notification (non-blocking wait).
    Poll = 9,

    // === Capability management ===
    /// Delete the capability in a slot.
    CapDelete = 19,

    // === Memory ===
    /// Retype untyped memory into kernel objects.
    Retype = 48,
    /// Map a frame into an address space.
    MapFrame = 49,
    /// Unmap a frame.
    UnmapFrame = 50,

    // === Threads ===
    /// Bind a TCB to its capability space and address space.
    TcbConfigure = 64,
    /// Write a TCB's register context.
    TcbWriteRegisters = 65,
    /// Make a TCB runnable.
    TcbResume = 67,
    /// Set a TCB's scheduling priority.
    TcbSetPriority = 69,
    /// Terminate the calling thread.
    TcbExit = 71,

    // === Interrupts ===
    /// Acknowledge an interrupt, unmasking its line.
    IrqAck = 80,
    /// Bind an IRQ handler to a notification with a badge.
    IrqSetHandler = 81,
    /// Clear an IRQ handler's notification binding.
    IrqClearHandler = 82,
    /// Mint an IRQ handler capability for a line.
    IrqControlGet = 83,

    // === Debug ===
    /// Write a string to the kernel debug console.
    DebugPuts = 254,
    /// Write one character to the kernel debug console.
    DebugPutChar = 255,
}

impl Syscall {
    /// Decode a raw syscall number.
    #[must_use]
    pub const fn from_number(number: u64) -> Option<Self> {
        match number {
            0 => Some(Self::Send),
            1 => Some(Self::Recv),
            6 => Some(Self::Yield),
            7 => Some(Self::Signal),
            8 => Some(Self::Wait),
            9 => Some(Self::Poll),
            19 => Some(Self::CapDelete),
            48 => Some(Self::Retype),
            49 => Some(Self::MapFrame),
            50 => Some(Self::UnmapFrame),
            64 => Some(Self::TcbConfigure),
            65 => Some(Self::TcbWriteRegisters),
            67 => Some(Self::TcbResume),
            69 => Some(Self::TcbSetPriority),
            71 => Some(Self::TcbExit),
            80 => Some(Self::IrqAck),
            81 => Some(Self::IrqSetHandler),
            82 => Some(Self::IrqClearHandler),
            83 => Some(Self::IrqControlGet),
            254 => Some(Self::DebugPuts),
            255 => Some(Self::DebugPutChar),
            _ => None,
        }
    }

    /// Human-readable name for this syscall.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Send => "Send",
            Self::Recv => "Recv",
            Self::Yield => "Yield",
            Self::Signal => "Signal",
            Self::Wait => "Wait",
            Self::Poll => "Poll",
            Self::CapDelete => "CapDelete",
            Self::Retype => "Retype",
            Self::MapFrame => "MapFrame",
            Self::UnmapFrame => "UnmapFrame",
            Self::TcbConfigure => "TcbConfigure",
            Self::TcbWriteRegisters => "TcbWriteRegisters",
            Self::TcbResume => "TcbResume",
            Self::TcbSetPriority => "TcbSetPriority",
            Self::TcbExit => "TcbExit",
            Self::IrqAck => "IrqAck",
            Self::IrqSetHandler => "IrqSetHandler",
            Self::IrqClearHandler => "IrqClearHandler",
            Self::IrqControlGet => "IrqControlGet",
            Self::DebugPuts => "DebugPuts",
            Self::DebugPutChar => "DebugPutChar",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_number_round_trip() {
        let calls = [
            Syscall::Send,
            Syscall::Wait,
            Syscall::Retype,
            Syscall::IrqControlGet,
            Syscall::DebugPutChar,
        ];
        for call in calls {
            assert_eq!(Syscall::from_number(call as u64), Some(call));
        }
    }

    #[test]
    fn test_from_number_unknown() {
        assert_eq!(Syscall::from_number(2), None);
        assert_eq!(Syscall::from_number(1000), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(Syscall::IrqAck.name(), "IrqAck");
        assert_eq!(Syscall::TcbSetPriority.name(), "TcbSetPriority");
    }
}
