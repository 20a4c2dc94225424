//! Interrupt server node
//!
//! A node manages a set of interrupt lines bound to a single notification
//! object. Each registered line gets a distinct badge bit from the node's
//! mask, so one wait on the notification identifies every line that fired
//! since the last wait. Bits not in the mask are the caller's: the node
//! never allocates them and ignores them when servicing, which lets the
//! caller multiplex its own signals onto the same notification.
//!
//! Acknowledgement is the handler's job, not the node's. The kernel masks
//! a line when it fires; the registered callback receives an
//! [`IrqContext`] and calls [`IrqContext::ack`] once the device is happy,
//! which unmasks the line. A callback that never acks silences its line.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use k2_cap::objects::{IrqHandler, Notification};
use k2_cap::{Badge, CPtr, IrqLine, MAX_IRQ_LINE};
use k2_syscall::{KernelOps, SyscallResult};

use crate::allocator::BadgeAllocator;
use crate::error::{IrqServerError, IrqServerResult};

/// What a callback gets handed when its line fires.
///
/// Borrowed for the duration of the callback; carries everything needed to
/// identify and acknowledge the interrupt.
pub struct IrqContext<'a, K: KernelOps> {
    line: IrqLine,
    badge: Badge,
    handler: CPtr<IrqHandler>,
    ops: &'a K,
}

impl<'a, K: KernelOps> IrqContext<'a, K> {
    /// The interrupt line that fired.
    #[inline]
    #[must_use]
    pub fn line(&self) -> IrqLine {
        self.line
    }

    /// The badge bit identifying this line on the node's notification.
    #[inline]
    #[must_use]
    pub fn badge(&self) -> Badge {
        self.badge
    }

    /// Acknowledge the interrupt, unmasking the line for the next delivery.
    pub fn ack(&self) -> SyscallResult<()> {
        self.ops.ack_irq(self.handler)
    }
}

/// Callback invoked when a registered line fires.
///
/// Callbacks run while the owning node is borrowed (and, in threaded use,
/// while its lock is held), so they must not call back into the node or a
/// server that owns it. Acknowledge the line through [`IrqContext::ack`].
pub type IrqCallback<K> = Box<dyn FnMut(IrqContext<'_, K>) + Send>;

struct IrqEntry<K: KernelOps> {
    line: IrqLine,
    badge: Badge,
    handler: CPtr<IrqHandler>,
    callback: IrqCallback<K>,
}

/// A set of interrupt lines multiplexed onto one notification.
pub struct IrqServerNode<K: KernelOps> {
    ops: Arc<K>,
    notification: CPtr<Notification>,
    badges: BadgeAllocator,
    /// Dispatch table keyed by badge bit index.
    entries: BTreeMap<u32, IrqEntry<K>>,
}

impl<K: KernelOps> IrqServerNode<K> {
    /// Create a node over an existing notification.
    ///
    /// `badge_mask` is the set of badge bits the node may assign to lines;
    /// the caller keeps the rest for its own use. An empty mask cannot
    /// identify any interrupt and is rejected.
    pub fn new(
        ops: Arc<K>,
        notification: CPtr<Notification>,
        badge_mask: Badge,
    ) -> IrqServerResult<Self> {
        if badge_mask.is_none() {
            return Err(IrqServerError::InvalidBadgeMask);
        }
        Ok(Self {
            ops,
            notification,
            badges: BadgeAllocator::new(badge_mask),
            entries: BTreeMap::new(),
        })
    }

    /// Register a callback for an interrupt line.
    ///
    /// Allocates a badge bit, mints a handler capability for the line, and
    /// binds it to the node's notification. Returns the badge bit assigned
    /// to the line. A failure part-way rolls everything back.
    pub fn register(&mut self, line: IrqLine, callback: IrqCallback<K>) -> IrqServerResult<Badge> {
        if line > MAX_IRQ_LINE {
            return Err(IrqServerError::InvalidLine);
        }
        if self.has_line(line) {
            return Err(IrqServerError::AlreadyRegistered);
        }
        let badge = self.badges.allocate().ok_or(IrqServerError::NodeFull)?;

        let handler = match self.ops.create_irq_handler(line) {
            Ok(handler) => handler,
            Err(err) => {
                self.badges.release(badge);
                return Err(err.into());
            }
        };

        if let Err(err) = self.ops.bind_irq(handler, self.notification, badge) {
            // The unbound handler slot is useless; reclaim what we can.
            if let Err(del) = self.ops.delete_cap(handler.to_untyped()) {
                log::warn!("leaking handler for line {}: {}", line, del);
            }
            self.badges.release(badge);
            return Err(err.into());
        }

        let bit = badge.value().trailing_zeros();
        self.entries.insert(
            bit,
            IrqEntry {
                line,
                badge,
                handler,
                callback,
            },
        );
        log::debug!("registered interrupt line {} on badge bit {}", line, bit);
        Ok(badge)
    }

    /// Remove a line's registration.
    ///
    /// Clears the handler binding, deletes the handler capability, and
    /// frees the badge bit. Kernel teardown failures are logged and
    /// swallowed; the table entry goes away regardless.
    pub fn unregister(&mut self, line: IrqLine) -> IrqServerResult<()> {
        let bit = self
            .entries
            .iter()
            .find(|(_, entry)| entry.line == line)
            .map(|(bit, _)| *bit)
            .ok_or(IrqServerError::NotRegistered)?;

        if let Some(entry) = self.entries.remove(&bit) {
            if let Err(err) = self.ops.clear_irq(entry.handler) {
                log::warn!("clearing handler for line {}: {}", line, err);
            }
            if let Err(err) = self.ops.delete_cap(entry.handler.to_untyped()) {
                log::warn!("deleting handler for line {}: {}", line, err);
            }
            self.badges.release(entry.badge);
        }
        log::debug!("unregistered interrupt line {}", line);
        Ok(())
    }

    /// Dispatch one badge word to the registered callbacks.
    ///
    /// Every set bit inside the node's mask fires its callback; a set bit
    /// with no registration is logged as spurious. Bits outside the mask
    /// are the caller's and are skipped without comment. Returns the
    /// number of callbacks invoked.
    pub fn service(&mut self, word: Badge) -> u32 {
        log::trace!("servicing badge word {:#x}", word.value());
        let relevant = word & self.badges.usable();
        let ops = Arc::clone(&self.ops);
        let mut handled = 0;
        for bit in relevant.bits() {
            match self.entries.get_mut(&bit) {
                Some(entry) => {
                    let ctx = IrqContext {
                        line: entry.line,
                        badge: entry.badge,
                        handler: entry.handler,
                        ops: ops.as_ref(),
                    };
                    (entry.callback)(ctx);
                    handled += 1;
                }
                None => {
                    log::warn!("spurious badge bit {} with no registered line", bit);
                }
            }
        }
        handled
    }

    /// Block on the notification, then dispatch whatever arrived.
    pub fn wait_and_service(&mut self) -> IrqServerResult<u32> {
        let word = self.ops.wait(self.notification)?;
        Ok(self.service(word))
    }

    /// Dispatch anything already pending without blocking. Returns 0 when
    /// nothing was waiting.
    pub fn poll_and_service(&mut self) -> IrqServerResult<u32> {
        let word = self.ops.poll(self.notification)?;
        Ok(self.service(word))
    }

    /// The notification this node waits on.
    #[inline]
    #[must_use]
    pub fn notification(&self) -> CPtr<Notification> {
        self.notification
    }

    /// The badge bits this node may assign.
    #[inline]
    #[must_use]
    pub fn badge_mask(&self) -> Badge {
        self.badges.usable()
    }

    /// Total lines this node can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.badges.capacity()
    }

    /// Badge bits still free.
    #[inline]
    #[must_use]
    pub fn available(&self) -> u32 {
        self.badges.available()
    }

    /// Check whether every badge bit is assigned.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.badges.is_full()
    }

    /// Check whether a line is registered here.
    #[must_use]
    pub fn has_line(&self, line: IrqLine) -> bool {
        self.entries.values().any(|entry| entry.line == line)
    }

    /// Number of registered lines.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.entries.len()
    }
}
