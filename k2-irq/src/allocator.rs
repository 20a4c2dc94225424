//! Badge bit allocation
//!
//! Each node owns a mask of badge bits it may hand out; bits outside the
//! mask belong to the caller for its own signalling on the shared
//! notification and are never allocated here. Allocation is lowest free
//! bit first, so registration order is deterministic and tests can predict
//! the badge a line receives.

use k2_cap::Badge;

/// Allocator for single-bit badges within a fixed usable mask.
#[derive(Clone, Copy, Debug)]
pub struct BadgeAllocator {
    /// Bits this allocator may hand out.
    usable: Badge,
    /// Bits currently handed out.
    taken: Badge,
}

impl BadgeAllocator {
    /// Create an allocator over the given usable mask.
    #[must_use]
    pub const fn new(mask: Badge) -> Self {
        Self {
            usable: mask,
            taken: Badge::NONE,
        }
    }

    /// The usable mask this allocator was created with.
    #[inline]
    #[must_use]
    pub const fn usable(&self) -> Badge {
        self.usable
    }

    /// Total number of allocatable bits.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.usable.count()
    }

    /// Number of bits currently handed out.
    #[inline]
    #[must_use]
    pub const fn in_use(&self) -> u32 {
        self.taken.count()
    }

    /// Number of bits still free.
    #[inline]
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.capacity() - self.in_use()
    }

    /// Check whether every usable bit is taken.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.available() == 0
    }

    /// Hand out the lowest free bit, or `None` when the mask is exhausted.
    pub fn allocate(&mut self) -> Option<Badge> {
        let free = self.usable.without(self.taken);
        let index = free.first_set_bit()?;
        let badge = Badge::bit(index);
        self.taken |= badge;
        Some(badge)
    }

    /// Return a badge to the pool. Releasing a badge that was never handed
    /// out is a no-op.
    pub fn release(&mut self, badge: Badge) {
        self.taken = self.taken.without(badge);
    }

    /// Check whether every bit of `badge` is currently handed out.
    #[inline]
    #[must_use]
    pub const fn is_allocated(&self, badge: Badge) -> bool {
        badge.is_some() && self.taken.contains(badge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_lowest_first() {
        let mut alloc = BadgeAllocator::new(Badge::MAX);
        assert_eq!(alloc.allocate(), Some(Badge::bit(0)));
        assert_eq!(alloc.allocate(), Some(Badge::bit(1)));
        assert_eq!(alloc.allocate(), Some(Badge::bit(2)));
        assert_eq!(alloc.in_use(), 3);
    }

    #[test]
    fn test_reserved_bits_never_allocated() {
        // Low nibble reserved by the caller.
        let mut alloc = BadgeAllocator::new(Badge::new(0xF0));
        assert_eq!(alloc.allocate(), Some(Badge::bit(4)));
        assert_eq!(alloc.allocate(), Some(Badge::bit(5)));
        assert_eq!(alloc.capacity(), 4);
    }

    #[test]
    fn test_exhaustion() {
        let mut alloc = BadgeAllocator::new(Badge::new(0b11));
        assert!(alloc.allocate().is_some());
        assert!(alloc.allocate().is_some());
        assert!(alloc.is_full());
        assert_eq!(alloc.allocate(), None);
    }

    #[test]
    fn test_release_reclaims_lowest() {
        let mut alloc = BadgeAllocator::new(Badge::new(0b111));
        let a = alloc.allocate().unwrap();
        let _b = alloc.allocate().unwrap();
        alloc.release(a);
        // The freed low bit comes back before the untouched high bit.
        assert_eq!(alloc.allocate(), Some(a));
        assert_eq!(alloc.allocate(), Some(Badge::bit(2)));
    }

    #[test]
    fn test_release_unallocated_is_noop() {
        let mut alloc = BadgeAllocator::new(Badge::new(0b11));
        alloc.release(Badge::bit(0));
        assert_eq!(alloc.in_use(), 0);
        assert_eq!(alloc.allocate(), Some(Badge::bit(0)));
    }

    #[test]
    fn test_is_allocated() {
        let mut alloc = BadgeAllocator::new(Badge::MAX);
        let badge = alloc.allocate().unwrap();
        assert!(alloc.is_allocated(badge));
        assert!(!alloc.is_allocated(Badge::bit(10)));
        assert!(!alloc.is_allocated(Badge::NONE));
    }
}
