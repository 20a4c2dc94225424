//! Notification badge words
//!
//! A badge is a 64-bit value baked into a capability when it is minted.
//! Signalling a notification through a badged capability ORs the badge into
//! the notification's word; a waiter receives the accumulated word and sees
//! every source that signalled since the last wait in a single result.
//!
//! That OR-aggregation is what makes badges suitable for interrupt
//! demultiplexing: give each interrupt source a distinct single-bit badge on
//! the same notification, and one wait identifies every line that fired.
//! [`Badge::bits`] walks those set bits in ascending order.

use core::fmt;

/// A 64-bit badge word.
///
/// Wraps either a single source's badge (usually one set bit) or the
/// aggregated word a wait returns. The zero word is an unbadged capability
/// and, as a wait result, means no source has signalled.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Badge(u64);

impl Badge {
    /// The empty badge (unbadged capability, or a wait word with no signals).
    pub const NONE: Self = Self(0);

    /// All 64 bits set.
    pub const MAX: Self = Self(u64::MAX);

    /// Number of distinct single-bit badges a word can carry.
    pub const BITS: u32 = 64;

    /// Create a badge from a raw word.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Create a single-bit badge.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 64 or more.
    #[inline]
    #[must_use]
    pub const fn bit(index: u32) -> Self {
        assert!(index < Self::BITS, "badge bit index out of range");
        Self(1 << index)
    }

    /// Get the raw word.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Check if the word is empty.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Check if any bit is set.
    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// OR two badge words together.
    ///
    /// This mirrors what the kernel does when several sources signal the
    /// same notification: each source's badge is OR'd into the word the
    /// next waiter receives.
    #[inline]
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check if every bit of `other` is present in this word.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Clear every bit of `other` from this word.
    #[inline]
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Index of the lowest set bit, if any bit is set.
    #[inline]
    #[must_use]
    pub const fn first_set_bit(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros())
        }
    }

    /// Iterate over the indices of set bits, lowest first.
    #[inline]
    pub const fn bits(self) -> BadgeBits {
        BadgeBits(self.0)
    }
}

/// Iterator over the set-bit indices of a badge word, ascending.
#[derive(Clone, Copy, Debug)]
pub struct BadgeBits(u64);

impl Iterator for BadgeBits {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(index)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.0.count_ones() as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for BadgeBits {}

impl fmt::Debug for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Badge::NONE")
        } else {
            write!(f, "Badge({:#018x})", self.0)
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

impl fmt::LowerHex for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl From<u64> for Badge {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Badge> for u64 {
    #[inline]
    fn from(badge: Badge) -> Self {
        badge.0
    }
}

impl core::ops::BitOr for Badge {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        self.combine(rhs)
    }
}

impl core::ops::BitOrAssign for Badge {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl core::ops::BitAnd for Badge {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl core::ops::Not for Badge {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_none() {
        assert!(Badge::NONE.is_none());
        assert!(!Badge::NONE.is_some());
        assert_eq!(Badge::NONE.value(), 0);
        assert_eq!(Badge::NONE.count(), 0);
        assert_eq!(Badge::NONE.first_set_bit(), None);
    }

    #[test]
    fn test_badge_bit() {
        assert_eq!(Badge::bit(0).value(), 1);
        assert_eq!(Badge::bit(5).value(), 0x20);
        assert_eq!(Badge::bit(63).value(), 1 << 63);
        assert_eq!(Badge::bit(5).first_set_bit(), Some(5));
        assert_eq!(Badge::bit(5).count(), 1);
    }

    #[test]
    fn test_badge_combine() {
        let a = Badge::bit(0);
        let b = Badge::bit(3);
        let word = a.combine(b);
        assert_eq!(word.value(), 0x09);
        assert!(word.contains(a));
        assert!(word.contains(b));
        assert!(!word.contains(Badge::bit(1)));
    }

    #[test]
    fn test_badge_without() {
        let word = Badge::new(0b1011);
        assert_eq!(word.without(Badge::bit(1)).value(), 0b1001);
        assert_eq!(word.without(Badge::MAX), Badge::NONE);
        assert_eq!(word.without(Badge::NONE), word);
    }

    #[test]
    fn test_badge_bits_iterates_ascending() {
        let word = Badge::new(0b1010_0001);
        let mut indices = [0u32; 3];
        let mut count = 0;
        for index in word.bits() {
            indices[count] = index;
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(indices, [0, 5, 7]);
    }

    #[test]
    fn test_badge_bits_empty() {
        assert_eq!(Badge::NONE.bits().next(), None);
        assert_eq!(Badge::NONE.bits().len(), 0);
    }

    #[test]
    fn test_badge_operators() {
        let mut word = Badge::bit(2);
        word |= Badge::bit(4);
        assert_eq!(word.value(), 0b10100);
        assert_eq!((word & Badge::bit(2)).value(), 0b100);
        assert_eq!((!Badge::MAX), Badge::NONE);
    }
}
