//! Capability access rights
//!
//! Every capability carries a rights mask limiting what its holder may do
//! with the object: read, write, grant (transfer capabilities through it),
//! and grant-reply. Rights only ever shrink: a derived capability holds at
//! most the rights of its parent. Userland mostly meets rights when mapping
//! frames (read/write) and when handing endpoints to less-trusted threads.

use core::fmt;

/// A capability rights mask.
///
/// Four independent bits packed into the low nibble of a byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct CapRights(u8);

impl CapRights {
    /// Permission to read from / receive through the object.
    pub const READ: Self = Self(0b0001);

    /// Permission to write to / send through the object.
    pub const WRITE: Self = Self(0b0010);

    /// Permission to transfer capabilities through the object.
    pub const GRANT: Self = Self(0b0100);

    /// Permission to grant a one-time reply capability.
    pub const GRANT_REPLY: Self = Self(0b1000);

    /// No rights at all.
    pub const NONE: Self = Self(0);

    /// Every right.
    pub const ALL: Self = Self(0b1111);

    /// Read and write (the usual frame-mapping rights).
    pub const RW: Self = Self(0b0011);

    /// Read, write, and grant (the usual endpoint rights).
    pub const RWG: Self = Self(0b0111);

    /// Build a rights mask from individual flags.
    #[inline]
    #[must_use]
    pub const fn new(read: bool, write: bool, grant: bool, grant_reply: bool) -> Self {
        let mut bits = 0u8;
        if read {
            bits |= Self::READ.0;
        }
        if write {
            bits |= Self::WRITE.0;
        }
        if grant {
            bits |= Self::GRANT.0;
        }
        if grant_reply {
            bits |= Self::GRANT_REPLY.0;
        }
        Self(bits)
    }

    /// Build a rights mask from raw bits; bits above the low nibble are
    /// discarded.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Get the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check for the read right.
    #[inline]
    #[must_use]
    pub const fn has_read(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    /// Check for the write right.
    #[inline]
    #[must_use]
    pub const fn has_write(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }

    /// Check for the grant right.
    #[inline]
    #[must_use]
    pub const fn has_grant(self) -> bool {
        self.0 & Self::GRANT.0 != 0
    }

    /// Check for the grant-reply right.
    #[inline]
    #[must_use]
    pub const fn has_grant_reply(self) -> bool {
        self.0 & Self::GRANT_REPLY.0 != 0
    }

    /// Check whether every right in `other` is present here.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Rights present in both masks.
    #[inline]
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Rights present in either mask.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether this mask grants nothing.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for CapRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapRights({})", self)
    }
}

impl fmt::Display for CapRights {
    /// Compact `RWGg` rendering; absent rights print as `-`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.has_read() { 'R' } else { '-' })?;
        write!(f, "{}", if self.has_write() { 'W' } else { '-' })?;
        write!(f, "{}", if self.has_grant() { 'G' } else { '-' })?;
        write!(f, "{}", if self.has_grant_reply() { 'g' } else { '-' })
    }
}

impl core::ops::BitOr for CapRights {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl core::ops::BitAnd for CapRights {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersect(rhs)
    }
}
