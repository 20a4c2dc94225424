//! Capability pointer (CPtr) addressing
//!
//! Userland names a capability by a CPtr: a 64-bit value the kernel resolves
//! through the thread's capability space. K2 root tasks run with a single
//! root capability node, so a CPtr is simply the slot index placed in the
//! most-significant bits:
//!
//! ```text
//! cptr = slot << (64 - radix)
//! ```
//!
//! where `radix` is the log2 slot count of the root node. [`CPtr::from_index`]
//! and [`CPtr::slot`] convert between the two encodings.
//!
//! # Type Safety
//!
//! [`CPtr<T>`] carries the expected object type as a zero-cost phantom
//! parameter, so a notification capability cannot be passed where a TCB
//! capability is needed without an explicit (unsafe) cast.

use core::fmt;
use core::marker::PhantomData;

use crate::objects::{CapObjectType, NullObj};

/// Capability pointer: names a slot in the holder's capability space.
///
/// The type parameter `T` is the object type the slot is expected to hold.
/// Use [`RawCPtr`] (alias for `CPtr<NullObj>`) when the type is not
/// statically known.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CPtr<T: CapObjectType = NullObj> {
    /// Raw CPtr value.
    value: u64,
    /// Phantom type marker.
    _type: PhantomData<T>,
}

impl<T: CapObjectType> CPtr<T> {
    /// Create a CPtr from a raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self {
            value,
            _type: PhantomData,
        }
    }

    /// Get the raw CPtr value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.value
    }

    /// Create a null CPtr.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self::from_raw(0)
    }

    /// Check if this is a null CPtr.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.value == 0
    }

    /// Erase the type information.
    #[inline]
    #[must_use]
    pub const fn to_untyped(self) -> RawCPtr {
        CPtr::from_raw(self.value)
    }

    /// Cast to a differently-typed CPtr.
    ///
    /// # Safety
    ///
    /// Caller must ensure the slot actually contains a capability of type
    /// `U`. Invoking a miscast capability fails at the kernel boundary, but
    /// the type confusion defeats the point of typed pointers.
    #[inline]
    #[must_use]
    pub const unsafe fn cast<U: CapObjectType>(self) -> CPtr<U> {
        CPtr::from_raw(self.value)
    }

    /// Encode a root-node slot index as a CPtr.
    ///
    /// # Parameters
    ///
    /// - `slot`: the slot index within the root capability node
    /// - `radix`: log2 of the root node's slot count
    #[inline]
    #[must_use]
    pub const fn from_index(slot: u64, radix: u8) -> Self {
        let shift = 64 - radix;
        Self::from_raw(slot << shift)
    }

    /// Recover the root-node slot index from this CPtr.
    ///
    /// Inverse of [`CPtr::from_index`] for the same radix.
    #[inline]
    #[must_use]
    pub const fn slot(self, radix: u8) -> u64 {
        let shift = 64 - radix;
        self.value >> shift
    }
}

impl<T: CapObjectType> Default for CPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: CapObjectType> fmt::Debug for CPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "CPtr<{}>::null()", T::NAME)
        } else {
            write!(f, "CPtr<{}>({:#018x})", T::NAME, self.value)
        }
    }
}

impl<T: CapObjectType> fmt::Display for CPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{:#x}", self.value)
        }
    }
}

impl<T: CapObjectType> fmt::LowerHex for CPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl<T: CapObjectType> fmt::UpperHex for CPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value, f)
    }
}

/// Untyped CPtr (type-erased).
pub type RawCPtr = CPtr<NullObj>;
