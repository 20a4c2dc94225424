//! Physical memory regions
//!
//! Plain descriptions of physical address ranges as handed across the
//! boot interface: a kind, a base, a length. The list is a fixed-size
//! `#[repr(C)]` table so it can cross an ABI boundary unchanged. Which
//! regions exist on a given board is the boot side's business; nothing
//! here enumerates hardware.

/// Physical memory classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PmemKind {
    /// General-purpose RAM.
    Ram = 0,
    /// Device space or otherwise unusable physical addresses.
    Device = 1,
}

impl PmemKind {
    /// Decode from the wire representation. Unknown values are treated as
    /// device space, never as usable RAM.
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Ram,
            _ => Self::Device,
        }
    }

    /// Whether memory of this kind can back allocations.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::Ram)
    }
}

/// One contiguous physical region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PmemRegion {
    /// Physical start address.
    pub base: u64,
    /// Size in bytes.
    pub length: u64,
    /// Region classification.
    pub kind: PmemKind,
    /// Reserved for alignment.
    pub _reserved: u32,
}

impl PmemRegion {
    /// Create a region.
    #[must_use]
    pub const fn new(kind: PmemKind, base: u64, length: u64) -> Self {
        Self {
            base,
            length,
            kind,
            _reserved: 0,
        }
    }

    /// The all-zero placeholder entry.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(PmemKind::Device, 0, 0)
    }

    /// A region is valid when it covers at least one byte.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.length != 0
    }

    /// Exclusive end address, or `None` when the region wraps the address
    /// space.
    #[must_use]
    pub const fn end(&self) -> Option<u64> {
        self.base.checked_add(self.length)
    }

    /// Check whether an address falls inside the region.
    #[must_use]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.length
    }

    /// Check whether two regions share at least one byte.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        self.base < other.base.saturating_add(other.length)
            && other.base < self.base.saturating_add(self.length)
    }
}

/// Maximum entries a [`PmemList`] holds.
pub const MAX_PMEM_REGIONS: usize = 32;

/// Fixed-capacity physical region table.
#[derive(Debug)]
#[repr(C)]
pub struct PmemList {
    /// Number of valid entries in `regions`.
    pub count: u32,
    /// Reserved for alignment.
    pub _reserved: u32,
    /// Region storage; entries past `count` are placeholders.
    pub regions: [PmemRegion; MAX_PMEM_REGIONS],
}

impl PmemList {
    /// Create an empty list.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            _reserved: 0,
            regions: [PmemRegion::empty(); MAX_PMEM_REGIONS],
        }
    }

    fn entries(&self) -> &[PmemRegion] {
        &self.regions[..(self.count as usize).min(MAX_PMEM_REGIONS)]
    }

    /// Append a region. Returns false when the table is full.
    pub fn push(&mut self, region: PmemRegion) -> bool {
        let index = self.count as usize;
        if index >= MAX_PMEM_REGIONS {
            return false;
        }
        self.regions[index] = region;
        self.count += 1;
        true
    }

    /// Number of regions held.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count as usize
    }

    /// Check whether the list holds no regions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Get a region by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PmemRegion> {
        self.entries().get(index)
    }

    /// Iterate over the valid regions.
    pub fn iter(&self) -> impl Iterator<Item = &PmemRegion> {
        self.entries().iter()
    }

    /// Find the region containing an address.
    #[must_use]
    pub fn find(&self, addr: u64) -> Option<&PmemRegion> {
        self.iter().find(|region| region.contains(addr))
    }

    /// Total bytes of usable RAM across the list.
    #[must_use]
    pub fn total_ram(&self) -> u64 {
        self.iter()
            .filter(|region| region.kind.is_usable())
            .map(|region| region.length)
            .sum()
    }

    /// Copy regions into a caller-provided buffer.
    ///
    /// Copies `min(out.len(), self.len())` entries and returns the number
    /// copied. A too-small destination is not an error; the caller gets
    /// the prefix that fits.
    pub fn copy_into(&self, out: &mut [PmemRegion]) -> usize {
        let n = self.len().min(out.len());
        out[..n].copy_from_slice(&self.entries()[..n]);
        n
    }
}

impl Default for PmemList {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> PmemList {
        let mut list = PmemList::empty();
        assert!(list.push(PmemRegion::new(PmemKind::Ram, 0x4000_0000, 0x1000_0000)));
        assert!(list.push(PmemRegion::new(PmemKind::Device, 0x0900_0000, 0x1000)));
        assert!(list.push(PmemRegion::new(PmemKind::Ram, 0x8000_0000, 0x2000)));
        list
    }

    #[test]
    fn test_region_end_checked() {
        let region = PmemRegion::new(PmemKind::Ram, 0x1000, 0x1000);
        assert_eq!(region.end(), Some(0x2000));
        let wrapping = PmemRegion::new(PmemKind::Ram, u64::MAX - 1, 4);
        assert_eq!(wrapping.end(), None);
    }

    #[test]
    fn test_region_contains() {
        let region = PmemRegion::new(PmemKind::Ram, 0x1000, 0x1000);
        assert!(region.contains(0x1000));
        assert!(region.contains(0x1FFF));
        assert!(!region.contains(0x2000));
        assert!(!region.contains(0xFFF));
        assert!(!PmemRegion::empty().contains(0));
    }

    #[test]
    fn test_region_overlaps() {
        let a = PmemRegion::new(PmemKind::Ram, 0x1000, 0x1000);
        let b = PmemRegion::new(PmemKind::Ram, 0x1800, 0x1000);
        let adjacent = PmemRegion::new(PmemKind::Ram, 0x2000, 0x1000);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Exclusive ends: touching regions do not overlap.
        assert!(!a.overlaps(&adjacent));
        assert!(!a.overlaps(&PmemRegion::empty()));
    }

    #[test]
    fn test_unknown_kind_is_not_usable() {
        assert_eq!(PmemKind::from_u32(0), PmemKind::Ram);
        assert_eq!(PmemKind::from_u32(7), PmemKind::Device);
        assert!(!PmemKind::from_u32(7).is_usable());
    }

    #[test]
    fn test_push_until_full() {
        let mut list = PmemList::empty();
        for i in 0..MAX_PMEM_REGIONS {
            assert!(list.push(PmemRegion::new(PmemKind::Ram, i as u64 * 0x1000, 0x1000)));
        }
        assert!(!list.push(PmemRegion::new(PmemKind::Ram, 0, 0x1000)));
        assert_eq!(list.len(), MAX_PMEM_REGIONS);
    }

    #[test]
    fn test_find_and_total_ram() {
        let list = sample_list();
        assert_eq!(list.find(0x0900_0800).map(|r| r.kind), Some(PmemKind::Device));
        assert!(list.find(0x3000_0000).is_none());
        assert_eq!(list.total_ram(), 0x1000_0000 + 0x2000);
    }

    #[test]
    fn test_copy_into_clamps_and_counts() {
        let list = sample_list();

        let mut small = [PmemRegion::empty(); 2];
        assert_eq!(list.copy_into(&mut small), 2);
        assert_eq!(small[0], list.regions[0]);
        assert_eq!(small[1], list.regions[1]);

        let mut large = [PmemRegion::empty(); 8];
        assert_eq!(list.copy_into(&mut large), 3);
        assert_eq!(large[2], list.regions[2]);
        assert!(!large[3].is_valid());
    }
}
