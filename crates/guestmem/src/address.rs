//! Guest to host address translation
//!
//! The emulator maps guest memory into its own address space at a location
//! that depends on how it was built:
//!
//! - 64-bit builds reserve the region relative to the main module, rounded
//!   down to a 256 MiB boundary. The loader may relocate the module, so the
//!   base has to be recomputed on every attach.
//! - 32-bit builds always place the region at the same fixed address.
//!
//! Guest addresses below the base offset are translated; anything at or above
//! it is treated as already absolute.

use std::fmt;

use crate::config::AddressProfile;
use crate::error::{Error, Result};

/// Signed address as seen by the emulated guest. `<= 0` means null.
pub type GuestAddress = i64;

/// Address valid for remote reads against the host process
pub type AbsoluteAddress = u64;

/// Low bits cleared from the module base in 64-bit mode (256 MiB alignment)
pub const MODULE_ALIGN_MASK: u64 = 0x0FFF_FFFF;

/// Translation constant between guest and absolute addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseOffset(u64);

impl BaseOffset {
    /// Wrap a raw value. Returns `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Derive the base offset for a freshly attached process
    pub fn compute(
        is_64_bit: bool,
        main_module_base: u64,
        profile: &AddressProfile,
    ) -> Result<Self> {
        let value = if is_64_bit {
            (main_module_base & !MODULE_ALIGN_MASK).wrapping_add(profile.offset_64)
        } else {
            profile.offset_32
        };
        Self::new(value).ok_or(Error::InvalidBaseOffset)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Translate a guest address. Returns `None` for null (non-positive) addresses.
    #[inline]
    pub fn normalize(self, address: GuestAddress) -> Option<AbsoluteAddress> {
        if address <= 0 {
            return None;
        }
        let address = address as u64;
        if address < self.0 {
            Some(address + self.0)
        } else {
            Some(address)
        }
    }

    /// Like [`normalize`](Self::normalize) but reports null addresses as an error
    pub fn resolve(self, address: GuestAddress) -> Result<AbsoluteAddress> {
        self.normalize(address).ok_or(Error::NullAddress(address))
    }
}

impl fmt::Display for BaseOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: AddressProfile = AddressProfile {
        offset_64: 0x0A00_0000,
        offset_32: 0x1000_0000,
    };

    #[test]
    fn test_compute_64_bit_masks_low_28_bits() {
        let base = BaseOffset::compute(true, 0x7FFA_1234_5000, &PROFILE).unwrap();
        assert_eq!(base.get(), 0x7FFA_1000_0000 + 0x0A00_0000);
    }

    #[test]
    fn test_compute_64_bit_already_aligned() {
        let base = BaseOffset::compute(true, 0x1_4000_0000, &PROFILE).unwrap();
        assert_eq!(base.get(), 0x1_4A00_0000);
    }

    #[test]
    fn test_compute_32_bit_ignores_module_base() {
        let a = BaseOffset::compute(false, 0x0040_0000, &PROFILE).unwrap();
        let b = BaseOffset::compute(false, 0x7700_0000, &PROFILE).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get(), 0x1000_0000);
    }

    #[test]
    fn test_compute_rejects_zero() {
        let profile = AddressProfile {
            offset_64: 0,
            offset_32: 0,
        };
        assert!(matches!(
            BaseOffset::compute(false, 0x40_0000, &profile),
            Err(Error::InvalidBaseOffset)
        ));
        assert!(matches!(
            BaseOffset::compute(true, 0x0FFF_0000, &profile),
            Err(Error::InvalidBaseOffset)
        ));
    }

    #[test]
    fn test_normalize_guest_address() {
        let base = BaseOffset::new(0x1000_0000).unwrap();
        assert_eq!(base.normalize(1), Some(0x1000_0001));
        assert_eq!(base.normalize(0x0123_4560), Some(0x1123_4560));
        assert_eq!(base.normalize(0x0FFF_FFFF), Some(0x1FFF_FFFF));
    }

    #[test]
    fn test_normalize_passes_absolute_through() {
        let base = BaseOffset::new(0x1000_0000).unwrap();
        assert_eq!(base.normalize(0x1000_0000), Some(0x1000_0000));
        assert_eq!(base.normalize(0x7FFA_0000_0000), Some(0x7FFA_0000_0000));
    }

    #[test]
    fn test_normalize_null() {
        let base = BaseOffset::new(0x1000_0000).unwrap();
        assert_eq!(base.normalize(0), None);
        assert_eq!(base.normalize(-5), None);
        assert_eq!(base.normalize(i64::MIN), None);
        assert!(matches!(base.resolve(-1), Err(Error::NullAddress(-1))));
    }

    #[test]
    fn test_display() {
        let base = BaseOffset::new(0xABC).unwrap();
        assert_eq!(base.to_string(), "0xABC");
    }
}
