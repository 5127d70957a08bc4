//! Load extent calculation
//!
//! Images are packed back to back in slot order, each rounded up to a
//! page. The argument region sits right after the first image but is not
//! counted in the total size. The packed set is then placed in the
//! address space window selected by the process' address space type.

use crate::aslr::SlideSource;
use crate::cache::HeaderCache;
use crate::error::{InvalidImage, LoadError};
use crate::kernel::KernelCapabilities;
use crate::slot::Slot;
use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

pub const PAGE_SIZE: u64 = 0x1000;
const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// Fixed overhead of the argument region beyond twice the argument size
pub const ARGS_SLACK: u64 = 0x9007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AddressSpaceType: u32 {
        const IS_64BIT               = 0x01;
        const LARGE_ADDRESS_SPACE    = 0x02;
        const ADDRESS_SPACE_EXTENDED = 0x04;
        const ADDRESS_SPACE_RESERVED = 0x08;
        const ENABLE_ASLR            = 0x20;
    }
}

impl AddressSpaceType {
    pub const KIND_MASK: u32 = 0x0E;

    #[inline]
    pub const fn from_raw(value: u32) -> Self {
        Self::from_bits_retain(value)
    }

    /// The address space regime encoded in bits 1 to 3
    #[inline]
    pub fn kind(&self) -> Option<AddressSpaceKind> {
        AddressSpaceKind::from_u32(self.bits() & Self::KIND_MASK)
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum AddressSpaceKind {
    As32Bit = 0,
    As36Bit = 2,
    As32BitNoReserved = 4,
    As39Bit = 6,
}

/// A window of virtual address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressSpace {
    pub start: u64,
    pub size: u64,
}

impl AddressSpace {
    pub const AS_32BIT: Self = Self::new(0x0020_0000, 0x3FE0_0000);
    pub const AS_36BIT: Self = Self::new(0x0800_0000, 0x7800_0000);
    pub const AS_39BIT: Self = Self::new(0x0800_0000, 0x7F_F800_0000);

    #[inline]
    pub const fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    #[inline]
    pub const fn end(&self) -> u64 {
        self.start + self.size
    }

    /// Selects the window for `ty`.
    ///
    /// Kernels without wide addressing only look at the large address
    /// space bit and never fail.
    pub fn select(ty: AddressSpaceType, wide_addressing: bool) -> Result<Self, LoadError> {
        if wide_addressing {
            match ty.kind() {
                Some(AddressSpaceKind::As32Bit) | Some(AddressSpaceKind::As32BitNoReserved) => {
                    Ok(Self::AS_32BIT)
                }
                Some(AddressSpaceKind::As36Bit) => Ok(Self::AS_36BIT),
                Some(AddressSpaceKind::As39Bit) => Ok(Self::AS_39BIT),
                None => Err(LoadError::UnsupportedAddressSpace(ty)),
            }
        } else if ty.contains(AddressSpaceType::LARGE_ADDRESS_SPACE) {
            Ok(Self::AS_36BIT)
        } else {
            Ok(Self::AS_32BIT)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgsRegion {
    pub address: u64,
    pub size: u64,
}

/// Final placement of a load set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadExtents {
    pub base_address: u64,
    /// Sum of the page aligned sizes of every image, excluding arguments
    pub total_size: u64,
    pub args: Option<ArgsRegion>,
    pub nso_addresses: [u64; Slot::MAX],
    pub nso_sizes: [u64; Slot::MAX],
    pub address_space: AddressSpace,
}

impl LoadExtents {
    #[inline]
    pub const fn address_of(&self, slot: Slot) -> u64 {
        self.nso_addresses[slot.index()]
    }

    #[inline]
    pub const fn size_of(&self, slot: Slot) -> u64 {
        self.nso_sizes[slot.index()]
    }

    #[inline]
    pub fn args_address(&self) -> u64 {
        self.args.map(|v| v.address).unwrap_or(0)
    }

    #[inline]
    pub fn args_size(&self) -> u64 {
        self.args.map(|v| v.size).unwrap_or(0)
    }
}

#[inline]
const fn page_align_up(value: u64) -> u64 {
    (value + PAGE_MASK) & !PAGE_MASK
}

/// Size of the argument region reserved for `args_size` bytes of arguments
#[inline]
pub const fn args_region_size(args_size: u32) -> u64 {
    page_align_up(2 * args_size as u64 + ARGS_SLACK)
}

/// Computes where every present image and the argument region will live.
///
/// `cache` must already have passed [`crate::validate::validate`].
pub fn compute_extents(
    cache: &HeaderCache,
    addspace_type: AddressSpaceType,
    args_size: u32,
    kernel: &dyn KernelCapabilities,
    slide_source: &mut dyn SlideSource,
) -> Result<LoadExtents, LoadError> {
    let mut extents = pack(cache, args_size)?;

    let address_space = AddressSpace::select(addspace_type, kernel.supports_wide_addressing())?;
    if extents.total_size > address_space.size {
        log::warn!(
            "image set of {:#x} bytes does not fit in {:#x}..{:#x}",
            extents.total_size,
            address_space.start,
            address_space.end()
        );
        return Err(LoadError::AddressSpaceExhausted {
            required: extents.total_size,
            available: address_space.size,
        });
    }

    let slide = if addspace_type.contains(AddressSpaceType::ENABLE_ASLR) {
        let max_slide = address_space.size - extents.total_size;
        slide_source.slide(max_slide).min(max_slide) & !PAGE_MASK
    } else {
        0
    };

    let base_address = address_space.start + slide;
    for (slot, _) in cache.present() {
        extents.nso_addresses[slot.index()] += base_address;
    }
    if let Some(args) = extents.args.as_mut() {
        args.address += base_address;
    }
    extents.base_address = base_address;
    extents.address_space = address_space;

    log::info!(
        "address space {:#x}..{:#x} base {:#x} (slide {:#x}) total {:#x}",
        address_space.start,
        address_space.end(),
        base_address,
        slide,
        extents.total_size
    );
    Ok(extents)
}

/// Lays out the present images relative to zero.
fn pack(cache: &HeaderCache, args_size: u32) -> Result<LoadExtents, LoadError> {
    let mut extents = LoadExtents::default();
    for (slot, header) in cache.present() {
        let end = header
            .image_end()
            .ok_or(InvalidImage::SegmentOverflow(slot))?;
        let size = page_align_up(end as u64);

        extents.nso_addresses[slot.index()] = extents.total_size;
        extents.nso_sizes[slot.index()] = size;
        extents.total_size += size;

        if args_size != 0 && extents.args.is_none() {
            extents.args = Some(ArgsRegion {
                address: extents.total_size,
                size: args_region_size(args_size),
            });
        }
    }
    Ok(extents)
}
