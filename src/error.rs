// Load planning errors

use crate::extents::AddressSpaceType;
use crate::slot::Slot;
use core::fmt;
use std::io;

/// Reasons a header set cannot be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidImage {
    /// The header could not be read whole
    ShortHeader(Slot),
    NoMainImage,
    /// A text segment does not start at the bottom of its image
    NonZeroTextBase(Slot),
    /// An auxiliary module is present without a loader stub
    ModuleWithoutRtld(Slot),
    /// Segment offsets or sizes overflow
    SegmentOverflow(Slot),
}

impl fmt::Display for InvalidImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortHeader(slot) => write!(f, "short header read in {}", slot),
            Self::NoMainImage => write!(f, "no main image"),
            Self::NonZeroTextBase(slot) => write!(f, "non-zero text base in {}", slot),
            Self::ModuleWithoutRtld(slot) => write!(f, "{} present without rtld", slot),
            Self::SegmentOverflow(slot) => write!(f, "segment extents overflow in {}", slot),
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    InvalidImage(InvalidImage),
    UnsupportedAddressSpace(AddressSpaceType),
    AddressSpaceExhausted { required: u64, available: u64 },
    Io(io::Error),
}

impl LoadError {
    pub const RESULT_INVALID_NSO: u32 = 0xA09;
    pub const RESULT_INVALID_MEMORY_RANGE: u32 = 0xD001;

    /// Platform result code reported to the process creator
    pub const fn result_code(&self) -> u32 {
        match self {
            Self::InvalidImage(_) | Self::Io(_) => Self::RESULT_INVALID_NSO,
            Self::UnsupportedAddressSpace(_) | Self::AddressSpaceExhausted { .. } => {
                Self::RESULT_INVALID_MEMORY_RANGE
            }
        }
    }

    #[inline]
    pub const fn invalid_image(&self) -> Option<InvalidImage> {
        match self {
            Self::InvalidImage(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidImage(reason) => write!(f, "invalid image: {}", reason),
            Self::UnsupportedAddressSpace(ty) => {
                write!(f, "unsupported address space type {:#x}", ty.bits())
            }
            Self::AddressSpaceExhausted {
                required,
                available,
            } => write!(
                f,
                "address space exhausted: {:#x} bytes required, {:#x} available",
                required, available
            ),
            Self::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<InvalidImage> for LoadError {
    #[inline]
    fn from(value: InvalidImage) -> Self {
        Self::InvalidImage(value)
    }
}

impl From<io::Error> for LoadError {
    #[inline]
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
