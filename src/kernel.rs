// Kernel capabilities

use core::fmt;

pub trait KernelCapabilities {
    /// Whether the kernel understands the full set of address space types
    fn supports_wide_addressing(&self) -> bool;
}

impl KernelCapabilities for bool {
    #[inline]
    fn supports_wide_addressing(&self) -> bool {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: u8,
    pub minor: u8,
    pub micro: u8,
}

impl KernelVersion {
    /// First version with the 39-bit address space
    pub const WIDE_ADDRESSING: Self = Self::new(2, 0, 0);

    #[inline]
    pub const fn new(major: u8, minor: u8, micro: u8) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }
}

impl KernelCapabilities for KernelVersion {
    #[inline]
    fn supports_wide_addressing(&self) -> bool {
        *self >= Self::WIDE_ADDRESSING
    }
}

impl fmt::Display for KernelVersion {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}
