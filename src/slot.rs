//! Load set slots

use core::fmt;

/// Positional role of an image in a load set.
///
/// Slot 0 is the optional dynamic loader stub, slot 1 is the mandatory
/// main image, and slots 2 to 11 are optional auxiliary modules that
/// must be present as a contiguous prefix.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u8);

impl Slot {
    pub const MAX: usize = 12;

    pub const RTLD: Self = Self(0);
    pub const MAIN: Self = Self(1);
    pub const FIRST_SUBSDK: Self = Self(2);

    const NAMES: [&'static str; Self::MAX] = [
        "rtld", "main", "subsdk0", "subsdk1", "subsdk2", "subsdk3", "subsdk4", "subsdk5",
        "subsdk6", "subsdk7", "subsdk8", "subsdk9",
    ];

    #[inline]
    pub const fn new(index: usize) -> Option<Self> {
        if index < Self::MAX {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// The n-th auxiliary module slot (`subsdk{n}`)
    #[inline]
    pub const fn subsdk(n: usize) -> Option<Self> {
        Self::new(n + Self::FIRST_SUBSDK.index())
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// File name of this slot inside an exefs
    #[inline]
    pub const fn file_name(&self) -> &'static str {
        Self::NAMES[self.0 as usize]
    }

    #[inline]
    pub fn all() -> impl Iterator<Item = Self> + Clone {
        (0..Self::MAX as u8).map(Self)
    }

    #[inline]
    pub fn subsdks() -> impl Iterator<Item = Self> + Clone {
        (Self::FIRST_SUBSDK.0..Self::MAX as u8).map(Self)
    }
}

impl fmt::Display for Slot {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Process identifier keying the updatable storage location.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TitleId(pub u64);

impl fmt::Display for TitleId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
