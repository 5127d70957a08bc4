//! Header cache of one load attempt

use crate::error::{InvalidImage, LoadError};
use crate::header::NsoHeader;
use crate::slot::{Slot, TitleId};
use crate::source::ImageSource;
use std::io::{self, Read};

/// Parsed headers of every slot, `None` where the slot is absent.
///
/// Auxiliary slots are always a contiguous prefix: once one of them is
/// absent, every later one is absent too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCache {
    entries: [Option<NsoHeader>; Slot::MAX],
}

impl HeaderCache {
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: [None; Slot::MAX],
        }
    }

    /// Builds a cache from arbitrary entries, dropping auxiliary modules
    /// that follow a gap.
    pub fn from_entries(mut entries: [Option<NsoHeader>; Slot::MAX]) -> Self {
        if let Some(gap) = Slot::subsdks().find(|slot| entries[slot.index()].is_none()) {
            for entry in &mut entries[gap.index()..] {
                *entry = None;
            }
        }
        Self { entries }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries = [None; Slot::MAX];
    }

    #[inline]
    pub fn get(&self, slot: Slot) -> Option<&NsoHeader> {
        self.entries[slot.index()].as_ref()
    }

    #[inline]
    pub fn is_present(&self, slot: Slot) -> bool {
        self.entries[slot.index()].is_some()
    }

    #[inline]
    pub fn rtld(&self) -> Option<&NsoHeader> {
        self.get(Slot::RTLD)
    }

    #[inline]
    pub fn main(&self) -> Option<&NsoHeader> {
        self.get(Slot::MAIN)
    }

    /// Present slots in ascending order
    pub fn present(&self) -> impl Iterator<Item = (Slot, &NsoHeader)> {
        Slot::all().filter_map(|slot| self.get(slot).map(|header| (slot, header)))
    }

    /// Replaces the contents with the headers of `title_id`.
    ///
    /// On failure the cache is left empty.
    pub fn load_headers<S: ImageSource>(
        &mut self,
        source: &S,
        title_id: TitleId,
    ) -> Result<(), LoadError> {
        self.clear();
        let result = self.acquire(source, title_id);
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn acquire<S: ImageSource>(&mut self, source: &S, title_id: TitleId) -> Result<(), LoadError> {
        for slot in [Slot::RTLD, Slot::MAIN] {
            self.entries[slot.index()] = read_header(source, title_id, slot)?;
        }
        self.contiguous_prefix_scan(source, title_id)
    }

    /// Reads auxiliary slots in order and stops at the first one missing.
    fn contiguous_prefix_scan<S: ImageSource>(
        &mut self,
        source: &S,
        title_id: TitleId,
    ) -> Result<(), LoadError> {
        for slot in Slot::subsdks() {
            match read_header(source, title_id, slot)? {
                Some(header) => self.entries[slot.index()] = Some(header),
                None => {
                    log::debug!("{}: not found, no further modules", slot);
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Reads a fresh cache for `title_id`.
pub fn load_headers<S: ImageSource>(source: &S, title_id: TitleId) -> Result<HeaderCache, LoadError> {
    let mut cache = HeaderCache::new();
    cache.load_headers(source, title_id)?;
    Ok(cache)
}

fn read_header<S: ImageSource>(
    source: &S,
    title_id: TitleId,
    slot: Slot,
) -> Result<Option<NsoHeader>, LoadError> {
    let mut reader = match source.open(title_id, slot)? {
        Some(v) => v,
        None => return Ok(None),
    };

    let mut buf = [0; NsoHeader::SIZE];
    match reader.read_exact(&mut buf) {
        Ok(()) => (),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            log::warn!("{}: header truncated", slot);
            return Err(InvalidImage::ShortHeader(slot).into());
        }
        Err(err) => return Err(err.into()),
    }

    let header = NsoHeader::from_bytes(&buf);
    if !header.is_valid() {
        log::warn!("{}: bad magic {:08x}", slot, header.magic);
    }
    log::debug!(
        "{}: text {:08x}+{:x} ro {:08x}+{:x} rw {:08x}+{:x}+{:x}",
        slot,
        header.text().dst_offset,
        header.text().decomp_size,
        header.rodata().dst_offset,
        header.rodata().decomp_size,
        header.data().dst_offset,
        header.data().decomp_size,
        header.data().align_or_total_size,
    );
    Ok(Some(header))
}
