//! Image byte sources
//!
//! A source resolves a slot of a title to a readable stream positioned at
//! the start of the image file. The updatable per-title location is always
//! consulted before the read-only system location.

use crate::slot::{Slot, TitleId};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

pub trait ImageSource {
    type Reader: Read;

    /// Returns `Ok(None)` if neither location has an entry for the slot.
    fn open(&self, title_id: TitleId, slot: Slot) -> io::Result<Option<Self::Reader>>;
}

/// Images on the host filesystem
pub struct DirectorySource {
    exefs_root: PathBuf,
    override_root: PathBuf,
}

impl DirectorySource {
    #[inline]
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(exefs_root: P, override_root: Q) -> Self {
        Self {
            exefs_root: exefs_root.as_ref().to_owned(),
            override_root: override_root.as_ref().to_owned(),
        }
    }

    pub fn override_path(&self, title_id: TitleId, slot: Slot) -> PathBuf {
        self.override_root
            .join("titles")
            .join(title_id.to_string())
            .join("exefs")
            .join(slot.file_name())
    }

    #[inline]
    pub fn exefs_path(&self, slot: Slot) -> PathBuf {
        self.exefs_root.join(slot.file_name())
    }

    fn open_if_exists(path: &Path) -> io::Result<Option<File>> {
        match File::open(path) {
            Ok(file) => Ok(Some(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl ImageSource for DirectorySource {
    type Reader = File;

    fn open(&self, title_id: TitleId, slot: Slot) -> io::Result<Option<File>> {
        let path = self.override_path(title_id, slot);
        if let Some(file) = Self::open_if_exists(&path)? {
            log::debug!("{}: using override {}", slot, path.display());
            return Ok(Some(file));
        }
        Self::open_if_exists(&self.exefs_path(slot))
    }
}

/// Images held in memory
#[derive(Default)]
pub struct MemorySource {
    system: HashMap<Slot, Vec<u8>>,
    overrides: HashMap<(TitleId, Slot), Vec<u8>>,
}

impl MemorySource {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places an image in the read-only system location.
    pub fn insert(&mut self, slot: Slot, image: impl Into<Vec<u8>>) -> &mut Self {
        self.system.insert(slot, image.into());
        self
    }

    /// Places an image in the updatable location of a title.
    pub fn insert_override(
        &mut self,
        title_id: TitleId,
        slot: Slot,
        image: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.overrides.insert((title_id, slot), image.into());
        self
    }

    /// Removes an image from the system location. Overrides are kept.
    pub fn remove(&mut self, slot: Slot) -> Option<Vec<u8>> {
        self.system.remove(&slot)
    }

    pub fn remove_override(&mut self, title_id: TitleId, slot: Slot) -> Option<Vec<u8>> {
        self.overrides.remove(&(title_id, slot))
    }
}

impl ImageSource for MemorySource {
    type Reader = Cursor<Vec<u8>>;

    fn open(&self, title_id: TitleId, slot: Slot) -> io::Result<Option<Self::Reader>> {
        Ok(self
            .overrides
            .get(&(title_id, slot))
            .or_else(|| self.system.get(&slot))
            .map(|image| Cursor::new(image.clone())))
    }
}
