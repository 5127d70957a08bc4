//! NSO Executable Header

use bitflags::bitflags;
use byteorder::{ByteOrder, LE};

pub const SEGMENT_TEXT: usize = 0;
pub const SEGMENT_RODATA: usize = 1;
pub const SEGMENT_DATA: usize = 2;
pub const NUM_SEGMENTS: usize = 3;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct NsoFlags: u32 {
        const TEXT_COMPRESSED   = 0b0000_0001;
        const RODATA_COMPRESSED = 0b0000_0010;
        const DATA_COMPRESSED   = 0b0000_0100;
        const TEXT_HASH         = 0b0000_1000;
        const RODATA_HASH       = 0b0001_0000;
        const DATA_HASH         = 0b0010_0000;
    }
}

/// One of the three load segments of an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NsoSegment {
    pub file_offset: u32,
    /// Offset of the segment within the image's own virtual range
    pub dst_offset: u32,
    /// Size of the segment after decompression
    pub decomp_size: u32,
    /// Module name offset for .text, module name size for .rodata,
    /// and the zero-filled tail (bss) for .data
    pub align_or_total_size: u32,
}

impl NsoSegment {
    const SIZE: usize = 0x10;

    #[inline]
    pub const fn new(dst_offset: u32, decomp_size: u32, align_or_total_size: u32) -> Self {
        Self {
            file_offset: 0,
            dst_offset,
            decomp_size,
            align_or_total_size,
        }
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            file_offset: LE::read_u32(&buf[0x0..0x4]),
            dst_offset: LE::read_u32(&buf[0x4..0x8]),
            decomp_size: LE::read_u32(&buf[0x8..0xC]),
            align_or_total_size: LE::read_u32(&buf[0xC..0x10]),
        }
    }

    fn write(&self, buf: &mut [u8]) {
        LE::write_u32(&mut buf[0x0..0x4], self.file_offset);
        LE::write_u32(&mut buf[0x4..0x8], self.dst_offset);
        LE::write_u32(&mut buf[0x8..0xC], self.decomp_size);
        LE::write_u32(&mut buf[0xC..0x10], self.align_or_total_size);
    }

    /// End of the segment content in the image's virtual range, or `None` on overflow.
    #[inline]
    pub fn content_end(&self) -> Option<u32> {
        self.dst_offset.checked_add(self.decomp_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsoHeader {
    pub magic: u32,
    pub version: u32,
    pub flags: NsoFlags,
    pub segments: [NsoSegment; NUM_SEGMENTS],
    pub build_id: [u8; 0x20],
    pub compressed_sizes: [u32; NUM_SEGMENTS],
    pub dynstr_extents: u64,
    pub dynsym_extents: u64,
    pub section_hashes: [[u8; 0x20]; NUM_SEGMENTS],
}

impl NsoHeader {
    pub const SIZE: usize = 0x100;
    pub const MAGIC: u32 = 0x304F_534E; // "NSO0"

    const OFFSET_SEGMENTS: usize = 0x10;
    const OFFSET_BUILD_ID: usize = 0x40;
    const OFFSET_COMPRESSED_SIZES: usize = 0x60;
    const OFFSET_DYNSTR: usize = 0x90;
    const OFFSET_DYNSYM: usize = 0x98;
    const OFFSET_HASHES: usize = 0xA0;

    /// A header with the given segments and everything else zeroed
    pub const fn with_segments(segments: [NsoSegment; NUM_SEGMENTS]) -> Self {
        Self {
            magic: Self::MAGIC,
            version: 0,
            flags: NsoFlags::empty(),
            segments,
            build_id: [0; 0x20],
            compressed_sizes: [0; NUM_SEGMENTS],
            dynstr_extents: 0,
            dynsym_extents: 0,
            section_hashes: [[0; 0x20]; NUM_SEGMENTS],
        }
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.magic == Self::MAGIC
    }

    pub fn from_bytes(buf: &[u8; Self::SIZE]) -> Self {
        let mut segments = [NsoSegment::default(); NUM_SEGMENTS];
        let mut compressed_sizes = [0; NUM_SEGMENTS];
        let mut section_hashes = [[0; 0x20]; NUM_SEGMENTS];
        for index in 0..NUM_SEGMENTS {
            let offset = Self::OFFSET_SEGMENTS + index * NsoSegment::SIZE;
            segments[index] = NsoSegment::read(&buf[offset..offset + NsoSegment::SIZE]);

            let offset = Self::OFFSET_COMPRESSED_SIZES + index * 4;
            compressed_sizes[index] = LE::read_u32(&buf[offset..offset + 4]);

            let offset = Self::OFFSET_HASHES + index * 0x20;
            section_hashes[index].copy_from_slice(&buf[offset..offset + 0x20]);
        }
        let mut build_id = [0; 0x20];
        build_id.copy_from_slice(&buf[Self::OFFSET_BUILD_ID..Self::OFFSET_BUILD_ID + 0x20]);

        Self {
            magic: LE::read_u32(&buf[0x0..0x4]),
            version: LE::read_u32(&buf[0x4..0x8]),
            flags: NsoFlags::from_bits_retain(LE::read_u32(&buf[0xC..0x10])),
            segments,
            build_id,
            compressed_sizes,
            dynstr_extents: LE::read_u64(&buf[Self::OFFSET_DYNSTR..Self::OFFSET_DYNSTR + 8]),
            dynsym_extents: LE::read_u64(&buf[Self::OFFSET_DYNSYM..Self::OFFSET_DYNSYM + 8]),
            section_hashes,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        LE::write_u32(&mut buf[0x0..0x4], self.magic);
        LE::write_u32(&mut buf[0x4..0x8], self.version);
        LE::write_u32(&mut buf[0xC..0x10], self.flags.bits());
        for index in 0..NUM_SEGMENTS {
            let offset = Self::OFFSET_SEGMENTS + index * NsoSegment::SIZE;
            self.segments[index].write(&mut buf[offset..offset + NsoSegment::SIZE]);

            let offset = Self::OFFSET_COMPRESSED_SIZES + index * 4;
            LE::write_u32(&mut buf[offset..offset + 4], self.compressed_sizes[index]);

            let offset = Self::OFFSET_HASHES + index * 0x20;
            buf[offset..offset + 0x20].copy_from_slice(&self.section_hashes[index]);
        }
        buf[Self::OFFSET_BUILD_ID..Self::OFFSET_BUILD_ID + 0x20].copy_from_slice(&self.build_id);
        LE::write_u64(
            &mut buf[Self::OFFSET_DYNSTR..Self::OFFSET_DYNSTR + 8],
            self.dynstr_extents,
        );
        LE::write_u64(
            &mut buf[Self::OFFSET_DYNSYM..Self::OFFSET_DYNSYM + 8],
            self.dynsym_extents,
        );
        buf
    }

    #[inline]
    pub const fn text(&self) -> &NsoSegment {
        &self.segments[SEGMENT_TEXT]
    }

    #[inline]
    pub const fn rodata(&self) -> &NsoSegment {
        &self.segments[SEGMENT_RODATA]
    }

    #[inline]
    pub const fn data(&self) -> &NsoSegment {
        &self.segments[SEGMENT_DATA]
    }

    /// Highest offset touched by any segment, not yet page aligned.
    ///
    /// The .data segment includes its zero-filled tail. Returns `None`
    /// if any of the sums overflow.
    pub fn image_end(&self) -> Option<u32> {
        let text_end = self.text().content_end()?;
        let ro_end = self.rodata().content_end()?;
        let rw_end = self
            .data()
            .content_end()?
            .checked_add(self.data().align_or_total_size)?;
        Some(text_end.max(ro_end).max(rw_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_offsets() {
        let mut buf = [0u8; NsoHeader::SIZE];
        buf[0..4].copy_from_slice(b"NSO0");
        LE::write_u32(&mut buf[0x0C..0x10], 0x3F);
        // .text dst_offset / decomp_size
        LE::write_u32(&mut buf[0x14..0x18], 0);
        LE::write_u32(&mut buf[0x18..0x1C], 0x1000);
        // .rodata
        LE::write_u32(&mut buf[0x24..0x28], 0x1000);
        LE::write_u32(&mut buf[0x28..0x2C], 0x500);
        // .data + bss
        LE::write_u32(&mut buf[0x34..0x38], 0x1800);
        LE::write_u32(&mut buf[0x38..0x3C], 0x300);
        LE::write_u32(&mut buf[0x3C..0x40], 0x200);
        buf[0x40] = 0xAB;
        LE::write_u32(&mut buf[0x68..0x6C], 0x123);
        LE::write_u64(&mut buf[0x90..0x98], 0x0000_0010_0000_0020);
        buf[0xFF] = 0xCD;

        let header = NsoHeader::from_bytes(&buf);
        assert!(header.is_valid());
        assert_eq!(header.flags, NsoFlags::all());
        assert_eq!(*header.text(), NsoSegment::new(0, 0x1000, 0));
        assert_eq!(*header.rodata(), NsoSegment::new(0x1000, 0x500, 0));
        assert_eq!(*header.data(), NsoSegment::new(0x1800, 0x300, 0x200));
        assert_eq!(header.build_id[0], 0xAB);
        assert_eq!(header.compressed_sizes[2], 0x123);
        assert_eq!(header.dynstr_extents, 0x0000_0010_0000_0020);
        assert_eq!(header.section_hashes[2][0x1F], 0xCD);
        assert_eq!(header.image_end(), Some(0x1D00));

        assert_eq!(header.to_bytes(), buf);
    }

    #[test]
    fn image_end_overflow() {
        let header = NsoHeader::with_segments([
            NsoSegment::new(0, 0x1000, 0),
            NsoSegment::new(0x1000, 0x1000, 0),
            NsoSegment::new(0xFFFF_F000, 0x800, 0x1000),
        ]);
        assert_eq!(header.image_end(), None);

        let header = NsoHeader::with_segments([
            NsoSegment::new(0xFFFF_FFFF, 1, 0),
            NsoSegment::default(),
            NsoSegment::default(),
        ]);
        assert_eq!(header.image_end(), None);
    }
}
