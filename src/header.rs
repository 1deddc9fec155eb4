// This file is part of novuspack.
//
// novuspack is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// novuspack is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with novuspack.  If not, see <https://www.gnu.org/licenses/>.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{
    NVPK_MAGIC, FORMAT_VERSION, PACKAGE_HEADER_SIZE, DEFAULT_ARCHIVE_PART_INFO,
    FLAGS_MASK_FEATURES, FLAGS_MASK_COMPRESSION_TYPE, FLAGS_MASK_RESERVED,
    FLAGS_SHIFT_COMPRESSION_TYPE, MAX_COMPRESSION_TYPE,
};
use crate::io::{FieldReader, FieldWriter};
use crate::result::{Result, Error, ErrorContext};

/// The fixed 112 byte header at offset 0 of every package.
///
/// `flags` and `archive_part_info` are bit-packed; use the accessors instead
/// of masking by hand:
///
/// | flags bits | meaning                         |
/// |------------|---------------------------------|
/// | 0-7        | feature flags (`FLAG_*`)        |
/// | 8-15       | package compression type (0-3)  |
/// | 16-31      | reserved, zero                  |
///
/// `archive_part_info` is `part << 16 | total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackageHeader {
    pub magic:                u32,
    pub format_version:       u32,
    pub flags:                u32,
    pub package_data_version: u32,
    pub metadata_version:     u32,
    /// CRC32 of the package content, 0 if not computed.
    pub package_crc:          u32,
    /// Unix nanoseconds.
    pub created_time:         u64,
    /// Unix nanoseconds.
    pub modified_time:        u64,
    pub locale_id:            u32,
    pub reserved:             u32,
    pub app_id:               u64,
    pub vendor_id:            u32,
    pub creator_id:           u32,
    pub index_start:          u64,
    pub index_size:           u64,
    pub archive_chain_id:     u64,
    pub archive_part_info:    u32,
    pub comment_size:         u32,
    pub comment_start:        u64,
    /// 0 for unsigned packages. Everything before this offset is frozen once
    /// a package is signed.
    pub signature_offset:     u64,
}

impl PackageHeader {
    /// A header for a fresh package: identity filled in, both version
    /// counters at 1, part 1 of 1, everything else zero.
    pub fn new() -> Self {
        PackageHeader {
            magic:                NVPK_MAGIC,
            format_version:       FORMAT_VERSION,
            package_data_version: 1,
            metadata_version:     1,
            archive_part_info:    DEFAULT_ARCHIVE_PART_INFO,
            ..PackageHeader::default()
        }
    }

    /// Reads exactly 112 bytes. The magic number is checked before any other
    /// field is looked at.
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut buffer = [0u8; PACKAGE_HEADER_SIZE];
        FieldReader::new(reader).fill(&mut buffer, "Header")?;

        let magic = LittleEndian::read_u32(&buffer[0..4]);
        if magic != NVPK_MAGIC {
            return Err(Error::validation(
                "invalid magic number",
                ErrorContext::new("Magic", format!("0x{:08X}", magic), format!("0x{:08X}", NVPK_MAGIC)),
            ));
        }

        let header = Self::from_bytes(&buffer);

        if header.format_version != FORMAT_VERSION {
            return Err(Error::validation(
                "unsupported format version",
                ErrorContext::new("FormatVersion", header.format_version, FORMAT_VERSION.to_string()),
            ));
        }

        if header.reserved != 0 {
            return Err(Error::validation(
                "reserved field must be 0",
                ErrorContext::new("Reserved", header.reserved, "0"),
            ));
        }

        log::debug!("read package header: index at {} ({} bytes), signature offset {}",
            header.index_start, header.index_size, header.signature_offset);

        Ok(header)
    }

    #[inline]
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut bytes)
    }

    fn from_bytes(buffer: &[u8; PACKAGE_HEADER_SIZE]) -> Self {
        PackageHeader {
            magic:                LittleEndian::read_u32(&buffer[0..4]),
            format_version:       LittleEndian::read_u32(&buffer[4..8]),
            flags:                LittleEndian::read_u32(&buffer[8..12]),
            package_data_version: LittleEndian::read_u32(&buffer[12..16]),
            metadata_version:     LittleEndian::read_u32(&buffer[16..20]),
            package_crc:          LittleEndian::read_u32(&buffer[20..24]),
            created_time:         LittleEndian::read_u64(&buffer[24..32]),
            modified_time:        LittleEndian::read_u64(&buffer[32..40]),
            locale_id:            LittleEndian::read_u32(&buffer[40..44]),
            reserved:             LittleEndian::read_u32(&buffer[44..48]),
            app_id:               LittleEndian::read_u64(&buffer[48..56]),
            vendor_id:            LittleEndian::read_u32(&buffer[56..60]),
            creator_id:           LittleEndian::read_u32(&buffer[60..64]),
            index_start:          LittleEndian::read_u64(&buffer[64..72]),
            index_size:           LittleEndian::read_u64(&buffer[72..80]),
            archive_chain_id:     LittleEndian::read_u64(&buffer[80..88]),
            archive_part_info:    LittleEndian::read_u32(&buffer[88..92]),
            comment_size:         LittleEndian::read_u32(&buffer[92..96]),
            comment_start:        LittleEndian::read_u64(&buffer[96..104]),
            signature_offset:     LittleEndian::read_u64(&buffer[104..112]),
        }
    }

    /// Serializes all 112 bytes as they are. Nothing is validated here, so a
    /// malformed header written out reads back byte for byte.
    pub fn encode(&self) -> [u8; PACKAGE_HEADER_SIZE] {
        let mut buffer = [0u8; PACKAGE_HEADER_SIZE];

        LittleEndian::write_u32(&mut buffer[0..4],     self.magic);
        LittleEndian::write_u32(&mut buffer[4..8],     self.format_version);
        LittleEndian::write_u32(&mut buffer[8..12],    self.flags);
        LittleEndian::write_u32(&mut buffer[12..16],   self.package_data_version);
        LittleEndian::write_u32(&mut buffer[16..20],   self.metadata_version);
        LittleEndian::write_u32(&mut buffer[20..24],   self.package_crc);
        LittleEndian::write_u64(&mut buffer[24..32],   self.created_time);
        LittleEndian::write_u64(&mut buffer[32..40],   self.modified_time);
        LittleEndian::write_u32(&mut buffer[40..44],   self.locale_id);
        LittleEndian::write_u32(&mut buffer[44..48],   self.reserved);
        LittleEndian::write_u64(&mut buffer[48..56],   self.app_id);
        LittleEndian::write_u32(&mut buffer[56..60],   self.vendor_id);
        LittleEndian::write_u32(&mut buffer[60..64],   self.creator_id);
        LittleEndian::write_u64(&mut buffer[64..72],   self.index_start);
        LittleEndian::write_u64(&mut buffer[72..80],   self.index_size);
        LittleEndian::write_u64(&mut buffer[80..88],   self.archive_chain_id);
        LittleEndian::write_u32(&mut buffer[88..92],   self.archive_part_info);
        LittleEndian::write_u32(&mut buffer[92..96],   self.comment_size);
        LittleEndian::write_u64(&mut buffer[96..104],  self.comment_start);
        LittleEndian::write_u64(&mut buffer[104..112], self.signature_offset);

        buffer
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<u64> {
        let mut writer = FieldWriter::new(writer);
        writer.write_bytes(&self.encode(), "Header")?;
        Ok(writer.written())
    }

    pub fn validate(&self) -> Result<()> {
        if self.magic != NVPK_MAGIC {
            return Err(Error::validation(
                "invalid magic number",
                ErrorContext::new("Magic", format!("0x{:08X}", self.magic), format!("0x{:08X}", NVPK_MAGIC)),
            ));
        }

        if self.format_version != FORMAT_VERSION {
            return Err(Error::validation(
                "unsupported format version",
                ErrorContext::new("FormatVersion", self.format_version, FORMAT_VERSION.to_string()),
            ));
        }

        if self.reserved != 0 {
            return Err(Error::validation(
                "reserved field must be 0",
                ErrorContext::new("Reserved", self.reserved, "0"),
            ));
        }

        if self.flags & FLAGS_MASK_RESERVED != 0 {
            return Err(Error::validation(
                "reserved flag bits 16-31 must be 0",
                ErrorContext::new("Flags", format!("0x{:08X}", self.flags), "bits 16-31 clear"),
            ));
        }

        if self.compression_type() > MAX_COMPRESSION_TYPE {
            return Err(Error::validation(
                "unknown package compression type",
                ErrorContext::new("Flags", self.compression_type(), format!("0..={}", MAX_COMPRESSION_TYPE)),
            ));
        }

        if (self.comment_size == 0) != (self.comment_start == 0) {
            return Err(Error::validation(
                "comment size and comment start must both be zero or both be non-zero",
                ErrorContext::new(
                    "CommentSize",
                    format!("size={}, start={}", self.comment_size, self.comment_start),
                    "both zero or both non-zero",
                ),
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn size(&self) -> usize {
        PACKAGE_HEADER_SIZE
    }

    /// Bits 8-15 of `flags`.
    #[inline]
    pub fn compression_type(&self) -> u8 {
        ((self.flags & FLAGS_MASK_COMPRESSION_TYPE) >> FLAGS_SHIFT_COMPRESSION_TYPE) as u8
    }

    /// Rewrites bits 8-15 only.
    #[inline]
    pub fn set_compression_type(&mut self, compression_type: u8) {
        self.flags &= !FLAGS_MASK_COMPRESSION_TYPE;
        self.flags |= (compression_type as u32) << FLAGS_SHIFT_COMPRESSION_TYPE;
    }

    /// Bits 0-7 of `flags`.
    #[inline]
    pub fn features(&self) -> u8 {
        (self.flags & FLAGS_MASK_FEATURES) as u8
    }

    #[inline]
    pub fn has_feature(&self, flag: u32) -> bool {
        self.flags & flag & FLAGS_MASK_FEATURES != 0
    }

    #[inline]
    pub fn set_feature(&mut self, flag: u32) {
        self.flags |= flag & FLAGS_MASK_FEATURES;
    }

    #[inline]
    pub fn clear_feature(&mut self, flag: u32) {
        self.flags &= !(flag & FLAGS_MASK_FEATURES);
    }

    #[inline]
    pub fn archive_part(&self) -> u16 {
        (self.archive_part_info >> 16) as u16
    }

    #[inline]
    pub fn archive_total(&self) -> u16 {
        (self.archive_part_info & 0xFFFF) as u16
    }

    #[inline]
    pub fn set_archive_part_info(&mut self, part: u16, total: u16) {
        self.archive_part_info = (part as u32) << 16 | total as u32;
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.signature_offset > 0
    }

    #[inline]
    pub fn has_comment(&self) -> bool {
        self.comment_size > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn populated() -> PackageHeader {
        let mut header = PackageHeader::new();
        header.flags = FLAG_HAS_SIGNATURES | FLAG_HAS_PACKAGE_COMMENT;
        header.set_compression_type(COMPRESSION_ZSTD);
        header.package_data_version = 7;
        header.metadata_version = 3;
        header.package_crc = 0xDEAD_BEEF;
        header.created_time = 1_700_000_000_000_000_000;
        header.modified_time = 1_700_000_000_500_000_000;
        header.locale_id = 0x0409;
        header.app_id = 730;
        header.vendor_id = VENDOR_ID_STEAM;
        header.index_start = 4096;
        header.index_size = 48;
        header.archive_chain_id = 0x1122_3344_5566_7788;
        header.set_archive_part_info(2, 3);
        header.comment_size = 20;
        header.comment_start = 4144;
        header.signature_offset = 4164;
        header
    }

    #[test]
    fn new_header_defaults() {
        let header = PackageHeader::new();
        assert_eq!(header.magic, NVPK_MAGIC);
        assert_eq!(header.format_version, 1);
        assert_eq!(header.package_data_version, 1);
        assert_eq!(header.metadata_version, 1);
        assert_eq!(header.archive_part_info, 0x0001_0001);
        assert_eq!(header.archive_part(), 1);
        assert_eq!(header.archive_total(), 1);
        assert_eq!(header.flags, 0);
        assert!(!header.is_signed());
        assert!(!header.has_comment());
        assert!(header.validate().is_ok());
    }

    #[test]
    fn encodes_magic_little_endian() {
        let bytes = PackageHeader::new().encode();
        assert_eq!(bytes.len(), 112);
        assert_eq!(&bytes[0..4], &[0x4B, 0x50, 0x56, 0x4E]);
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
    }

    #[test]
    fn example_round_trip_validates() {
        let header = PackageHeader::new();
        let decoded = PackageHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn populated_round_trip() {
        let header = populated();
        let mut out = Vec::new();
        assert_eq!(header.write_to(&mut out).unwrap(), 112);
        assert_eq!(PackageHeader::read_from(&mut &out[..]).unwrap(), header);
    }

    #[test]
    fn field_offsets() {
        let bytes = populated().encode();
        assert_eq!(LittleEndian::read_u64(&bytes[64..72]), 4096);
        assert_eq!(LittleEndian::read_u32(&bytes[88..92]), 0x0002_0003);
        assert_eq!(LittleEndian::read_u64(&bytes[104..112]), 4164);
    }

    #[test]
    fn magic_is_checked_before_anything_else() {
        // version and reserved are also wrong, but magic must win
        let mut bytes = [0xFFu8; 112];
        bytes[0..4].copy_from_slice(b"PK\x03\x04");
        let error = PackageHeader::decode(&bytes).unwrap_err();
        assert!(error.is_validation());
        assert!(error.message().contains("magic"));
        assert_eq!(error.field(), Some("Magic"));
    }

    #[rstest]
    #[case::format_version(4, 2, "FormatVersion")]
    #[case::reserved(44, 1, "Reserved")]
    fn decode_rejects_bad_fields(#[case] offset: usize, #[case] value: u32, #[case] field: &str) {
        let mut bytes = PackageHeader::new().encode();
        LittleEndian::write_u32(&mut bytes[offset..offset + 4], value);
        let error = PackageHeader::decode(&bytes).unwrap_err();
        assert!(error.is_validation());
        assert_eq!(error.field(), Some(field));
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(4)]
    #[case(64)]
    #[case(111)]
    fn truncated_header_is_corruption(#[case] len: usize) {
        let bytes = PackageHeader::new().encode();
        let error = PackageHeader::decode(&bytes[..len]).unwrap_err();
        assert!(error.is_corruption());
        assert_eq!(error.bytes_consumed(), Some(len as u64));
    }

    #[test]
    fn encode_preserves_malformed_headers() {
        let mut header = PackageHeader::new();
        header.reserved = 5;
        header.flags = 0xFFFF_FFFF;
        let bytes = header.encode();
        assert_eq!(LittleEndian::read_u32(&bytes[44..48]), 5);
        assert_eq!(LittleEndian::read_u32(&bytes[8..12]), 0xFFFF_FFFF);
        assert!(header.validate().is_err());
    }

    #[test]
    fn compression_type_preserves_features() {
        let mut header = PackageHeader::new();
        header.flags = 0x00FF;
        header.set_compression_type(2);
        assert_eq!(header.flags, 0x02FF);
        assert_eq!(header.features(), 0xFF);
        assert_eq!(header.compression_type(), 2);

        header.set_compression_type(COMPRESSION_NONE);
        assert_eq!(header.flags, 0x00FF);
    }

    #[test]
    fn features_do_not_touch_compression_bits() {
        let mut header = PackageHeader::new();
        header.set_compression_type(COMPRESSION_LZMA);
        header.set_feature(FLAG_METADATA_ONLY | FLAG_HAS_PER_FILE_TAGS);
        assert!(header.has_feature(FLAG_METADATA_ONLY));
        assert!(header.has_feature(FLAG_HAS_PER_FILE_TAGS));
        assert!(!header.has_feature(FLAG_HAS_SIGNATURES));

        header.clear_feature(FLAG_METADATA_ONLY);
        assert!(!header.has_feature(FLAG_METADATA_ONLY));
        assert_eq!(header.compression_type(), COMPRESSION_LZMA);

        // a flag outside bits 0-7 is ignored
        header.set_feature(0x0001_0000);
        assert_eq!(header.flags & FLAGS_MASK_RESERVED, 0);
    }

    #[rstest]
    #[case(1, 1, 0x0001_0001)]
    #[case(3, 10, 0x0003_000A)]
    #[case(0xFFFF, 0xFFFF, 0xFFFF_FFFF)]
    fn archive_part_info_packing(#[case] part: u16, #[case] total: u16, #[case] packed: u32) {
        let mut header = PackageHeader::new();
        header.set_archive_part_info(part, total);
        assert_eq!(header.archive_part_info, packed);
        assert_eq!(header.archive_part(), part);
        assert_eq!(header.archive_total(), total);
    }

    #[test]
    fn signed_and_comment_predicates() {
        let header = populated();
        assert!(header.is_signed());
        assert!(header.has_comment());
        assert!(header.validate().is_ok());
    }

    #[rstest]
    #[case::reserved_flags(|h: &mut PackageHeader| h.flags |= 0x0100_0000, "Flags")]
    #[case::compression(|h: &mut PackageHeader| h.set_compression_type(4), "Flags")]
    #[case::comment_size_only(|h: &mut PackageHeader| h.comment_size = 12, "CommentSize")]
    #[case::comment_start_only(|h: &mut PackageHeader| h.comment_start = 512, "CommentSize")]
    #[case::magic(|h: &mut PackageHeader| h.magic = 0, "Magic")]
    fn validate_rejects(#[case] corrupt: fn(&mut PackageHeader), #[case] field: &str) {
        let mut header = PackageHeader::new();
        corrupt(&mut header);
        let error = header.validate().unwrap_err();
        assert!(error.is_validation());
        assert_eq!(error.field(), Some(field));
    }

    proptest! {
        #[test]
        fn round_trip(words in any::<[u32; 11]>(), longs in any::<[u64; 8]>()) {
            let header = PackageHeader {
                magic:                NVPK_MAGIC,
                format_version:       FORMAT_VERSION,
                flags:                words[0],
                package_data_version: words[1],
                metadata_version:     words[2],
                package_crc:          words[3],
                created_time:         longs[0],
                modified_time:        longs[1],
                locale_id:            words[4],
                reserved:             0,
                app_id:               longs[2],
                vendor_id:            words[5],
                creator_id:           words[6],
                index_start:          longs[3],
                index_size:           longs[4],
                archive_chain_id:     longs[5],
                archive_part_info:    words[7],
                comment_size:         words[8],
                comment_start:        longs[6],
                signature_offset:     longs[7],
            };
            let bytes = header.encode();
            prop_assert_eq!(bytes.len(), 112);
            prop_assert_eq!(PackageHeader::decode(&bytes).unwrap(), header);
        }

        #[test]
        fn wrong_magic_always_rejected(magic in any::<u32>().prop_filter("not NVPK", |m| *m != NVPK_MAGIC),
                                       rest in proptest::collection::vec(any::<u8>(), 108)) {
            let mut bytes = magic.to_le_bytes().to_vec();
            bytes.extend_from_slice(&rest);
            let error = PackageHeader::decode(&bytes).unwrap_err();
            prop_assert!(error.is_validation());
            prop_assert!(error.message().contains("magic"));
        }

        #[test]
        fn short_buffers_are_corruption(len in 0usize..112) {
            let bytes = PackageHeader::new().encode();
            let error = PackageHeader::decode(&bytes[..len]).unwrap_err();
            prop_assert!(error.is_corruption());
            prop_assert!(error.bytes_consumed().unwrap() <= len as u64);
        }
    }
}
