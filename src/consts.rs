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

/// "NVPK", stored little-endian as `4B 50 56 4E`.
pub const NVPK_MAGIC: u32 = 0x4E56_504B;
pub const FORMAT_VERSION: u32 = 1;

pub const PACKAGE_HEADER_SIZE: usize = 112;
pub const FILE_INDEX_HEADER_SIZE: usize = 4 + 4 + 8;
pub const INDEX_ENTRY_SIZE: usize = 8 + 8;
pub const FILE_ENTRY_FIXED_SIZE: usize = 64;
pub const PATH_ENTRY_HEADER_SIZE: usize = 2;
pub const HASH_ENTRY_HEADER_SIZE: usize = 1 + 1 + 2;
pub const OPTIONAL_DATA_HEADER_SIZE: usize = 1 + 2;
pub const SIGNATURE_HEADER_SIZE: usize = 4 * 4 + 2;
pub const COMMENT_RESERVED_SIZE: usize = 3;

/// Upper bound for `PackageComment::comment_length`, terminator included.
pub const MAX_COMMENT_LENGTH: u32 = 1_048_575;

pub const DEFAULT_ARCHIVE_PART_INFO: u32 = 0x0001_0001;

// Flags: bits 0-7
pub const FLAG_HAS_SIGNATURES:       u32 = 1 << 0;
pub const FLAG_HAS_COMPRESSED_FILES: u32 = 1 << 1;
pub const FLAG_HAS_ENCRYPTED_FILES:  u32 = 1 << 2;
pub const FLAG_HAS_EXTENDED_ATTRS:   u32 = 1 << 3;
pub const FLAG_HAS_PACKAGE_COMMENT:  u32 = 1 << 4;
pub const FLAG_HAS_PER_FILE_TAGS:    u32 = 1 << 5;
pub const FLAG_HAS_SPECIAL_METADATA: u32 = 1 << 6;
pub const FLAG_METADATA_ONLY:        u32 = 1 << 7;

pub const FLAGS_MASK_FEATURES:         u32 = 0x0000_00FF;
pub const FLAGS_MASK_COMPRESSION_TYPE: u32 = 0x0000_FF00;
pub const FLAGS_MASK_RESERVED:         u32 = 0xFFFF_0000;
pub const FLAGS_SHIFT_COMPRESSION_TYPE: u32 = 8;

pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_ZSTD: u8 = 1;
pub const COMPRESSION_LZ4:  u8 = 2;
pub const COMPRESSION_LZMA: u8 = 3;
pub const MAX_COMPRESSION_TYPE: u8 = COMPRESSION_LZMA;

pub const ENCRYPTION_NONE:         u8 = 0x00;
pub const ENCRYPTION_AES256_GCM:   u8 = 0x01;
pub const ENCRYPTION_QUANTUM_SAFE: u8 = 0x02;

pub const HASH_TYPE_SHA256:   u8 = 0x00;
pub const HASH_TYPE_SHA512:   u8 = 0x01;
pub const HASH_TYPE_BLAKE3:   u8 = 0x02;
pub const HASH_TYPE_XXH3:     u8 = 0x03;
pub const HASH_TYPE_BLAKE2B:  u8 = 0x04;
pub const HASH_TYPE_BLAKE2S:  u8 = 0x05;
pub const HASH_TYPE_SHA3_256: u8 = 0x06;
pub const HASH_TYPE_SHA3_512: u8 = 0x07;
pub const HASH_TYPE_CRC32:    u8 = 0x08;
pub const HASH_TYPE_CRC64:    u8 = 0x09;

// Advisory tags only, nothing checks that a hash matches its purpose.
pub const HASH_PURPOSE_CONTENT_VERIFICATION: u8 = 0x00;
pub const HASH_PURPOSE_DEDUPLICATION:        u8 = 0x01;
pub const HASH_PURPOSE_INTEGRITY:            u8 = 0x02;
pub const HASH_PURPOSE_FAST_LOOKUP:          u8 = 0x03;
pub const HASH_PURPOSE_ERROR_DETECTION:      u8 = 0x04;

pub const OPTIONAL_DATA_TAGS:                  u8 = 0x00;
pub const OPTIONAL_DATA_PATH_ENCODING:         u8 = 0x01;
pub const OPTIONAL_DATA_PATH_FLAGS:            u8 = 0x02;
pub const OPTIONAL_DATA_COMPRESSION_DICTIONARY: u8 = 0x03;
pub const OPTIONAL_DATA_SOLID_GROUP_ID:        u8 = 0x04;
pub const OPTIONAL_DATA_FILE_SYSTEM_FLAGS:     u8 = 0x05;
pub const OPTIONAL_DATA_WINDOWS_ATTRIBUTES:    u8 = 0x06;
pub const OPTIONAL_DATA_EXTENDED_ATTRIBUTES:   u8 = 0x07;
pub const OPTIONAL_DATA_ACL:                   u8 = 0x08;

pub const SIGNATURE_TYPE_ML_DSA:  u32 = 0x01;
pub const SIGNATURE_TYPE_SLH_DSA: u32 = 0x02;
pub const SIGNATURE_TYPE_PGP:     u32 = 0x03;
pub const SIGNATURE_TYPE_X509:    u32 = 0x04;

pub const VENDOR_ID_NONE:         u32 = 0x0000_0000;
pub const VENDOR_ID_STEAM:        u32 = 0x5354_4541; // STEA
pub const VENDOR_ID_EPIC:         u32 = 0x4550_4943; // EPIC
pub const VENDOR_ID_GOG:          u32 = 0x474F_4720; // "GOG "
pub const VENDOR_ID_ITCH:         u32 = 0x4954_4348; // ITCH
pub const VENDOR_ID_HUMBLE:       u32 = 0x4855_4D42; // HUMB
pub const VENDOR_ID_MICROSOFT:    u32 = 0x4D49_4352; // MICR
pub const VENDOR_ID_PLAYSTATION:  u32 = 0x5053_4E59; // PSNY
pub const VENDOR_ID_XBOX:         u32 = 0x5842_4F58; // XBOX
pub const VENDOR_ID_NINTENDO:     u32 = 0x4E54_444F; // NTDO
pub const VENDOR_ID_UNITY:        u32 = 0x554E_4954; // UNIT
pub const VENDOR_ID_UNREAL:       u32 = 0x554E_5245; // UNRE
pub const VENDOR_ID_GITHUB:       u32 = 0x4749_5448; // GITH
pub const VENDOR_ID_GITLAB:       u32 = 0x4749_544C; // GITL

/// Above this many bytes the file index allocation gate starts consulting
/// available memory.
pub const DEFAULT_LARGE_ALLOCATION: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_MAX_ALLOCATION:   u64 = 10 * 1024 * 1024 * 1024;
