#![allow(dead_code)]

use std::io::{Cursor, Seek, SeekFrom, Write};

use novuspack::consts::*;
use novuspack::{FileEntry, FileIndex, PackageComment, PackageHeader, Signature};
use rstest::fixture;

pub struct SourceFile {
    pub file_id: u64,
    pub paths:   Vec<&'static str>,
    pub content: Vec<u8>,
}

pub fn source_files() -> Vec<SourceFile> {
    vec![
        SourceFile {
            file_id: 1,
            paths:   vec!["readme.txt"],
            content: b"NovusPack test package\n".to_vec(),
        },
        SourceFile {
            file_id: 2,
            paths:   vec!["assets/logo.bin", "assets/logo-alias.bin"],
            content: (0..=255u8).cycle().take(1000).collect(),
        },
        SourceFile {
            file_id: 0xABCD_0000_0000_0003,
            paths:   vec!["empty"],
            content: Vec::new(),
        },
    ]
}

pub struct PackageImage {
    pub bytes:   Vec<u8>,
    pub entries: Vec<FileEntry>,
}

/// Lays a package out the way a writer does: header placeholder, entries with
/// their content, index, comment, one signature, then the real header.
pub fn build_package(files: &[SourceFile], comment: &str) -> PackageImage {
    let mut out = Cursor::new(Vec::new());
    out.write_all(&[0; PACKAGE_HEADER_SIZE]).unwrap();

    let mut header = PackageHeader::new();
    header.created_time  = 1_700_000_000_000_000_000;
    header.modified_time = header.created_time;
    header.vendor_id     = VENDOR_ID_GITHUB;
    header.app_id        = 42;

    let mut index = FileIndex::new(PACKAGE_HEADER_SIZE as u64);
    let mut entries = Vec::new();

    for file in files {
        let mut entry = FileEntry::new(file.file_id);
        entry.original_size   = file.content.len() as u64;
        entry.stored_size     = file.content.len() as u64;
        entry.raw_checksum    = crc::crc32::checksum_ieee(&file.content);
        entry.stored_checksum = entry.raw_checksum;
        for path in &file.paths {
            entry.add_path(*path).unwrap();
        }
        entry.add_hash(HASH_TYPE_CRC32, HASH_PURPOSE_ERROR_DETECTION, entry.raw_checksum.to_le_bytes()).unwrap();

        let offset = out.position();
        entry.write_to(&mut out, &mut &file.content[..]).unwrap();
        index.push(file.file_id, offset);
        entries.push(entry);
    }

    header.index_start = out.position();
    header.index_size  = index.write_to(&mut out).unwrap();

    if !comment.is_empty() {
        let mut comment = PackageComment::new(comment).unwrap();
        header.comment_start = out.position();
        header.comment_size  = comment.write_to(&mut out).unwrap() as u32;
        header.set_feature(FLAG_HAS_PACKAGE_COMMENT);
    }

    header.signature_offset = out.position();
    header.set_feature(FLAG_HAS_SIGNATURES);
    let mut signature = Signature::new(SIGNATURE_TYPE_SLH_DSA, 1_700_000_000, vec![0x5A; 64]).unwrap();
    signature.write_to(&mut out).unwrap();

    out.seek(SeekFrom::Start(0)).unwrap();
    header.write_to(&mut out).unwrap();

    PackageImage {
        bytes: out.into_inner(),
        entries,
    }
}

#[fixture]
pub fn package() -> PackageImage {
    build_package(&source_files(), "built by the integration tests")
}
