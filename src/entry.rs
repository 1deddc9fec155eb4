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

use crate::consts::FILE_ENTRY_FIXED_SIZE;
use crate::hash_entry::HashEntry;
use crate::io::{FieldReader, FieldWriter};
use crate::optional_data::OptionalDataEntry;
use crate::path_entry::PathEntry;
use crate::result::{Result, Error, ErrorContext};

/// Per-file record: a 64 byte fixed part followed by a variable section
/// holding, in this order, the paths, the hashes and the optional data.
///
/// `hash_data_offset` and `optional_data_offset` are relative to the start of
/// the variable section. All counts, lengths and offsets are derived from the
/// sub-entries when writing; call [`FileEntry::update_layout`] to refresh
/// them without writing.
///
/// The file content (`stored_size` bytes) follows the structure in a package
/// but is not owned by this type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileEntry {
    pub file_id:              u64,
    pub original_size:        u64,
    pub stored_size:          u64,
    pub raw_checksum:         u32,
    pub stored_checksum:      u32,
    pub file_version:         u32,
    pub metadata_version:     u32,
    pub path_count:           u16,
    pub file_type:            u16,
    pub compression_type:     u8,
    pub compression_level:    u8,
    pub encryption_type:      u8,
    pub hash_count:           u8,
    pub hash_data_offset:     u32,
    pub hash_data_len:        u16,
    pub optional_data_len:    u16,
    pub optional_data_offset: u32,
    pub reserved:             u32,

    pub paths:         Vec<PathEntry>,
    pub hashes:        Vec<HashEntry>,
    pub optional_data: Vec<OptionalDataEntry>,
}

struct Layout {
    paths:    usize,
    hashes:   usize,
    optional: usize,
}

impl FileEntry {
    pub fn new(file_id: u64) -> Self {
        FileEntry {
            file_id,
            file_version:     1,
            metadata_version: 1,
            ..FileEntry::default()
        }
    }

    #[inline]
    pub fn fixed_size(&self) -> usize {
        FILE_ENTRY_FIXED_SIZE
    }

    #[inline]
    pub fn variable_size(&self) -> usize {
        let layout = self.layout();
        layout.paths + layout.hashes + layout.optional
    }

    /// Structure size, not counting the file content.
    #[inline]
    pub fn size(&self) -> usize {
        self.fixed_size() + self.variable_size()
    }

    fn layout(&self) -> Layout {
        Layout {
            paths:    self.paths.iter().map(PathEntry::size).sum(),
            hashes:   self.hashes.iter().map(HashEntry::size).sum(),
            optional: self.optional_data.iter().map(OptionalDataEntry::size).sum(),
        }
    }

    pub fn add_path(&mut self, path: impl Into<String>) -> Result<()> {
        self.paths.push(PathEntry::new(path)?);
        self.update_layout().map_err(|error| {
            self.paths.pop();
            error
        })
    }

    pub fn add_hash(&mut self, hash_type: u8, hash_purpose: u8, hash_data: impl Into<Vec<u8>>) -> Result<()> {
        self.hashes.push(HashEntry::new(hash_type, hash_purpose, hash_data)?);
        self.update_layout().map_err(|error| {
            self.hashes.pop();
            error
        })
    }

    pub fn add_optional_data(&mut self, data_type: u8, data: impl Into<Vec<u8>>) -> Result<()> {
        self.optional_data.push(OptionalDataEntry::new(data_type, data)?);
        self.update_layout().map_err(|error| {
            self.optional_data.pop();
            error
        })
    }

    /// Recomputes `path_count`, `hash_count` and the section offsets and
    /// lengths from the sub-entries. Fails, leaving the fields untouched, when
    /// a value does not fit its wire field.
    pub fn update_layout(&mut self) -> Result<()> {
        let layout = self.layout();

        let path_count           = fit::<u16>(self.paths.len(), "PathCount")?;
        let hash_count           = fit::<u8>(self.hashes.len(), "HashCount")?;
        let hash_data_offset     = fit::<u32>(layout.paths, "HashDataOffset")?;
        let hash_data_len        = fit::<u16>(layout.hashes, "HashDataLen")?;
        let optional_data_offset = fit::<u32>(layout.paths + layout.hashes, "OptionalDataOffset")?;
        let optional_data_len    = fit::<u16>(layout.optional, "OptionalDataLen")?;

        self.path_count           = path_count;
        self.hash_count           = hash_count;
        self.hash_data_offset     = hash_data_offset;
        self.hash_data_len        = hash_data_len;
        self.optional_data_offset = optional_data_offset;
        self.optional_data_len    = optional_data_len;

        Ok(())
    }

    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut reader = FieldReader::new(reader);

        let mut entry = FileEntry {
            file_id:              reader.read_u64("FileID")?,
            original_size:        reader.read_u64("OriginalSize")?,
            stored_size:          reader.read_u64("StoredSize")?,
            raw_checksum:         reader.read_u32("RawChecksum")?,
            stored_checksum:      reader.read_u32("StoredChecksum")?,
            file_version:         reader.read_u32("FileVersion")?,
            metadata_version:     reader.read_u32("MetadataVersion")?,
            path_count:           reader.read_u16("PathCount")?,
            file_type:            reader.read_u16("Type")?,
            compression_type:     reader.read_u8("CompressionType")?,
            compression_level:    reader.read_u8("CompressionLevel")?,
            encryption_type:      reader.read_u8("EncryptionType")?,
            hash_count:           reader.read_u8("HashCount")?,
            hash_data_offset:     reader.read_u32("HashDataOffset")?,
            hash_data_len:        reader.read_u16("HashDataLen")?,
            optional_data_len:    reader.read_u16("OptionalDataLen")?,
            optional_data_offset: reader.read_u32("OptionalDataOffset")?,
            reserved:             reader.read_u32("Reserved")?,
            ..FileEntry::default()
        };

        if entry.reserved != 0 {
            return Err(Error::validation(
                "reserved field must be 0",
                ErrorContext::new("Reserved", entry.reserved, "0"),
            ).with_consumed(reader.consumed()));
        }

        let start = reader.consumed();

        entry.paths.reserve(entry.path_count as usize);
        for index in 0..entry.path_count {
            let path = PathEntry::read_with(&mut reader).map_err(|error| {
                let message = format!("failed to read path entry {}: {}", index, error.message());
                error.with_message(message)
            })?;
            entry.paths.push(path);
        }

        let offset = reader.consumed() - start;
        if entry.hash_data_offset as u64 != offset {
            return Err(Error::validation(
                "hash data offset does not follow the paths",
                ErrorContext::new("HashDataOffset", entry.hash_data_offset, offset.to_string()),
            ).with_consumed(reader.consumed()));
        }

        entry.hashes.reserve(entry.hash_count as usize);
        for index in 0..entry.hash_count {
            let hash = HashEntry::read_with(&mut reader).map_err(|error| {
                let message = format!("failed to read hash entry {}: {}", index, error.message());
                error.with_message(message)
            })?;
            entry.hashes.push(hash);
        }

        let hashes_len = reader.consumed() - start - offset;
        if entry.hash_data_len as u64 != hashes_len {
            return Err(Error::validation(
                "hash data length does not match the hash entries",
                ErrorContext::new("HashDataLen", entry.hash_data_len, hashes_len.to_string()),
            ).with_consumed(reader.consumed()));
        }

        let offset = reader.consumed() - start;
        if entry.optional_data_offset as u64 != offset {
            return Err(Error::validation(
                "optional data offset does not follow the hashes",
                ErrorContext::new("OptionalDataOffset", entry.optional_data_offset, offset.to_string()),
            ).with_consumed(reader.consumed()));
        }

        let mut remaining = entry.optional_data_len as usize;
        while remaining > 0 {
            let data = OptionalDataEntry::read_within(&mut reader, remaining).map_err(|error| {
                let message = format!("failed to read optional data entry {}: {}", entry.optional_data.len(), error.message());
                error.with_message(message)
            })?;
            remaining -= data.size();
            entry.optional_data.push(data);
        }

        log::debug!("read file entry {}: {} paths, {} hashes, {} optional data entries",
            entry.file_id, entry.paths.len(), entry.hashes.len(), entry.optional_data.len());

        Ok(entry)
    }

    #[inline]
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut bytes)
    }

    fn write_structure<W: Write + ?Sized>(&mut self, writer: &mut FieldWriter<W>) -> Result<()> {
        self.update_layout()?;

        writer.write_u64(self.file_id,              "FileID")?;
        writer.write_u64(self.original_size,        "OriginalSize")?;
        writer.write_u64(self.stored_size,          "StoredSize")?;
        writer.write_u32(self.raw_checksum,         "RawChecksum")?;
        writer.write_u32(self.stored_checksum,      "StoredChecksum")?;
        writer.write_u32(self.file_version,         "FileVersion")?;
        writer.write_u32(self.metadata_version,     "MetadataVersion")?;
        writer.write_u16(self.path_count,           "PathCount")?;
        writer.write_u16(self.file_type,            "Type")?;
        writer.write_u8(self.compression_type,      "CompressionType")?;
        writer.write_u8(self.compression_level,     "CompressionLevel")?;
        writer.write_u8(self.encryption_type,       "EncryptionType")?;
        writer.write_u8(self.hash_count,            "HashCount")?;
        writer.write_u32(self.hash_data_offset,     "HashDataOffset")?;
        writer.write_u16(self.hash_data_len,        "HashDataLen")?;
        writer.write_u16(self.optional_data_len,    "OptionalDataLen")?;
        writer.write_u32(self.optional_data_offset, "OptionalDataOffset")?;
        writer.write_u32(self.reserved,             "Reserved")?;

        for path in &mut self.paths {
            path.write_with(writer)?;
        }

        for hash in &mut self.hashes {
            hash.write_with(writer)?;
        }

        for data in &mut self.optional_data {
            data.write_with(writer)?;
        }

        Ok(())
    }

    /// Writes the fixed part and the variable section only. The content does
    /// not need to be at hand, so a package writer can emit the structure and
    /// stream the content separately.
    pub fn write_meta_to(&mut self, writer: &mut impl Write) -> Result<u64> {
        let mut writer = FieldWriter::new(writer);
        self.write_structure(&mut writer)?;
        Ok(writer.written())
    }

    pub fn encode_meta(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.size());
        self.write_meta_to(&mut buffer)?;
        Ok(buffer)
    }

    /// Writes the structure followed by exactly `stored_size` bytes taken from
    /// `content`.
    pub fn write_to(&mut self, writer: &mut impl Write, content: &mut impl Read) -> Result<u64> {
        let mut writer = FieldWriter::new(writer);
        self.write_structure(&mut writer)?;

        let copied = writer.copy_from(content, self.stored_size, "Data")?;
        if copied != self.stored_size {
            return Err(Error::validation(
                format!("file content ended after {} of {} bytes", copied, self.stored_size),
                ErrorContext::new("StoredSize", self.stored_size, format!("{} bytes of content", copied)),
            ));
        }

        log::debug!("wrote file entry {}: {} bytes of structure, {} bytes of content",
            self.file_id, writer.written() - copied, copied);

        Ok(writer.written())
    }

    pub fn encode(&mut self, content: &[u8]) -> Result<Vec<u8>> {
        if content.len() as u64 != self.stored_size {
            return Err(Error::validation(
                "content length does not match stored size",
                ErrorContext::new("StoredSize", self.stored_size, content.len().to_string()),
            ));
        }

        let mut buffer = Vec::with_capacity(self.size() + content.len());
        self.write_to(&mut buffer, &mut &content[..])?;
        Ok(buffer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_id == 0 {
            return Err(Error::validation(
                "file ID cannot be zero",
                ErrorContext::new("FileID", 0, "non-zero"),
            ));
        }

        if self.reserved != 0 {
            return Err(Error::validation(
                "reserved field must be 0",
                ErrorContext::new("Reserved", self.reserved, "0"),
            ));
        }

        if self.paths.is_empty() {
            return Err(Error::validation(
                "file entry must have at least one path",
                ErrorContext::new("PathCount", self.path_count, ">= 1"),
            ));
        }

        if self.path_count as usize != self.paths.len() {
            return Err(Error::validation(
                "path count does not match number of paths",
                ErrorContext::new("PathCount", self.path_count, self.paths.len().to_string()),
            ));
        }

        if self.hash_count as usize != self.hashes.len() {
            return Err(Error::validation(
                "hash count does not match number of hashes",
                ErrorContext::new("HashCount", self.hash_count, self.hashes.len().to_string()),
            ));
        }

        for (index, path) in self.paths.iter().enumerate() {
            path.validate().map_err(|error| {
                let message = format!("path entry {}: {}", index, error.message());
                error.with_message(message)
            })?;
        }

        for (index, hash) in self.hashes.iter().enumerate() {
            hash.validate().map_err(|error| {
                let message = format!("hash entry {}: {}", index, error.message());
                error.with_message(message)
            })?;
        }

        for (index, data) in self.optional_data.iter().enumerate() {
            data.validate().map_err(|error| {
                let message = format!("optional data entry {}: {}", index, error.message());
                error.with_message(message)
            })?;
        }

        let layout = self.layout();
        let variable_size = layout.paths + layout.hashes + layout.optional;

        if self.hash_data_len as usize != layout.hashes {
            return Err(Error::validation(
                "hash data length does not match the hash entries",
                ErrorContext::new("HashDataLen", self.hash_data_len, layout.hashes.to_string()),
            ));
        }

        if self.optional_data_len as usize != layout.optional {
            return Err(Error::validation(
                "optional data length does not match the optional data entries",
                ErrorContext::new("OptionalDataLen", self.optional_data_len, layout.optional.to_string()),
            ));
        }

        for (field, offset, expected) in [
            ("HashDataOffset",     self.hash_data_offset,     layout.paths),
            ("OptionalDataOffset", self.optional_data_offset, layout.paths + layout.hashes),
        ] {
            if offset as usize > variable_size {
                return Err(Error::validation(
                    format!("{} points outside the variable section", field),
                    ErrorContext::new(field, offset, format!("<= {}", variable_size)),
                ));
            }

            if offset as usize != expected {
                return Err(Error::validation(
                    format!("{} does not match the preceding sections", field),
                    ErrorContext::new(field, offset, expected.to_string()),
                ));
            }
        }

        Ok(())
    }
}

fn fit<T: TryFrom<usize>>(value: usize, field: &'static str) -> Result<T> {
    match T::try_from(value) {
        Ok(value) => Ok(value),
        Err(_) => Err(Error::validation(
            format!("{} does not fit its field", field),
            ErrorContext::new(field, value, format!("fits in {} bytes", std::mem::size_of::<T>())),
        )),
    }
}
