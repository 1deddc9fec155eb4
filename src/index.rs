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

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::consts::{
    FILE_INDEX_HEADER_SIZE, INDEX_ENTRY_SIZE, DEFAULT_LARGE_ALLOCATION, DEFAULT_MAX_ALLOCATION,
};
use crate::io::{FieldReader, FieldWriter, READ_CHUNK_HINT};
use crate::memory::available_memory;
use crate::result::{Result, Error, ErrorContext};

/// Bounds on how much memory a decoded `EntryCount` may claim.
///
/// Counts needing no more than `large_allocation` bytes are always accepted.
/// Above that the requirement must also fit in `max_allocation` and in half of
/// the memory the system reports as available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLimits {
    pub large_allocation: u64,
    pub max_allocation:   u64,
}

impl IndexLimits {
    #[inline]
    pub fn new() -> Self {
        IndexLimits::default()
    }
}

impl Default for IndexLimits {
    #[inline]
    fn default() -> Self {
        Self {
            large_allocation: DEFAULT_LARGE_ALLOCATION,
            max_allocation:   DEFAULT_MAX_ALLOCATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndexEntry {
    pub file_id: u64,
    pub offset:  u64,
}

impl IndexEntry {
    #[inline]
    pub fn new(file_id: u64, offset: u64) -> Self {
        IndexEntry { file_id, offset }
    }

    fn read_with<R: Read + ?Sized>(reader: &mut FieldReader<R>) -> Result<Self> {
        let file_id = reader.read_u64("FileID")?;
        let offset  = reader.read_u64("Offset")?;
        Ok(IndexEntry { file_id, offset })
    }

    fn write_with<W: Write + ?Sized>(&self, writer: &mut FieldWriter<W>) -> Result<()> {
        writer.write_u64(self.file_id, "FileID")?;
        writer.write_u64(self.offset,  "Offset")?;
        Ok(())
    }
}

/// Directory mapping FileIDs to the offsets of their file entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileIndex {
    pub entry_count:        u32,
    pub reserved:           u32,
    pub first_entry_offset: u64,
    pub entries:            Vec<IndexEntry>,
}

impl FileIndex {
    #[inline]
    pub fn new(first_entry_offset: u64) -> Self {
        FileIndex {
            first_entry_offset,
            ..FileIndex::default()
        }
    }

    /// Appends an entry and keeps `entry_count` in step. Past `u32::MAX`
    /// entries the count sticks at `u32::MAX`; `validate` and `write_to`
    /// reject such an index.
    pub fn push(&mut self, file_id: u64, offset: u64) {
        self.entries.push(IndexEntry::new(file_id, offset));
        self.entry_count = entry_count_of(self.entries.len()).unwrap_or(u32::MAX);
    }

    pub fn get(&self, file_id: u64) -> Option<&IndexEntry> {
        self.entries.iter().find(|entry| entry.file_id == file_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn size(&self) -> usize {
        FILE_INDEX_HEADER_SIZE + self.entries.len() * INDEX_ENTRY_SIZE
    }

    #[inline]
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        Self::read_from_with_limits(reader, &IndexLimits::default())
    }

    pub fn read_from_with_limits(reader: &mut impl Read, limits: &IndexLimits) -> Result<Self> {
        let mut reader = FieldReader::new(reader);

        let entry_count        = reader.read_u32("EntryCount")?;
        let reserved           = reader.read_u32("Reserved")?;
        let first_entry_offset = reader.read_u64("FirstEntryOffset")?;

        check_allocation(entry_count, limits)?;

        // grows with the entries actually read
        let mut entries = Vec::with_capacity((entry_count as u64).min(READ_CHUNK_HINT / INDEX_ENTRY_SIZE as u64) as usize);
        for index in 0..entry_count {
            let entry = IndexEntry::read_with(&mut reader).map_err(|error| {
                let message = format!("failed to read entry {}: {}", index, error.message());
                error.with_message(message)
            })?;
            entries.push(entry);
        }

        log::debug!("read file index: {} entries, first entry at {}", entry_count, first_entry_offset);

        Ok(FileIndex {
            entry_count,
            reserved,
            first_entry_offset,
            entries,
        })
    }

    #[inline]
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut bytes)
    }

    /// Writes the index, deriving `entry_count` from the entries first.
    pub fn write_to(&mut self, writer: &mut impl Write) -> Result<u64> {
        self.entry_count = entry_count_of(self.entries.len())?;

        let mut writer = FieldWriter::new(writer);
        writer.write_u32(self.entry_count,        "EntryCount")?;
        writer.write_u32(self.reserved,           "Reserved")?;
        writer.write_u64(self.first_entry_offset, "FirstEntryOffset")?;

        for entry in &self.entries {
            entry.write_with(&mut writer)?;
        }

        Ok(writer.written())
    }

    pub fn encode(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.size());
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reserved != 0 {
            return Err(Error::validation(
                "reserved field must be 0",
                ErrorContext::new("Reserved", self.reserved, "0"),
            ));
        }

        if self.entry_count as usize != self.entries.len() {
            return Err(Error::validation(
                "entry count does not match number of entries",
                ErrorContext::new("EntryCount", self.entry_count, self.entries.len().to_string()),
            ));
        }

        let mut seen = HashMap::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.file_id == 0 {
                return Err(Error::validation(
                    format!("entry {} has a zero FileID", index),
                    ErrorContext::new("FileID", 0, "non-zero"),
                ));
            }

            if let Some(first) = seen.insert(entry.file_id, index) {
                return Err(Error::validation(
                    format!("duplicate FileID {} at entries {} and {}", entry.file_id, first, index),
                    ErrorContext::new("FileID", entry.file_id, "unique"),
                ));
            }
        }

        Ok(())
    }
}

fn entry_count_of(len: usize) -> Result<u32> {
    match u32::try_from(len) {
        Ok(count) => Ok(count),
        Err(_) => Err(Error::validation(
            "too many file index entries",
            ErrorContext::new("EntryCount", len, format!("<= {}", u32::MAX)),
        )),
    }
}

fn check_allocation(entry_count: u32, limits: &IndexLimits) -> Result<()> {
    let reject = |reason: &str, required: String| {
        log::warn!("rejecting file index with {} entries: {}", entry_count, reason);
        Err(Error::validation(
            format!("file index entry count too large: {}", reason),
            ErrorContext::new("EntryCount", entry_count, required),
        ))
    };

    if entry_count as u64 > (isize::MAX as u64) / INDEX_ENTRY_SIZE as u64 {
        return reject("exceeds addressable length", "addressable entry count".to_string());
    }

    let required = match (entry_count as u64).checked_mul(INDEX_ENTRY_SIZE as u64) {
        Some(required) => required,
        None => return reject("size overflows", "non-overflowing size".to_string()),
    };

    if required <= limits.large_allocation {
        return Ok(());
    }

    let limit = match available_memory() {
        Some(available) => limits.max_allocation.min(available / 2),
        None => limits.max_allocation,
    };

    if required > limit {
        return reject(
            &format!("{} bytes required, at most {} allowed", required, limit),
            format!("<= {} bytes", limit),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn index() -> FileIndex {
        let mut index = FileIndex::new(112);
        index.push(1, 112);
        index.push(2, 4096);
        index.push(0xFFFF_FFFF_FFFF, 8192);
        index
    }

    #[rstest]
    fn round_trip(mut index: FileIndex) {
        let bytes = index.encode().unwrap();
        assert_eq!(bytes.len(), 16 + 3 * 16);
        assert_eq!(bytes.len(), index.size());

        let decoded = FileIndex::decode(&bytes).unwrap();
        assert_eq!(decoded, index);
        assert!(decoded.validate().is_ok());
        assert_eq!(decoded.get(2).map(|entry| entry.offset), Some(4096));
        assert!(decoded.get(3).is_none());
    }

    #[test]
    fn encode_recomputes_stale_count() {
        let mut index = FileIndex::new(0);
        index.entries.push(IndexEntry::new(9, 10));
        index.entry_count = 42;

        let bytes = index.encode().unwrap();
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(index.entry_count, 1);
    }

    #[test]
    fn empty_index_is_valid() {
        let mut index = FileIndex::new(112);
        assert!(index.validate().is_ok());
        let bytes = index.encode().unwrap();
        assert_eq!(bytes.len(), 16);
        assert!(FileIndex::decode(&bytes).unwrap().is_empty());
    }

    #[rstest]
    #[case::entry_count(0, "EntryCount")]
    #[case::reserved(5, "Reserved")]
    #[case::first_entry_offset(12, "FirstEntryOffset")]
    #[case::first_file_id(16, "FileID")]
    #[case::first_offset(31, "Offset")]
    #[case::last_file_id(48, "FileID")]
    #[case::last_offset(63, "Offset")]
    fn truncation_names_the_field(mut index: FileIndex, #[case] len: usize, #[case] field: &str) {
        let bytes = index.encode().unwrap();
        let error = FileIndex::decode(&bytes[..len]).unwrap_err();
        assert!(error.is_corruption());
        assert_eq!(error.field(), Some(field));
        assert_eq!(error.bytes_consumed(), Some(len as u64));
    }

    #[rstest]
    fn truncated_entry_reports_its_position(mut index: FileIndex) {
        let bytes = index.encode().unwrap();
        let error = FileIndex::decode(&bytes[..40]).unwrap_err();
        assert!(error.message().starts_with("failed to read entry 1"));
    }

    #[test]
    fn huge_entry_count_is_rejected_before_allocating() {
        let mut bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(&[0; 12]);
        let error = FileIndex::decode(&bytes).unwrap_err();
        assert!(error.is_validation());
        assert_eq!(error.field(), Some("EntryCount"));
    }

    #[test]
    fn limits_are_configurable() {
        let limits = IndexLimits {
            large_allocation: 16,
            max_allocation:   32,
        };

        let mut two = FileIndex::new(0);
        two.push(1, 0);
        two.push(2, 0);
        let bytes = two.encode().unwrap();
        assert_eq!(FileIndex::read_from_with_limits(&mut &bytes[..], &limits).unwrap(), two);

        let mut three = two.clone();
        three.push(3, 0);
        let bytes = three.encode().unwrap();
        let error = FileIndex::read_from_with_limits(&mut &bytes[..], &limits).unwrap_err();
        assert!(error.is_validation());
    }

    #[test]
    fn gigabyte_count_on_short_input_is_corruption() {
        // 0x0400_0000 entries need exactly 1 GiB and pass the default gate
        let mut bytes = 0x0400_0000u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 12]);
        let error = FileIndex::decode(&bytes).unwrap_err();
        assert!(error.is_corruption());
        assert_eq!(error.bytes_consumed(), Some(16));
        assert!(error.message().starts_with("failed to read entry 0"));
    }

    #[test]
    fn entry_count_limits() {
        assert_eq!(entry_count_of(0).unwrap(), 0);
        assert_eq!(entry_count_of(u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn entry_count_beyond_u32_is_rejected() {
        let error = entry_count_of(u32::MAX as usize + 1).unwrap_err();
        assert!(error.is_validation());
        assert_eq!(error.field(), Some("EntryCount"));
    }

    #[test]
    fn small_counts_on_short_input_are_corruption() {
        let mut bytes = 1000u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 12]);
        assert!(FileIndex::decode(&bytes).unwrap_err().is_corruption());
    }

    #[rstest]
    fn validate_rejects_zero_file_id(mut index: FileIndex) {
        index.entries[1].file_id = 0;
        let error = index.validate().unwrap_err();
        assert!(error.is_validation());
        assert!(error.message().contains("entry 1"));
    }

    #[rstest]
    fn validate_reports_both_duplicate_indices(mut index: FileIndex) {
        index.push(2, 16384);
        let error = index.validate().unwrap_err();
        assert!(error.message().contains("entries 1 and 3"), "{}", error.message());
    }

    #[rstest]
    fn validate_rejects_count_mismatch(mut index: FileIndex) {
        index.entry_count = 7;
        assert_eq!(index.validate().unwrap_err().field(), Some("EntryCount"));
    }

    #[rstest]
    fn validate_rejects_reserved(mut index: FileIndex) {
        index.reserved = 1;
        assert_eq!(index.validate().unwrap_err().field(), Some("Reserved"));
    }

    proptest! {
        #[test]
        fn distinct_non_zero_ids_validate(ids in proptest::collection::hash_set(1u64.., 0..64)) {
            let mut index = FileIndex::new(112);
            for (position, id) in ids.iter().enumerate() {
                index.push(*id, position as u64 * 100);
            }
            prop_assert!(index.validate().is_ok());

            let bytes = index.encode().unwrap();
            prop_assert_eq!(FileIndex::decode(&bytes).unwrap(), index);
        }

        #[test]
        fn any_repeat_fails_validation(ids in proptest::collection::vec(1u64.., 1..32), pick in any::<prop::sample::Index>()) {
            let mut index = FileIndex::new(0);
            for id in &ids {
                index.push(*id, 0);
            }
            index.push(ids[pick.index(ids.len())], 0);
            prop_assert!(index.validate().is_err());
        }
    }
}
