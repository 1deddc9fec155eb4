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

use crate::consts::HASH_ENTRY_HEADER_SIZE;
use crate::io::{FieldReader, FieldWriter};
use crate::path_entry::length_u16;
use crate::result::{Result, Error, ErrorContext};

/// A stored digest of a file. `hash_type` and `hash_purpose` are the
/// `HASH_TYPE_*` and `HASH_PURPOSE_*` codes; neither is interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashEntry {
    pub hash_type:    u8,
    pub hash_purpose: u8,
    pub hash_length:  u16,
    pub hash_data:    Vec<u8>,
}

impl HashEntry {
    pub fn new(hash_type: u8, hash_purpose: u8, hash_data: impl Into<Vec<u8>>) -> Result<Self> {
        let hash_data = hash_data.into();
        let hash_length = length_u16(hash_data.len(), "HashLength")?;
        Ok(HashEntry {
            hash_type,
            hash_purpose,
            hash_length,
            hash_data,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        HASH_ENTRY_HEADER_SIZE + self.hash_data.len()
    }

    pub(crate) fn read_with<R: Read + ?Sized>(reader: &mut FieldReader<R>) -> Result<Self> {
        let hash_type    = reader.read_u8("HashType")?;
        let hash_purpose = reader.read_u8("HashPurpose")?;
        let hash_length  = reader.read_u16("HashLength")?;
        let hash_data    = reader.read_bytes(hash_length as u64, "HashData")?;

        Ok(HashEntry {
            hash_type,
            hash_purpose,
            hash_length,
            hash_data,
        })
    }

    #[inline]
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        Self::read_with(&mut FieldReader::new(reader))
    }

    #[inline]
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut bytes)
    }

    pub(crate) fn write_with<W: Write + ?Sized>(&mut self, writer: &mut FieldWriter<W>) -> Result<()> {
        self.hash_length = length_u16(self.hash_data.len(), "HashLength")?;
        writer.write_u8(self.hash_type,     "HashType")?;
        writer.write_u8(self.hash_purpose,  "HashPurpose")?;
        writer.write_u16(self.hash_length,  "HashLength")?;
        writer.write_bytes(&self.hash_data, "HashData")?;
        Ok(())
    }

    pub fn write_to(&mut self, writer: &mut impl Write) -> Result<u64> {
        let mut writer = FieldWriter::new(writer);
        self.write_with(&mut writer)?;
        Ok(writer.written())
    }

    pub fn encode(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.size());
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hash_data.is_empty() {
            return Err(Error::validation(
                "hash data must not be empty",
                ErrorContext::new("HashData", 0, "non-empty"),
            ));
        }

        if self.hash_length as usize != self.hash_data.len() {
            return Err(Error::validation(
                "hash length does not match hash data",
                ErrorContext::new("HashLength", self.hash_length, self.hash_data.len().to_string()),
            ));
        }

        Ok(())
    }
}
