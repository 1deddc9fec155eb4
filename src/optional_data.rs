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

use crate::consts::OPTIONAL_DATA_HEADER_SIZE;
use crate::io::{FieldReader, FieldWriter};
use crate::path_entry::length_u16;
use crate::result::{Result, Error, ErrorContext};

/// Tagged opaque blob (`OPTIONAL_DATA_*` type codes).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionalDataEntry {
    pub data_type:   u8,
    pub data_length: u16,
    pub data:        Vec<u8>,
}

impl OptionalDataEntry {
    pub fn new(data_type: u8, data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        let data_length = length_u16(data.len(), "DataLength")?;
        Ok(OptionalDataEntry {
            data_type,
            data_length,
            data,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        OPTIONAL_DATA_HEADER_SIZE + self.data.len()
    }

    pub(crate) fn read_with<R: Read + ?Sized>(reader: &mut FieldReader<R>) -> Result<Self> {
        let data_type   = reader.read_u8("DataType")?;
        let data_length = reader.read_u16("DataLength")?;
        let data        = reader.read_bytes(data_length as u64, "Data")?;

        Ok(OptionalDataEntry {
            data_type,
            data_length,
            data,
        })
    }

    /// Reads one entry that has to fit in the `budget` bytes left of its
    /// section. A header or payload that would cross the end of the section
    /// is rejected before the payload is read.
    pub(crate) fn read_within<R: Read + ?Sized>(reader: &mut FieldReader<R>, budget: usize) -> Result<Self> {
        if budget < OPTIONAL_DATA_HEADER_SIZE {
            return Err(Error::validation(
                "optional data section ends inside an entry header",
                ErrorContext::new("OptionalDataLen", budget, format!(">= {} bytes remaining", OPTIONAL_DATA_HEADER_SIZE)),
            ).with_consumed(reader.consumed()));
        }

        let data_type   = reader.read_u8("DataType")?;
        let data_length = reader.read_u16("DataLength")?;

        let remaining = budget - OPTIONAL_DATA_HEADER_SIZE;
        if data_length as usize > remaining {
            return Err(Error::validation(
                "optional data entry overruns its section",
                ErrorContext::new("DataLength", data_length, format!("<= {}", remaining)),
            ).with_consumed(reader.consumed()));
        }

        let data = reader.read_bytes(data_length as u64, "Data")?;

        Ok(OptionalDataEntry {
            data_type,
            data_length,
            data,
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
        self.data_length = length_u16(self.data.len(), "DataLength")?;
        writer.write_u8(self.data_type,    "DataType")?;
        writer.write_u16(self.data_length, "DataLength")?;
        writer.write_bytes(&self.data,     "Data")?;
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
        if self.data.is_empty() {
            return Err(Error::validation(
                "optional data must not be empty",
                ErrorContext::new("Data", 0, "non-empty"),
            ));
        }

        if self.data_length as usize != self.data.len() {
            return Err(Error::validation(
                "data length does not match data",
                ErrorContext::new("DataLength", self.data_length, self.data.len().to_string()),
            ));
        }

        Ok(())
    }
}
