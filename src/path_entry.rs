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

use crate::consts::PATH_ENTRY_HEADER_SIZE;
use crate::io::{FieldReader, FieldWriter};
use crate::result::{Result, Error, ErrorContext};

/// One name of a file: `PathLength (u16)` followed by that many UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathEntry {
    pub path_length: u16,
    pub path:        String,
}

impl PathEntry {
    /// Builds an entry with a matching length field. Paths that do not fit
    /// in a u16 length are rejected.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let path_length = length_u16(path.len(), "PathLength")?;
        Ok(PathEntry { path_length, path })
    }

    #[inline]
    pub fn size(&self) -> usize {
        PATH_ENTRY_HEADER_SIZE + self.path.len()
    }

    pub(crate) fn read_with<R: Read + ?Sized>(reader: &mut FieldReader<R>) -> Result<Self> {
        let path_length = reader.read_u16("PathLength")?;
        let path        = reader.read_string(path_length as u64, "Path")?;
        Ok(PathEntry { path_length, path })
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
        self.path_length = length_u16(self.path.len(), "PathLength")?;
        writer.write_u16(self.path_length, "PathLength")?;
        writer.write_bytes(self.path.as_bytes(), "Path")?;
        Ok(())
    }

    /// Writes the entry with `path_length` recomputed from the path.
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
        if self.path.trim().is_empty() {
            return Err(Error::validation(
                "path must not be empty or whitespace",
                ErrorContext::new("Path", &self.path, "non-empty path"),
            ));
        }

        if self.path_length as usize != self.path.len() {
            return Err(Error::validation(
                "path length does not match path",
                ErrorContext::new("PathLength", self.path_length, self.path.len().to_string()),
            ));
        }

        Ok(())
    }
}

/// Length fields on the wire are u16; anything longer cannot be represented.
pub(crate) fn length_u16(len: usize, field: &'static str) -> Result<u16> {
    match u16::try_from(len) {
        Ok(len) => Ok(len),
        Err(_) => Err(Error::validation(
            format!("{} exceeds {} bytes", field, u16::MAX),
            ErrorContext::new(field, len, format!("<= {}", u16::MAX)),
        )),
    }
}
