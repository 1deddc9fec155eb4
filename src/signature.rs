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

use crate::consts::SIGNATURE_HEADER_SIZE;
use crate::io::{FieldReader, FieldWriter};
use crate::path_entry::length_u16;
use crate::result::{Result, Error, ErrorContext};

/// One signature block. Only the envelope is handled here; producing and
/// checking `signature_data` is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub signature_type:      u32,
    pub signature_size:      u32,
    pub signature_flags:     u32,
    /// Unix seconds.
    pub signature_timestamp: u32,
    pub comment_length:      u16,
    pub signature_comment:   String,
    pub signature_data:      Vec<u8>,
}

fn size_u32(len: usize) -> Result<u32> {
    match u32::try_from(len) {
        Ok(len) => Ok(len),
        Err(_) => Err(Error::validation(
            format!("signature data exceeds {} bytes", u32::MAX),
            ErrorContext::new("SignatureSize", len, format!("<= {}", u32::MAX)),
        )),
    }
}

impl Signature {
    pub fn new(signature_type: u32, signature_timestamp: u32, signature_data: impl Into<Vec<u8>>) -> Result<Self> {
        let signature_data = signature_data.into();
        Ok(Signature {
            signature_type,
            signature_size: size_u32(signature_data.len())?,
            signature_timestamp,
            signature_data,
            ..Signature::default()
        })
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) -> Result<()> {
        let comment = comment.into();
        self.comment_length = length_u16(comment.len(), "CommentLength")?;
        self.signature_comment = comment;
        Ok(())
    }

    #[inline]
    pub fn has_flag(&self, flag: u32) -> bool {
        self.signature_flags & flag != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: u32) {
        self.signature_flags |= flag;
    }

    #[inline]
    pub fn clear_flag(&mut self, flag: u32) {
        self.signature_flags &= !flag;
    }

    #[inline]
    pub fn size(&self) -> usize {
        SIGNATURE_HEADER_SIZE + self.signature_comment.len() + self.signature_data.len()
    }

    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut reader = FieldReader::new(reader);

        let signature_type      = reader.read_u32("SignatureType")?;
        let signature_size      = reader.read_u32("SignatureSize")?;
        let signature_flags     = reader.read_u32("SignatureFlags")?;
        let signature_timestamp = reader.read_u32("SignatureTimestamp")?;
        let comment_length      = reader.read_u16("CommentLength")?;
        let signature_comment   = reader.read_string(comment_length as u64, "SignatureComment")?;
        let signature_data      = reader.read_bytes(signature_size as u64, "SignatureData")?;

        log::debug!("read signature: type {}, {} bytes", signature_type, signature_size);

        Ok(Signature {
            signature_type,
            signature_size,
            signature_flags,
            signature_timestamp,
            comment_length,
            signature_comment,
            signature_data,
        })
    }

    #[inline]
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut bytes)
    }

    /// Writes the block with `signature_size` and `comment_length` taken from
    /// the payload and comment.
    pub fn write_to(&mut self, writer: &mut impl Write) -> Result<u64> {
        self.comment_length = length_u16(self.signature_comment.len(), "CommentLength")?;
        self.signature_size = size_u32(self.signature_data.len())?;

        let mut writer = FieldWriter::new(writer);
        writer.write_u32(self.signature_type,      "SignatureType")?;
        writer.write_u32(self.signature_size,      "SignatureSize")?;
        writer.write_u32(self.signature_flags,     "SignatureFlags")?;
        writer.write_u32(self.signature_timestamp, "SignatureTimestamp")?;
        writer.write_u16(self.comment_length,      "CommentLength")?;
        if self.comment_length > 0 {
            writer.write_bytes(self.signature_comment.as_bytes(), "SignatureComment")?;
        }
        writer.write_bytes(&self.signature_data, "SignatureData")?;

        Ok(writer.written())
    }

    pub fn encode(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.size());
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.signature_type == 0 {
            return Err(Error::validation(
                "signature type must be set",
                ErrorContext::new("SignatureType", 0, "non-zero"),
            ));
        }

        if self.signature_data.is_empty() {
            return Err(Error::validation(
                "signature data must not be empty",
                ErrorContext::new("SignatureData", 0, "non-empty"),
            ));
        }

        if self.signature_size as usize != self.signature_data.len() {
            return Err(Error::validation(
                "signature size does not match signature data",
                ErrorContext::new("SignatureSize", self.signature_size, self.signature_data.len().to_string()),
            ));
        }

        if self.comment_length as usize != self.signature_comment.len() {
            return Err(Error::validation(
                "comment length does not match comment",
                ErrorContext::new("CommentLength", self.comment_length, self.signature_comment.len().to_string()),
            ));
        }

        Ok(())
    }
}
