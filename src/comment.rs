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

use crate::consts::{MAX_COMMENT_LENGTH, COMMENT_RESERVED_SIZE};
use crate::io::{FieldReader, FieldWriter};
use crate::result::{Result, Error, ErrorContext};

/// The package comment stored at `PackageHeader::comment_start`.
///
/// On the wire the text is NUL terminated and `comment_length` counts the
/// terminator; an empty comment has length 0 and no terminator. `text` never
/// holds the terminator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageComment {
    pub comment_length: u32,
    text:               String,
    pub reserved:       [u8; COMMENT_RESERVED_SIZE],
}

fn embedded_nul(bytes: &[u8]) -> Result<()> {
    match bytes.iter().position(|&byte| byte == 0) {
        Some(position) => Err(Error::validation(
            format!("comment contains an embedded NUL at position {}", position),
            ErrorContext::new("Comment", position, "no embedded NUL"),
        )),
        None => Ok(()),
    }
}

fn check_length(length: u64) -> Result<()> {
    if length > MAX_COMMENT_LENGTH as u64 {
        return Err(Error::validation(
            "comment is too long",
            ErrorContext::new("CommentLength", length, format!("<= {}", MAX_COMMENT_LENGTH)),
        ));
    }
    Ok(())
}

impl PackageComment {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let mut comment = PackageComment::default();
        comment.set_text(text)?;
        Ok(comment)
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text. A single trailing NUL is accepted and dropped.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        let mut text = text.into();
        if text.ends_with('\0') {
            text.pop();
        }

        embedded_nul(text.as_bytes())?;

        let length = if text.is_empty() { 0 } else { text.len() as u64 + 1 };
        check_length(length)?;

        self.comment_length = length as u32;
        self.text = text;
        Ok(())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[inline]
    pub fn size(&self) -> usize {
        4 + self.comment_length as usize + COMMENT_RESERVED_SIZE
    }

    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut reader = FieldReader::new(reader);

        let comment_length = reader.read_u32("CommentLength")?;
        check_length(comment_length as u64).map_err(|error| error.with_consumed(reader.consumed()))?;

        // an empty comment is stored with length 0, never as a lone terminator
        if comment_length == 1 {
            return Err(Error::validation(
                "empty comment must have length 0",
                ErrorContext::new("CommentLength", comment_length, "0 or >= 2"),
            ).with_consumed(reader.consumed()));
        }

        let text = if comment_length == 0 {
            String::new()
        } else {
            let mut bytes = reader.read_bytes(comment_length as u64, "Comment")?;
            if bytes.pop() != Some(0) {
                return Err(Error::validation(
                    "comment is not NUL terminated",
                    ErrorContext::new("Comment", comment_length, "NUL terminated string"),
                ).with_consumed(reader.consumed()));
            }

            embedded_nul(&bytes).map_err(|error| error.with_consumed(reader.consumed()))?;

            match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(error) => {
                    return Err(Error::validation(
                        "comment is not valid UTF-8",
                        ErrorContext::new("Comment", error.utf8_error(), "valid UTF-8"),
                    ).with_consumed(reader.consumed()));
                }
            }
        };

        let mut reserved = [0u8; COMMENT_RESERVED_SIZE];
        reader.fill(&mut reserved, "Reserved")?;

        let comment = PackageComment {
            comment_length,
            text,
            reserved,
        };
        comment.check_reserved().map_err(|error| error.with_consumed(reader.consumed()))?;

        Ok(comment)
    }

    #[inline]
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut bytes)
    }

    pub fn write_to(&mut self, writer: &mut impl Write) -> Result<u64> {
        let length = if self.text.is_empty() { 0 } else { self.text.len() as u64 + 1 };
        check_length(length)?;
        self.comment_length = length as u32;

        let mut writer = FieldWriter::new(writer);
        writer.write_u32(self.comment_length, "CommentLength")?;
        if self.comment_length > 0 {
            writer.write_bytes(self.text.as_bytes(), "Comment")?;
            writer.write_u8(0, "Comment")?;
        }
        writer.write_bytes(&self.reserved, "Reserved")?;

        Ok(writer.written())
    }

    pub fn encode(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.size());
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    fn check_reserved(&self) -> Result<()> {
        match self.reserved.iter().position(|&byte| byte != 0) {
            Some(index) => Err(Error::validation(
                format!("reserved byte {} must be zero", index),
                ErrorContext::new("Reserved", self.reserved[index], "0"),
            )),
            None => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_length(self.comment_length as u64)?;
        embedded_nul(self.text.as_bytes())?;

        let expected = if self.text.is_empty() { 0 } else { self.text.len() + 1 };
        if self.comment_length as usize != expected {
            return Err(Error::validation(
                "comment length does not match comment",
                ErrorContext::new("CommentLength", self.comment_length, expected.to_string()),
            ));
        }

        self.check_reserved()
    }
}
