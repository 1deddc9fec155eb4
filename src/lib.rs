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

//! Reading and writing the structures of a NovusPack (`.nvpk`) package.
//!
//! A package is laid out as
//!
//! ```text
//! PackageHeader            112 bytes at offset 0
//! FileEntry + content      repeated, located through the index
//! FileIndex                at header.index_start
//! PackageComment           at header.comment_start, optional
//! Signature                zero or more, from header.signature_offset
//! ```
//!
//! Each structure is decoded and encoded on its own; putting them together
//! and seeking between them is left to the caller.

pub(crate) mod io;

pub mod result;
pub use self::result::{Result, Error, ErrorKind, ErrorContext};

pub mod consts;

pub mod memory;

pub mod header;
pub use self::header::PackageHeader;

pub mod index;
pub use self::index::{FileIndex, IndexEntry, IndexLimits};

pub mod path_entry;
pub use self::path_entry::PathEntry;

pub mod hash_entry;
pub use self::hash_entry::HashEntry;

pub mod optional_data;
pub use self::optional_data::OptionalDataEntry;

pub mod entry;
pub use self::entry::FileEntry;

pub mod signature;
pub use self::signature::Signature;

pub mod comment;
pub use self::comment::PackageComment;
