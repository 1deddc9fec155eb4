use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::result::{Result, Error, ErrorContext};

// Untrusted length fields never size an allocation up front beyond this.
pub(crate) const READ_CHUNK_HINT: u64 = 64 * 1024;

/// Sequential little-endian field reader. Every read names the field it is
/// for, so a short read is reported as Corruption with the field and the
/// number of bytes consumed so far, and any other failure as IO.
pub(crate) struct FieldReader<'a, R: ?Sized> {
    inner:    &'a mut R,
    consumed: u64,
}

impl<'a, R: Read + ?Sized> FieldReader<'a, R> {
    #[inline]
    pub(crate) fn new(inner: &'a mut R) -> Self {
        FieldReader {
            inner,
            consumed: 0,
        }
    }

    #[inline]
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }

    fn truncated(&mut self, field: &'static str, filled: usize, wanted: u64) -> Error {
        self.consumed += filled as u64;
        Error::corruption(
            format!("failed to read {}: incomplete data (read {} of {} bytes)", field, filled, wanted),
            ErrorContext::new(field, self.consumed, format!("{} bytes", wanted)),
            self.consumed,
        )
    }

    fn failed(&mut self, field: &'static str, filled: usize, wanted: u64, error: std::io::Error) -> Error {
        self.consumed += filled as u64;
        Error::io(
            format!("failed to read {}", field),
            error,
            ErrorContext::new(field, self.consumed, format!("{} bytes", wanted)),
        ).with_consumed(self.consumed)
    }

    pub(crate) fn fill(&mut self, buffer: &mut [u8], field: &'static str) -> Result<()> {
        let wanted = buffer.len() as u64;
        let mut filled = 0usize;
        while filled < buffer.len() {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => {
                    return Err(self.truncated(field, filled, wanted));
                },
                Ok(count) => {
                    filled += count;
                },
                Err(error) => match error.kind() {
                    std::io::ErrorKind::Interrupted => {},
                    std::io::ErrorKind::UnexpectedEof => {
                        return Err(self.truncated(field, filled, wanted));
                    },
                    _ => {
                        return Err(self.failed(field, filled, wanted, error));
                    }
                }
            }
        }
        self.consumed += wanted;
        Ok(())
    }

    #[inline]
    pub(crate) fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        let mut buffer = [0; 1];
        self.fill(&mut buffer, field)?;
        Ok(buffer[0])
    }

    #[inline]
    pub(crate) fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        let mut buffer = [0; 2];
        self.fill(&mut buffer, field)?;
        Ok(LittleEndian::read_u16(&buffer))
    }

    #[inline]
    pub(crate) fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        let mut buffer = [0; 4];
        self.fill(&mut buffer, field)?;
        Ok(LittleEndian::read_u32(&buffer))
    }

    #[inline]
    pub(crate) fn read_u64(&mut self, field: &'static str) -> Result<u64> {
        let mut buffer = [0; 8];
        self.fill(&mut buffer, field)?;
        Ok(LittleEndian::read_u64(&buffer))
    }

    /// Reads exactly `len` bytes. The buffer grows with the data actually
    /// delivered, so a forged length on a short input costs nothing.
    pub(crate) fn read_bytes(&mut self, len: u64, field: &'static str) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(len.min(READ_CHUNK_HINT) as usize);
        let result = (&mut *self.inner).take(len).read_to_end(&mut buffer);
        let filled = buffer.len();

        match result {
            Ok(_) if filled as u64 == len => {
                self.consumed += len;
                Ok(buffer)
            },
            Ok(_) => Err(self.truncated(field, filled, len)),
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(self.truncated(field, filled, len))
            },
            Err(error) => Err(self.failed(field, filled, len, error)),
        }
    }

    pub(crate) fn read_string(&mut self, len: u64, field: &'static str) -> Result<String> {
        let bytes = self.read_bytes(len, field)?;
        match String::from_utf8(bytes) {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::validation(
                format!("{} is not valid UTF-8", field),
                ErrorContext::new(field, error.utf8_error(), "valid UTF-8"),
            ).with_consumed(self.consumed)),
        }
    }
}

/// Counterpart of `FieldReader`. Write failures are always IO.
pub(crate) struct FieldWriter<'a, W: ?Sized> {
    inner:   &'a mut W,
    written: u64,
}

impl<'a, W: Write + ?Sized> FieldWriter<'a, W> {
    #[inline]
    pub(crate) fn new(inner: &'a mut W) -> Self {
        FieldWriter {
            inner,
            written: 0,
        }
    }

    #[inline]
    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    fn failed(&self, field: &'static str, error: std::io::Error) -> Error {
        Error::io(
            format!("failed to write {}", field),
            error,
            ErrorContext::new(field, self.written, "written successfully"),
        )
    }

    #[inline]
    pub(crate) fn write_u8(&mut self, value: u8, field: &'static str) -> Result<()> {
        self.inner.write_u8(value).map_err(|error| self.failed(field, error))?;
        self.written += 1;
        Ok(())
    }

    #[inline]
    pub(crate) fn write_u16(&mut self, value: u16, field: &'static str) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value).map_err(|error| self.failed(field, error))?;
        self.written += 2;
        Ok(())
    }

    #[inline]
    pub(crate) fn write_u32(&mut self, value: u32, field: &'static str) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value).map_err(|error| self.failed(field, error))?;
        self.written += 4;
        Ok(())
    }

    #[inline]
    pub(crate) fn write_u64(&mut self, value: u64, field: &'static str) -> Result<()> {
        self.inner.write_u64::<LittleEndian>(value).map_err(|error| self.failed(field, error))?;
        self.written += 8;
        Ok(())
    }

    #[inline]
    pub(crate) fn write_bytes(&mut self, value: &[u8], field: &'static str) -> Result<()> {
        self.inner.write_all(value).map_err(|error| self.failed(field, error))?;
        self.written += value.len() as u64;
        Ok(())
    }

    /// Streams exactly `len` bytes from `source`. Returns how many bytes were
    /// copied; fewer than `len` means the source ran dry.
    pub(crate) fn copy_from(&mut self, source: &mut impl Read, len: u64, field: &'static str) -> Result<u64> {
        let copied = match std::io::copy(&mut source.take(len), &mut *self.inner) {
            Ok(copied) => copied,
            Err(error) => return Err(self.failed(field, error)),
        };
        self.written += copied;
        Ok(copied)
    }
}
