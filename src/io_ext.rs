use std::fs::File;
use std::io;

use crate::error::{Error, Result};

pub const MAX_VARINT_LEN64: usize = 10;

/// A byte source addressed by absolute offset. Reads never move a shared
/// cursor, so one source can serve any number of callers at once.
pub trait ReadAt {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(buf, offset) {
                Ok(0) => break,
                Ok(n) => {
                    let tmp = buf;
                    buf = &mut tmp[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        if buf.is_empty() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "failed to fill whole buffer",
            ))
        }
    }
}

impl ReadAt for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        // pread doesn't move the file cursor
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        // Moves the cursor, but nothing here reads through it.
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.len() {
            return Ok(0);
        }

        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<R: ReadAt + ?Sized> ReadAt for &R {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

/// Reads exactly `buf.len()` bytes at `offset`, refusing to cross `len`.
pub(crate) fn read_exact_at<R>(src: &R, buf: &mut [u8], offset: u64, len: u64) -> Result<()>
where
    R: ReadAt + ?Sized,
{
    match offset.checked_add(buf.len() as u64) {
        Some(end) if end <= len => {}
        _ => return Err(Error::eof(offset)),
    }

    src.read_exact_at(buf, offset)
        .map_err(|e| Error::io(offset, e))
}

/// Decodes an unsigned LEB128 varint stored at `offset`.
///
/// Returns the value and the number of bytes it occupied.
pub(crate) fn read_uvarint_at<R>(src: &R, offset: u64, len: u64) -> Result<(u64, u64)>
where
    R: ReadAt + ?Sized,
{
    if offset >= len {
        return Err(Error::eof(offset));
    }

    let avail = (len - offset).min(MAX_VARINT_LEN64 as u64) as usize;
    let mut buf = [0u8; MAX_VARINT_LEN64];
    read_exact_at(src, &mut buf[..avail], offset, len)?;

    match uvarint(&buf[..avail]) {
        Some(Ok((value, n))) => Ok((value, n as u64)),
        Some(Err(())) => Err(Error::io(
            offset,
            io::Error::new(io::ErrorKind::InvalidData, "varint overflows a 64-bit integer"),
        )),
        None => Err(Error::eof(offset)),
    }
}

/// `None` when `buf` ends mid-varint, `Some(Err(()))` on overflow.
fn uvarint(buf: &[u8]) -> Option<std::result::Result<(u64, usize), ()>> {
    let mut x = 0u64;
    let mut shift = 0u32;

    for (i, &b) in buf.iter().enumerate() {
        if b < 0x80 {
            if i == MAX_VARINT_LEN64 - 1 && b > 1 {
                return Some(Err(()));
            }
            return Some(Ok((x | ((b as u64) << shift), i + 1)));
        }
        x |= ((b & 0x7F) as u64) << shift;
        shift += 7;
    }

    if buf.len() >= MAX_VARINT_LEN64 {
        Some(Err(()))
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) fn put_uvarint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}
