//! Little-endian field access over borrowed byte buffers.

use crate::FrameError;

#[inline]
pub(crate) fn section<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], FrameError> {
    let end = offset.checked_add(len).ok_or(FrameError::Truncated {
        what,
        needed: usize::MAX,
        got: buf.len(),
    })?;
    buf.get(offset..end).ok_or(FrameError::Truncated {
        what,
        needed: end,
        got: buf.len(),
    })
}

/// Byte length of a `width × height` payload with `bytes_per_pixel` bytes each.
pub(crate) fn payload_len(
    section: &'static str,
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> Result<usize, FrameError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(bytes_per_pixel))
        .ok_or(FrameError::PayloadOverflow {
            section,
            width,
            height,
        })
}

#[inline]
fn array<const N: usize>(buf: &[u8], offset: usize, what: &'static str) -> Result<[u8; N], FrameError> {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(section(buf, offset, N, what)?);
    Ok(bytes)
}

#[inline]
pub(crate) fn read_i32(buf: &[u8], offset: usize, what: &'static str) -> Result<i32, FrameError> {
    array::<4>(buf, offset, what).map(i32::from_le_bytes)
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], offset: usize, what: &'static str) -> Result<u32, FrameError> {
    array::<4>(buf, offset, what).map(u32::from_le_bytes)
}

#[inline]
pub(crate) fn read_f32(buf: &[u8], offset: usize, what: &'static str) -> Result<f32, FrameError> {
    array::<4>(buf, offset, what).map(f32::from_le_bytes)
}

pub(crate) fn f64_values(raw: &[u8]) -> Vec<f64> {
    raw.chunks_exact(8)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            f64::from_le_bytes(b)
        })
        .collect()
}

pub(crate) fn f32_values(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(4)
        .map(|c| {
            let mut b = [0u8; 4];
            b.copy_from_slice(c);
            f32::from_le_bytes(b)
        })
        .collect()
}

pub(crate) fn u16_values(raw: &[u8]) -> Vec<u16> {
    raw.chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Convert a declared section length, treating negatives as corruption.
pub(crate) fn section_len(len: i32, section: &'static str) -> Result<usize, FrameError> {
    usize::try_from(len).map_err(|_| FrameError::NegativeLength { section, len })
}

/// Append-only little-endian writer used by the encoders.
#[derive(Default)]
pub(crate) struct LeWriter {
    pub(crate) buf: Vec<u8>,
}

impl LeWriter {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            buf: Vec::with_capacity(n),
        }
    }

    pub(crate) fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub(crate) fn i32(&mut self, v: i32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn f32(&mut self, v: f32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn f64(&mut self, v: f64) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }
}
