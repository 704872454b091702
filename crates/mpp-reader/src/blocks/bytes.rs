//! Bounds-checked little-endian readers. Every helper returns `None` instead of panicking
//! when the requested range falls outside the buffer.

use uuid::Uuid;

fn array_at<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    data.get(offset..end)?.try_into().ok()
}

pub(crate) fn u8_at(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

pub(crate) fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    array_at(data, offset).map(u16::from_le_bytes)
}

pub(crate) fn i16_at(data: &[u8], offset: usize) -> Option<i16> {
    array_at(data, offset).map(i16::from_le_bytes)
}

pub(crate) fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    array_at(data, offset).map(u32::from_le_bytes)
}

pub(crate) fn i32_at(data: &[u8], offset: usize) -> Option<i32> {
    array_at(data, offset).map(i32::from_le_bytes)
}

pub(crate) fn i64_at(data: &[u8], offset: usize) -> Option<i64> {
    array_at(data, offset).map(i64::from_le_bytes)
}

/// Reads an `f64`, mapping NaN to zero.
pub(crate) fn f64_at(data: &[u8], offset: usize) -> Option<f64> {
    array_at(data, offset).map(f64::from_le_bytes).map(|v| if v.is_nan() { 0.0 } else { v })
}

/// Reads a GUID stored with the first three groups little-endian and the last eight bytes
/// in order. An all-zero GUID is treated as absent.
pub(crate) fn guid_at(data: &[u8], offset: usize) -> Option<Uuid> {
    let raw: [u8; 16] = array_at(data, offset)?;
    if raw.iter().all(|b| *b == 0) {
        return None;
    }
    Some(Uuid::from_bytes_le(raw))
}

/// Reads a NUL-terminated UTF-16LE string starting at `offset`.
pub(crate) fn unicode_string_at(data: &[u8], offset: usize) -> Option<String> {
    let tail = data.get(offset..)?;
    let units: Vec<u16> = tail
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    Some(String::from_utf16_lossy(&units))
}

/// Reads a UTF-16LE string of at most `len` bytes, stopping early at a NUL.
pub(crate) fn unicode_string_of_len(data: &[u8], offset: usize, len: usize) -> Option<String> {
    let end = offset.checked_add(len)?;
    let units: Vec<u16> = data
        .get(offset..end)?
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    Some(String::from_utf16_lossy(&units))
}

/// Reads a NUL-terminated 8-bit string (Windows-1252) starting at `offset`.
pub(crate) fn ansi_string_at(data: &[u8], offset: usize) -> Option<String> {
    let tail = data.get(offset..)?;
    let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&tail[..end]);
    Some(text.into_owned())
}
