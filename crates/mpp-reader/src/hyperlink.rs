//! Hyperlink blobs stored in the var data of tasks, resources and assignments.

use mpp_model::Hyperlink;

use crate::blocks::bytes::unicode_string_at;

/// Offset of the display text.
const TEXT_OFFSET: usize = 24;
/// Header bytes between one string's terminator and the next string.
const STRING_GAP: usize = 12;

/// Decodes a hyperlink blob. Assignment blobs carry a screen tip after the sub-address.
///
/// Returns `None` when the blob is truncated before the sub-address or holds no text at all.
pub(crate) fn read_hyperlink(blob: &[u8], with_screen_tip: bool) -> Option<Hyperlink> {
    let mut offset = TEXT_OFFSET;
    let mut next = || {
        let text = unicode_string_at(blob, offset)?;
        offset += (text.encode_utf16().count() + 1) * 2 + STRING_GAP;
        Some(text)
    };
    let text = next()?;
    let address = next()?;
    let sub_address = next()?;
    let screen_tip = if with_screen_tip { next() } else { None };

    if text.is_empty() && address.is_empty() && sub_address.is_empty() {
        return None;
    }
    Some(Hyperlink {
        text,
        address,
        sub_address,
        screen_tip: screen_tip.filter(|tip| !tip.is_empty()),
    })
}

#[cfg(test)]
pub(crate) fn hyperlink_blob(parts: &[&str]) -> Vec<u8> {
    let mut blob = vec![0u8; TEXT_OFFSET];
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            blob.extend_from_slice(&[0u8; STRING_GAP]);
        }
        blob.extend(crate::test_support::utf16(part));
    }
    blob
}
