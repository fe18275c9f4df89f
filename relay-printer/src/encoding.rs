//! Code page utilities for thermal printers
//!
//! Receipts are plain ASCII for the most part, but menu and customer names
//! regularly carry Latin accents ("Jalapeño", "José"). The printer is switched
//! to Windows-1252 (ESC t 16), where every character occupies one column.
//! This module provides utilities for:
//! - Calculating printed string widths
//! - Truncating/padding strings to printed widths
//! - Converting UTF-8 to Windows-1252 while preserving ESC/POS commands

use tracing::instrument;

/// ESC t 16 - Select character code table WPC1252
const SELECT_WPC1252: [u8; 3] = [0x1B, 0x74, 16];

/// Substitute for characters the code page cannot represent
const REPLACEMENT: u8 = b'?';

/// Get the printed width of a string in columns
///
/// Every character maps to exactly one byte, either its Windows-1252 code or
/// the replacement character.
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a printed width
pub fn truncate_text(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific printed width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_text(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_text(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Convert mixed UTF-8 content (with ESC/POS commands) to Windows-1252
///
/// ASCII bytes (0x00-0x7F) are kept exactly as is, which protects ESC/POS
/// commands from being corrupted. Only bytes >= 0x80 are treated as UTF-8
/// sequences and transcoded.
///
/// The code page is selected at the start and again after every INIT
/// command (ESC @), since INIT resets the table to the printer default.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn convert_to_cp1252(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len() + 8);
    let mut buffer = Vec::new();
    let mut i = 0;

    if !bytes.starts_with(&[0x1B, 0x40]) {
        result.extend_from_slice(&SELECT_WPC1252);
    }

    while i < bytes.len() {
        let b = bytes[i];

        // INIT (ESC @ = 0x1B 0x40) must be followed by the code page selection
        if b == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == 0x40 {
            flush_buffer(&mut buffer, &mut result);
            result.extend_from_slice(&[0x1B, 0x40]);
            result.extend_from_slice(&SELECT_WPC1252);
            i += 2;
            continue;
        }

        if b < 0x80 {
            flush_buffer(&mut buffer, &mut result);
            result.push(b);
        } else {
            buffer.push(b);
        }
        i += 1;
    }

    flush_buffer(&mut buffer, &mut result);

    result
}

/// Flush the non-ASCII buffer, converting UTF-8 to Windows-1252 char by char
fn flush_buffer(buffer: &mut Vec<u8>, result: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    let mut utf8 = [0u8; 4];
    for c in s.chars() {
        let (encoded, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut utf8));
        if had_errors || encoded.len() != 1 {
            result.push(REPLACEMENT);
        } else {
            result.push(encoded[0]);
        }
    }
    buffer.clear();
}
