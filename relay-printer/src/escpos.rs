//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::encoding::{convert_to_cp1252, pad_text, text_width};

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// Text is transcoded to Windows-1252 by [`EscPosBuilder::build`].
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(2048);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self { buf, width }
    }

    // === Text Output ===

    /// Write raw text
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Write multiple empty lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n - Print and feed n lines
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Print Quality ===

    /// Maximum print density (GS ( K)
    ///
    /// Cheap WiFi printers print very light by default.
    pub fn max_density(&mut self) -> &mut Self {
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x4B, 0x02, 0x00, 0x31, 0x09]);
        self
    }

    // === Text Style ===

    /// Enable bold (emphasized) text
    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Enable double-strike (darker) text
    pub fn double_strike(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x47, 0x01]);
        self
    }

    /// Disable double-strike text
    pub fn double_strike_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x47, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    /// Double height only
    pub fn double_height(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x01]);
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn sep_double(&mut self) -> &mut Self {
        self.line(&"=".repeat(self.width))
    }

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.width))
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with spaces filling the gap.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw >= self.width {
            // Too long, just print with space
            self.text(left);
            self.text(" ");
            self.line(right);
        } else {
            let spaces = self.width - lw - rw;
            self.text(left);
            self.text(&" ".repeat(spaces));
            self.line(right);
        }
        self
    }

    /// Print text pushed against the right edge of the paper
    pub fn line_right(&mut self, s: &str) -> &mut Self {
        if text_width(s) >= self.width {
            return self.line(s);
        }
        let padded = pad_text(s, self.width, true);
        self.line(&padded)
    }

    // === Paper Control ===

    /// Partial cut (leave a small connection, easier to tear)
    pub fn cut_partial(&mut self) -> &mut Self {
        // GS V 1 - Partial cut
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x01]);
        self
    }

    // === Build ===

    /// Build the final byte buffer in Windows-1252
    ///
    /// This converts all UTF-8 text while preserving ESC/POS commands.
    pub fn build(self) -> Vec<u8> {
        convert_to_cp1252(&self.buf)
    }
}
