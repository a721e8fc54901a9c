use crate::scalar::Index;

/// Non-owning byte scanner over a mapped region.
///
/// Cheap to copy; every primitive is a no-op once the position reaches the
/// end bound, so scans can run off malformed input without reading past the
/// region.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

#[inline(always)]
fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

#[inline(always)]
fn is_fp_byte(b: u8) -> bool {
    is_digit(b) || b == b'.' || b == b'e' || b == b'E' || b == b'+' || b == b'-'
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor {
            data,
            pos: 0,
            end: data.len(),
        }
    }

    /// The same region with the position advanced by `offset` bytes.
    pub fn at_offset(&self, offset: usize) -> Self {
        Cursor {
            data: self.data,
            pos: (self.pos + offset).min(self.end),
            end: self.end,
        }
    }

    #[inline(always)]
    pub fn good(&self) -> bool {
        self.pos < self.end
    }

    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        // a clamped end bound can sit before an already-advanced position
        self.end.saturating_sub(self.pos)
    }

    /// Shrink the end bound to `other`'s position, if smaller.
    pub fn clamp_end(&mut self, other: &Cursor<'a>) {
        if other.pos < self.end {
            self.end = other.pos;
        }
    }

    #[inline(always)]
    fn cur(&self) -> u8 {
        self.data[self.pos]
    }

    /// While positioned on a `%` or `#` comment line, advance past its
    /// newline.
    pub fn skip_comments(&mut self) {
        while self.good() && (self.cur() == b'%' || self.cur() == b'#') {
            while self.good() {
                let b = self.cur();
                self.pos += 1;
                if b == b'\n' {
                    break;
                }
            }
        }
    }

    pub fn skip_space_tab(&mut self) {
        while self.good() && (self.cur() == b' ' || self.cur() == b'\t') {
            self.pos += 1;
        }
    }

    /// Bytes up to the next space, tab or line ending.
    pub fn read_word(&mut self) -> &'a [u8] {
        let start = self.pos;
        while self.good() {
            let b = self.cur();
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Skip non-digit bytes, then accumulate decimal digits. Unsigned-style:
    /// signs are treated as any other non-digit byte.
    pub fn read_int<T: Index>(&mut self) -> T {
        let mut res = 0u64;
        while self.good() && !is_digit(self.cur()) {
            self.pos += 1;
        }
        while self.good() && is_digit(self.cur()) {
            res = res * 10 + (self.cur() - b'0') as u64;
            self.pos += 1;
        }
        T::from_u64(res)
    }

    /// +1, or -1 when positioned on a `-` (which is consumed).
    pub fn read_sign(&mut self) -> i64 {
        if self.good() && self.cur() == b'-' {
            self.pos += 1;
            return -1;
        }
        1
    }

    /// Relaxed decimal scanner for `[+-]?A.B(eE[+-]?Z)?`.
    ///
    /// The fraction is accumulated as an integer and divided by a power of
    /// ten, the exponent is parsed recursively and applied through `powf`.
    /// Intentionally lossy in the last bits; never locale-dependent.
    pub fn read_fp(&mut self) -> f64 {
        while self.good() && !is_fp_byte(self.cur()) {
            self.pos += 1;
        }
        let mut positive = true;
        if self.good() {
            if self.cur() == b'-' {
                positive = false;
                self.pos += 1;
            } else if self.cur() == b'+' {
                self.pos += 1;
            }
        }

        let mut res = 0f64;
        while self.good() && is_digit(self.cur()) {
            res = res * 10. + (self.cur() - b'0') as f64;
            self.pos += 1;
        }
        if self.good() && self.cur() == b'.' {
            self.pos += 1;
            let mut fraction = 0f64;
            let mut fraction_count = 0i32;
            while self.good() && is_digit(self.cur()) {
                fraction = fraction * 10. + (self.cur() - b'0') as f64;
                self.pos += 1;
                fraction_count += 1;
            }
            res += fraction / 10f64.powi(fraction_count);
        }
        if self.good() && (self.cur() == b'e' || self.cur() == b'E') {
            self.pos += 1;
            let exp = self.read_fp();
            res *= 10f64.powf(exp);
        }

        if !positive {
            res = -res;
        }
        res
    }

    /// True iff only spaces or `\r` remain before the next newline (or the
    /// end of the region).
    pub fn at_eol(&self) -> bool {
        let mut td = self.pos;
        while td < self.end && self.data[td] != b'\n' {
            if self.data[td] != b' ' && self.data[td] != b'\r' {
                return false;
            }
            td += 1;
        }
        true
    }

    pub fn move_to_eol(&mut self) {
        while self.good() && self.cur() != b'\n' {
            self.pos += 1;
        }
    }

    pub fn move_to_non_int(&mut self) {
        while self.good() && is_digit(self.cur()) {
            self.pos += 1;
        }
    }

    pub fn move_to_fp(&mut self) {
        while self.good() && !is_fp_byte(self.cur()) {
            self.pos += 1;
        }
    }

    pub fn move_to_non_fp(&mut self) {
        while self.good() && is_fp_byte(self.cur()) {
            self.pos += 1;
        }
    }

    /// Advance to the next digit, skipping comment lines on the way.
    pub fn move_to_first_int(&mut self) {
        self.skip_comments();
        while self.good() && !is_digit(self.cur()) {
            self.pos += 1;
            self.skip_comments();
        }
    }

    /// Advance past the current digit run and on to the next digit.
    pub fn move_to_next_int(&mut self) {
        self.move_to_non_int();
        self.move_to_first_int();
    }

    /// As [`move_to_next_int`], but a `+` or `-` also terminates the move,
    /// so signed values can be picked up with [`read_sign`] + [`read_int`].
    ///
    /// [`move_to_next_int`]: Cursor::move_to_next_int
    /// [`read_sign`]: Cursor::read_sign
    /// [`read_int`]: Cursor::read_int
    pub fn move_to_next_signed_int(&mut self) {
        if self.good() && (self.cur() == b'+' || self.cur() == b'-') {
            self.pos += 1;
        }
        self.move_to_non_int();

        self.skip_comments();
        while self.good() && !is_digit(self.cur()) && self.cur() != b'+' && self.cur() != b'-' {
            self.pos += 1;
            self.skip_comments();
        }
    }

    /// Count integer-to-integer transitions on the current line.
    ///
    /// Trailing whitespace before the newline, and trailing comments, do not
    /// count; the cursor is left at the newline (or region end). A line with
    /// k numbers yields k-1.
    pub fn count_spaces_to_eol(&mut self) -> usize {
        let mut space_ct = 0usize;
        while self.good() && self.cur() != b'\n' {
            while self.good() {
                let b = self.cur();
                if b == b'\n' || b == b'%' || b == b'#' || is_digit(b) {
                    break;
                }
                self.pos += 1;
            }

            if !self.good() || !is_digit(self.cur()) {
                self.move_to_eol();
                break;
            }

            while self.good() && (is_digit(self.cur()) || self.cur() == b'.') {
                self.pos += 1;
            }

            if !self.good() || self.cur() == b'\n' {
                break;
            }
            if self.cur() == b'%' || self.cur() == b'#' {
                self.move_to_eol();
                break;
            }

            space_ct += 1;

            while self.good() && self.cur() == b' ' {
                self.pos += 1;
            }

            // un-count trailing whitespace or a trailing comment
            if !self.good() || self.cur() == b'\n' {
                space_ct -= 1;
                break;
            }
            if self.cur() == b'%' || self.cur() == b'#' {
                space_ct -= 1;
                self.move_to_eol();
                break;
            }
        }
        space_ct
    }

    /// True iff the bytes at the current position equal `s`; does not
    /// advance.
    pub fn matches(&self, s: &[u8]) -> bool {
        if self.pos + s.len() > self.end {
            return false;
        }
        &self.data[self.pos..self.pos + s.len()] == s
    }

    /// Match-and-advance; leaves the position untouched on mismatch.
    pub fn read(&mut self, s: &[u8]) -> bool {
        if self.matches(s) {
            self.pos += s.len();
            return true;
        }
        false
    }
}
