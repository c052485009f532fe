//! Low-level group-code writer.
//!
//! Every DXF value is a pair of lines: a right-aligned group code and its
//! value. Reals are written in their shortest round-trip form with a
//! mandatory decimal point, so identical drawings serialise to identical
//! bytes on every platform.
use std::fmt::{self, Display, Write as _};
use std::io::{self, Write};

/// An entity or table handle, written as upper-case hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// The null handle used for objects owned by nothing.
    pub const NONE: Self = Self(0);
}

impl Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Writes group codes and allocates handles sequentially.
pub struct GroupWriter<W> {
    out: W,
    next_handle: u64,
}

impl<W: Write> GroupWriter<W> {
    /// Start writing, handing out handles from `first_handle`.
    pub const fn new(out: W, first_handle: u64) -> Self {
        Self {
            out,
            next_handle: first_handle,
        }
    }

    /// Reserve the next handle.
    pub const fn allocate(&mut self) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// First handle not yet allocated, as written to `$HANDSEED`.
    pub const fn handle_seed(&self) -> Handle {
        Handle(self.next_handle)
    }

    /// Write a pair whose value needs no escaping.
    pub fn code(&mut self, code: i16, value: impl Display) -> io::Result<()> {
        writeln!(self.out, "{code:>3}")?;
        writeln!(self.out, "{value}")
    }

    /// Write a free-text value.
    pub fn text(&mut self, code: i16, value: &str) -> io::Result<()> {
        self.code(code, escape_text(value))
    }

    /// Write a real value.
    pub fn real(&mut self, code: i16, value: f64) -> io::Result<()> {
        self.code(code, format_real(value))
    }

    /// Write a 2D point as `code`, `code + 10`.
    pub fn point(&mut self, code: i16, x: f64, y: f64) -> io::Result<()> {
        self.real(code, x)?;
        self.real(code + 10, y)
    }

    /// Write a 3D point on the ground plane as `code`, `code + 10`, `code + 20`.
    pub fn point3(&mut self, code: i16, x: f64, y: f64) -> io::Result<()> {
        self.point(code, x, y)?;
        self.real(code + 20, 0.0)
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Shortest round-trip decimal with a decimal point; negative zero is `0.0`.
pub fn format_real(value: f64) -> String {
    if value == 0.0 {
        return "0.0".to_owned();
    }
    let mut formatted = value.to_string();
    if !formatted.contains(['.', 'e', 'E', 'N', 'n']) {
        formatted.push_str(".0");
    }
    formatted
}

/// Escape a string for a DXF text value.
///
/// Non-ASCII characters become `\U+XXXX` UTF-16 escapes, control characters
/// become spaces and a literal caret becomes `^ `.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '^' => escaped.push_str("^ "),
            c if c.is_control() => escaped.push(' '),
            c if c.is_ascii() => escaped.push(c),
            c => {
                let mut units = [0_u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // Writing to a String cannot fail.
                    let _ = write!(escaped, "\\U+{unit:04X}");
                }
            }
        }
    }
    escaped
}
