//! Server-side line editing for raw terminals.
//!
//! An SSH client with a pty sends every keystroke as typed and expects the server to echo
//! it. [`LineEditor`] turns keystrokes into echo bytes plus finished lines, handling
//! backspace and swallowing cursor-key escape sequences. Finished lines come out
//! `\n`-terminated so they can be fed straight into a [`crate::line::LineReader`].

const BS: u8 = 0x08;
const DEL: u8 = 0x7f;
const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;

pub const DEFAULT_MAX_EDIT_LINE: usize = 1024;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Escape {
    #[default]
    None,
    Start,
    Sequence,
}

/// What one batch of keystrokes produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Bytes to write back to the terminal.
    pub echo: Vec<u8>,
    /// Completed lines, each ending in `\n`.
    pub lines: Vec<u8>,
    /// The user asked to leave (Ctrl-C, or Ctrl-D on an empty line).
    pub hangup: bool,
}

#[derive(Debug)]
pub struct LineEditor {
    line: Vec<u8>,
    max_len: usize,
    escape: Escape,
    after_cr: bool,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            max_len: DEFAULT_MAX_EDIT_LINE,
            escape: Escape::None,
            after_cr: false,
        }
    }

    /// Keystrokes past this many bytes are ignored until the line is finished.
    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = max.max(1);
        self
    }

    pub fn feed(&mut self, keys: &[u8]) -> Edit {
        let mut edit = Edit::default();
        for &b in keys {
            if edit.hangup {
                break;
            }
            let after_cr = std::mem::replace(&mut self.after_cr, false);

            match self.escape {
                Escape::Start => {
                    self.escape = if b == b'[' || b == b'O' {
                        Escape::Sequence
                    } else {
                        Escape::None
                    };
                    continue;
                }
                // CSI parameters run until a final byte in 0x40..=0x7e.
                Escape::Sequence => {
                    if (0x40..=0x7e).contains(&b) {
                        self.escape = Escape::None;
                    }
                    continue;
                }
                Escape::None => {}
            }

            match b {
                b'\n' if after_cr => {}
                b'\r' | b'\n' => {
                    self.after_cr = b == b'\r';
                    edit.echo.extend_from_slice(b"\r\n");
                    edit.lines.append(&mut self.line);
                    edit.lines.push(b'\n');
                }
                BS | DEL => {
                    if self.pop_char() {
                        edit.echo.extend_from_slice(b"\x08 \x08");
                    }
                }
                ESC => self.escape = Escape::Start,
                CTRL_C => edit.hangup = true,
                CTRL_D if self.line.is_empty() => edit.hangup = true,
                b if b < 0x20 => {}
                b => {
                    if self.line.len() < self.max_len {
                        self.line.push(b);
                        edit.echo.push(b);
                    }
                }
            }
        }
        edit
    }

    // Removes one UTF-8 character.
    fn pop_char(&mut self) -> bool {
        while let Some(b) = self.line.pop() {
            if b & 0xc0 != 0x80 {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_and_finishes_lines() {
        let mut ed = LineEditor::new();
        let e = ed.feed(b"look");
        assert_eq!(e.echo, b"look");
        assert!(e.lines.is_empty());

        let e = ed.feed(b"\r");
        assert_eq!(e.echo, b"\r\n");
        assert_eq!(e.lines, b"look\n");

        // CRLF from a client is one line ending, not two.
        let e = ed.feed(b"\nsay hi\r\n");
        assert_eq!(e.lines, b"say hi\n");
    }

    #[test]
    fn backspace_removes_whole_characters() {
        let mut ed = LineEditor::new();
        let e = ed.feed("tak€\x7f\x7fke\r".as_bytes());
        assert_eq!(e.lines, b"take\n");
        assert_eq!(e.echo.windows(3).filter(|w| *w == b"\x08 \x08").count(), 2);

        // Nothing to erase: no echo.
        assert!(ed.feed(b"\x08").echo.is_empty());
    }

    #[test]
    fn cursor_keys_are_ignored() {
        let mut ed = LineEditor::new();
        let e = ed.feed(b"n\x1b[A\x1b[1;5Co\x1bOBrth\r");
        assert_eq!(e.lines, b"north\n");
        assert_eq!(e.echo, b"north\r\n");
    }

    #[test]
    fn control_keys_hang_up() {
        let mut ed = LineEditor::new();
        assert!(ed.feed(b"\x03").hangup);

        let mut ed = LineEditor::new();
        let e = ed.feed(b"ab\x04");
        assert!(!e.hangup);
        let e = ed.feed(b"\r\x04look\r");
        assert!(e.hangup);
        assert_eq!(e.lines, b"ab\n");
    }

    #[test]
    fn long_lines_are_capped() {
        let mut ed = LineEditor::new().max_len(4);
        let e = ed.feed(b"abcdefg\r");
        assert_eq!(e.lines, b"abcd\n");
        assert_eq!(e.echo, b"abcd\r\n");
    }
}
