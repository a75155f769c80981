//! `mudio`: the small amount of terminal plumbing a player connection needs.
//!
//! - telnet IAC filtering that refuses every option the client offers,
//! - line framing over the filtered stream (LF, CRLF, CR NUL),
//! - echo and backspace handling for raw SSH terminals,
//! - newline normalization for text going back out.

pub mod edit;
pub mod line;
pub mod telnet;

/// Rewrite bare `\n` as `\r\n` for telnet clients. Existing `\r\n` pairs are kept.
pub fn crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev = '\0';
    for c in text.chars() {
        if c == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(c);
        prev = c;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::crlf;

    #[test]
    fn crlf_only_touches_bare_newlines() {
        assert_eq!(crlf("a\nb"), "a\r\nb");
        assert_eq!(crlf("a\r\nb\n"), "a\r\nb\r\n");
        assert_eq!(crlf(""), "");
    }
}
