//! Telnet IAC filtering.
//!
//! Players connect with whatever telnet client they have. We never negotiate anything:
//! `DO x` is answered with `WONT x`, `WILL x` with `DONT x`, and subnegotiation blocks
//! (`IAC SB .. IAC SE`) are discarded along with every other command sequence.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    #[default]
    Text,
    Command,
    Option(u8),
    Sub,
    SubCommand,
}

#[derive(Debug, Default)]
pub struct TelnetFilter {
    phase: Phase,
    replies: Vec<u8>,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the plain-text bytes of `chunk` to `out`.
    ///
    /// Sequences may be split across calls; the filter keeps its position between chunks.
    pub fn filter_into(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        for &b in chunk {
            self.phase = match (self.phase, b) {
                (Phase::Text, IAC) => Phase::Command,
                (Phase::Text, _) => {
                    out.push(b);
                    Phase::Text
                }
                // IAC IAC is a literal 0xff.
                (Phase::Command, IAC) => {
                    out.push(IAC);
                    Phase::Text
                }
                (Phase::Command, DO | DONT | WILL | WONT) => Phase::Option(b),
                (Phase::Command, SB) => Phase::Sub,
                // NOP, GA, AYT and friends carry no option byte.
                (Phase::Command, _) => Phase::Text,
                (Phase::Option(cmd), opt) => {
                    match cmd {
                        DO => self.replies.extend_from_slice(&[IAC, WONT, opt]),
                        WILL => self.replies.extend_from_slice(&[IAC, DONT, opt]),
                        _ => {}
                    }
                    Phase::Text
                }
                (Phase::Sub, IAC) => Phase::SubCommand,
                (Phase::Sub, _) => Phase::Sub,
                (Phase::SubCommand, SE) => Phase::Text,
                (Phase::SubCommand, _) => Phase::Sub,
            };
        }
    }

    /// Negotiation replies accumulated so far; the caller writes them back to the peer.
    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(f: &mut TelnetFilter, bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        f.filter_into(bytes, &mut out);
        out
    }

    #[test]
    fn plain_text_passes_through() {
        let mut f = TelnetFilter::new();
        assert_eq!(run(&mut f, b"look\r\n"), b"look\r\n");
        assert!(f.take_replies().is_empty());
    }

    #[test]
    fn refuses_offers_and_requests() {
        let mut f = TelnetFilter::new();
        // IAC WILL NAWS, IAC DO ECHO, then text.
        let out = run(&mut f, &[IAC, WILL, 31, IAC, DO, 1, b'n']);
        assert_eq!(out, b"n");
        assert_eq!(f.take_replies(), vec![IAC, DONT, 31, IAC, WONT, 1]);
        assert!(f.take_replies().is_empty());
    }

    #[test]
    fn split_sequence_is_resumed() {
        let mut f = TelnetFilter::new();
        assert!(run(&mut f, &[IAC]).is_empty());
        assert!(run(&mut f, &[DO]).is_empty());
        assert_eq!(run(&mut f, &[3, b'o', b'k']), b"ok");
        assert_eq!(f.take_replies(), vec![IAC, WONT, 3]);
    }

    #[test]
    fn drops_subnegotiation_and_keeps_escaped_iac() {
        let mut f = TelnetFilter::new();
        let out = run(
            &mut f,
            &[b'a', IAC, SB, 24, 0, b'x', IAC, SE, IAC, IAC, b'b'],
        );
        assert_eq!(out, vec![b'a', IAC, b'b']);
        assert!(f.take_replies().is_empty());
    }
}
