//! Printable-ASCII sanitization of captured analyzer output.
//!
//! Analyzer containers interleave stdout and stderr on one transport channel,
//! so captured buffers can contain terminal control codes, partial UTF-8
//! sequences, and binary noise. Downstream parsers are ASCII-oriented, so
//! everything outside the printable range is dropped rather than transcoded.

/// Strips every byte outside `[0x20, 0x7E]` from the input.
///
/// Total and idempotent: never fails, and a second pass is a no-op. Note that
/// newlines (0x0A) are below 0x20 and are dropped too.
pub fn sanitize_output(raw: &[u8]) -> String {
    raw.iter().copied().filter(|b| (0x20..=0x7E).contains(b)).map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_printable_ascii() {
        let input = b"slither 0.10.0 found 3 results";
        assert_eq!(sanitize_output(input), "slither 0.10.0 found 3 results");
    }

    #[test]
    fn drops_nul_and_newline() {
        // NUL, newline, and printable text mixed together
        let input = b"ok\x00line1\nline2";
        assert_eq!(sanitize_output(input), "okline1line2");
    }

    #[test]
    fn drops_ansi_escapes_and_high_bytes() {
        let input = b"\x1b[31mERROR\x1b[0m caf\xc3\xa9 \x7f";
        assert_eq!(sanitize_output(input), "[31mERROR[0m caf ");
    }

    #[test]
    fn idempotent_on_arbitrary_bytes() {
        let inputs: &[&[u8]] = &[
            b"",
            b"\x00\x01\x02",
            b"plain",
            b"\xff\xfe mixed \x9c content \x08",
            b"tabs\tand\rreturns",
        ];
        for input in inputs {
            let once = sanitize_output(input);
            let twice = sanitize_output(once.as_bytes());
            assert_eq!(once, twice);
            assert!(once.bytes().all(|b| (0x20..=0x7E).contains(&b)));
        }
    }
}
