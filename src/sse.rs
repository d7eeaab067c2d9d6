//! Server-Sent Events reader for streamed completions.
//!
//! Turns a blocking byte stream into the payloads of its `data:` fields:
//! - Events end at a blank line; `\n` and `\r\n` line endings are accepted
//! - Multiple `data:` lines in one event are joined with `\n`
//! - Comments (`:` lines) and other fields (`event:`, `id:`, `retry:`) are ignored
//! - A `[DONE]` payload ends the stream

use std::io::{self, BufRead};

const DONE_SENTINEL: &str = "[DONE]";

/// Iterator over the `data:` payloads of an SSE stream.
///
/// The iterator is finite and fuses after `[DONE]`, end of input, or the first
/// read error.
#[derive(Debug)]
pub struct SseReader<R> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> SseReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }

    /// Reads lines until an event with data is complete.
    fn next_event(&mut self) -> io::Result<Option<String>> {
        let mut data: Option<String> = None;

        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line)?;

            if read == 0 {
                // Unterminated trailing event still counts
                return Ok(data);
            }

            let line = self.line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if data.is_some() {
                    return Ok(data);
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            if let Some(value) = field_value(line, "data") {
                match data.as_mut() {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for SseReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_event() {
            Ok(Some(data)) if data.trim() == DONE_SENTINEL => {
                self.finished = true;
                None
            }
            Ok(Some(data)) => Some(Ok(data)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Returns the value of `name` if `line` is that field. One leading space is stripped.
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?;
    if rest.is_empty() {
        return Some("");
    }
    let value = rest.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str) -> Vec<String> {
        SseReader::new(Cursor::new(input.as_bytes().to_vec()))
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn test_single_event() {
        let events = collect("data: {\"a\":1}\n\n");
        assert_eq!(events, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_multiple_events_in_order() {
        let events = collect("data: one\n\ndata: two\n\ndata: three\n\n");
        assert_eq!(events, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_stops_at_done() {
        let events = collect("data: one\n\ndata: [DONE]\n\ndata: after\n\n");
        assert_eq!(events, vec!["one"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let events = collect("data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(events, vec!["one", "two"]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let events = collect("data: first\ndata: second\n\n");
        assert_eq!(events, vec!["first\nsecond"]);
    }

    #[test]
    fn test_comments_and_other_fields_ignored() {
        let events = collect(": keep-alive\n\nevent: completion\nid: 7\ndata: text\n\n");
        assert_eq!(events, vec!["text"]);
    }

    #[test]
    fn test_unterminated_trailing_event() {
        let events = collect("data: one\n\ndata: two");
        assert_eq!(events, vec!["one", "two"]);
    }

    #[test]
    fn test_data_without_space() {
        let events = collect("data:compact\n\n");
        assert_eq!(events, vec!["compact"]);
    }

    #[test]
    fn test_similar_field_names_not_data() {
        let events = collect("database: nope\ndata: yes\n\n");
        assert_eq!(events, vec!["yes"]);
    }

    #[test]
    fn test_read_error_fuses() {
        struct Failing;
        impl io::Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::TimedOut, "slow"))
            }
        }

        let mut reader = SseReader::new(io::BufReader::new(Failing));
        let first = reader.next().unwrap();
        assert_eq!(first.unwrap_err().kind(), io::ErrorKind::TimedOut);
        assert!(reader.next().is_none());
    }
}
