use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Text sent to the completion API: instruction followed by the input code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    text: String,
    instruction_len: usize,
}

impl Payload {
    /// Joins `instruction` and `code`.
    #[must_use]
    pub fn new(instruction: &str, code: &str) -> Self {
        let mut text = String::with_capacity(instruction.len() + code.len());
        text.push_str(instruction);
        text.push_str(code);

        Self {
            text,
            instruction_len: instruction.len(),
        }
    }

    /// Returns the full payload.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the input code without the instruction.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.text[self.instruction_len..]
    }

    /// Consumes the payload, returning the full text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

/// Reads `path` and prefixes its contents with `instruction`.
///
/// Invalid UTF-8 is replaced rather than rejected; the input is opaque text.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read.
pub fn read_payload(path: &Path, instruction: &str) -> Result<Payload> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;

    let code = match String::from_utf8(bytes) {
        Ok(code) => code,
        Err(e) => {
            warn!(
                "{} is not valid UTF-8; invalid sequences replaced",
                path.display()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    debug!("Read {} bytes from {}", code.len(), path.display());
    Ok(Payload::new(instruction, &code))
}

/// Reads an instruction from a file, keeping it byte-for-byte.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, or [`Error::Config`] if
/// it is empty.
pub fn read_instruction(path: &Path) -> Result<String> {
    let instruction = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if instruction.is_empty() {
        return Err(Error::config(format!(
            "instruction file is empty: {}",
            path.display()
        )));
    }
    Ok(instruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_payload_concatenation() {
        let payload = Payload::new("Fix this:\n\n", "package main\n");
        assert_eq!(payload.as_str(), "Fix this:\n\npackage main\n");
        assert_eq!(payload.code(), "package main\n");
    }

    #[test]
    fn test_read_payload() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("input_code.txt");
        input.write_str("func run() error { return nil }").unwrap();

        let payload = read_payload(input.path(), "Check context:\n\n").unwrap();
        assert_eq!(
            payload.into_string(),
            "Check context:\n\nfunc run() error { return nil }"
        );
    }

    #[test]
    fn test_empty_input_keeps_instruction() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("input_code.txt");
        input.touch().unwrap();

        let payload = read_payload(input.path(), "Check context:\n\n").unwrap();
        assert_eq!(payload.as_str(), "Check context:\n\n");
        assert!(payload.code().is_empty());
    }

    #[test]
    fn test_missing_input() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = read_payload(&temp.path().join("absent.txt"), "x").unwrap_err();
        assert!(err.is_io());
        assert!(err.to_string().contains("absent.txt"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("input_code.txt");
        input.write_binary(&[b'o', b'k', 0xFF, b'!']).unwrap();

        let payload = read_payload(input.path(), "").unwrap();
        assert_eq!(payload.code(), "ok\u{FFFD}!");
    }

    #[test]
    fn test_read_instruction() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("instruction.txt");
        file.write_str("Add docs:\n\n").unwrap();
        assert_eq!(read_instruction(file.path()).unwrap(), "Add docs:\n\n");

        let empty = temp.child("empty.txt");
        empty.touch().unwrap();
        assert!(read_instruction(empty.path()).unwrap_err().is_config());
    }
}
