//! Reads LS-8 program images.
//!
//! The image format is line oriented: one byte per line written as up to
//! eight binary digits. Everything after `#` is a comment, and blank lines
//! are skipped.
//!
//! ```text
//! # print8.ls8
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```

use std::fs;
use std::io;
use std::path::Path;

use crate::error::LoadError;
use crate::memory::MEMORY_SIZE;

/// Parse the text of a program image into bytes.
pub fn parse_image(text: &str) -> Result<Vec<u8>, LoadError> {
    let mut image = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let code = line.split('#').next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }
        image.push(parse_literal(code).ok_or_else(|| LoadError::MalformedLiteral {
            line: i + 1,
            text: code.to_string(),
        })?);
    }
    if image.len() > MEMORY_SIZE {
        return Err(LoadError::TooLarge { len: image.len() });
    }
    Ok(image)
}

/// One to eight `0`/`1` characters. `u8::from_str_radix` alone would also
/// accept a leading `+`.
fn parse_literal(code: &str) -> Option<u8> {
    if code.len() > 8 || !code.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u8::from_str_radix(code, 2).ok()
}

/// Read and parse a program image from disk.
pub fn load_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io(err),
    })?;
    parse_image(&text)
}
