//! Minimal JVM class file constant-pool rewriting.
//!
//! Only the constant pool is decoded. Everything after it (access flags,
//! this/super class, interfaces, fields, methods, attributes) references the
//! pool purely by index, so rewriting only the `Utf8` entries' contents
//! leaves every other byte valid without needing a full class file model.

use hitch_util::errors::{HitchError, HitchResult};

use crate::rule::RelocationRule;
use crate::text::rewrite_slash;

const CONSTANT_UTF8: u8 = 1;
const CONSTANT_INTEGER: u8 = 3;
const CONSTANT_FLOAT: u8 = 4;
const CONSTANT_LONG: u8 = 5;
const CONSTANT_DOUBLE: u8 = 6;
const CONSTANT_CLASS: u8 = 7;
const CONSTANT_STRING: u8 = 8;
const CONSTANT_FIELDREF: u8 = 9;
const CONSTANT_METHODREF: u8 = 10;
const CONSTANT_INTERFACE_METHODREF: u8 = 11;
const CONSTANT_NAME_AND_TYPE: u8 = 12;
const CONSTANT_METHOD_HANDLE: u8 = 15;
const CONSTANT_METHOD_TYPE: u8 = 16;
const CONSTANT_DYNAMIC: u8 = 17;
const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
const CONSTANT_MODULE: u8 = 19;
const CONSTANT_PACKAGE: u8 = 20;

/// Rewrite every `Utf8` constant-pool entry whose content contains a
/// whole-segment match for one of `rules`. Returns the rewritten bytes and
/// whether anything changed (the entry name/path still needs to be
/// relocated by the caller if it changed).
pub fn rewrite_class(bytes: &[u8], rules: &[RelocationRule]) -> HitchResult<(Vec<u8>, bool)> {
    let mut cursor = Cursor::new(bytes);

    let magic = cursor.take(4)?;
    if magic != [0xCA, 0xFE, 0xBA, 0xBE] {
        return Err(HitchError::ConfigurationError {
            message: "not a class file (bad magic)".to_string(),
        }
        .into());
    }
    let minor_major = cursor.take(4)?;
    let pool_count = cursor.take_u16()?;

    let mut out = Vec::with_capacity(bytes.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&minor_major);
    out.extend_from_slice(&pool_count.to_be_bytes());

    let mut any_changed = false;
    let mut i = 1u16;
    while i < pool_count {
        let tag = cursor.take_u8()?;
        out.push(tag);
        match tag {
            CONSTANT_UTF8 => {
                let len = cursor.take_u16()?;
                let raw = cursor.take(len as usize)?;
                let rewritten = match std::str::from_utf8(raw) {
                    Ok(s) => {
                        let (new_s, changed) = rewrite_slash(s, rules);
                        any_changed |= changed;
                        new_s.into_bytes()
                    }
                    Err(_) => raw.to_vec(),
                };
                out.extend_from_slice(&(rewritten.len() as u16).to_be_bytes());
                out.extend_from_slice(&rewritten);
            }
            CONSTANT_CLASS | CONSTANT_STRING | CONSTANT_METHOD_TYPE | CONSTANT_MODULE
            | CONSTANT_PACKAGE => {
                out.extend_from_slice(cursor.take(2)?);
            }
            CONSTANT_FIELDREF
            | CONSTANT_METHODREF
            | CONSTANT_INTERFACE_METHODREF
            | CONSTANT_NAME_AND_TYPE
            | CONSTANT_DYNAMIC
            | CONSTANT_INVOKE_DYNAMIC => {
                out.extend_from_slice(cursor.take(4)?);
            }
            CONSTANT_INTEGER | CONSTANT_FLOAT => {
                out.extend_from_slice(cursor.take(4)?);
            }
            CONSTANT_LONG | CONSTANT_DOUBLE => {
                out.extend_from_slice(cursor.take(8)?);
                // 8-byte constants occupy two pool slots.
                i += 1;
            }
            CONSTANT_METHOD_HANDLE => {
                out.extend_from_slice(cursor.take(3)?);
            }
            other => {
                return Err(HitchError::ConfigurationError {
                    message: format!("unknown constant pool tag {other}"),
                }
                .into());
            }
        }
        i += 1;
    }

    out.extend_from_slice(cursor.remainder());
    Ok((out, any_changed))
}

/// Whether `bytes` looks like a class file before attempting to parse it.
pub fn is_class_file(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == [0xCA, 0xFE, 0xBA, 0xBE]
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> HitchResult<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(HitchError::ConfigurationError {
                message: "truncated class file".to_string(),
            }
            .into());
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> HitchResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> HitchResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn remainder(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
