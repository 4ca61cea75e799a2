//! Incremental JSON event reader
//!
//! Tokenizes a JSON document from any `Read` into path-tagged events without
//! building the document. Memory is bounded by nesting depth plus the longest
//! single scalar.

use super::types::{EventKind, EventSource, ParseEvent};
use crate::error::{Error, Result};
use crate::types::Scalar;
use std::io::{ErrorKind, Read};
use tracing::debug;

const BUFFER_SIZE: usize = 64 * 1024;

/// Path segment standing for any array index
const ITEM: &str = "item";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectState {
    KeyOrEnd,
    Key,
    Colon,
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayState {
    ValueOrEnd,
    Value,
    CommaOrEnd,
}

#[derive(Debug)]
enum Frame {
    Object {
        prefix: String,
        key: String,
        state: ObjectState,
    },
    Array {
        prefix: String,
        state: ArrayState,
    },
}

#[derive(Debug, Clone, Copy)]
enum Top {
    Root,
    Object(ObjectState),
    Array(ArrayState),
}

/// Decoded string plus the first problem seen while decoding it
struct StringToken {
    text: String,
    problem: Option<String>,
}

/// Streaming JSON tokenizer
///
/// Value-level damage (bad escapes, invalid UTF-8, bad number literals,
/// unknown bare words) is reported as `Error::MalformedEvent` after the value
/// has been consumed, so the next call continues with the following event.
/// Structural damage is reported once as `Error::Decode`; afterwards the
/// reader reports end of stream.
pub struct JsonEventReader<R> {
    input: R,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    offset: u64,
    stack: Vec<Frame>,
    started: bool,
    finished: bool,
    scratch: Vec<u8>,
}

impl<R: Read> JsonEventReader<R> {
    /// Create a reader over a byte stream
    pub fn new(input: R) -> Self {
        Self {
            input,
            buf: vec![0; BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            offset: 0,
            stack: Vec::new(),
            started: false,
            finished: false,
            scratch: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Byte level
    // ------------------------------------------------------------------------

    fn fill(&mut self) -> Result<bool> {
        if self.pos < self.len {
            return Ok(true);
        }
        loop {
            match self.input.read(&mut self.buf) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.pos = 0;
                    self.len = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.finished = true;
                    return Err(Error::Io(e));
                }
            }
        }
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        if self.fill()? {
            Ok(Some(self.buf[self.pos]))
        } else {
            Ok(None)
        }
    }

    fn bump(&mut self) {
        self.pos += 1;
        self.offset += 1;
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.peek()?;
        if byte.is_some() {
            self.bump();
        }
        Ok(byte)
    }

    fn skip_whitespace(&mut self) -> Result<Option<u8>> {
        loop {
            match self.peek()? {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.bump(),
                other => return Ok(other),
            }
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> Error {
        self.finished = true;
        self.stack.clear();
        Error::decode(self.offset, message)
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    fn top(&self) -> Top {
        match self.stack.last() {
            None => Top::Root,
            Some(Frame::Object { state, .. }) => Top::Object(*state),
            Some(Frame::Array { state, .. }) => Top::Array(*state),
        }
    }

    fn set_object_state(&mut self, next: ObjectState) {
        if let Some(Frame::Object { state, .. }) = self.stack.last_mut() {
            *state = next;
        }
    }

    fn set_array_state(&mut self, next: ArrayState) {
        if let Some(Frame::Array { state, .. }) = self.stack.last_mut() {
            *state = next;
        }
    }

    /// Path of the value about to be read in the current container
    fn child_path(&self) -> String {
        match self.stack.last() {
            None => String::new(),
            Some(Frame::Object { prefix, key, .. }) => join_path(prefix, key),
            Some(Frame::Array { prefix, .. }) => join_path(prefix, ITEM),
        }
    }

    fn close(&mut self, kind: EventKind) -> ParseEvent {
        let prefix = match self.stack.pop() {
            Some(Frame::Object { prefix, .. } | Frame::Array { prefix, .. }) => prefix,
            None => String::new(),
        };
        ParseEvent::container(prefix, kind)
    }

    fn advance(&mut self) -> Result<Option<ParseEvent>> {
        loop {
            let byte = self.skip_whitespace()?;
            match self.top() {
                Top::Root => {
                    if !self.started {
                        self.started = true;
                        return self.parse_value(String::new(), byte);
                    }
                    return match byte {
                        None => {
                            self.finished = true;
                            Ok(None)
                        }
                        Some(b) => Err(self.fail(format!(
                            "trailing data after document: {:?}",
                            b as char
                        ))),
                    };
                }
                Top::Object(state) => match (state, byte) {
                    (ObjectState::KeyOrEnd | ObjectState::CommaOrEnd, Some(b'}')) => {
                        self.bump();
                        return Ok(Some(self.close(EventKind::EndMap)));
                    }
                    (ObjectState::CommaOrEnd, Some(b',')) => {
                        self.bump();
                        self.set_object_state(ObjectState::Key);
                    }
                    (ObjectState::KeyOrEnd | ObjectState::Key, Some(b'"')) => {
                        self.bump();
                        let token = self.read_string()?;
                        if let Some(problem) = token.problem {
                            debug!("Object key decoded lossily: {problem}");
                        }
                        if let Some(Frame::Object { key, state, .. }) = self.stack.last_mut() {
                            *key = token.text;
                            *state = ObjectState::Colon;
                        }
                    }
                    (ObjectState::Colon, Some(b':')) => {
                        self.bump();
                        self.set_object_state(ObjectState::Value);
                    }
                    (ObjectState::Value, b) => {
                        self.set_object_state(ObjectState::CommaOrEnd);
                        let path = self.child_path();
                        return self.parse_value(path, b);
                    }
                    (_, None) => return Err(self.fail("unexpected end of document inside object")),
                    (_, Some(b)) => {
                        return Err(self.fail(format!("unexpected byte {:?} in object", b as char)))
                    }
                },
                Top::Array(state) => match (state, byte) {
                    (ArrayState::ValueOrEnd | ArrayState::CommaOrEnd, Some(b']')) => {
                        self.bump();
                        return Ok(Some(self.close(EventKind::EndArray)));
                    }
                    (ArrayState::CommaOrEnd, Some(b',')) => {
                        self.bump();
                        self.set_array_state(ArrayState::Value);
                    }
                    (ArrayState::ValueOrEnd | ArrayState::Value, b) => {
                        self.set_array_state(ArrayState::CommaOrEnd);
                        let path = self.child_path();
                        return self.parse_value(path, b);
                    }
                    (_, None) => return Err(self.fail("unexpected end of document inside array")),
                    (_, Some(b)) => {
                        return Err(self.fail(format!("unexpected byte {:?} in array", b as char)))
                    }
                },
            }
        }
    }

    fn parse_value(&mut self, path: String, byte: Option<u8>) -> Result<Option<ParseEvent>> {
        match byte {
            Some(b'{') => {
                self.bump();
                self.stack.push(Frame::Object {
                    prefix: path.clone(),
                    key: String::new(),
                    state: ObjectState::KeyOrEnd,
                });
                Ok(Some(ParseEvent::container(path, EventKind::StartMap)))
            }
            Some(b'[') => {
                self.bump();
                self.stack.push(Frame::Array {
                    prefix: path.clone(),
                    state: ArrayState::ValueOrEnd,
                });
                Ok(Some(ParseEvent::container(path, EventKind::StartArray)))
            }
            Some(b'"') => {
                self.bump();
                let token = self.read_string()?;
                match token.problem {
                    None => Ok(Some(ParseEvent::scalar(path, Scalar::String(token.text)))),
                    Some(problem) => Err(Error::malformed(path, problem)),
                }
            }
            Some(b'-' | b'0'..=b'9') => {
                let literal = self.read_bare_token()?;
                if is_json_number(&literal) {
                    Ok(Some(ParseEvent::scalar(path, Scalar::Number(literal))))
                } else {
                    Err(Error::malformed(
                        path,
                        format!("invalid number literal '{literal}'"),
                    ))
                }
            }
            Some(b'a'..=b'z' | b'A'..=b'Z') => {
                let word = self.read_bare_token()?;
                let value = match word.as_str() {
                    "true" => Scalar::Bool(true),
                    "false" => Scalar::Bool(false),
                    "null" => Scalar::Null,
                    _ => return Err(Error::malformed(path, format!("unknown literal '{word}'"))),
                };
                Ok(Some(ParseEvent::scalar(path, value)))
            }
            Some(b) => Err(self.fail(format!(
                "unexpected byte {:?} where a value was expected",
                b as char
            ))),
            None => Err(self.fail("unexpected end of document where a value was expected")),
        }
    }

    // ------------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------------

    fn read_bare_token(&mut self) -> Result<String> {
        self.scratch.clear();
        while let Some(b) = self.peek()? {
            if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.') {
                self.scratch.push(b);
                self.bump();
            } else {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&self.scratch).into_owned())
    }

    /// Read a string body; the opening quote is already consumed
    fn read_string(&mut self) -> Result<StringToken> {
        self.scratch.clear();
        let mut problem: Option<String> = None;
        loop {
            let Some(b) = self.next_byte()? else {
                return Err(self.fail("unterminated string"));
            };
            match b {
                b'"' => break,
                b'\\' => {
                    let Some(escape) = self.next_byte()? else {
                        return Err(self.fail("unterminated escape sequence"));
                    };
                    let found = if escape == b'u' {
                        self.push_unicode_escape()?
                    } else {
                        self.push_simple_escape(escape)
                    };
                    if problem.is_none() {
                        problem = found;
                    }
                }
                0x00..=0x1f => {
                    if problem.is_none() {
                        problem = Some("unescaped control character in string".to_string());
                    }
                    self.scratch.push(b);
                }
                _ => self.scratch.push(b),
            }
        }

        let text = match std::str::from_utf8(&self.scratch) {
            Ok(s) => s.to_owned(),
            Err(_) => {
                if problem.is_none() {
                    problem = Some("invalid UTF-8 in string".to_string());
                }
                String::from_utf8_lossy(&self.scratch).into_owned()
            }
        };
        Ok(StringToken { text, problem })
    }

    fn push_simple_escape(&mut self, escape: u8) -> Option<String> {
        let byte = match escape {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            other => return Some(format!("invalid escape '\\{}'", other as char)),
        };
        self.scratch.push(byte);
        None
    }

    fn push_char(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.scratch
            .extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
    }

    /// Hex digits are only consumed while they are hex, so a short escape
    /// never swallows the closing quote
    fn read_hex4(&mut self) -> Result<Option<u32>> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self.peek()?.and_then(|b| (b as char).to_digit(16));
            let Some(digit) = digit else {
                return Ok(None);
            };
            self.bump();
            value = value * 16 + digit;
        }
        Ok(Some(value))
    }

    fn push_unicode_escape(&mut self) -> Result<Option<String>> {
        let Some(first) = self.read_hex4()? else {
            return Ok(Some("invalid \\u escape".to_string()));
        };
        let code = match first {
            0xD800..=0xDBFF => {
                if self.peek()? != Some(b'\\') {
                    return Ok(Some("unpaired surrogate in \\u escape".to_string()));
                }
                self.bump();
                let Some(escape) = self.next_byte()? else {
                    return Err(self.fail("unterminated escape sequence"));
                };
                if escape != b'u' {
                    self.push_simple_escape(escape);
                    return Ok(Some("unpaired surrogate in \\u escape".to_string()));
                }
                match self.read_hex4()? {
                    Some(second @ 0xDC00..=0xDFFF) => {
                        0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
                    }
                    _ => return Ok(Some("unpaired surrogate in \\u escape".to_string())),
                }
            }
            0xDC00..=0xDFFF => return Ok(Some("unpaired surrogate in \\u escape".to_string())),
            other => other,
        };
        match char::from_u32(code) {
            Some(c) => {
                self.push_char(c);
                Ok(None)
            }
            None => Ok(Some(format!("invalid code point U+{code:X}"))),
        }
    }
}

impl<R: Read> EventSource for JsonEventReader<R> {
    fn next_event(&mut self) -> Result<Option<ParseEvent>> {
        if self.finished {
            return Ok(None);
        }
        self.advance()
    }
}

impl<R: Read> Iterator for JsonEventReader<R> {
    type Item = Result<ParseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

impl<R> std::fmt::Debug for JsonEventReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonEventReader")
            .field("offset", &self.offset)
            .field("depth", &self.stack.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn is_json_number(literal: &str) -> bool {
    let bytes = literal.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };

    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            digits(&mut i);
        }
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if digits(&mut i) == 0 {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return false;
        }
    }
    i == bytes.len()
}
