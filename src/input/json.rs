//! Streaming reader over a JSON array: the bytes of one element are cut out of the stream and
//! decoded on their own, so a malformed element costs only that element.
//!
//! `serde_json` streams a top-level array only through `deserialize_seq`, where the first element
//! that fails to decode aborts the whole sequence with no way to continue after it, and its
//! `StreamDeserializer` expects whitespace-separated values rather than array elements. Hence the
//! element boundaries are found here and each element is handed to `serde_json::from_slice`.

use std::io::BufRead;

use crate::error::{Error, malformed_input, malformed_record};
use crate::input::RawSpectatorEntry;

enum ArrayState {
    BeforeArray,
    FirstElement,
    NextElement,
    Done,
}

pub(crate) struct JsonRecords<R> {
    reader: R,
    state: ArrayState,
    position: u64,
    element: Vec<u8>,
}

impl<R: BufRead> JsonRecords<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            state: ArrayState::BeforeArray,
            position: 0,
            element: Vec::new(),
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<RawSpectatorEntry>, Error> {
        if !self.advance()? {
            return Ok(None);
        }
        serde_json::from_slice(&self.element)
            .map(Some)
            .map_err(|e| malformed_record(self.position, e.to_string()))
    }

    pub(crate) fn skip_entry(&mut self) -> Result<bool, Error> {
        self.advance()
    }

    /// Moves to the next array element and captures its bytes. Returns `false` at the end of the array.
    fn advance(&mut self) -> Result<bool, Error> {
        match self.locate_element() {
            Ok(true) => {
                self.position += 1;
                Ok(true)
            }
            Ok(false) => {
                self.state = ArrayState::Done;
                Ok(false)
            }
            Err(e) => {
                // the stream cannot be resynchronised after structural damage
                self.state = ArrayState::Done;
                Err(e)
            }
        }
    }

    fn locate_element(&mut self) -> Result<bool, Error> {
        match self.state {
            ArrayState::Done => return Ok(false),
            ArrayState::BeforeArray => {
                self.skip_whitespace()?;
                match self.peek()? {
                    // an empty input holds no records
                    None => return Ok(false),
                    Some(b'[') => self.bump(),
                    Some(other) => {
                        return Err(self.structural(format!(
                            "expected '[' at start of input, found '{}'",
                            other as char
                        )));
                    }
                }
                self.state = ArrayState::FirstElement;
            }
            ArrayState::FirstElement | ArrayState::NextElement => {}
        }

        self.skip_whitespace()?;
        match self.peek()? {
            Some(b']') => {
                self.bump();
                return Ok(false);
            }
            None => return Err(self.structural("unexpected end of input inside array")),
            Some(b',') if matches!(self.state, ArrayState::NextElement) => {
                self.bump();
                self.skip_whitespace()?;
            }
            Some(other) if matches!(self.state, ArrayState::NextElement) => {
                return Err(self.structural(format!(
                    "expected ',' or ']' between elements, found '{}'",
                    other as char
                )));
            }
            Some(_) => {}
        }

        self.capture_element()?;
        self.state = ArrayState::NextElement;
        Ok(true)
    }

    fn capture_element(&mut self) -> Result<(), Error> {
        self.element.clear();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        loop {
            let Some(byte) = self.peek()? else {
                return Err(self.structural("unexpected end of input inside element"));
            };

            if in_string {
                self.take(byte);
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                continue;
            }

            match byte {
                b'"' => {
                    in_string = true;
                    self.take(byte);
                }
                b'{' | b'[' => {
                    depth += 1;
                    self.take(byte);
                }
                b'}' | b']' if depth > 0 => {
                    depth -= 1;
                    self.take(byte);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                // scalar elements end at the next delimiter, which stays in the stream
                b',' | b']' | b'}' if depth == 0 => return self.finish_scalar(),
                b if b.is_ascii_whitespace() && depth == 0 => return self.finish_scalar(),
                _ => self.take(byte),
            }
        }
    }

    fn finish_scalar(&self) -> Result<(), Error> {
        if self.element.is_empty() {
            Err(self.structural("missing element between delimiters"))
        } else {
            Ok(())
        }
    }

    fn take(&mut self, byte: u8) {
        self.element.push(byte);
        self.bump();
    }

    fn skip_whitespace(&mut self) -> Result<(), Error> {
        while let Some(byte) = self.peek()? {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.bump();
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>, Error> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    fn bump(&mut self) {
        self.reader.consume(1);
    }

    fn structural(&self, message: impl Into<String>) -> Error {
        malformed_input(self.position, message)
    }
}
