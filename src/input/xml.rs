//! Streaming reader over `<spectatorEntry>` fragments. Child elements are mapped onto record
//! fields by tag name; tags that do not name a field are ignored.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::name::QName;

use crate::error::{Error, malformed_input, malformed_record};
use crate::input::{RawSeatLocation, RawSpectatorEntry};

const FRAGMENT_ROOT: &[u8] = b"spectatorEntry";
const SEAT_LOCATION: &str = "seatLocation";

pub(crate) struct XmlRecords<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    position: u64,
    done: bool,
    // qualified name of the fragment currently open, prefix included
    fragment_name: Vec<u8>,
}

impl<R: BufRead> XmlRecords<R> {
    pub(crate) fn new(reader: R) -> Self {
        let mut reader = Reader::from_reader(reader);
        let config = reader.config_mut();
        config.trim_text(true);
        config.expand_empty_elements = true;

        Self {
            reader,
            buf: Vec::new(),
            position: 0,
            done: false,
            fragment_name: Vec::new(),
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<RawSpectatorEntry>, Error> {
        if !self.seek_fragment()? {
            return Ok(None);
        }
        self.read_fragment().map(Some)
    }

    pub(crate) fn skip_entry(&mut self) -> Result<bool, Error> {
        if !self.seek_fragment()? {
            return Ok(false);
        }
        self.buf.clear();
        if let Err(e) = self
            .reader
            .read_to_end_into(QName(self.fragment_name.as_slice()), &mut self.buf)
        {
            self.done = true;
            return Err(malformed_input(self.position, e.to_string()));
        }
        Ok(true)
    }

    /// Advances past the opening tag of the next fragment. Returns `false` at the end of the document.
    fn seek_fragment(&mut self) -> Result<bool, Error> {
        if self.done {
            return Ok(false);
        }
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(start)) if start.local_name().as_ref() == FRAGMENT_ROOT => {
                    self.fragment_name.clear();
                    self.fragment_name.extend_from_slice(start.name().as_ref());
                    self.position += 1;
                    return Ok(true);
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return Ok(false);
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Err(malformed_input(self.position, e.to_string()));
                }
            }
        }
    }

    /// Consumes the fragment up to its closing tag. A field that fails to decode is reported only
    /// after the closing tag was reached, so the next fragment starts cleanly.
    fn read_fragment(&mut self) -> Result<RawSpectatorEntry, Error> {
        let position = self.position;
        let mut entry = RawSpectatorEntry::default();
        let mut path: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut field_error: Option<String> = None;

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.done = true;
                    return Err(malformed_input(position, e.to_string()));
                }
            };

            match event {
                Event::Start(start) => {
                    path.push(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
                    text.clear();
                }
                Event::Text(chunk) => match chunk.unescape() {
                    Ok(unescaped) => text.push_str(&unescaped),
                    Err(e) => {
                        field_error.get_or_insert(e.to_string());
                    }
                },
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Event::End(_) => {
                    let Some(name) = path.pop() else {
                        // closing tag of the fragment root
                        return match field_error {
                            Some(message) => Err(malformed_record(position, message)),
                            None => Ok(entry),
                        };
                    };
                    let value = std::mem::take(&mut text);
                    if let Err(message) = assign(&mut entry, &path, &name, value) {
                        field_error.get_or_insert(message);
                    }
                }
                Event::Eof => {
                    self.done = true;
                    return Err(malformed_input(
                        position,
                        "unexpected end of document inside spectatorEntry",
                    ));
                }
                _ => {}
            }
        }
    }
}

fn assign(
    entry: &mut RawSpectatorEntry,
    parents: &[String],
    name: &str,
    value: String,
) -> Result<(), String> {
    match parents {
        [] => assign_entry_field(entry, name, value),
        [parent] if parent == SEAT_LOCATION => {
            let seat = entry
                .seat_location
                .get_or_insert_with(RawSeatLocation::default);
            assign_seat_field(seat, name, value);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn assign_entry_field(
    entry: &mut RawSpectatorEntry,
    name: &str,
    value: String,
) -> Result<(), String> {
    let value = Some(value).filter(|v| !v.is_empty());
    match name {
        "spectatorId" => entry.spectator_id = value,
        "age" => {
            entry.age = value
                .map(|v| {
                    v.parse::<i32>()
                        .map_err(|_| format!("age is not an integer: {v}"))
                })
                .transpose()?;
        }
        "nationality" => entry.nationality = value,
        "matchId" => entry.match_id = value,
        "entryTime" => entry.entry_time = value,
        "gate" => entry.gate = value,
        "ticketNumber" => entry.ticket_number = value,
        "ticketType" => entry.ticket_type = value,
        SEAT_LOCATION => {
            entry
                .seat_location
                .get_or_insert_with(RawSeatLocation::default);
        }
        _ => {}
    }
    Ok(())
}

fn assign_seat_field(seat: &mut RawSeatLocation, name: &str, value: String) {
    let value = Some(value).filter(|v| !v.is_empty());
    match name {
        "tribune" => seat.tribune = value,
        "bloc" => seat.bloc = value,
        "rang" => seat.rang = value,
        "siege" => seat.siege = value,
        _ => {}
    }
}
