//! Module defining the record source: the user-provided input is decoded into [`SpectatorRecord`]s,
//! one at a time, from either of the two supported formats.

mod json;
mod xml;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::domain::{SeatLocation, SpectatorRecord};
use crate::error::{Error, configuration_error, malformed_record};

use json::JsonRecords;
use xml::XmlRecords;


/// The wire encodings a source can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// A JSON array, one record per element
    Json,
    /// A sequence of `<spectatorEntry>` fragments
    Xml,
}

impl SourceFormat {
    /// Picks the format for `resource`, either from the selector or from the file suffix.
    pub fn resolve(resource: &str, selector: FormatSelector) -> Result<Self, Error> {
        if let FormatSelector::Explicit(format) = selector {
            return Ok(format);
        }
        let extension = Path::new(resource)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(SourceFormat::Json),
            Some("xml") => Ok(SourceFormat::Xml),
            _ => Err(configuration_error(format!(
                "unsupported input format: {resource}"
            ))),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Json => f.write_str("json"),
            SourceFormat::Xml => f.write_str("xml"),
        }
    }
}

impl FromStr for SourceFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SourceFormat::Json),
            "xml" => Ok(SourceFormat::Xml),
            other => Err(configuration_error(format!("unknown source type: {other}"))),
        }
    }
}

/// How the format of an input is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatSelector {
    /// By the suffix of the resource name
    #[default]
    Auto,
    /// Fixed by configuration, regardless of the suffix
    Explicit(SourceFormat),
}

impl FromStr for FormatSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(FormatSelector::Auto)
        } else {
            s.parse().map(FormatSelector::Explicit)
        }
    }
}

/// Number of items consumed from the input. A source resumed at a token does not emit those items again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PositionToken(u64);

impl PositionToken {
    pub fn new(items: u64) -> Self {
        Self(items)
    }

    pub fn items(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PositionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

enum Input {
    Path(PathBuf),
    Reader {
        name: String,
        reader: Option<Box<dyn BufRead>>,
    },
}

impl Input {
    fn name(&self) -> String {
        match self {
            Input::Path(path) => path.display().to_string(),
            Input::Reader { name, .. } => name.clone(),
        }
    }
}

enum FormatReader {
    Json(JsonRecords<Box<dyn BufRead>>),
    Xml(XmlRecords<Box<dyn BufRead>>),
}

impl FormatReader {
    fn next_entry(&mut self) -> Result<Option<RawSpectatorEntry>, Error> {
        match self {
            FormatReader::Json(reader) => reader.next_entry(),
            FormatReader::Xml(reader) => reader.next_entry(),
        }
    }

    fn skip_entry(&mut self) -> Result<bool, Error> {
        match self {
            FormatReader::Json(reader) => reader.skip_entry(),
            FormatReader::Xml(reader) => reader.skip_entry(),
        }
    }

    fn position(&self) -> u64 {
        match self {
            FormatReader::Json(reader) => reader.position(),
            FormatReader::Xml(reader) => reader.position(),
        }
    }
}

enum State {
    Pending,
    Open(FormatReader),
    Closed,
}

/// Produces spectator records from a JSON or XML input.
///
/// The concrete reader is chosen and constructed on the first call to [`RecordSource::open`] or
/// [`RecordSource::next_record`], so an unsupported format surfaces when the pipeline starts.
/// Once chosen, the format stays fixed for the lifetime of the source.
pub struct RecordSource {
    input: Input,
    selector: FormatSelector,
    resume_from: PositionToken,
    format: Option<SourceFormat>,
    state: State,
}

impl RecordSource {
    pub fn from_path(path: impl Into<PathBuf>, selector: FormatSelector) -> Self {
        Self::new(Input::Path(path.into()), selector)
    }

    /// A source over an already open reader; `name` takes the role of the file name for format dispatch.
    pub fn from_reader(
        name: impl Into<String>,
        reader: impl BufRead + 'static,
        selector: FormatSelector,
    ) -> Self {
        Self::new(
            Input::Reader {
                name: name.into(),
                reader: Some(Box::new(reader)),
            },
            selector,
        )
    }

    fn new(input: Input, selector: FormatSelector) -> Self {
        Self {
            input,
            selector,
            resume_from: PositionToken::default(),
            format: None,
            state: State::Pending,
        }
    }

    /// Skips the items before `token` when the source is opened.
    pub(crate) fn resuming_at(mut self, token: PositionToken) -> Self {
        self.resume_from = token;
        self
    }

    /// The format in use, known once the source is open.
    pub fn format(&self) -> Option<SourceFormat> {
        self.format
    }

    /// Resolves the format and opens the input. Calling it on an open source has no effect.
    pub fn open(&mut self) -> Result<(), Error> {
        if !matches!(self.state, State::Pending) {
            return Ok(());
        }

        let name = self.input.name();
        let format = SourceFormat::resolve(&name, self.selector)?;
        let reader: Box<dyn BufRead> = match &mut self.input {
            Input::Path(path) => Box::new(BufReader::new(File::open(path)?)),
            Input::Reader { reader, .. } => reader
                .take()
                .ok_or_else(|| configuration_error(format!("input {name} was already consumed")))?,
        };

        let mut format_reader = match format {
            SourceFormat::Json => FormatReader::Json(JsonRecords::new(reader)),
            SourceFormat::Xml => FormatReader::Xml(XmlRecords::new(reader)),
        };

        let mut skipped = 0;
        while skipped < self.resume_from.items() && format_reader.skip_entry()? {
            skipped += 1;
        }
        if skipped > 0 {
            info!(skipped, "resumed {name} past already committed items");
        }

        info!(%format, input = %name, "source opened");
        self.format = Some(format);
        self.state = State::Open(format_reader);
        Ok(())
    }

    /// Reads the next record; `None` once the input is exhausted or the source was closed.
    pub fn next_record(&mut self) -> Result<Option<SpectatorRecord>, Error> {
        self.open()?;
        let State::Open(reader) = &mut self.state else {
            return Ok(None);
        };

        let Some(entry) = reader.next_entry()? else {
            debug!(position = reader.position(), "source exhausted");
            return Ok(None);
        };
        entry.into_record(reader.position()).map(Some)
    }

    /// Position after the last item handed out (or failed) so far.
    pub fn checkpoint(&self) -> PositionToken {
        match &self.state {
            State::Open(reader) => PositionToken::new(reader.position()),
            State::Pending | State::Closed => self.resume_from,
        }
    }

    pub fn close(&mut self) {
        if let State::Open(reader) = &self.state {
            self.resume_from = PositionToken::new(reader.position());
        }
        self.state = State::Closed;
    }
}

/// Parses an entry time: first as an ISO-8601 local date-time, then with the space separator replaced by `T`.
pub(crate) fn parse_entry_time(value: &str) -> Option<NaiveDateTime> {
    parse_iso_local(value).or_else(|| parse_iso_local(&value.replace(' ', "T")))
}

fn parse_iso_local(value: &str) -> Option<NaiveDateTime> {
    value
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").ok())
}

// Intermediate type mirroring the fields of one input item, shared by both formats
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSpectatorEntry {
    spectator_id: Option<String>,
    age: Option<i32>,
    nationality: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    match_id: Option<String>,
    entry_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    gate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    ticket_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    ticket_type: Option<String>,
    seat_location: Option<RawSeatLocation>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSeatLocation {
    #[serde(default, deserialize_with = "lenient_text")]
    tribune: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    bloc: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    rang: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    siege: Option<String>,
}

impl RawSpectatorEntry {
    fn into_record(self, position: u64) -> Result<SpectatorRecord, Error> {
        let RawSpectatorEntry {
            spectator_id,
            age,
            nationality,
            match_id,
            entry_time,
            gate,
            ticket_number,
            ticket_type,
            seat_location,
        } = self;

        let entry_time = match entry_time {
            Some(raw) => Some(parse_entry_time(&raw).ok_or_else(|| {
                malformed_record(position, format!("unparseable entry time: {raw}"))
            })?),
            None => None,
        };

        Ok(SpectatorRecord {
            spectator_id,
            // an absent age is rejected downstream like any non-positive one
            age: age.unwrap_or_default(),
            nationality,
            match_id,
            entry_time,
            gate,
            ticket_number,
            ticket_type,
            seat_location: seat_location.map(|seat| SeatLocation {
                tribune: seat.tribune,
                bloc: seat.bloc,
                rang: seat.rang,
                siege: seat.siege,
            }),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

// Identifiers such as ticket numbers show up both quoted and unquoted in the wild
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Integer(n) => n.to_string(),
            TextOrNumber::Float(n) => n.to_string(),
        }),
    )
}
