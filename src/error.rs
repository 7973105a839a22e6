use std::fmt::Display;
use std::path::PathBuf;
use std::error::Error;

use super::event::EventRecord;
use super::words::{Truncation, WordKind};

/*
    Validation violations
 */

/// Which crate trailer field disagreed with the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerField {
    TriggerId,
    BxId,
}

impl Display for TrailerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TriggerId => write!(f, "trigger id"),
            Self::BxId => write!(f, "bunch crossing id"),
        }
    }
}

/// A single failed check found when finalizing an event. Every variant carries the values that
/// conflicted, with `expected` taken from the authoritative word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingWord(WordKind),
    FieldTruncation(Truncation),
    MarkerMismatch { word: WordKind, expected: u8, found: u8 },
    TrailerHeaderMismatch { field: TrailerField, expected: u32, found: u32 },
    BoardCountMismatch { expected: usize, found: usize },
    LengthMismatch { expected: u64, found: u64 },
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingWord(kind) => write!(f, "The {} was never set!", kind),
            Self::FieldTruncation(trunc) => write!(f, "Field truncated in strict mode: {}", trunc),
            Self::MarkerMismatch { word, expected, found } => write!(f, "Incorrect control marker in {}! Found: {:#x}, Expected: {:#x}", word, found, expected),
            Self::TrailerHeaderMismatch { field, expected, found } => write!(f, "Crate trailer {} does not match the header! Found: {}, Expected: {}", field, found, expected),
            Self::BoardCountMismatch { expected, found } => write!(f, "Incorrect number of board sub-headers! Found: {}, Expected: {}", found, expected),
            Self::LengthMismatch { expected, found } => write!(f, "Incorrect event length! Computed: {}, Declared: {}", found, expected)
        }
    }
}

/*
    Validation errors
 */

/// Returned by finalize when any check fails. Holds every violation found along with the
/// rejected record, which stays read-only.
#[derive(Debug, Clone)]
pub struct ValidationError {
    violations: Vec<Violation>,
    record: EventRecord,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>, record: EventRecord) -> Self {
        Self { violations, record }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn record(&self) -> &EventRecord {
        &self.record
    }

    /// True if the failure means the reader lost track of the record boundaries
    pub fn is_framing_error(&self) -> bool {
        self.violations.iter().any(|v| matches!(v, Violation::MarkerMismatch { .. }))
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AMC13 event failed validation with {} violation(s)!", self.violations.len())?;
        for violation in self.violations.iter() {
            write!(f, " {}", violation)?;
        }
        Ok(())
    }
}

impl Error for ValidationError {

}

/*
    Event errors
 */
#[derive(Debug)]
pub enum EventError {
    NoBoardForPayload(usize),
}

impl Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoBoardForPayload(len) => write!(f, "Event was given {} payload bytes before any board sub-header!", len)
        }
    }
}

impl Error for EventError {

}

/*
    RawFile errors
 */

#[derive(Debug)]
pub enum RawFileError {
    BadFilePath(PathBuf),
    TruncatedEvent(WordKind),
    PayloadSizeMismatch { board: usize, expected: u64, found: u64 },
    EventError(EventError),
    IOError(std::io::Error)
}

impl From<std::io::Error> for RawFileError {
    fn from(value: std::io::Error) -> Self {
        RawFileError::IOError(value)
    }
}

impl From<EventError> for RawFileError {
    fn from(value: EventError) -> Self {
        RawFileError::EventError(value)
    }
}

impl Display for RawFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadFilePath(path) => write!(f, "File {} does not exist at RawFile::new!", path.display()),
            Self::TruncatedEvent(kind) => write!(f, "Raw stream ended in the middle of an event while reading the {}!", kind),
            Self::PayloadSizeMismatch { board, expected, found } => write!(f, "Board {} payload does not match its block size! Found: {} bytes, Expected: {} bytes", board, found, expected),
            Self::EventError(e) => write!(f, "RawFile received an event error: {}", e),
            Self::IOError(e) => write!(f, "RawFile received an io error: {}!", e)
        }
    }
}

impl Error for RawFileError {

}

/*
    Config errors
 */
#[derive(Debug)]
pub enum ConfigError {
    BadFilePath(PathBuf),
    IOError(std::io::Error),
    ParsingError(serde_yaml::Error)
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::IOError(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::ParsingError(value)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadFilePath(path) => write!(f, "File {} given to Config does not exist!", path.display()),
            Self::IOError(e) => write!(f, "Config received an io error: {}", e),
            Self::ParsingError(e) => write!(f, "Config received a parsing error: {}", e)
        }
    }
}

impl Error for ConfigError {

}

/*
    Processor errors
 */
#[derive(Debug)]
pub enum ProcessorError {
    FileError(RawFileError),
    ConfigError(ConfigError),
    RejectedEvent(u64, ValidationError)
}

impl From<RawFileError> for ProcessorError {
    fn from(value: RawFileError) -> Self {
        Self::FileError(value)
    }
}

impl From<ConfigError> for ProcessorError {
    fn from(value: ConfigError) -> Self {
        Self::ConfigError(value)
    }
}

impl Display for ProcessorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileError(e) => write!(f, "Processor failed reading the raw file with error: {}", e),
            Self::ConfigError(e) => write!(f, "Processor failed due to Configuration error: {}", e),
            Self::RejectedEvent(n, e) => write!(f, "Processor stopped at event {}: {}", n, e)
        }
    }
}

impl Error for ProcessorError {

}
