use std::fmt::Display;

use super::bitfield::{mask, BitField};
use super::constants::*;

/*
    Word layouts. Offsets count from the least significant bit of the 64-bit word.
 */

// CDF header
const CDFH_FOV: BitField = BitField::new("fov", 4, 4);
const CDFH_SOURCE_ID: BitField = BitField::new("source_id", 8, 12);
const CDFH_BX_ID: BitField = BitField::new("bx_id", 20, 12);
const CDFH_TRIGGER_ID: BitField = BitField::new("trigger_id", 32, 24);
const CDFH_EVENT_TYPE: BitField = BitField::new("event_type", 56, 4);
const CDFH_MARKER: BitField = BitField::new("marker", 60, 4);

// Crate header
const CRATEH_MARKER: BitField = BitField::new("marker", 0, 4);
const CRATEH_ORBIT_NUMBER: BitField = BitField::new("orbit_number", 4, 32);
const CRATEH_BOARD_COUNT: BitField = BitField::new("board_count", 52, 4);
const CRATEH_CAL_TYPE: BitField = BitField::new("cal_type", 56, 4);
const CRATEH_UFOV: BitField = BitField::new("ufov", 60, 4);

// Crate trailer (no control marker)
const CRATET_BX_ID: BitField = BitField::new("bx_id", 0, 12);
const CRATET_TRIGGER_ID: BitField = BitField::new("trigger_id", 12, 8);
const CRATET_BLOCK_NUMBER: BitField = BitField::new("block_number", 20, 8);
const CRATET_CRC32: BitField = BitField::new("crc32", 32, 32);

// CDF trailer
const CDFT_TTS: BitField = BitField::new("tts", 4, 4);
const CDFT_EVENT_STATUS: BitField = BitField::new("event_status", 8, 8);
const CDFT_CRC: BitField = BitField::new("crc", 16, 16);
const CDFT_EVENT_LENGTH: BitField = BitField::new("event_length", 32, 24);
const CDFT_MARKER: BitField = BitField::new("marker", 60, 4);

// Board sub-header
// 55 - 32    | 27 - 20      | 19 - 16     | 15 - 0
// block_size | block_number | board_index | board_id
const BOARD_ID: BitField = BitField::new("board_id", 0, 16);
const BOARD_INDEX: BitField = BitField::new("board_index", 16, 4);
const BOARD_BLOCK_NUMBER: BitField = BitField::new("block_number", 20, 8);
const BOARD_BLOCK_SIZE: BitField = BitField::new("block_size", 32, 24);

/// Position of a word within the event record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordKind {
    CdfHeader,
    CrateHeader,
    BoardHeader,
    CrateTrailer,
    CdfTrailer,
}

impl Display for WordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CdfHeader => write!(f, "CDF header"),
            Self::CrateHeader => write!(f, "crate header"),
            Self::BoardHeader => write!(f, "board sub-header"),
            Self::CrateTrailer => write!(f, "crate trailer"),
            Self::CdfTrailer => write!(f, "CDF trailer"),
        }
    }
}

/// A field value which was wider than its slot and lost its high bits when packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub word: WordKind,
    pub field: &'static str,
    pub value: u64,
    pub width: u32,
}

impl Truncation {
    /// The value that actually landed in the word
    pub fn kept(&self) -> u64 {
        self.value & mask(self.width)
    }
}

impl Display for Truncation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} field {} given {:#x} which does not fit in {} bits, kept {:#x}", self.word, self.field, self.value, self.width, self.kept())
    }
}

/// A packed word along with any truncations that happened while packing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed<T> {
    pub word: T,
    pub truncations: Vec<Truncation>,
}

/// Composes a word one field at a time, OR-ing the partial words together
struct WordPacker {
    kind: WordKind,
    word: u64,
    truncations: Vec<Truncation>,
}

impl WordPacker {
    fn new(kind: WordKind) -> Self {
        WordPacker { kind, word: 0, truncations: vec![] }
    }

    fn field(mut self, field: &BitField, value: u64) -> Self {
        if !field.fits(value) {
            self.truncations.push(Truncation { word: self.kind, field: field.name, value, width: field.width });
        }
        self.word |= field.pack(value);
        self
    }

    fn finish(self) -> (u64, Vec<Truncation>) {
        (self.word, self.truncations)
    }
}

/// Words that carry a fixed control nibble identifying their place in the record
pub trait MarkedWord {
    const KIND: WordKind;
    const EXPECTED_MARKER: u8;

    fn marker(&self) -> u8;
}

/*
    CDF header
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CdfHeader {
    word: u64,
}

impl CdfHeader {
    pub fn new(event_type: u8, trigger_id: u32, bx_id: u16, source_id: u16) -> Self {
        Self::pack(event_type, trigger_id, bx_id, source_id).word
    }

    pub fn pack(event_type: u8, trigger_id: u32, bx_id: u16, source_id: u16) -> Packed<Self> {
        let (word, truncations) = WordPacker::new(WordKind::CdfHeader)
            .field(&CDFH_MARKER, CDF_HEADER_MARKER as u64)
            .field(&CDFH_EVENT_TYPE, event_type as u64)
            .field(&CDFH_TRIGGER_ID, trigger_id as u64)
            .field(&CDFH_BX_ID, bx_id as u64)
            .field(&CDFH_SOURCE_ID, source_id as u64)
            .finish();
        Packed { word: Self { word }, truncations }
    }

    pub fn from_word(word: u64) -> Self {
        Self { word }
    }

    pub fn word(&self) -> u64 {
        self.word
    }

    pub fn event_type(&self) -> u8 {
        CDFH_EVENT_TYPE.unpack(self.word) as u8
    }

    /// Level-1 trigger id
    pub fn trigger_id(&self) -> u32 {
        CDFH_TRIGGER_ID.unpack(self.word) as u32
    }

    pub fn bx_id(&self) -> u16 {
        CDFH_BX_ID.unpack(self.word) as u16
    }

    pub fn source_id(&self) -> u16 {
        CDFH_SOURCE_ID.unpack(self.word) as u16
    }

    pub fn fov(&self) -> u8 {
        CDFH_FOV.unpack(self.word) as u8
    }
}

impl MarkedWord for CdfHeader {
    const KIND: WordKind = WordKind::CdfHeader;
    const EXPECTED_MARKER: u8 = CDF_HEADER_MARKER;

    fn marker(&self) -> u8 {
        CDFH_MARKER.unpack(self.word) as u8
    }
}

/*
    Crate header
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrateHeader {
    word: u64,
}

impl CrateHeader {
    pub fn new(cal_type: u8, board_count: u8, orbit_number: u32) -> Self {
        Self::pack(cal_type, board_count, orbit_number).word
    }

    pub fn pack(cal_type: u8, board_count: u8, orbit_number: u32) -> Packed<Self> {
        let (word, truncations) = WordPacker::new(WordKind::CrateHeader)
            .field(&CRATEH_MARKER, CRATE_HEADER_MARKER as u64)
            .field(&CRATEH_CAL_TYPE, cal_type as u64)
            .field(&CRATEH_BOARD_COUNT, board_count as u64)
            .field(&CRATEH_ORBIT_NUMBER, orbit_number as u64)
            .finish();
        Packed { word: Self { word }, truncations }
    }

    pub fn from_word(word: u64) -> Self {
        Self { word }
    }

    pub fn word(&self) -> u64 {
        self.word
    }

    pub fn cal_type(&self) -> u8 {
        CRATEH_CAL_TYPE.unpack(self.word) as u8
    }

    /// Number of board sub-headers the crate declares will follow
    pub fn board_count(&self) -> u8 {
        CRATEH_BOARD_COUNT.unpack(self.word) as u8
    }

    pub fn orbit_number(&self) -> u32 {
        CRATEH_ORBIT_NUMBER.unpack(self.word) as u32
    }

    pub fn ufov(&self) -> u8 {
        CRATEH_UFOV.unpack(self.word) as u8
    }
}

impl MarkedWord for CrateHeader {
    const KIND: WordKind = WordKind::CrateHeader;
    const EXPECTED_MARKER: u8 = CRATE_HEADER_MARKER;

    fn marker(&self) -> u8 {
        CRATEH_MARKER.unpack(self.word) as u8
    }
}

/*
    Crate trailer
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrateTrailer {
    word: u64,
}

impl CrateTrailer {
    pub fn new(block_number: u8, trigger_id: u8, bx_id: u16) -> Self {
        Self::pack(block_number, trigger_id, bx_id).word
    }

    pub fn pack(block_number: u8, trigger_id: u8, bx_id: u16) -> Packed<Self> {
        let (word, truncations) = WordPacker::new(WordKind::CrateTrailer)
            .field(&CRATET_BLOCK_NUMBER, block_number as u64)
            .field(&CRATET_TRIGGER_ID, trigger_id as u64)
            .field(&CRATET_BX_ID, bx_id as u64)
            .finish();
        Packed { word: Self { word }, truncations }
    }

    pub fn from_word(word: u64) -> Self {
        Self { word }
    }

    pub fn word(&self) -> u64 {
        self.word
    }

    pub fn block_number(&self) -> u8 {
        CRATET_BLOCK_NUMBER.unpack(self.word) as u8
    }

    /// Low 8 bits of the level-1 trigger id
    pub fn trigger_id(&self) -> u8 {
        CRATET_TRIGGER_ID.unpack(self.word) as u8
    }

    pub fn bx_id(&self) -> u16 {
        CRATET_BX_ID.unpack(self.word) as u16
    }

    pub fn crc32(&self) -> u32 {
        CRATET_CRC32.unpack(self.word) as u32
    }
}

/*
    CDF trailer
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CdfTrailer {
    word: u64,
}

impl CdfTrailer {
    pub fn new(event_length: u32) -> Self {
        Self::pack(event_length).word
    }

    pub fn pack(event_length: u32) -> Packed<Self> {
        let (word, truncations) = WordPacker::new(WordKind::CdfTrailer)
            .field(&CDFT_MARKER, CDF_TRAILER_MARKER as u64)
            .field(&CDFT_EVENT_LENGTH, event_length as u64)
            .finish();
        Packed { word: Self { word }, truncations }
    }

    pub fn from_word(word: u64) -> Self {
        Self { word }
    }

    pub fn word(&self) -> u64 {
        self.word
    }

    /// Declared event length in 64-bit words, header and trailer words included
    pub fn event_length(&self) -> u32 {
        CDFT_EVENT_LENGTH.unpack(self.word) as u32
    }

    pub fn tts(&self) -> u8 {
        CDFT_TTS.unpack(self.word) as u8
    }

    pub fn event_status(&self) -> u8 {
        CDFT_EVENT_STATUS.unpack(self.word) as u8
    }

    pub fn crc(&self) -> u16 {
        CDFT_CRC.unpack(self.word) as u16
    }
}

impl MarkedWord for CdfTrailer {
    const KIND: WordKind = WordKind::CdfTrailer;
    const EXPECTED_MARKER: u8 = CDF_TRAILER_MARKER;

    fn marker(&self) -> u8 {
        CDFT_MARKER.unpack(self.word) as u8
    }
}

/*
    Board sub-header
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardHeader {
    word: u64,
}

impl BoardHeader {
    pub fn new(block_size: u32, block_number: u8, board_index: u8, board_id: u16) -> Self {
        Self::pack(block_size, block_number, board_index, board_id).word
    }

    pub fn pack(block_size: u32, block_number: u8, board_index: u8, board_id: u16) -> Packed<Self> {
        let (word, truncations) = WordPacker::new(WordKind::BoardHeader)
            .field(&BOARD_BLOCK_SIZE, block_size as u64)
            .field(&BOARD_BLOCK_NUMBER, block_number as u64)
            .field(&BOARD_INDEX, board_index as u64)
            .field(&BOARD_ID, board_id as u64)
            .finish();
        Packed { word: Self { word }, truncations }
    }

    pub fn from_word(word: u64) -> Self {
        Self { word }
    }

    pub fn word(&self) -> u64 {
        self.word
    }

    /// Payload size of the board in 64-bit words
    pub fn block_size(&self) -> u32 {
        BOARD_BLOCK_SIZE.unpack(self.word) as u32
    }

    pub fn block_number(&self) -> u8 {
        BOARD_BLOCK_NUMBER.unpack(self.word) as u8
    }

    /// Slot of the board within the crate
    pub fn board_index(&self) -> u8 {
        BOARD_INDEX.unpack(self.word) as u8
    }

    pub fn board_id(&self) -> u16 {
        BOARD_ID.unpack(self.word) as u16
    }
}
