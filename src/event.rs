use fxhash::FxHashMap;
use serde_derive::{Deserialize, Serialize};

use super::error::{EventError, ValidationError, Violation};
use super::validator::validate;
use super::words::{BoardHeader, CdfHeader, CdfTrailer, CrateHeader, CrateTrailer, Packed, Truncation, WordKind};

/// What to do when a field value is wider than its slot. The hardware truncates silently, so
/// that is the default; `Strict` turns each truncation into a violation at finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    #[default]
    Silent,
    Warn,
    Strict,
}

/// A board sub-header and the opaque payload bytes that belong to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardBlock {
    header: BoardHeader,
    payload: Vec<u8>,
}

impl BoardBlock {
    pub fn header(&self) -> &BoardHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// # EventRecord
/// The words collected for one event. Header and trailer words are None until set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    cdf_header: Option<CdfHeader>,
    crate_header: Option<CrateHeader>,
    crate_trailer: Option<CrateTrailer>,
    cdf_trailer: Option<CdfTrailer>,
    boards: Vec<BoardBlock>,
}

impl EventRecord {
    pub fn cdf_header(&self) -> Option<CdfHeader> {
        self.cdf_header
    }

    pub fn crate_header(&self) -> Option<CrateHeader> {
        self.crate_header
    }

    pub fn crate_trailer(&self) -> Option<CrateTrailer> {
        self.crate_trailer
    }

    pub fn cdf_trailer(&self) -> Option<CdfTrailer> {
        self.cdf_trailer
    }

    pub fn boards(&self) -> &[BoardBlock] {
        &self.boards
    }
}

/// # Amc13Event
/// Builder for a single AMC13 event record: one CDF header, one crate header, the board sub-headers
/// in the order they arrived, then the crate trailer and CDF trailer.
///
/// Header and trailer setters may be called any number of times in any order; the last call wins.
/// Board sub-headers are append-only. Nothing is checked until `finalize`, which consumes the builder
/// and hands back either a `ValidatedEvent` or a `ValidationError` listing every problem found.
#[derive(Debug, Clone, Default)]
pub struct Amc13Event {
    record: EventRecord,
    policy: TruncationPolicy,
    truncations: Vec<Truncation>,
}

impl Amc13Event {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: TruncationPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn set_cdf_header(&mut self, event_type: u8, trigger_id: u32, bx_id: u16, source_id: u16) {
        let header = self.accept(WordKind::CdfHeader, CdfHeader::pack(event_type, trigger_id, bx_id, source_id));
        self.record.cdf_header = Some(header);
    }

    pub fn set_crate_header(&mut self, cal_type: u8, board_count: u8, orbit_number: u32) {
        let header = self.accept(WordKind::CrateHeader, CrateHeader::pack(cal_type, board_count, orbit_number));
        self.record.crate_header = Some(header);
    }

    pub fn set_crate_trailer(&mut self, block_number: u8, trigger_id: u8, bx_id: u16) {
        let trailer = self.accept(WordKind::CrateTrailer, CrateTrailer::pack(block_number, trigger_id, bx_id));
        self.record.crate_trailer = Some(trailer);
    }

    pub fn set_cdf_trailer(&mut self, event_length: u32) {
        let trailer = self.accept(WordKind::CdfTrailer, CdfTrailer::pack(event_length));
        self.record.cdf_trailer = Some(trailer);
    }

    /*
        Raw word setters, for replaying captured data
     */

    pub fn set_cdf_header_word(&mut self, word: u64) {
        self.forget_truncations(WordKind::CdfHeader);
        self.record.cdf_header = Some(CdfHeader::from_word(word));
    }

    pub fn set_crate_header_word(&mut self, word: u64) {
        self.forget_truncations(WordKind::CrateHeader);
        self.record.crate_header = Some(CrateHeader::from_word(word));
    }

    pub fn set_crate_trailer_word(&mut self, word: u64) {
        self.forget_truncations(WordKind::CrateTrailer);
        self.record.crate_trailer = Some(CrateTrailer::from_word(word));
    }

    pub fn set_cdf_trailer_word(&mut self, word: u64) {
        self.forget_truncations(WordKind::CdfTrailer);
        self.record.cdf_trailer = Some(CdfTrailer::from_word(word));
    }

    /// Append an already packed board sub-header verbatim
    pub fn append_board_header_word(&mut self, word: u64) {
        self.record.boards.push(BoardBlock { header: BoardHeader::from_word(word), payload: vec![] });
    }

    /// Pack and append a board sub-header. Values wider than their field are truncated.
    pub fn append_board_header(&mut self, block_size: u32, block_number: u8, board_index: u8, board_id: u16) {
        let packed = BoardHeader::pack(block_size, block_number, board_index, board_id);
        self.note_truncations(packed.truncations);
        self.record.boards.push(BoardBlock { header: packed.word, payload: vec![] });
    }

    /// Attach payload bytes to the most recently appended board
    pub fn extend_board_payload(&mut self, bytes: &[u8]) -> Result<(), EventError> {
        match self.record.boards.last_mut() {
            Some(board) => {
                board.payload.extend_from_slice(bytes);
                Ok(())
            }
            None => Err(EventError::NoBoardForPayload(bytes.len()))
        }
    }

    /// Number of board sub-headers appended so far
    pub fn board_count(&self) -> usize {
        self.record.boards.len()
    }

    pub fn truncations(&self) -> &[Truncation] {
        &self.truncations
    }

    pub fn policy(&self) -> TruncationPolicy {
        self.policy
    }

    /// Run the validator and freeze the event. There is no way back to building afterwards.
    pub fn finalize(self) -> Result<ValidatedEvent, ValidationError> {
        let mut violations: Vec<Violation> = match self.policy {
            TruncationPolicy::Strict => self.truncations.into_iter().map(Violation::FieldTruncation).collect(),
            _ => vec![]
        };
        violations.extend(validate(&self.record));

        if violations.is_empty() {
            Ok(ValidatedEvent::from_record(self.record))
        } else {
            Err(ValidationError::new(violations, self.record))
        }
    }

    // A header or trailer that is overwritten takes its old truncations with it
    fn accept<T>(&mut self, kind: WordKind, packed: Packed<T>) -> T {
        self.forget_truncations(kind);
        self.note_truncations(packed.truncations);
        packed.word
    }

    fn forget_truncations(&mut self, kind: WordKind) {
        self.truncations.retain(|t| t.word != kind);
    }

    fn note_truncations(&mut self, truncations: Vec<Truncation>) {
        for trunc in truncations {
            if self.policy == TruncationPolicy::Warn {
                log::warn!("{}", trunc);
            }
            self.truncations.push(trunc);
        }
    }
}

/// # ValidatedEvent
/// An event which passed every check. Read-only, and safe to share between threads.
#[derive(Debug, Clone)]
pub struct ValidatedEvent {
    cdf_header: CdfHeader,
    crate_header: CrateHeader,
    crate_trailer: CrateTrailer,
    cdf_trailer: CdfTrailer,
    boards: Vec<BoardBlock>,
    board_lookup: FxHashMap<u16, usize>, // board id -> position in boards
}

impl ValidatedEvent {

    // Only reached once the validator found every word present
    fn from_record(record: EventRecord) -> Self {
        let mut board_lookup: FxHashMap<u16, usize> = FxHashMap::default();
        for (idx, board) in record.boards.iter().enumerate() {
            board_lookup.entry(board.header.board_id()).or_insert(idx);
        }

        Self {
            cdf_header: record.cdf_header.unwrap_or_default(),
            crate_header: record.crate_header.unwrap_or_default(),
            crate_trailer: record.crate_trailer.unwrap_or_default(),
            cdf_trailer: record.cdf_trailer.unwrap_or_default(),
            boards: record.boards,
            board_lookup,
        }
    }

    pub fn cdf_header(&self) -> &CdfHeader {
        &self.cdf_header
    }

    pub fn crate_header(&self) -> &CrateHeader {
        &self.crate_header
    }

    pub fn crate_trailer(&self) -> &CrateTrailer {
        &self.crate_trailer
    }

    pub fn cdf_trailer(&self) -> &CdfTrailer {
        &self.cdf_trailer
    }

    pub fn event_type(&self) -> u8 {
        self.cdf_header.event_type()
    }

    pub fn trigger_id(&self) -> u32 {
        self.cdf_header.trigger_id()
    }

    pub fn bx_id(&self) -> u16 {
        self.cdf_header.bx_id()
    }

    pub fn source_id(&self) -> u16 {
        self.cdf_header.source_id()
    }

    pub fn cal_type(&self) -> u8 {
        self.crate_header.cal_type()
    }

    pub fn orbit_number(&self) -> u32 {
        self.crate_header.orbit_number()
    }

    pub fn block_number(&self) -> u8 {
        self.crate_trailer.block_number()
    }

    pub fn event_length(&self) -> u32 {
        self.cdf_trailer.event_length()
    }

    /// Boards in wire order
    pub fn boards(&self) -> &[BoardBlock] {
        &self.boards
    }

    pub fn board(&self, position: usize) -> Option<&BoardBlock> {
        self.boards.get(position)
    }

    /// First board carrying the given board id
    pub fn board_by_id(&self, board_id: u16) -> Option<&BoardBlock> {
        self.board_lookup.get(&board_id).and_then(|idx| self.boards.get(*idx))
    }

    /// Header, sub-header and trailer words in wire order, without payload
    pub fn framing_words(&self) -> Vec<u64> {
        let mut words: Vec<u64> = Vec::with_capacity(self.boards.len() + 4);
        words.push(self.cdf_header.word());
        words.push(self.crate_header.word());
        words.extend(self.boards.iter().map(|b| b.header.word()));
        words.push(self.crate_trailer.word());
        words.push(self.cdf_trailer.word());
        words
    }
}
