use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use super::constants::WORD_SIZE_BYTES;
use super::error::RawFileError;
use super::event::{Amc13Event, TruncationPolicy, ValidatedEvent};
use super::words::{BoardHeader, CrateHeader, WordKind};

/// # RawReader
/// Frames AMC13 events out of a stream of 64-bit little-endian words. The layout of one event is
///
/// CDF header | crate header | board sub-headers | board payloads | crate trailer | CDF trailer
///
/// The crate header's board count says how many sub-headers follow, and each sub-header's block size
/// says how many payload words belong to that board. The reader only frames; the events it returns
/// still have to be finalized to be checked.
#[derive(Debug)]
pub struct RawReader<R: Read> {
    reader: R,
    policy: TruncationPolicy,
    events_read: u64,
    is_eof: bool,
}

impl RawReader<BufReader<File>> {
    /// Open a raw data file in read-only mode
    pub fn open(path: &Path) -> Result<Self, RawFileError> {
        if !path.exists() {
            return Err(RawFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> RawReader<R> {

    pub fn new(reader: R) -> Self {
        RawReader { reader, policy: TruncationPolicy::default(), events_read: 0, is_eof: false }
    }

    pub fn with_policy(mut self, policy: TruncationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Read the next event. Returns Ok(None) when the stream ends cleanly between events.
    pub fn next_event(&mut self) -> Result<Option<Amc13Event>, RawFileError> {
        if self.is_eof {
            return Ok(None);
        }

        let cdf_header = match self.read_first_word()? {
            Some(word) => word,
            None => return Ok(None)
        };
        let crate_header = self.read_word(WordKind::CrateHeader)?;

        let n_boards = CrateHeader::from_word(crate_header).board_count();
        let mut board_words: Vec<u64> = Vec::with_capacity(n_boards as usize);
        for _ in 0..n_boards {
            board_words.push(self.read_word(WordKind::BoardHeader)?);
        }

        // Payloads arrive in board order once all sub-headers have been read
        let mut payloads: Vec<Vec<u8>> = Vec::with_capacity(board_words.len());
        for word in board_words.iter() {
            let n_bytes = BoardHeader::from_word(*word).block_size() as u64 * WORD_SIZE_BYTES as u64;
            payloads.push(self.read_payload(n_bytes)?);
        }

        let crate_trailer = self.read_word(WordKind::CrateTrailer)?;
        let cdf_trailer = self.read_word(WordKind::CdfTrailer)?;

        let mut event = Amc13Event::with_policy(self.policy);
        event.set_cdf_header_word(cdf_header);
        event.set_crate_header_word(crate_header);
        for (word, payload) in board_words.into_iter().zip(payloads) {
            event.append_board_header_word(word);
            event.extend_board_payload(&payload)?;
        }
        event.set_crate_trailer_word(crate_trailer);
        event.set_cdf_trailer_word(cdf_trailer);

        self.events_read += 1;
        Ok(Some(event))
    }

    pub fn events_read(&self) -> u64 {
        self.events_read
    }

    pub fn is_eof(&self) -> bool {
        self.is_eof
    }

    // Zero bytes here is a clean end of stream, anything short of a word is a cut event
    fn read_first_word(&mut self) -> Result<Option<u64>, RawFileError> {
        let mut buffer = [0u8; WORD_SIZE_BYTES];
        let mut filled: usize = 0;
        while filled < WORD_SIZE_BYTES {
            match self.reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RawFileError::IOError(e))
            }
        }

        match filled {
            0 => {
                self.is_eof = true;
                Ok(None)
            }
            WORD_SIZE_BYTES => Ok(Some(LittleEndian::read_u64(&buffer))),
            _ => {
                self.is_eof = true;
                Err(RawFileError::TruncatedEvent(WordKind::CdfHeader))
            }
        }
    }

    fn read_word(&mut self, kind: WordKind) -> Result<u64, RawFileError> {
        match self.reader.read_u64::<LittleEndian>() {
            Ok(word) => Ok(word),
            Err(e) => match e.kind() {
                std::io::ErrorKind::UnexpectedEof => {
                    self.is_eof = true;
                    Err(RawFileError::TruncatedEvent(kind))
                }
                _ => Err(RawFileError::IOError(e))
            }
        }
    }

    fn read_payload(&mut self, n_bytes: u64) -> Result<Vec<u8>, RawFileError> {
        let mut payload: Vec<u8> = Vec::new();
        (&mut self.reader).take(n_bytes).read_to_end(&mut payload)?;
        if (payload.len() as u64) < n_bytes {
            self.is_eof = true;
            return Err(RawFileError::TruncatedEvent(WordKind::BoardHeader));
        }
        Ok(payload)
    }
}

/// Write a validated event using the same layout RawReader expects. Every board payload must be
/// exactly `block_size` words long, otherwise the stream could not be framed again; nothing is
/// written in that case.
pub fn write_event<W: Write>(writer: &mut W, event: &ValidatedEvent) -> Result<(), RawFileError> {
    for (idx, board) in event.boards().iter().enumerate() {
        let expected = board.header().block_size() as u64 * WORD_SIZE_BYTES as u64;
        let found = board.payload().len() as u64;
        if expected != found {
            return Err(RawFileError::PayloadSizeMismatch { board: idx, expected, found });
        }
    }

    writer.write_u64::<LittleEndian>(event.cdf_header().word())?;
    writer.write_u64::<LittleEndian>(event.crate_header().word())?;
    for board in event.boards() {
        writer.write_u64::<LittleEndian>(board.header().word())?;
    }
    for board in event.boards() {
        writer.write_all(board.payload())?;
    }
    writer.write_u64::<LittleEndian>(event.crate_trailer().word())?;
    writer.write_u64::<LittleEndian>(event.cdf_trailer().word())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::constants::EVENT_OVERHEAD_WORDS;

    fn build_event(trigger_id: u32, payloads: &[(u16, Vec<u8>)]) -> ValidatedEvent {
        let total_words: u32 = payloads.iter().map(|(_, p)| (p.len() / WORD_SIZE_BYTES) as u32).sum();
        let mut event = Amc13Event::new();
        event.set_cdf_header(1, trigger_id, 50, 7);
        event.set_crate_header(0, payloads.len() as u8, 1234);
        for (idx, (board_id, payload)) in payloads.iter().enumerate() {
            event.append_board_header((payload.len() / WORD_SIZE_BYTES) as u32, 0, idx as u8, *board_id);
            event.extend_board_payload(payload).expect("board was just appended");
        }
        event.set_crate_trailer(0, (trigger_id & 0xFF) as u8, 50);
        event.set_cdf_trailer(total_words + EVENT_OVERHEAD_WORDS as u32);
        event.finalize().expect("test event should validate")
    }

    #[test]
    fn written_events_read_back() {
        let first = build_event(100, &[(0x1001, vec![0xAA; 16]), (0x1002, vec![0xBB; 8])]);
        let second = build_event(101, &[(0x1001, vec![0xCC; 8])]);

        let mut buffer: Vec<u8> = Vec::new();
        write_event(&mut buffer, &first).expect("write to vec");
        write_event(&mut buffer, &second).expect("write to vec");
        assert_eq!(buffer.len(), (6 + 3 + 5 + 1) * WORD_SIZE_BYTES);

        let mut reader = RawReader::new(Cursor::new(buffer));
        for expected in [&first, &second] {
            let event = reader.next_event().expect("read ok").expect("event present");
            let decoded = event.finalize().expect("decoded event should validate");
            assert_eq!(decoded.framing_words(), expected.framing_words());
            for (got, want) in decoded.boards().iter().zip(expected.boards()) {
                assert_eq!(got.payload(), want.payload());
            }
        }
        assert!(reader.next_event().expect("clean end").is_none());
        assert!(reader.is_eof());
        assert_eq!(reader.events_read(), 2);
    }

    #[test]
    fn empty_stream_has_no_events() {
        let mut reader = RawReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.next_event().expect("clean end").is_none());
    }

    #[test]
    fn cut_stream_reports_truncation() {
        let event = build_event(100, &[(0x1001, vec![0xAA; 16])]);
        let mut buffer: Vec<u8> = Vec::new();
        write_event(&mut buffer, &event).expect("write to vec");

        let mut cut = buffer.clone();
        cut.truncate(3 * WORD_SIZE_BYTES + 4); // inside the payload
        let mut reader = RawReader::new(Cursor::new(cut));
        assert!(matches!(reader.next_event(), Err(RawFileError::TruncatedEvent(WordKind::BoardHeader))));
        assert!(reader.next_event().expect("stream is done").is_none());

        let mut cut = buffer.clone();
        cut.truncate(buffer.len() - WORD_SIZE_BYTES);
        let mut reader = RawReader::new(Cursor::new(cut));
        assert!(matches!(reader.next_event(), Err(RawFileError::TruncatedEvent(WordKind::CdfTrailer))));

        let mut reader = RawReader::new(Cursor::new(vec![0u8; 3]));
        assert!(matches!(reader.next_event(), Err(RawFileError::TruncatedEvent(WordKind::CdfHeader))));
    }

    #[test]
    fn desynchronized_stream_fails_marker_check() {
        let event = build_event(100, &[]);
        let mut buffer: Vec<u8> = Vec::new();
        write_event(&mut buffer, &event).expect("write to vec");
        // drop the CDF header so every word shifts down by one position
        let mut shifted = buffer[WORD_SIZE_BYTES..].to_vec();
        shifted.extend_from_slice(&[0u8; WORD_SIZE_BYTES]);

        let mut reader = RawReader::new(Cursor::new(shifted));
        let decoded = reader.next_event().expect("read ok").expect("event present");
        let err = decoded.finalize().expect_err("shifted words must not validate");
        assert!(err.is_framing_error());
    }

    #[test]
    fn payload_shorter_than_block_size_is_not_written() {
        let mut event = Amc13Event::new();
        event.set_cdf_header(1, 100, 50, 7);
        event.set_crate_header(0, 1, 0);
        event.append_board_header(16, 0, 0, 0x1001);
        event.set_crate_trailer(0, 100, 50);
        event.set_cdf_trailer(16 + EVENT_OVERHEAD_WORDS as u32);
        let validated = event.finalize().expect("header-only event validates");

        let mut buffer: Vec<u8> = Vec::new();
        let result = write_event(&mut buffer, &validated);
        assert!(matches!(result, Err(RawFileError::PayloadSizeMismatch { board: 0, expected: 128, found: 0 })));
        assert!(buffer.is_empty());
    }

    #[test]
    fn payload_longer_than_block_size_is_not_written() {
        let mut event = Amc13Event::new();
        event.set_cdf_header(1, 100, 50, 7);
        event.set_crate_header(0, 2, 0);
        event.append_board_header(1, 0, 0, 0x1001);
        event.extend_board_payload(&[0xAA; 8]).expect("board was just appended");
        event.append_board_header(1, 0, 1, 0x1002);
        event.extend_board_payload(&[0xBB; 12]).expect("board was just appended");
        event.set_crate_trailer(0, 100, 50);
        event.set_cdf_trailer(2 + EVENT_OVERHEAD_WORDS as u32);
        let validated = event.finalize().expect("event validates");

        let mut buffer: Vec<u8> = Vec::new();
        let result = write_event(&mut buffer, &validated);
        assert!(matches!(result, Err(RawFileError::PayloadSizeMismatch { board: 1, expected: 8, found: 12 })));
        assert!(buffer.is_empty());
    }

    #[test]
    fn missing_file_is_rejected() {
        let path = Path::new("/definitely/not/here.raw");
        assert!(matches!(RawReader::open(path), Err(RawFileError::BadFilePath(_))));
    }
}
