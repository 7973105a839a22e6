use super::constants::EVENT_OVERHEAD_WORDS;
use super::error::{TrailerField, Violation};
use super::event::EventRecord;
use super::words::{MarkedWord, WordKind};

/// Run every consistency check over the record and collect all failures in check order.
/// Checks that depend on a word which was never set are skipped; the missing word is reported instead.
pub fn validate(record: &EventRecord) -> Vec<Violation> {
    let mut violations: Vec<Violation> = Vec::new();
    check_present(record, &mut violations);
    check_markers(record, &mut violations);
    check_trailer_against_header(record, &mut violations);
    check_board_count(record, &mut violations);
    check_event_length(record, &mut violations);
    violations
}

fn check_present(record: &EventRecord, violations: &mut Vec<Violation>) {
    if record.cdf_header().is_none() {
        violations.push(Violation::MissingWord(WordKind::CdfHeader));
    }
    if record.crate_header().is_none() {
        violations.push(Violation::MissingWord(WordKind::CrateHeader));
    }
    if record.crate_trailer().is_none() {
        violations.push(Violation::MissingWord(WordKind::CrateTrailer));
    }
    if record.cdf_trailer().is_none() {
        violations.push(Violation::MissingWord(WordKind::CdfTrailer));
    }
}

fn check_marker<W: MarkedWord>(word: &W, violations: &mut Vec<Violation>) {
    let found = word.marker();
    if found != W::EXPECTED_MARKER {
        violations.push(Violation::MarkerMismatch { word: W::KIND, expected: W::EXPECTED_MARKER, found });
    }
}

fn check_markers(record: &EventRecord, violations: &mut Vec<Violation>) {
    if let Some(header) = record.cdf_header() {
        check_marker(&header, violations);
    }
    if let Some(header) = record.crate_header() {
        check_marker(&header, violations);
    }
    if let Some(trailer) = record.cdf_trailer() {
        check_marker(&trailer, violations);
    }
}

// The crate trailer only keeps the low 8 bits of the trigger id
fn check_trailer_against_header(record: &EventRecord, violations: &mut Vec<Violation>) {
    let (header, trailer) = match (record.cdf_header(), record.crate_trailer()) {
        (Some(h), Some(t)) => (h, t),
        _ => return
    };

    let expected_trigger = header.trigger_id() & 0xFF;
    if expected_trigger != trailer.trigger_id() as u32 {
        violations.push(Violation::TrailerHeaderMismatch { field: TrailerField::TriggerId, expected: expected_trigger, found: trailer.trigger_id() as u32 });
    }
    if header.bx_id() != trailer.bx_id() {
        violations.push(Violation::TrailerHeaderMismatch { field: TrailerField::BxId, expected: header.bx_id() as u32, found: trailer.bx_id() as u32 });
    }
}

fn check_board_count(record: &EventRecord, violations: &mut Vec<Violation>) {
    if let Some(header) = record.crate_header() {
        let expected = header.board_count() as usize;
        let found = record.boards().len();
        if expected != found {
            violations.push(Violation::BoardCountMismatch { expected, found });
        }
    }
}

fn check_event_length(record: &EventRecord, violations: &mut Vec<Violation>) {
    if let Some(trailer) = record.cdf_trailer() {
        let expected = trailer.event_length() as u64;
        let found = record.boards().iter().fold(EVENT_OVERHEAD_WORDS, |sum, board| sum + board.header().block_size() as u64);
        if expected != found {
            violations.push(Violation::LengthMismatch { expected, found });
        }
    }
}
