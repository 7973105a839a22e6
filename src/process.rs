use std::io::Read;

use super::config::Config;
use super::error::{ProcessorError, RawFileError};
use super::raw_file::RawReader;

/// Tally of one processing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub events_valid: u64,
    pub events_rejected: u64,
    pub boards: u64,
    pub payload_bytes: u64,
}

/// Decode and validate every event in the raw file named by the config
pub fn process_file(config: &Config) -> Result<ProcessSummary, ProcessorError> {
    let reader = RawReader::open(&config.raw_path)?;
    let size_bytes = std::fs::metadata(&config.raw_path).map_err(RawFileError::from)?.len();
    log::info!("Total raw file size: {}", human_bytes::human_bytes(size_bytes as f64));

    process_stream(reader.with_policy(config.truncation_policy), config)
}

pub fn process_stream<R: Read>(mut reader: RawReader<R>, config: &Config) -> Result<ProcessSummary, ProcessorError> {
    let mut summary = ProcessSummary::default();
    let mut event_counter: u64 = 0;

    loop {
        if config.max_events.is_some_and(|limit| event_counter >= limit) {
            log::info!("Reached the event limit of {}.", event_counter);
            break;
        }

        let event = match reader.next_event()? {
            Some(event) => event,
            None => break
        };

        match event.finalize() {
            Ok(validated) => {
                summary.events_valid += 1;
                summary.boards += validated.boards().len() as u64;
                summary.payload_bytes += validated.boards().iter().map(|b| b.payload().len() as u64).sum::<u64>();
            }
            Err(e) => {
                summary.events_rejected += 1;
                for violation in e.violations() {
                    log::error!("Event {} rejected: {}", event_counter, violation);
                }
                if e.is_framing_error() {
                    log::warn!("Control marker mismatch at event {}, the stream is probably out of sync.", event_counter);
                }
                if config.stop_on_error {
                    return Err(ProcessorError::RejectedEvent(event_counter, e));
                }
            }
        }
        event_counter += 1;
    }

    log::info!("Processed {} events: {} valid, {} rejected.", event_counter, summary.events_valid, summary.events_rejected);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::constants::EVENT_OVERHEAD_WORDS;
    use crate::event::Amc13Event;
    use crate::raw_file::write_event;

    fn write_test_event(buffer: &mut Vec<u8>, trigger_id: u32, trailer_trigger: u8) {
        let mut event = Amc13Event::new();
        event.set_cdf_header(1, trigger_id, 50, 7);
        event.set_crate_header(0, 1, 0);
        event.append_board_header(2, 0, 0, 0x1001);
        event.extend_board_payload(&[0x11; 16]).expect("board was just appended");
        event.set_crate_trailer(0, trigger_id as u8, 50);
        event.set_cdf_trailer(2 + EVENT_OVERHEAD_WORDS as u32);
        let validated = event.finalize().expect("test event should validate");
        write_event(buffer, &validated).expect("write to vec");

        // corrupt the crate trailer trigger id in place if asked to
        if trailer_trigger != trigger_id as u8 {
            let trailer_pos = buffer.len() - 16;
            buffer[trailer_pos + 1] = (buffer[trailer_pos + 1] & 0x0F) | ((trailer_trigger & 0x0F) << 4);
            buffer[trailer_pos + 2] = (buffer[trailer_pos + 2] & 0xF0) | (trailer_trigger >> 4);
        }
    }

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn counts_valid_and_rejected_events() {
        let mut buffer: Vec<u8> = Vec::new();
        write_test_event(&mut buffer, 1, 1);
        write_test_event(&mut buffer, 2, 9);
        write_test_event(&mut buffer, 3, 3);

        let summary = process_stream(RawReader::new(Cursor::new(buffer)), &config()).expect("stream is readable");
        assert_eq!(summary, ProcessSummary { events_valid: 2, events_rejected: 1, boards: 2, payload_bytes: 32 });
    }

    #[test]
    fn stop_on_error_returns_the_rejection() {
        let mut buffer: Vec<u8> = Vec::new();
        write_test_event(&mut buffer, 1, 1);
        write_test_event(&mut buffer, 2, 9);

        let mut conf = config();
        conf.stop_on_error = true;
        let result = process_stream(RawReader::new(Cursor::new(buffer)), &conf);
        match result {
            Err(ProcessorError::RejectedEvent(n, e)) => {
                assert_eq!(n, 1);
                assert_eq!(e.violations().len(), 1);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn event_limit_is_respected() {
        let mut buffer: Vec<u8> = Vec::new();
        for trigger in 0..5 {
            write_test_event(&mut buffer, trigger, trigger as u8);
        }
        let mut conf = config();
        conf.max_events = Some(3);
        let summary = process_stream(RawReader::new(Cursor::new(buffer)), &conf).expect("stream is readable");
        assert_eq!(summary.events_valid, 3);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let mut buffer: Vec<u8> = Vec::new();
        write_test_event(&mut buffer, 1, 1);
        buffer.truncate(buffer.len() - 4);
        let result = process_stream(RawReader::new(Cursor::new(buffer)), &config());
        assert!(matches!(result, Err(ProcessorError::FileError(RawFileError::TruncatedEvent(_)))));
    }
}
