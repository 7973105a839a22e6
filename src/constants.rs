// Control markers
pub const CDF_HEADER_MARKER: u8 = 0x5;
pub const CRATE_HEADER_MARKER: u8 = 0x0;
pub const CDF_TRAILER_MARKER: u8 = 0xA;

// Data sizes
pub const WORD_SIZE_BYTES: usize = 8;
pub const EVENT_OVERHEAD_WORDS: u64 = 4; // CDF header, crate header, crate trailer, CDF trailer
