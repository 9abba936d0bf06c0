pub mod bounded_reader;
pub mod line_scanner;
pub mod tail_session;

pub use bounded_reader::BoundedRangeReader;
pub use line_scanner::{BackwardScan, LineScanner, DEFAULT_CHUNK_SIZE};
pub use tail_session::{PollOutcome, TailSession, Window};
