//! Terminal progress and report files.

mod progress;
mod report;

pub use progress::{create_record_progress, finish_progress, inc_progress, println_above};
pub use report::write_json_report;
