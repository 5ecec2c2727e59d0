pub mod audio;
pub mod client;
pub mod config;
pub mod history;
pub mod intent;
mod logging;
pub mod record;
pub mod source;
pub mod submit;
mod telemetry;
pub mod terminal_restore;
pub mod text;

pub use logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
pub use record::{start_record_job, RecordJob, RecordJobMessage};
pub use submit::{start_submit_job, SubmitJob, SubmitJobMessage};
pub use telemetry::init_tracing;
