//! Command implementations for the CLI.

mod capture;
mod config;
mod scan;
mod sign;
mod upload;

pub use capture::{CaptureArgs, cmd_capture};
pub use config::cmd_config;
pub use scan::cmd_scan;
pub use sign::cmd_sign;
pub use upload::cmd_upload;
