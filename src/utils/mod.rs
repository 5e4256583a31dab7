//! Small helpers shared by the command-line commands.

pub mod progress;

pub use progress::{ProgressBar, spinner_with_message};
