pub mod process;
pub mod vcs;

pub use process::{command_line, interpret, CommandRunner, ExecOptions, ProcessOutput};
pub use vcs::VcsAdapter;
