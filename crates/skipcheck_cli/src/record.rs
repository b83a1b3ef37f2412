//! `skipcheck record`: snapshot the project's files.

use crate::pipeline::Session;
use crate::GlobalArgs;

/// Runs the `skipcheck record` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let count = session.decider().record_snapshot(&session.project)?;
    if !global.quiet {
        eprintln!("   Recorded {count} files for {}", session.project);
    }
    Ok(0)
}
