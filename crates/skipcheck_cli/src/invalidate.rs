//! `skipcheck invalidate`: delete snapshots so the next check rebuilds.

use crate::pipeline::Session;
use crate::{GlobalArgs, InvalidateArgs};

/// Runs the `skipcheck invalidate` command.
///
/// Removes every option variant of the project's snapshot, then those of
/// each `--downstream` project.
pub fn run(args: &InvalidateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let decider = session.decider();

    let own = decider.invalidate(&session.project.identity)?;
    let downstream = decider.invalidate_downstream(&session.project, &args.downstream);

    if !global.quiet {
        eprintln!(
            "   Invalidated {own} snapshot(s) for {}, {downstream} downstream",
            session.project
        );
    }
    Ok(0)
}
