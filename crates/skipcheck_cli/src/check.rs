//! `skipcheck check`: report whether the project must rebuild.
//!
//! Exits 0 when the project may be cached and 1 when it must rebuild, so
//! shell scripts can branch on the result.

use serde::Serialize;
use skipcheck_engine::Verdict;

use crate::pipeline::{steps_from_phases, Session};
use crate::{CheckArgs, GlobalArgs, ReportFormat};

/// Verdict report printed with `--format json`.
#[derive(Debug, Serialize)]
struct CheckReport {
    project: String,
    rebuild: bool,
    reason: Option<String>,
    enabled: bool,
    snapshot: String,
}

/// Runs the `skipcheck check` command.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let steps = steps_from_phases(&args.phases, false);
    let verdict = session.decider().decide(&session.project, &steps)?;

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                println!("{}: {verdict}", session.project);
            }
        }
        ReportFormat::Json => {
            let report = CheckReport {
                project: session.project.to_string(),
                rebuild: verdict.is_rebuild(),
                reason: match &verdict {
                    Verdict::NeedRebuild(reason) => Some(reason.to_string()),
                    Verdict::MayBeCached => None,
                },
                enabled: session.check.enabled,
                snapshot: session
                    .store
                    .key_for(&session.project.identity)
                    .path()
                    .display()
                    .to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(exit_code(&verdict))
}

fn exit_code(verdict: &Verdict) -> i32 {
    if verdict.is_rebuild() {
        1
    } else {
        0
    }
}
