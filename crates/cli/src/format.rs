//! Human-readable rendering of executor outcomes. JSON output bypasses
//! this module entirely and serializes the outcome directly.

#![allow(clippy::print_stdout)]

use infraglue_core::{DriftReport, ExecOutcome, PlanOutcome};

pub fn print_plan(outcome: &PlanOutcome) {
    if !outcome.has_changes {
        println!("no changes across {} level(s)", outcome.levels.len());
        return;
    }

    for (index, level) in outcome.levels.iter().enumerate() {
        if level.is_empty() {
            continue;
        }
        println!("level {}:", index + 1);
        for workspace in level {
            let s = &workspace.plan.change_summary;
            println!(
                "  {} ({}): +{} ~{} -{} ±{} outputs:{}",
                workspace.workspace_name, workspace.plan.provider, s.add, s.change, s.remove, s.replace, s.output_updates
            );
        }
    }
}

pub fn print_exec_outcome(outcome: &ExecOutcome) {
    if outcome.levels_applied < outcome.levels_total {
        println!("stopped after level {} of {}", outcome.levels_applied, outcome.levels_total);
        return;
    }

    println!("applied {} level(s)", outcome.levels_total);
    if !outcome.exports.is_empty() {
        println!("exports:");
        for (name, value) in &outcome.exports {
            println!("  {name} = {value}");
        }
    }
}

pub fn print_drift(report: &DriftReport) {
    if !report.has_drift {
        println!("no drift in {} ({} workspace(s) checked)", report.environment, report.workspaces.len());
        return;
    }

    println!("drift detected in {}:", report.environment);
    for workspace in &report.workspaces {
        if !workspace.has_drift {
            continue;
        }
        let infra = if workspace.infrastructure_drift.has_drift { "infrastructure" } else { "" };
        let config = if workspace.configuration_drift.has_drift { "configuration" } else { "" };
        let sides: Vec<&str> = [infra, config].into_iter().filter(|s| !s.is_empty()).collect();
        println!("  {} ({}): {}", workspace.name, workspace.provider, sides.join(", "));
    }
}
