//! `check` command: validate settings and job definitions without running.

use std::collections::HashSet;
use std::process::ExitCode;

use relay_config::{JobDefinition, JobDefinitionStore, ServiceConfig};
use relay_pipeline::{PlaceholderExpander, RunError, resolve_output_path};
use relay_scheduler::next_fire;

use crate::definitions_path;

pub(crate) fn check(config: &ServiceConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let path = definitions_path(config);
    let store = JobDefinitionStore::new();
    let definitions = store.load(&path)?;
    println!("{} job definitions in {}", definitions.len(), path.display());

    let mut seen = HashSet::new();
    let mut problems = 0;
    for job in definitions {
        let mut issues = Vec::new();
        if !seen.insert(job.id.as_str()) {
            issues.push("duplicate job id".to_string());
        }
        let next = next_fire(&job.id, &job.cron).map_err(|e| issues.push(e.to_string())).ok();
        let output = preview_output(job).map_err(|e| issues.push(e.to_string())).ok();

        match (next, output, issues.is_empty()) {
            (Some(next), Some(output), true) => println!(
                "  ok    {:<24} next {}  -> {} ({} uploads)",
                job.id,
                next.format("%Y-%m-%d %H:%M:%S"),
                output,
                job.uploads.len()
            ),
            _ => {
                problems += 1;
                println!("  FAIL  {:<24} {}", job.id, issues.join("; "));
            }
        }
    }

    if problems > 0 {
        println!("{} of {} definitions have problems", problems, definitions.len());
        Ok(ExitCode::FAILURE)
    } else if definitions.is_empty() {
        println!("No jobs defined");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn preview_output(job: &JobDefinition) -> Result<String, RunError> {
    let expanded = PlaceholderExpander::expand(&job.output_path)?;
    Ok(resolve_output_path(&expanded)?.display().to_string())
}
