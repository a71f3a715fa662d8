//! Build command implementations (build, watch)

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use super::{load_project, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildSummary, Pipeline};
use crate::config::CliOverrides;
use crate::watch::{watch, WatchOptions};

/// Run the build command
pub fn run_build(config: Option<&Path>, selector: &str) -> ExitCode {
    let Some(project) = load_project(config, &CliOverrides::default()) else {
        return ExitCode::from(EXIT_ERROR);
    };
    let profiles = match project.select_profiles(Some(selector)) {
        Ok(profiles) => profiles,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if profiles.is_empty() {
        eprintln!("Error: no profiles configured in packsmith.toml");
        return ExitCode::from(EXIT_ERROR);
    }

    let pipeline = Pipeline::new(project);
    let start = Instant::now();
    let mut summary = BuildSummary::new();

    // One failing profile does not stop the batch
    for id in &profiles {
        println!("Building {} ...", id);
        let outcome = pipeline.build(id);
        match (&outcome.artifact, outcome.error()) {
            (Some(artifact), _) => {
                println!("  {} ({} bytes)", artifact.path.display(), artifact.size)
            }
            (None, Some(err)) => println!("  Failed: {}", err),
            (None, None) => {}
        }
        summary.add(outcome);
    }

    let summary = summary.with_duration(start.elapsed());
    println!("{}", summary.summary());

    if summary.is_success() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the watch command
pub fn run_watch(config: Option<&Path>, selector: &str, no_deploy: bool, debounce: Option<u64>) -> ExitCode {
    let overrides = CliOverrides {
        debounce_ms: debounce,
        deploy: no_deploy.then_some(false),
        ..Default::default()
    };
    let Some(project) = load_project(config, &overrides) else {
        return ExitCode::from(EXIT_ERROR);
    };
    let profiles = match project.select_profiles(Some(selector)) {
        Ok(profiles) => profiles,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let options = WatchOptions::from_project(&project);
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match runtime.block_on(watch(Pipeline::new(project), profiles, options)) {
        Ok(report) => {
            println!(
                "Stopped: {} build(s), {} failed, {} deployed",
                report.builds, report.failures, report.deploys
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
