//! Informational commands (list, status)

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use chrono::{DateTime, Local};

use super::{load_project, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::CliOverrides;
use crate::project::Project;

/// Run the list command
pub fn run_list(config: Option<&Path>) -> ExitCode {
    let Some(project) = load_project(config, &CliOverrides::default()) else {
        return ExitCode::from(EXIT_ERROR);
    };

    let profiles = &project.config().profiles;
    if profiles.is_empty() {
        println!("No profiles configured");
        return ExitCode::from(EXIT_SUCCESS);
    }

    let width = profiles.keys().map(String::len).max().unwrap_or(0);
    for (id, profile) in profiles {
        println!("{:width$}  {:12}  {}", id, profile.transformer.to_string(), project.description(id), width = width);
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// One line of `status` output.
fn status_line(project: &Project, id: &str) -> String {
    let output = if project.output_dir(id).is_dir() { "built" } else { "not built" };

    let artifact = project.artifact_path(id);
    let packaged = match fs::metadata(&artifact) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|_| "?".to_string());
            format!("{} bytes, {}", meta.len(), modified)
        }
        Err(_) => "no artifact".to_string(),
    };

    let target = match project.deploy_target(id) {
        Some(path) if path.exists() => format!("deployed at {}", path.display()),
        Some(path) => format!("target {}", path.display()),
        None => "no deploy target".to_string(),
    };

    format!("{}: {}; {}; {}", id, output, packaged, target)
}

/// Run the status command
pub fn run_status(config: Option<&Path>) -> ExitCode {
    let Some(project) = load_project(config, &CliOverrides::default()) else {
        return ExitCode::from(EXIT_ERROR);
    };

    println!("Project: {} ({})", project.config().project.name, project.root().display());
    for id in project.profile_ids() {
        println!("  {}", status_line(&project, &id));
    }
    ExitCode::from(EXIT_SUCCESS)
}
