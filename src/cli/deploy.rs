//! Deploy command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{load_project, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::CliOverrides;
use crate::deploy::Deployer;

/// Run the deploy command
pub fn run_deploy(config: Option<&Path>, selector: &str) -> ExitCode {
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

    let deployer = Deployer::new(project.config().deploy.backup);
    let mut failed = 0;
    for id in &profiles {
        let artifact = project.artifact_path(id);
        let target = project.deploy_target(id);
        match deployer.deploy(id, &artifact, target.as_deref()) {
            Ok(report) => {
                println!("{} -> {}", id, report.target.display());
                if let Some(backup) = report.backup {
                    println!("  backup: {}", backup.display());
                }
            }
            Err(e) => {
                eprintln!("{}: {}", id, e);
                failed += 1;
            }
        }
    }

    if failed == 0 {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{} of {} deploy(s) failed", failed, profiles.len());
        ExitCode::from(EXIT_ERROR)
    }
}
