use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use fakeit_generate::{GenerationReport, OutputFile};

use super::RunResult;
use crate::config::Settings;

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub models: PathBuf,
    pub settings: Settings,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig<'a> {
    pub run_id: &'a str,
    pub started_at: String,
    pub models: &'a Path,
    pub settings: &'a Settings,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
    pub outputs_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with its config and an empty log.
pub fn start_run(ctx: &RunContext) -> RunResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx
        .settings
        .run_dir
        .join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        models: &ctx.models,
        settings: &ctx.settings,
        git: collect_git_info(),
    };
    write_json(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        logs_path,
        report_path: root.join("generation_report.json"),
        outputs_path: root.join("outputs.json"),
        root,
    })
}

pub fn write_report(paths: &RunPaths, report: &GenerationReport) -> RunResult<()> {
    write_json(&paths.report_path, report)
}

pub fn write_outputs_manifest(paths: &RunPaths, outputs: &[OutputFile]) -> RunResult<()> {
    write_json(&paths.outputs_path, &outputs)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> RunResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn run_directory_layout() {
        let run_dir = std::env::temp_dir().join(format!("fakeit_runs_{}", uuid::Uuid::new_v4()));
        let settings = Settings {
            run_dir: run_dir.clone(),
            ..Settings::default()
        };
        let ctx = RunContext {
            run_id: "abc".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            models: PathBuf::from("demos/models"),
            settings,
        };

        let paths = start_run(&ctx).expect("start run");
        assert_eq!(paths.root, run_dir.join("2024-05-01T12-30-00Z__run_abc"));
        assert!(paths.logs_path.exists());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(paths.root.join("config.json")).expect("config"),
        )
        .expect("config json");
        assert_eq!(config["run_id"], "abc");
        assert_eq!(config["settings"]["seed"], 42);
        assert_eq!(config["models"], "demos/models");

        let report = GenerationReport::new("abc".to_string(), 42, 1);
        write_report(&paths, &report).expect("report");
        let written: GenerationReport = serde_json::from_str(
            &std::fs::read_to_string(&paths.report_path).expect("report file"),
        )
        .expect("report json");
        assert_eq!(written, report);

        std::fs::remove_dir_all(&run_dir).ok();
    }
}
