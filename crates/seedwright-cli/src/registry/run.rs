use std::fs::{self, OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use seedwright_generate::{GenerateOptions, GenerationReport};

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub data_model: PathBuf,
    pub plan: PathBuf,
    pub config: Option<PathBuf>,
    pub options: GenerateOptions,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub data_model: String,
    pub plan: String,
    pub config: Option<String>,
    pub options: GenerateOptions,
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
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub sql_path: PathBuf,
    pub report_path: PathBuf,
}

impl RunPaths {
    fn new(root: PathBuf) -> Self {
        Self {
            config_path: root.join("config.json"),
            logs_path: root.join("logs.ndjson"),
            sql_path: root.join("seed.sql"),
            report_path: root.join("generation_report.json"),
            root,
        }
    }
}

/// Create `{run_dir}/{timestamp}__run_{id}` with its `config.json` and an empty log file.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let paths = RunPaths::new(
        ctx.run_dir
            .join(format!("{timestamp}__run_{}", ctx.run_id)),
    );

    create_dir_all(&paths.root)?;

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        data_model: display(&ctx.data_model),
        plan: display(&ctx.plan),
        config: ctx.config.as_deref().map(display),
        options: ctx.options.clone(),
        git: collect_git_info(),
    };
    write_json_artifact(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

/// One statement per line.
pub fn write_sql(paths: &RunPaths, statements: &[String]) -> RegistryResult<()> {
    let mut sql = statements.join("\n");
    if !sql.is_empty() {
        sql.push('\n');
    }
    write_artifact(&paths.sql_path, sql.as_bytes())
}

pub fn write_report(paths: &RunPaths, report: &GenerationReport) -> RegistryResult<()> {
    write_json_artifact(&paths.report_path, report)
}

fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    write_artifact(path, &data)
}

/// Written beside `path`, then renamed over it. Readers never see a partial artifact.
fn write_artifact(path: &Path, data: &[u8]) -> RegistryResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| RegistryError::InvalidPath(path.display().to_string()))?;
    let partial = path.with_file_name(format!("{}.partial", file_name.to_string_lossy()));

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&partial)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&partial, path)?;
    Ok(())
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

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn run_directory_holds_config_sql_and_report() {
        let run_dir = std::env::temp_dir().join(format!("seedwright-runs-{}", std::process::id()));
        let ctx = RunContext {
            run_id: "abc".to_string(),
            started_at: Utc
                .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
                .single()
                .expect("timestamp"),
            run_dir: run_dir.clone(),
            data_model: PathBuf::from("dataModel.json"),
            plan: PathBuf::from("plan.json"),
            config: None,
            options: GenerateOptions::default(),
        };

        let paths = start_run(&ctx).expect("start run");
        assert_eq!(
            paths.root,
            run_dir.join("2024-05-01T12-30-00Z__run_abc")
        );
        assert!(paths.logs_path.exists());

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.config_path).expect("config"))
                .expect("config json");
        assert_eq!(config["run_id"], "abc");
        assert_eq!(config["options"]["seed"], "seedwright");

        write_sql(
            &paths,
            &["INSERT INTO \"a\" DEFAULT VALUES;".to_string(), "SELECT 1;".to_string()],
        )
        .expect("sql");
        assert_eq!(
            std::fs::read_to_string(&paths.sql_path).expect("read sql"),
            "INSERT INTO \"a\" DEFAULT VALUES;\nSELECT 1;\n"
        );

        write_report(&paths, &GenerationReport::new("seed".to_string(), "digest".to_string()))
            .expect("report");
        assert!(paths.report_path.exists());

        write_sql(&paths, &["SELECT 2;".to_string()]).expect("rewrite sql");
        assert_eq!(
            std::fs::read_to_string(&paths.sql_path).expect("reread sql"),
            "SELECT 2;\n"
        );
        assert!(!paths.root.join("seed.sql.partial").exists());

        std::fs::remove_dir_all(&run_dir).expect("cleanup");
    }

    #[test]
    fn artifacts_need_a_file_name() {
        assert!(matches!(
            write_artifact(Path::new("/"), b"x"),
            Err(RegistryError::InvalidPath(_))
        ));
    }
}
