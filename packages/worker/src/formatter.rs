//! Command formatters: turn a task name and job parameters into an argv
//! vector, and run that argv to completion. The broker's job loop treats
//! whichever variant is configured opaquely — it only sees `format` and
//! `execute`.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::config::FormatterConfig;
use crate::error::{WorkerError, WorkerResult};

pub struct ExecutionOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait CommandFormatter: Send + Sync {
    /// Builds the argv vector for a job, e.g. `["python", "train.py",
    /// "--lr", "0.01"]` from `task_name = "train"` and `parameters =
    /// {"lr": 0.01}`.
    fn format(&self, task_name: &str, parameters: &Value) -> WorkerResult<Vec<String>>;

    async fn execute(&self, argv: &[String]) -> WorkerResult<ExecutionOutput>;
}

/// Invokes `task_name` as a local executable, passing each parameter as a
/// `--key value` pair. This is the only formatter the core actually runs;
/// batch-scheduler submission is a separate deployment concern.
pub struct CliFormatter;

#[async_trait]
impl CommandFormatter for CliFormatter {
    fn format(&self, task_name: &str, parameters: &Value) -> WorkerResult<Vec<String>> {
        let mut argv = vec![task_name.to_string()];
        if let Some(map) = parameters.as_object() {
            for (key, value) in map {
                argv.push(format!("--{key}"));
                argv.push(scalar_to_arg(value));
            }
        }
        Ok(argv)
    }

    async fn execute(&self, argv: &[String]) -> WorkerResult<ExecutionOutput> {
        let [program, args @ ..] = argv else {
            return Err(WorkerError::ExecutionFailure("empty command".into()));
        };

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| WorkerError::ExecutionFailure(format!("failed to spawn {program}: {e}")))?;

        Ok(ExecutionOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn scalar_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Submits the job to a Slurm cluster via `sbatch`. Genuinely external:
/// building the batch script and polling `squeue` is out of scope for the
/// core, so this variant only documents the seam.
pub struct SlurmFormatter;

#[async_trait]
impl CommandFormatter for SlurmFormatter {
    fn format(&self, _task_name: &str, _parameters: &Value) -> WorkerResult<Vec<String>> {
        Err(WorkerError::ExecutionFailure(
            "slurm formatter is not implemented by this worker; submit jobs through sbatch directly".into(),
        ))
    }

    async fn execute(&self, _argv: &[String]) -> WorkerResult<ExecutionOutput> {
        Err(WorkerError::ExecutionFailure("slurm formatter is not implemented".into()))
    }
}

/// Submits the job as a container run (`runai submit` / similar). Same
/// status as [`SlurmFormatter`]: out of scope, stubbed for the seam.
pub struct RunaiFormatter;

#[async_trait]
impl CommandFormatter for RunaiFormatter {
    fn format(&self, _task_name: &str, _parameters: &Value) -> WorkerResult<Vec<String>> {
        Err(WorkerError::ExecutionFailure(
            "runai formatter is not implemented by this worker; submit jobs through runai directly".into(),
        ))
    }

    async fn execute(&self, _argv: &[String]) -> WorkerResult<ExecutionOutput> {
        Err(WorkerError::ExecutionFailure("runai formatter is not implemented".into()))
    }
}

pub enum Formatter {
    Cli(CliFormatter),
    Slurm(SlurmFormatter),
    Runai(RunaiFormatter),
}

impl Formatter {
    pub fn from_config(config: &FormatterConfig) -> Self {
        match config.kind.as_str() {
            "slurm" => Formatter::Slurm(SlurmFormatter),
            "runai" => Formatter::Runai(RunaiFormatter),
            _ => Formatter::Cli(CliFormatter),
        }
    }

    pub fn format(&self, task_name: &str, parameters: &Value) -> WorkerResult<Vec<String>> {
        match self {
            Formatter::Cli(f) => f.format(task_name, parameters),
            Formatter::Slurm(f) => f.format(task_name, parameters),
            Formatter::Runai(f) => f.format(task_name, parameters),
        }
    }

    pub async fn execute(&self, argv: &[String]) -> WorkerResult<ExecutionOutput> {
        match self {
            Formatter::Cli(f) => f.execute(argv).await,
            Formatter::Slurm(f) => f.execute(argv).await,
            Formatter::Runai(f) => f.execute(argv).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_formatter_builds_flag_pairs() {
        let formatter = CliFormatter;
        let argv = formatter
            .format("train", &serde_json::json!({"lr": 0.01, "epochs": 3}))
            .unwrap();
        assert_eq!(argv[0], "train");
        assert!(argv.contains(&"--lr".to_string()));
        assert!(argv.contains(&"0.01".to_string()));
        assert!(argv.contains(&"--epochs".to_string()));
        assert!(argv.contains(&"3".to_string()));
    }

    #[test]
    fn cli_formatter_handles_no_parameters() {
        let formatter = CliFormatter;
        let argv = formatter.format("noop", &serde_json::json!({})).unwrap();
        assert_eq!(argv, vec!["noop".to_string()]);
    }

    #[tokio::test]
    async fn slurm_formatter_reports_unimplemented() {
        let formatter = SlurmFormatter;
        let err = formatter.format("train", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, WorkerError::ExecutionFailure(_)));
    }
}
