//! Layered worker/CLI configuration.
//!
//! Search order: current directory, repository root (found by walking up
//! looking for a `Cargo.toml` or `.git` marker, the way a monorepo
//! dev-tool's config loader does), then `$HOME`. The first `whatsnext.toml`
//! found wins — there is no merging across layers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "whatsnext.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WorkerConfig {
    pub project: Option<String>,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub formatter: FormatterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub entity: Option<String>,
    pub name: Option<String>,
    pub cpus: i32,
    pub accelerators: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self { kind: "cli".to_string() }
    }
}

impl WorkerConfig {
    /// Loads from the first `whatsnext.toml` found along the search path,
    /// or returns the all-defaults config if none exists — the CLI's
    /// `--server`/`--project` flags are expected to fill the rest in.
    pub fn load() -> Result<Self> {
        match find_config_file()? {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }
}

fn find_config_file() -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;

    let candidate = cwd.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        return Ok(Some(candidate));
    }

    if let Some(repo_root) = find_repo_root(&cwd) {
        let candidate = repo_root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    if let Some(home) = dirs_home() {
        let candidate = home.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Walks upward from `start` looking for a `Cargo.toml` or `.git` marker.
fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join("Cargo.toml").is_file() || dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = WorkerConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.formatter.kind, "cli");
        assert_eq!(config.client.cpus, 0);
    }

    #[test]
    fn parses_recognised_keys() {
        let toml = r#"
            project = "demo"

            [server]
            host = "broker.internal"
            port = 9000
            api_key = "secret"

            [client]
            entity = "lab-a"
            name = "gpu-node-1"
            cpus = 4
            accelerators = 1

            [formatter]
            type = "slurm"
        "#;
        let config: WorkerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.as_deref(), Some("demo"));
        assert_eq!(config.server.host, "broker.internal");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.client.entity.as_deref(), Some("lab-a"));
        assert_eq!(config.formatter.kind, "slurm");
    }

    #[test]
    fn repo_root_stops_at_cargo_toml() {
        let dir = std::env::temp_dir().join(format!("whatsnext-test-{}", std::process::id()));
        let nested = dir.join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.join("Cargo.toml"), "[workspace]").unwrap();

        let found = find_repo_root(&nested);
        assert_eq!(found, Some(dir.clone()));

        std::fs::remove_dir_all(&dir).ok();
    }
}
