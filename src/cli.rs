//! Command-line interface.
//!
//! Designed for CI pipelines: point it at a SonarQube server, let it wait
//! for analysis, and gate the build on the result. Flags override the
//! optional `.sonarcheck.toml`; both override built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{self, Config, ConfigError, FileConfig};

/// Check a SonarQube server for unresolved issues.
///
/// Waits for background analysis to finish, fails the build when unresolved
/// issues exist, and can write a standalone HTML report with highlighted
/// source previews.
#[derive(Debug, Parser)]
#[command(name = "sonarcheck", version)]
pub struct Cli {
    /// SonarQube base URL [default: http://localhost:9000].
    #[arg(long)]
    pub url: Option<String>,

    /// Attempts before reporting failure [default: 20].
    #[arg(long)]
    pub count: Option<u32>,

    /// Milliseconds between two attempts [default: 5000].
    #[arg(long)]
    pub sleep: Option<u64>,

    /// Only check that the server responds and analysis completes.
    #[arg(long, short = 'c')]
    pub check: bool,

    /// Write an HTML report when issues are found.
    #[arg(long, short = 'r')]
    pub report: bool,

    /// HTML report path [default: sonarqube-issues.html].
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Project source root used to locate preview files, as `name=root`.
    /// Can be given multiple times.
    #[arg(long = "project", value_name = "NAME=ROOT", value_parser = parse_project)]
    pub projects: Vec<(String, PathBuf)>,

    /// Encoding of the source files shown in previews [default: UTF-8].
    #[arg(long, short = 'e')]
    pub encoding: Option<String>,

    /// Basic-auth credentials for admin endpoints, as `user:password`
    /// [default: admin:admin].
    #[arg(long)]
    pub auth: Option<String>,

    /// Config file to read defaults from [default: .sonarcheck.toml].
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Parses a `name=root` project pair.
fn parse_project(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, root)) if !name.is_empty() && !root.is_empty() => {
            Ok((name.to_string(), PathBuf::from(root)))
        }
        _ => Err(format!("invalid project '{value}', expected name=root")),
    }
}

impl Cli {
    /// Resolves flags against the config file into the final configuration.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let file_path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
        let file = FileConfig::load(&file_path)?;
        self.resolve(file)
    }

    fn resolve(self, file: FileConfig) -> Result<Config, ConfigError> {
        let label = self
            .encoding
            .or(file.encoding)
            .unwrap_or_else(|| config::DEFAULT_ENCODING.to_string());
        let encoding = config::resolve_encoding(&label)?;

        let credentials = config::resolve_credentials(
            self.auth
                .or(file.auth)
                .unwrap_or_else(|| config::DEFAULT_CREDENTIALS.to_string()),
        )?;

        // Flag-provided projects win over file-provided ones of the same name.
        let mut projects = file.projects;
        projects.extend(self.projects);

        Ok(Config {
            url: self
                .url
                .or(file.url)
                .unwrap_or_else(|| config::DEFAULT_URL.to_string()),
            attempts: self.count.or(file.count).unwrap_or(config::DEFAULT_ATTEMPTS),
            sleep_milliseconds: self
                .sleep
                .or(file.sleep)
                .unwrap_or(config::DEFAULT_SLEEP_MILLISECONDS),
            check: self.check,
            report: self.report || file.report.unwrap_or(false),
            report_path: self
                .path
                .or(file.path)
                .unwrap_or_else(|| PathBuf::from(config::DEFAULT_REPORT_PATH)),
            projects,
            encoding,
            credentials,
        })
    }
}
