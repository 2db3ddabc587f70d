use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::data::InputSource;
use crate::logging::Verbosity;
use crate::settings::{CONFIG_DIR, CONFIG_FILE, LogFormat, Settings};

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit configuration file (`--config`)
    pub config_file: Option<PathBuf>,
    /// Injection target (`--target`)
    pub target: Option<PathBuf>,
    /// Force JSON logs (`--json-logs`)
    pub json_logs: bool,
}

/// Runtime configuration for one synthflow run.
///
/// Bundles the validated input with settings layered file, environment,
/// then command line, plus where results go and how loudly to run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: InputSource,
    pub settings: Settings,
    /// File the settings were read from, if any
    pub settings_file: Option<PathBuf>,
    /// Where the final post container is written as JSON
    pub output: Option<PathBuf>,
    /// Print the run report as JSON
    pub report_json: bool,
    pub verbosity: Verbosity,
    /// Draw progress bars on stderr
    pub progress: bool,
}

impl RunConfig {
    pub fn new(input: InputSource, settings: Settings) -> Self {
        Self {
            input,
            settings,
            settings_file: None,
            output: None,
            report_json: false,
            verbosity: Verbosity::Normal,
            progress: true,
        }
    }

    /// Resolve settings for `project_dir` and apply environment and CLI
    /// overrides.
    pub fn load(input: InputSource, project_dir: &Path, overrides: &CliOverrides) -> Result<Self> {
        let (mut settings, settings_file) =
            load_settings(project_dir, overrides.config_file.as_deref())?;
        settings
            .apply_env()
            .context("Failed to apply environment overrides")?;
        apply_cli(&mut settings, overrides);

        Ok(Self {
            settings_file,
            ..Self::new(input, settings)
        })
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_report_json(mut self, report_json: bool) -> Self {
        self.report_json = report_json;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self.progress = verbosity != Verbosity::Quiet;
        self
    }

    pub fn log_format(&self) -> LogFormat {
        self.settings.logging.format
    }

    /// Write the final container to the output path, if one is set.
    pub fn write_output<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let Some(path) = &self.output else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
        Ok(())
    }
}

/// Load settings from an explicit file, or from `.synthflow/synthflow.toml`
/// under `project_dir` when present.
fn load_settings(project_dir: &Path, explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let settings = Settings::load(path)?;
        return Ok((settings, Some(path.to_path_buf())));
    }

    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);
    let found = config_path.exists().then_some(config_path);
    Ok((Settings::load_or_default(&config_dir)?, found))
}

fn apply_cli(settings: &mut Settings, overrides: &CliOverrides) {
    if let Some(target) = &overrides.target {
        settings.injection.target = Some(target.clone());
    }
    if overrides.json_logs {
        settings.logging.format = LogFormat::Json;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn text() -> InputSource {
        InputSource::Text("Wave.".to_string())
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = tempdir().unwrap();
        let (settings, file) = load_settings(dir.path(), None).unwrap();
        assert!(file.is_none());
        assert_eq!(settings.synthesis.receiver, "robot");
    }

    #[test]
    fn test_project_file_is_discovered() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join(CONFIG_FILE),
            "[synthesis]\nreceiver = \"arm\"\n",
        )
        .unwrap();

        let (settings, file) = load_settings(dir.path(), None).unwrap();
        assert_eq!(settings.synthesis.receiver, "arm");
        assert_eq!(file, Some(config_dir.join(CONFIG_FILE)));
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_settings(dir.path(), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut settings = Settings::parse(
            "[logging]\nformat = \"compact\"\n[injection]\ntarget = \"a.py\"\n",
        )
        .unwrap();
        apply_cli(
            &mut settings,
            &CliOverrides {
                config_file: None,
                target: Some(PathBuf::from("b.py")),
                json_logs: true,
            },
        );
        assert_eq!(settings.injection.target, Some(PathBuf::from("b.py")));
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_quiet_disables_progress() {
        let config = RunConfig::new(text(), Settings::default()).with_verbosity(Verbosity::Quiet);
        assert!(!config.progress);
        let config = RunConfig::new(text(), Settings::default()).with_verbosity(Verbosity::Verbose);
        assert!(config.progress);
    }

    #[test]
    fn test_write_output_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("result.json");
        let config = RunConfig::new(text(), Settings::default()).with_output(Some(path.clone()));
        config.write_output(&serde_json::json!({"ok": true})).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["ok"], true);
    }

    #[test]
    fn test_write_output_without_path_is_noop() {
        let config = RunConfig::new(text(), Settings::default());
        config.write_output(&"ignored").unwrap();
    }
}
