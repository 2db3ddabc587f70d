//! Configuration file support for synthflow.
//!
//! Settings are read from `.synthflow/synthflow.toml` and layered
//! file → environment → CLI. A missing file means defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [logging]
//! format = "compact"        # or "json"
//!
//! [asr]
//! command = "whisper-cli"
//! args = ["--model", "base", "{input}"]
//!
//! [synthesis]
//! method_name = "execute"
//! receiver = "robot"
//!
//! [injection]
//! target = "robot_program.py"
//! marker = "synthflow"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the project configuration.
pub const CONFIG_DIR: &str = ".synthflow";
/// Configuration file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "synthflow.toml";

pub const ENV_ASR_CMD: &str = "SYNTHFLOW_ASR_CMD";
pub const ENV_INJECT_TARGET: &str = "SYNTHFLOW_INJECT_TARGET";
pub const ENV_LOG_FORMAT: &str = "SYNTHFLOW_LOG_FORMAT";

/// Placeholder in `asr.args` replaced by the audio file path.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: compact, json", s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
}

/// External speech recognizer used by the transcription stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrSection {
    /// Transcriber executable; when unset, a sidecar `<audio>.txt` is read
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed to the transcriber
    #[serde(default = "default_asr_args")]
    pub args: Vec<String>,
}

fn default_asr_args() -> Vec<String> {
    vec![INPUT_PLACEHOLDER.to_string()]
}

impl Default for AsrSection {
    fn default() -> Self {
        Self {
            command: None,
            args: default_asr_args(),
        }
    }
}

impl AsrSection {
    /// Arguments with the input placeholder substituted.
    pub fn args_for(&self, input: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSection {
    /// Name of the generated entry-point method
    #[serde(default = "default_method_name")]
    pub method_name: String,
    /// Object the generated code calls actions on
    #[serde(default = "default_receiver")]
    pub receiver: String,
}

fn default_method_name() -> String {
    "execute".to_string()
}

fn default_receiver() -> String {
    "robot".to_string()
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            method_name: default_method_name(),
            receiver: default_receiver(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionSection {
    /// File the generated code is merged into
    #[serde(default)]
    pub target: Option<PathBuf>,
    /// Name used in the `# >>> marker` / `# <<< marker` region delimiters
    #[serde(default = "default_marker")]
    pub marker: String,
}

fn default_marker() -> String {
    "synthflow".to_string()
}

impl Default for InjectionSection {
    fn default() -> Self {
        Self {
            target: None,
            marker: default_marker(),
        }
    }
}

/// Root of `synthflow.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub asr: AsrSection,
    #[serde(default)]
    pub synthesis: SynthesisSection,
    #[serde(default)]
    pub injection: InjectionSection,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse synthflow.toml")
    }

    /// Load `synthflow.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize synthflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides looked up through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(cmd) = get(ENV_ASR_CMD) {
            self.asr.command = Some(cmd);
        }
        if let Some(target) = get(ENV_INJECT_TARGET) {
            self.injection.target = Some(PathBuf::from(target));
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            self.logging.format = format
                .parse()
                .with_context(|| format!("Invalid {}", ENV_LOG_FORMAT))?;
        }
        Ok(())
    }

    /// Validate the settings and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !is_identifier(&self.synthesis.method_name) {
            warnings.push(format!(
                "synthesis.method_name '{}' is not a valid identifier",
                self.synthesis.method_name
            ));
        }
        if !is_identifier(&self.synthesis.receiver) {
            warnings.push(format!(
                "synthesis.receiver '{}' is not a valid identifier",
                self.synthesis.receiver
            ));
        }
        if self.injection.marker.trim().is_empty() {
            warnings.push("injection.marker is empty".to_string());
        }
        if self.asr.command.is_some()
            && !self.asr.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER))
        {
            warnings.push(format!(
                "asr.args does not contain '{}'; the transcriber will not receive the audio path",
                INPUT_PLACEHOLDER
            ));
        }

        warnings
    }
}

/// ASCII identifier check used for generated method and receiver names.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
