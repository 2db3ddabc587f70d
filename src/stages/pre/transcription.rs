//! Speech recognition for audio input.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::data::{Capability, Hypothesis, PrePipelineData};
use crate::errors::StageError;
use crate::settings::AsrSection;
use crate::stage::{Stage, StageDescriptor};

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "transcription",
    &[Capability::AudioInput],
    &[Capability::MainHypothesis],
);

/// Magic bytes at the start of every FLAC stream.
const FLAC_MAGIC: &[u8; 4] = b"fLaC";

/// Turns a FLAC recording into the main hypothesis.
///
/// With `asr.command` configured the recording is passed to that program
/// and its stdout is the transcript. Otherwise a sidecar transcript next to
/// the recording (`<audio>.txt`, then the recording path with a `.txt`
/// extension) is read.
pub struct Transcription {
    descriptor: StageDescriptor,
    asr: AsrSection,
    program: Option<PathBuf>,
}

impl Transcription {
    pub fn new(asr: AsrSection) -> Self {
        Self {
            descriptor: DESCRIPTOR,
            asr,
            program: None,
        }
    }

    fn transcribe(&self, audio: &Path) -> Result<String, StageError> {
        match &self.program {
            Some(program) => self.run_command(program, audio),
            None => read_sidecar(audio),
        }
    }

    fn run_command(&self, program: &Path, audio: &Path) -> Result<String, StageError> {
        let name = self.descriptor.name;
        tracing::debug!(program = %program.display(), "Running transcriber");
        let output = Command::new(program)
            .args(self.asr.args_for(audio))
            .output()
            .map_err(|e| {
                StageError::execution(name, format!("failed to run {}: {}", program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::execution(
                name,
                format!(
                    "transcriber exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Stage<PrePipelineData> for Transcription {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        if let Some(command) = &self.asr.command {
            let program = which::which(command).map_err(|e| {
                StageError::initialization(
                    self.descriptor.name,
                    format!("transcriber '{}' not usable: {}", command, e),
                )
            })?;
            self.program = Some(program);
        }
        Ok(())
    }

    fn execute(&mut self, mut input: PrePipelineData) -> Result<PrePipelineData, StageError> {
        let name = self.descriptor.name;
        let audio = input
            .input_file_path()
            .ok_or_else(|| StageError::missing(name, Capability::AudioInput.field()))?
            .to_path_buf();

        check_flac(name, &audio)?;
        let transcript = self.transcribe(&audio)?;
        let hypothesis = Hypothesis::from_text(transcript.trim());
        if hypothesis.is_empty() {
            return Err(StageError::execution(
                name,
                format!("transcript of {} is empty", audio.display()),
            ));
        }

        tracing::info!(hypothesis = %hypothesis, "Main hypothesis transcribed from audio");
        input.set_main_hypothesis(hypothesis);
        Ok(input)
    }
}

fn check_flac(stage: &str, audio: &Path) -> Result<(), StageError> {
    let mut file = std::fs::File::open(audio).map_err(|e| {
        StageError::execution(stage, format!("cannot open {}: {}", audio.display(), e))
    })?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == FLAC_MAGIC => Ok(()),
        _ => Err(StageError::execution(
            stage,
            format!("{} is not a FLAC file", audio.display()),
        )),
    }
}

fn sidecar_candidates(audio: &Path) -> [PathBuf; 2] {
    let mut appended = audio.as_os_str().to_owned();
    appended.push(".txt");
    [PathBuf::from(appended), audio.with_extension("txt")]
}

fn read_sidecar(audio: &Path) -> Result<String, StageError> {
    let candidates = sidecar_candidates(audio);
    for path in &candidates {
        if path.is_file() {
            tracing::debug!(transcript = %path.display(), "Reading sidecar transcript");
            return std::fs::read_to_string(path).map_err(|e| {
                StageError::execution(
                    DESCRIPTOR.name,
                    format!("cannot read {}: {}", path.display(), e),
                )
            });
        }
    }
    Err(StageError::execution(
        DESCRIPTOR.name,
        format!(
            "no transcriber configured and no transcript found at {}",
            candidates[0].display()
        ),
    ))
}
