use std::path::{Path, PathBuf};

use crate::data::{Capability, Injection, PostPipelineData};
use crate::errors::StageError;
use crate::settings::InjectionSection;
use crate::stage::{Stage, StageDescriptor};

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "code-injector",
    &[Capability::GeneratedCode],
    &[Capability::InjectedCode],
);

const MODULE_DOCSTRING: &str = "\"\"\"Robot program generated by synthflow.\"\"\"";

/// Merges generated code into a delimited region of the target file.
///
/// The region sits between `# >>> <marker>` and `# <<< <marker>` lines. An
/// existing region is replaced; otherwise one is appended. Without a
/// target the code is wrapped in a fresh in-memory module.
pub struct CodeInjector {
    descriptor: StageDescriptor,
    target: Option<PathBuf>,
    marker: String,
}

impl Default for CodeInjector {
    fn default() -> Self {
        Self::new(InjectionSection::default())
    }
}

impl CodeInjector {
    pub fn new(section: InjectionSection) -> Self {
        Self {
            descriptor: DESCRIPTOR,
            target: section.target,
            marker: section.marker,
        }
    }

    fn begin(&self) -> String {
        format!("# >>> {}", self.marker)
    }

    fn end(&self) -> String {
        format!("# <<< {}", self.marker)
    }

    fn region(&self, code: &str) -> String {
        let mut region = format!("{}\n{}", self.begin(), code);
        if !code.ends_with('\n') {
            region.push('\n');
        }
        region.push_str(&self.end());
        region.push('\n');
        region
    }

    fn template(&self, code: &str) -> String {
        format!("{MODULE_DOCSTRING}\n\n{}", self.region(code))
    }

    /// Merge `code` into `existing`; returns the new content and whether a
    /// region was replaced.
    ///
    /// Lines outside the region keep their terminators; the region uses
    /// `\r\n` when the file already does.
    pub fn merge(&self, existing: &str, code: &str) -> Result<(String, bool), StageError> {
        let lines: Vec<&str> = existing.split_inclusive('\n').collect();
        let newline = if existing.contains("\r\n") { "\r\n" } else { "\n" };
        let region = self.region(code).replace('\n', newline);
        let (begin, end) = (self.begin(), self.end());
        let begins: Vec<usize> = positions(&lines, &begin);
        let ends: Vec<usize> = positions(&lines, &end);

        match (begins.as_slice(), ends.as_slice()) {
            ([], []) => {
                let mut content = existing.to_string();
                if !content.is_empty() {
                    if !content.ends_with('\n') {
                        content.push_str(newline);
                    }
                    content.push_str(newline);
                }
                content.push_str(&region);
                Ok((content, false))
            }
            ([b], [e]) if b < e => {
                let mut content = lines[..*b].concat();
                content.push_str(&region);
                content.push_str(&lines[e + 1..].concat());
                Ok((content, true))
            }
            _ => Err(StageError::execution(
                self.descriptor.name,
                format!(
                    "unbalanced '{}' markers ({} opening, {} closing)",
                    self.marker,
                    begins.len(),
                    ends.len()
                ),
            )),
        }
    }

    fn inject_into(&self, path: &Path, code: &str) -> Result<Injection, StageError> {
        let name = self.descriptor.name;
        let existing = if path.exists() {
            std::fs::read_to_string(path).map_err(|e| {
                StageError::execution(name, format!("failed to read {}: {e}", path.display()))
            })?
        } else {
            String::new()
        };
        let (content, replaced_existing) = self.merge(&existing, code)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StageError::execution(name, format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(path, &content).map_err(|e| {
            StageError::execution(name, format!("failed to write {}: {e}", path.display()))
        })?;

        Ok(Injection {
            target: Some(path.to_path_buf()),
            content,
            replaced_existing,
        })
    }
}

fn positions(lines: &[&str], marker: &str) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == marker)
        .map(|(i, _)| i)
        .collect()
}

impl Stage<PostPipelineData> for CodeInjector {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        if self.marker.trim().is_empty() {
            return Err(StageError::initialization(
                self.descriptor.name,
                "the injection marker is empty",
            ));
        }
        Ok(())
    }

    fn execute(&mut self, mut input: PostPipelineData) -> Result<PostPipelineData, StageError> {
        let code = input.code(self.descriptor.name)?.to_string();
        let injection = match &self.target {
            Some(path) => self.inject_into(path, &code)?,
            None => Injection {
                target: None,
                content: self.template(&code),
                replaced_existing: false,
            },
        };
        let destination = injection
            .target
            .as_ref()
            .map_or_else(|| "in-memory module".to_string(), |p| p.display().to_string());
        tracing::info!(
            destination = %destination,
            replaced = injection.replaced_existing,
            "Code injected"
        );
        input.set_injection(injection);
        Ok(input)
    }
}
