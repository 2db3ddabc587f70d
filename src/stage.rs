//! The stage contract shared by every unit of pipeline work.
//!
//! A stage is initialized once, then executed with the container of its
//! phase: it takes the container by value and hands back the container it
//! produced. Agents use the graph itself as their container.

use serde::Serialize;

use crate::data::Capability;
use crate::errors::StageError;

/// Static description of a stage: identity plus declared data dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub name: &'static str,
    /// Capabilities that must be present before the stage runs
    pub requires: &'static [Capability],
    /// Capabilities the stage adds on success
    pub provides: &'static [Capability],
}

impl StageDescriptor {
    pub const fn new(
        name: &'static str,
        requires: &'static [Capability],
        provides: &'static [Capability],
    ) -> Self {
        Self {
            name,
            requires,
            provides,
        }
    }
}

/// A unit of pipeline work over container type `C`.
pub trait Stage<C> {
    fn descriptor(&self) -> &StageDescriptor;

    /// Allocate models, dictionaries and external handles.
    ///
    /// Called exactly once per instance, before the first `execute`. An error
    /// here is fatal to the run.
    fn init(&mut self) -> Result<(), StageError>;

    /// Process the container and return the container for the next stage.
    fn execute(&mut self, input: C) -> Result<C, StageError>;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper {
        descriptor: StageDescriptor,
    }

    impl Stage<String> for Upper {
        fn descriptor(&self) -> &StageDescriptor {
            &self.descriptor
        }

        fn init(&mut self) -> Result<(), StageError> {
            Ok(())
        }

        fn execute(&mut self, input: String) -> Result<String, StageError> {
            Ok(input.to_uppercase())
        }
    }

    #[test]
    fn test_stage_hands_back_container() {
        let mut stage = Upper {
            descriptor: StageDescriptor::new("upper", &[], &[Capability::PosTags]),
        };
        stage.init().unwrap();
        assert_eq!(stage.execute("move".into()).unwrap(), "MOVE");
        assert_eq!(stage.name(), "upper");
        assert_eq!(stage.descriptor().provides, &[Capability::PosTags]);
    }
}
