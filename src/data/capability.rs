use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An annotation a stage requires or contributes.
///
/// Capabilities are what make stage ordering checkable: every stage declares
/// the capabilities it reads and the ones it adds, and a phase can only be
/// assembled if each requirement is provided earlier in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    AudioInput,
    MainHypothesis,
    PosTags,
    NamedEntities,
    SemanticRoles,
    Graph,
    WordSenses,
    Actions,
    TeachingSequences,
    Context,
    Coreference,
    Conditions,
    Loops,
    Concurrency,
    Methods,
    SynthesizedAst,
    ExtractedAst,
    GeneratedCode,
    InjectedCode,
}

impl Capability {
    /// Field name reported in missing-data errors.
    pub fn field(self) -> &'static str {
        match self {
            Capability::AudioInput => "input_file_path",
            Capability::MainHypothesis => "main_hypothesis",
            Capability::PosTags => "pos_tags",
            Capability::NamedEntities => "named_entities",
            Capability::SemanticRoles => "semantic_roles",
            Capability::Graph => "graph",
            Capability::WordSenses => "word_senses",
            Capability::Actions => "actions",
            Capability::TeachingSequences => "teaching_sequences",
            Capability::Context => "context",
            Capability::Coreference => "coreference",
            Capability::Conditions => "conditions",
            Capability::Loops => "loops",
            Capability::Concurrency => "concurrency",
            Capability::Methods => "methods",
            Capability::SynthesizedAst => "synthesized_ast",
            Capability::ExtractedAst => "extracted_ast",
            Capability::GeneratedCode => "generated_code",
            Capability::InjectedCode => "injection",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::AudioInput => "audio-input",
            Capability::MainHypothesis => "main-hypothesis",
            Capability::PosTags => "pos-tags",
            Capability::NamedEntities => "named-entities",
            Capability::SemanticRoles => "semantic-roles",
            Capability::Graph => "graph",
            Capability::WordSenses => "word-senses",
            Capability::Actions => "actions",
            Capability::TeachingSequences => "teaching-sequences",
            Capability::Context => "context",
            Capability::Coreference => "coreference",
            Capability::Conditions => "conditions",
            Capability::Loops => "loops",
            Capability::Concurrency => "concurrency",
            Capability::Methods => "methods",
            Capability::SynthesizedAst => "synthesized-ast",
            Capability::ExtractedAst => "extracted-ast",
            Capability::GeneratedCode => "generated-code",
            Capability::InjectedCode => "injected-code",
        };
        f.write_str(name)
    }
}

/// A container whose contents are tracked as a set of capabilities.
///
/// The phase runner uses this to check a stage's requirements before it runs
/// and to record its contributions after it succeeds.
pub trait Annotated {
    fn annotations(&self) -> &BTreeSet<Capability>;

    fn annotate(&mut self, capability: Capability);

    fn has(&self, capability: Capability) -> bool {
        self.annotations().contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_name() {
        for cap in [
            Capability::MainHypothesis,
            Capability::TeachingSequences,
            Capability::SynthesizedAst,
        ] {
            let json = serde_json::to_string(&cap).unwrap();
            assert_eq!(json, format!("\"{}\"", cap));
        }
    }

    #[test]
    fn field_names_use_snake_case() {
        assert_eq!(Capability::MainHypothesis.field(), "main_hypothesis");
        assert_eq!(Capability::AudioInput.field(), "input_file_path");
    }
}
