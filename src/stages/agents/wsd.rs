use crate::data::{Capability, Graph, NodeId, NodeKind};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "wsd",
    &[Capability::Graph, Capability::PosTags],
    &[Capability::WordSenses],
);

/// Word-sense disambiguation: assigns each content token its lemma and the
/// first sense for its part of speech (`lemma.pos.01`).
pub struct Wsd {
    descriptor: StageDescriptor,
}

impl Default for Wsd {
    fn default() -> Self {
        Self::new()
    }
}

impl Wsd {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

fn sense_class(pos: &str) -> Option<char> {
    match pos {
        p if p.starts_with("NN") => Some('n'),
        p if p.starts_with("VB") => Some('v'),
        p if p.starts_with("JJ") => Some('a'),
        p if p.starts_with("RB") => Some('r'),
        _ => None,
    }
}

impl Stage<Graph> for Wsd {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut graph: Graph) -> Result<Graph, StageError> {
        let name = self.descriptor.name;
        if graph.count_of(NodeKind::Token) == 0 {
            return Err(StageError::execution(name, "the graph has no token nodes"));
        }

        let senses: Vec<(NodeId, String, Option<String>)> = graph
            .nodes_of(NodeKind::Token)
            .map(|node| {
                let word = node.text("word").unwrap_or_default();
                let lemma = lexicon::lemma(word);
                let sense = node
                    .text("pos")
                    .and_then(sense_class)
                    .map(|class| format!("{lemma}.{class}.01"));
                (node.id, lemma, sense)
            })
            .collect();

        let mut disambiguated = 0;
        for (id, lemma, sense) in senses {
            graph.set_attr(id, "lemma", lemma);
            if let Some(sense) = sense {
                graph.set_attr(id, "sense", sense);
                disambiguated += 1;
            }
        }
        tracing::debug!(tokens = disambiguated, "Word senses assigned");

        Ok(graph)
    }
}
