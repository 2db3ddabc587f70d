//! Gazetteer-based named-entity tagging.

use std::collections::HashSet;

use crate::data::{Capability, PrePipelineData, Token};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "ner",
    &[Capability::PosTags],
    &[Capability::NamedEntities],
);

pub const OBJECT: &str = "OBJECT";
pub const LOCATION: &str = "LOCATION";
pub const NUMBER: &str = "NUMBER";
pub const NAMED: &str = "NAMED";

/// Tags nouns found in the object and location gazetteers, cardinals and
/// proper nouns.
pub struct Ner {
    descriptor: StageDescriptor,
    objects: HashSet<&'static str>,
    locations: HashSet<&'static str>,
}

impl Default for Ner {
    fn default() -> Self {
        Self::new()
    }
}

impl Ner {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
            objects: HashSet::new(),
            locations: HashSet::new(),
        }
    }

    fn classify(&self, token: &Token) -> Option<&'static str> {
        if token.pos_is("CD") {
            return Some(NUMBER);
        }
        if token.pos_is("NNP") {
            return Some(NAMED);
        }
        if !token.pos_is("NN") {
            return None;
        }
        let lemma = lexicon::lemma(&token.word);
        if self.locations.contains(lemma.as_str()) {
            Some(LOCATION)
        } else if self.objects.contains(lemma.as_str()) {
            Some(OBJECT)
        } else {
            None
        }
    }
}

impl Stage<PrePipelineData> for Ner {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        self.objects = lexicon::OBJECTS.iter().copied().collect();
        self.locations = lexicon::LOCATIONS.iter().copied().collect();
        Ok(())
    }

    fn execute(&mut self, mut input: PrePipelineData) -> Result<PrePipelineData, StageError> {
        let name = self.descriptor.name;
        let hypothesis = input.main_hypothesis_mut(name)?;
        if hypothesis.tokens.iter().any(|t| t.pos.is_none()) {
            return Err(StageError::missing(name, Capability::PosTags.field()));
        }

        let labels: Vec<Option<&'static str>> =
            hypothesis.tokens.iter().map(|t| self.classify(t)).collect();
        let mut tagged = 0;
        for (token, label) in hypothesis.tokens.iter_mut().zip(labels) {
            token.entity = label.map(str::to_string);
            tagged += usize::from(label.is_some());
        }
        tracing::debug!(entities = tagged, "Named entities tagged");

        Ok(input)
    }
}
