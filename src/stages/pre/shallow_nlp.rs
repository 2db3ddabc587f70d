//! Part-of-speech tagging and instruction segmentation.

use std::collections::HashMap;

use crate::data::{Capability, PrePipelineData, Token};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::lexicon;

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "shallow-nlp",
    &[Capability::MainHypothesis],
    &[Capability::PosTags],
);

/// Lexicon-driven Penn-style tagger for imperative robot commands.
pub struct ShallowNlp {
    descriptor: StageDescriptor,
    dictionary: HashMap<&'static str, &'static str>,
}

impl Default for ShallowNlp {
    fn default() -> Self {
        Self::new()
    }
}

impl ShallowNlp {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
            dictionary: HashMap::new(),
        }
    }

    fn load_dictionary(&mut self) {
        let tables: [(&[&'static str], &'static str); 11] = [
            (lexicon::DETERMINERS, "DT"),
            (lexicon::POSSESSIVES, "PRP$"),
            (lexicon::PRONOUNS, "PRP"),
            (lexicon::PREPOSITIONS, "IN"),
            (lexicon::CONDITION_WORDS, "IN"),
            (lexicon::LOOP_WORDS, "IN"),
            (lexicon::CONJUNCTIONS, "CC"),
            (lexicon::ADVERBS, "RB"),
            (lexicon::ADJECTIVES, "JJ"),
            (lexicon::MODALS, "MD"),
            (lexicon::COPULAS, "VBZ"),
        ];
        for (words, tag) in tables {
            for &word in words {
                self.dictionary.insert(word, tag);
            }
        }
        self.dictionary.insert("to", "TO");
        self.dictionary.insert("please", "UH");
        self.dictionary.insert("means", "VBZ");
        self.dictionary.insert("mean", "VBP");
        self.dictionary.insert("times", "NNS");
        self.dictionary.insert("time", "NN");
        self.dictionary.insert("are", "VBP");
        self.dictionary.insert("be", "VB");
    }

    fn lookup(&self, lower: &str) -> Option<&'static str> {
        self.dictionary.get(lower).copied()
    }

    fn tag(&self, tokens: &[Token], i: usize, tags: &[String]) -> String {
        let word = tokens[i].word.as_str();
        let lower = tokens[i].lower();
        let prev = i.checked_sub(1).map(|p| tags[p].as_str());

        if tokens[i].is_punctuation() {
            return if lexicon::is_sentence_end(word) {
                ".".into()
            } else if word == "," {
                ",".into()
            } else {
                ":".into()
            };
        }
        if lexicon::number_value(word).is_some() {
            return "CD".into();
        }

        let lemma = lexicon::lemma(&lower);
        let action = lexicon::is_action_verb(&lemma);
        let capitalized = word.chars().next().is_some_and(char::is_uppercase);
        let sentence_start = i == 0 || prev == Some(".");
        // Labels such as "position A" and names in mid-sentence
        if capitalized
            && !sentence_start
            && (prev.is_some_and(|p| p.starts_with("NN"))
                || (self.lookup(&lower).is_none() && !action))
        {
            return "NNP".into();
        }

        if let Some(tag) = self.lookup(&lower) {
            return tag.into();
        }
        // "to <verb> means <verb> ...": both slots hold verbs, known or not.
        if opens_teaching_header(i, tags) || follows_means(tokens, i) {
            return "VB".into();
        }

        if action {
            if lemma != lower {
                return lexicon::verb_form(&lower).into();
            }
            let before_prev = i.checked_sub(2).map(|p| tags[p].as_str());
            return match prev {
                Some("DT" | "PRP$") => "NN".into(),
                Some("JJ") if matches!(before_prev, Some("DT" | "PRP$")) => "NN".into(),
                Some("VBZ" | "VBP") => "JJ".into(),
                _ => "VB".into(),
            };
        }

        if sentence_start && self.looks_like_object_follows(tokens, i) {
            return "VB".into();
        }
        if prev == Some("PRP") {
            return "VBP".into();
        }
        if lower.ends_with("ly") {
            return "RB".into();
        }
        if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
            return "NNS".into();
        }
        "NN".into()
    }

    /// An unknown sentence-initial word is read as an imperative verb when a
    /// determiner, pronoun or preposition follows it.
    fn looks_like_object_follows(&self, tokens: &[Token], i: usize) -> bool {
        match tokens.get(i + 1) {
            None => true,
            Some(next) if next.is_punctuation() => true,
            Some(next) => matches!(
                self.lookup(&next.lower()),
                Some("DT" | "PRP" | "PRP$" | "IN" | "TO")
            ),
        }
    }
}

/// Whether the token sits right after a sentence-initial `to`.
fn opens_teaching_header(i: usize, tags: &[String]) -> bool {
    match i.checked_sub(1) {
        Some(to) => tags[to] == "TO" && (to == 0 || tags[to - 1] == "."),
        None => false,
    }
}

fn follows_means(tokens: &[Token], i: usize) -> bool {
    i.checked_sub(1)
        .is_some_and(|p| matches!(tokens[p].lower().as_str(), "means" | "mean"))
}

/// Number tokens by instruction.
///
/// A new instruction starts after sentence punctuation, and at a predicate
/// verb when the current instruction already has one.
fn number_instructions(tokens: &mut [Token]) {
    let mut instruction = 0;
    let mut has_predicate = false;
    for i in 0..tokens.len() {
        if i > 0 && lexicon::is_sentence_end(&tokens[i - 1].word) {
            instruction += 1;
            has_predicate = false;
        }
        let token = &mut tokens[i];
        if lexicon::is_predicate(token.pos.as_deref(), &token.lower()) {
            if has_predicate {
                instruction += 1;
            }
            has_predicate = true;
        }
        token.instruction = instruction;
    }
}

impl Stage<PrePipelineData> for ShallowNlp {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        self.load_dictionary();
        tracing::debug!(entries = self.dictionary.len(), "Tagger dictionary loaded");
        Ok(())
    }

    fn execute(&mut self, mut input: PrePipelineData) -> Result<PrePipelineData, StageError> {
        let name = self.descriptor.name;
        let hypothesis = input.main_hypothesis_mut(name)?;
        if hypothesis.is_empty() {
            return Err(StageError::execution(name, "the main hypothesis has no tokens"));
        }

        let mut tags: Vec<String> = Vec::with_capacity(hypothesis.len());
        for i in 0..hypothesis.tokens.len() {
            let tag = self.tag(&hypothesis.tokens, i, &tags);
            tags.push(tag);
        }
        for (token, tag) in hypothesis.tokens.iter_mut().zip(tags) {
            token.pos = Some(tag);
        }
        number_instructions(&mut hypothesis.tokens);

        Ok(input)
    }
}
