//! Linguistic parse of an utterance.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+(?:'\w+)?|[^\w\s]").expect("token pattern is a valid static regex")
});

/// A single word of the hypothesis with the annotations attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub word: String,
    /// Penn-style part-of-speech tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    /// Named-entity class; `None` for tokens outside any entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Number of the instruction (clause) this token belongs to
    #[serde(default)]
    pub instruction: usize,
}

impl Token {
    pub fn new(index: usize, word: &str) -> Self {
        Self {
            index,
            word: word.to_string(),
            pos: None,
            entity: None,
            instruction: 0,
        }
    }

    pub fn lower(&self) -> String {
        self.word.to_lowercase()
    }

    /// Whether the POS tag starts with `prefix` (e.g. `"VB"`, `"NN"`).
    pub fn pos_is(&self, prefix: &str) -> bool {
        self.pos.as_deref().is_some_and(|p| p.starts_with(prefix))
    }

    pub fn is_punctuation(&self) -> bool {
        self.word.chars().all(|c| !c.is_alphanumeric())
    }
}

/// One argument of a semantic-role frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrlArgument {
    /// PropBank-style role label (`A1`, `A2`, `AM-LOC`, ...)
    pub role: String,
    /// Token indices covered by the argument, in order
    pub tokens: Vec<usize>,
}

/// Predicate-argument structure for one verb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrlFrame {
    pub predicate: usize,
    pub verb: String,
    #[serde(default)]
    pub arguments: Vec<SrlArgument>,
}

/// A structured parse or transcription of an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub frames: Vec<SrlFrame>,
    pub confidence: f64,
}

impl Hypothesis {
    /// Tokenize raw text into an unannotated hypothesis.
    ///
    /// Words keep their original casing; punctuation becomes separate tokens.
    pub fn from_text(text: &str) -> Self {
        let tokens = TOKEN_RE
            .find_iter(text)
            .enumerate()
            .map(|(i, m)| Token::new(i, m.as_str()))
            .collect();
        Self {
            tokens,
            frames: Vec::new(),
            confidence: 1.0,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.word.as_str())
    }

    /// Join the words at the given indices, skipping indices out of range.
    pub fn span_text(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .filter_map(|&i| self.tokens.get(i))
            .map(|t| t.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = self.words().collect::<Vec<_>>().join(" ");
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_splits_punctuation() {
        let hyp = Hypothesis::from_text("Move the arm, then stop.");
        let words: Vec<_> = hyp.words().collect();
        assert_eq!(words, vec!["Move", "the", "arm", ",", "then", "stop", "."]);
        assert_eq!(hyp.tokens[2].index, 2);
        assert!(hyp.tokens[3].is_punctuation());
    }

    #[test]
    fn test_from_text_keeps_contractions_together() {
        let hyp = Hypothesis::from_text("don't drop it");
        assert_eq!(hyp.tokens[0].word, "don't");
        assert_eq!(hyp.len(), 3);
    }

    #[test]
    fn test_from_text_empty() {
        let hyp = Hypothesis::from_text("   ");
        assert!(hyp.is_empty());
        assert_eq!(hyp.to_string(), "");
    }

    #[test]
    fn test_span_text_ignores_out_of_range() {
        let hyp = Hypothesis::from_text("close the gripper");
        assert_eq!(hyp.span_text(&[1, 2, 9]), "the gripper");
    }

    #[test]
    fn test_pos_prefix() {
        let mut token = Token::new(0, "moves");
        assert!(!token.pos_is("VB"));
        token.pos = Some("VBZ".into());
        assert!(token.pos_is("VB"));
        assert!(!token.pos_is("NN"));
    }
}
