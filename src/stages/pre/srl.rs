//! Rule-based semantic-role labeling.

use crate::data::{Capability, PrePipelineData, SrlArgument, SrlFrame, Token};
use crate::errors::StageError;
use crate::stage::{Stage, StageDescriptor};
use crate::stages::lexicon::{self, contains};

const DESCRIPTOR: StageDescriptor = StageDescriptor::new(
    "srl",
    &[Capability::PosTags, Capability::NamedEntities],
    &[Capability::SemanticRoles],
);

pub const ROLE_PATIENT: &str = "A1";
pub const ROLE_DESTINATION: &str = "A2";
pub const ROLE_LOCATION: &str = "AM-LOC";
pub const ROLE_SOURCE: &str = "AM-DIR";
pub const ROLE_INSTRUMENT: &str = "AM-MNR";
pub const ROLE_EXTENT: &str = "AM-EXT";

/// Builds one predicate-argument frame per predicate verb.
///
/// Arguments are collected left to right within the predicate's instruction
/// and stop at conjunctions, clause openers and sentence punctuation.
pub struct Srl {
    descriptor: StageDescriptor,
}

impl Default for Srl {
    fn default() -> Self {
        Self::new()
    }
}

impl Srl {
    pub fn new() -> Self {
        Self {
            descriptor: DESCRIPTOR,
        }
    }
}

fn is_predicate(token: &Token) -> bool {
    lexicon::is_predicate(token.pos.as_deref(), &token.lower())
}

fn preposition_role(lower: &str) -> &'static str {
    if contains(lexicon::DESTINATION_PREPOSITIONS, lower) {
        ROLE_DESTINATION
    } else if lower == "from" {
        ROLE_SOURCE
    } else if lower == "with" {
        ROLE_INSTRUMENT
    } else {
        ROLE_LOCATION
    }
}

fn is_count_phrase(tokens: &[Token], i: usize) -> bool {
    tokens[i].pos_is("CD") && tokens.get(i + 1).is_some_and(|t| t.lower() == "times")
}

fn ends_argument_list(token: &Token) -> bool {
    let lower = token.lower();
    token.is_punctuation()
        || token.pos_is("CC")
        || is_predicate(token)
        || lower == "then"
        || contains(lexicon::CONDITION_WORDS, &lower)
        || contains(lexicon::LOOP_WORDS, &lower)
        || contains(lexicon::ELSE_WORDS, &lower)
}

/// End (exclusive) of the noun phrase starting at `start`.
fn noun_phrase_end(tokens: &[Token], words: &[String], start: usize) -> usize {
    let mut end = start;
    while end < tokens.len() {
        let token = &tokens[end];
        if lexicon::concurrency_marker_at(words, end).is_some() || is_count_phrase(tokens, end) {
            break;
        }
        if token.pos_is("PRP") && !token.pos_is("PRP$") {
            if end == start {
                end += 1;
            }
            break;
        }
        let in_phrase = token.pos_is("DT")
            || token.pos_is("PRP$")
            || token.pos_is("JJ")
            || token.pos_is("NN")
            || token.pos_is("CD");
        if !in_phrase {
            break;
        }
        end += 1;
    }
    end
}

fn frame_for(tokens: &[Token], words: &[String], predicate: usize) -> SrlFrame {
    let verb = &tokens[predicate];
    let mut frame = SrlFrame {
        predicate,
        verb: lexicon::lemma(&verb.word),
        arguments: Vec::new(),
    };
    let has_role = |frame: &SrlFrame, role: &str| frame.arguments.iter().any(|a| a.role == role);

    let mut j = predicate + 1;
    // "pick up the cup": the particle belongs to the verb
    if let Some(next) = tokens.get(j)
        && contains(lexicon::PARTICLES, &next.lower())
        && tokens
            .get(j + 1)
            .is_none_or(|t| t.pos_is("DT") || t.pos_is("NN") || t.pos_is("PRP") || t.is_punctuation())
    {
        j += 1;
    }

    while j < tokens.len() {
        let token = &tokens[j];
        if token.instruction != verb.instruction || ends_argument_list(token) {
            break;
        }
        if let Some(len) = lexicon::concurrency_marker_at(words, j) {
            j += len;
            continue;
        }
        if is_count_phrase(tokens, j) {
            frame.arguments.push(SrlArgument {
                role: ROLE_EXTENT.into(),
                tokens: vec![j, j + 1],
            });
            j += 2;
            continue;
        }
        if lexicon::repetition_count(&token.lower()).is_some() {
            frame.arguments.push(SrlArgument {
                role: ROLE_EXTENT.into(),
                tokens: vec![j],
            });
            j += 1;
            continue;
        }
        if token.pos_is("TO") || token.pos_is("IN") {
            let end = noun_phrase_end(tokens, words, j + 1);
            if end > j + 1 {
                frame.arguments.push(SrlArgument {
                    role: preposition_role(&token.lower()).into(),
                    tokens: (j + 1..end).collect(),
                });
                j = end;
            } else {
                j += 1;
            }
            continue;
        }
        let end = noun_phrase_end(tokens, words, j);
        if end > j {
            let role = if !has_role(&frame, ROLE_PATIENT) {
                Some(ROLE_PATIENT)
            } else if !has_role(&frame, ROLE_DESTINATION) {
                Some(ROLE_DESTINATION)
            } else {
                None
            };
            if let Some(role) = role {
                frame.arguments.push(SrlArgument {
                    role: role.into(),
                    tokens: (j..end).collect(),
                });
            }
            j = end;
        } else {
            j += 1;
        }
    }
    frame
}

impl Stage<PrePipelineData> for Srl {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn init(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    fn execute(&mut self, mut input: PrePipelineData) -> Result<PrePipelineData, StageError> {
        let name = self.descriptor.name;
        let hypothesis = input.main_hypothesis_mut(name)?;
        if hypothesis.tokens.iter().any(|t| t.pos.is_none()) {
            return Err(StageError::missing(name, Capability::PosTags.field()));
        }

        let words: Vec<String> = hypothesis.tokens.iter().map(Token::lower).collect();
        let frames: Vec<SrlFrame> = (0..hypothesis.tokens.len())
            .filter(|&i| is_predicate(&hypothesis.tokens[i]))
            .map(|i| frame_for(&hypothesis.tokens, &words, i))
            .collect();

        tracing::debug!(frames = frames.len(), "Semantic roles labeled");
        hypothesis.frames = frames;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InputSource;
    use crate::stages::pre::{Ner, ShallowNlp};

    fn label(text: &str) -> (Vec<SrlFrame>, Vec<String>) {
        let mut tagger = ShallowNlp::new();
        let mut ner = Ner::new();
        let mut srl = Srl::new();
        tagger.init().unwrap();
        ner.init().unwrap();
        srl.init().unwrap();
        let data = PrePipelineData::new(InputSource::Text(text.into()));
        let data = srl
            .execute(ner.execute(tagger.execute(data).unwrap()).unwrap())
            .unwrap();
        let hyp = data.main_hypothesis("test").unwrap();
        let words = hyp.words().map(str::to_string).collect();
        (hyp.frames.clone(), words)
    }

    fn arg<'a>(frame: &'a SrlFrame, role: &str) -> Option<&'a [usize]> {
        frame
            .arguments
            .iter()
            .find(|a| a.role == role)
            .map(|a| a.tokens.as_slice())
    }

    #[test]
    fn test_reference_sentence_frames() {
        let (frames, _) = label("Move the robot arm to position A and then close the gripper.");
        assert_eq!(frames.len(), 2);

        assert_eq!(frames[0].verb, "move");
        assert_eq!(arg(&frames[0], ROLE_PATIENT), Some(&[1, 2, 3][..]));
        assert_eq!(arg(&frames[0], ROLE_DESTINATION), Some(&[5, 6][..]));

        assert_eq!(frames[1].verb, "close");
        assert_eq!(frames[1].predicate, 9);
        assert_eq!(arg(&frames[1], ROLE_PATIENT), Some(&[10, 11][..]));
    }

    #[test]
    fn test_location_and_particle() {
        let (frames, _) = label("pick up the cup from the table");
        assert_eq!(frames.len(), 1);
        assert_eq!(arg(&frames[0], ROLE_PATIENT), Some(&[2, 3][..]));
        assert_eq!(arg(&frames[0], ROLE_SOURCE), Some(&[5, 6][..]));
    }

    #[test]
    fn test_extent_arguments() {
        let (frames, _) = label("wave 3 times");
        assert_eq!(arg(&frames[0], ROLE_EXTENT), Some(&[1, 2][..]));
        assert!(arg(&frames[0], ROLE_PATIENT).is_none());

        let (frames, _) = label("nod twice");
        assert_eq!(arg(&frames[0], ROLE_EXTENT), Some(&[1][..]));
    }

    #[test]
    fn test_concurrency_marker_is_not_an_argument() {
        let (frames, _) = label("wave at the same time");
        assert!(frames[0].arguments.is_empty());
    }

    #[test]
    fn test_pronoun_argument() {
        let (frames, _) = label("grab it");
        assert_eq!(arg(&frames[0], ROLE_PATIENT), Some(&[1][..]));
    }
}
