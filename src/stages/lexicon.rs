//! Word lists and morphology shared by the reference stages.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Verbs the robot knows how to execute.
pub const ACTION_VERBS: &[&str] = &[
    "bring", "carry", "check", "clean", "close", "cut", "drop", "empty", "fetch", "fill",
    "find", "follow", "give", "go", "grab", "grasp", "hand", "hold", "lift", "look", "lower",
    "make", "move", "nod", "open", "pick", "place", "point", "pour", "prepare", "press", "pull",
    "push", "put", "raise", "release", "return", "rotate", "say", "serve", "set", "shake",
    "speak", "start", "stir", "stop", "switch", "take", "turn", "wait", "walk", "wash", "wave",
    "wipe",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("brought", "bring"),
    ("gave", "give"),
    ("given", "give"),
    ("went", "go"),
    ("gone", "go"),
    ("held", "hold"),
    ("made", "make"),
    ("said", "say"),
    ("spoke", "speak"),
    ("shook", "shake"),
    ("took", "take"),
    ("taken", "take"),
    ("found", "find"),
];

pub const DETERMINERS: &[&str] = &[
    "a", "all", "an", "another", "any", "both", "each", "every", "some", "that", "the", "these",
    "this", "those",
];

pub const POSSESSIVES: &[&str] = &["his", "its", "my", "our", "their", "your"];

pub const PRONOUNS: &[&str] = &[
    "he", "her", "him", "i", "it", "itself", "me", "she", "them", "they", "us", "we", "you",
];

/// Pronouns that can be resolved to an earlier entity.
pub const REFERRING_PRONOUNS: &[&str] = &["her", "him", "it", "itself", "them", "they"];

pub const PREPOSITIONS: &[&str] = &[
    "above", "across", "at", "behind", "below", "beside", "by", "for", "from", "in", "inside",
    "into", "near", "next", "of", "off", "on", "onto", "out", "over", "through", "toward",
    "towards", "under", "up", "down", "with", "away", "back",
];

/// Prepositions introducing a destination argument.
pub const DESTINATION_PREPOSITIONS: &[&str] = &["into", "onto", "to", "toward", "towards"];

/// Prepositions that attach to the verb when directly following it.
pub const PARTICLES: &[&str] = &["away", "back", "down", "off", "out", "up"];

pub const CONJUNCTIONS: &[&str] = &["and", "but", "or"];

/// Words opening a condition clause.
pub const CONDITION_WORDS: &[&str] = &["if", "unless", "when", "whenever"];

/// Words opening a loop condition clause.
pub const LOOP_WORDS: &[&str] = &["until", "while"];

/// Words opening the alternative branch of a condition.
pub const ELSE_WORDS: &[&str] = &["else", "otherwise"];

pub const ADVERBS: &[&str] = &[
    "afterwards", "again", "also", "carefully", "concurrently", "else", "finally", "first",
    "meanwhile", "not", "now", "once", "otherwise", "quickly", "simultaneously", "slowly",
    "then", "thrice", "twice",
];

pub const COPULAS: &[&str] = &["am", "are", "be", "is", "was", "were"];

pub const ADJECTIVES: &[&str] = &[
    "big", "black", "blue", "bottom", "cold", "dirty", "full", "green", "hot", "large", "left",
    "little", "new", "old", "red", "right", "same", "small", "top", "white", "yellow",
];

pub const MODALS: &[&str] = &["can", "could", "must", "should", "will", "would"];

/// Gazetteer of manipulable objects.
pub const OBJECTS: &[&str] = &[
    "arm", "ball", "bottle", "bowl", "box", "coffee", "cup", "dish", "door", "drawer", "fork",
    "fridge", "glass", "gripper", "hand", "head", "juice", "knife", "lid", "light", "milk",
    "mug", "plate", "robot", "spoon", "tea", "water", "window",
];

/// Gazetteer of places.
pub const LOCATIONS: &[&str] = &[
    "counter", "corner", "dishwasher", "home", "kitchen", "location", "place", "position",
    "room", "shelf", "sink", "table", "wall",
];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
];

/// Adverbs that repeat the preceding action a fixed number of times.
pub const REPETITION_ADVERBS: &[(&str, u32)] = &[("twice", 2), ("thrice", 3)];

/// Multi-word markers of concurrent execution.
pub const CONCURRENCY_MARKERS: &[&[&str]] = &[
    &["simultaneously"],
    &["concurrently"],
    &["meanwhile"],
    &["at", "the", "same", "time"],
    &["in", "parallel"],
];

/// Words that never head a predicate even when tagged as verbs.
const NON_PREDICATES: &[&str] = &[
    "am", "are", "be", "do", "does", "is", "mean", "means", "was", "were",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

static ACTION_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ACTION_VERBS.iter().copied().collect());

static IRREGULAR_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| IRREGULAR.iter().copied().collect());

pub fn is_action_verb(lemma: &str) -> bool {
    ACTION_SET.contains(lemma)
}

pub fn contains(list: &[&str], word: &str) -> bool {
    list.contains(&word)
}

pub fn is_sentence_end(word: &str) -> bool {
    matches!(word, "." | "!" | "?" | ";")
}

/// Value of a cardinal written as digits or as a word.
pub fn number_value(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse::<u32>() {
        return Some(n);
    }
    let lower = word.to_lowercase();
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| *w == lower)
        .map(|(_, n)| *n)
}

pub fn repetition_count(word: &str) -> Option<u32> {
    REPETITION_ADVERBS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, n)| *n)
}

/// Whether a tagged word heads a predicate.
pub fn is_predicate(pos: Option<&str>, lower: &str) -> bool {
    pos.is_some_and(|p| p.starts_with("VB")) && !NON_PREDICATES.contains(&lower)
}

/// Length of the concurrency marker starting at `index`, if any.
pub fn concurrency_marker_at<S: AsRef<str>>(words: &[S], index: usize) -> Option<usize> {
    CONCURRENCY_MARKERS.iter().find_map(|marker| {
        let end = index + marker.len();
        (end <= words.len()
            && marker
                .iter()
                .zip(&words[index..end])
                .all(|(m, w)| *m == w.as_ref()))
        .then_some(marker.len())
    })
}

/// Verb lemma for inflected action verbs, singular for plural nouns.
pub fn lemma(word: &str) -> String {
    let lower = word.to_lowercase();
    if is_action_verb(&lower) {
        return lower;
    }
    if let Some(base) = IRREGULAR_MAP.get(lower.as_str()) {
        return base.to_string();
    }
    if let Some(base) = verb_stem(&lower) {
        return base;
    }
    noun_singular(&lower)
}

fn verb_stem(lower: &str) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(stem) = lower.strip_suffix("ies") {
        candidates.push(format!("{stem}y"));
    }
    if let Some(stem) = lower.strip_suffix("es") {
        candidates.push(stem.to_string());
    }
    if let Some(stem) = lower.strip_suffix('s') {
        candidates.push(stem.to_string());
    }
    for suffix in ["ing", "ed"] {
        if let Some(stem) = lower.strip_suffix(suffix) {
            candidates.push(stem.to_string());
            candidates.push(format!("{stem}e"));
            let mut chars = stem.chars();
            if let (Some(last), Some(prev)) = (chars.next_back(), chars.next_back())
                && last == prev
            {
                candidates.push(stem[..stem.len() - last.len_utf8()].to_string());
            }
        }
    }
    candidates.into_iter().find(|c| is_action_verb(c))
}

fn noun_singular(lower: &str) -> String {
    for suffix in ["sses", "shes", "ches", "xes"] {
        if lower.ends_with(suffix) {
            return lower[..lower.len() - 2].to_string();
        }
    }
    if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
        return lower[..lower.len() - 1].to_string();
    }
    lower.to_string()
}

/// Inflection class of an action verb form: `VB`, `VBZ`, `VBG` or `VBD`.
pub fn verb_form(lower: &str) -> &'static str {
    if is_action_verb(lower) {
        "VB"
    } else if IRREGULAR_MAP.contains_key(lower) || lower.ends_with("ed") {
        "VBD"
    } else if lower.ends_with("ing") {
        "VBG"
    } else {
        "VBZ"
    }
}

/// Join words into a lower camel-case identifier (`make coffee` -> `makeCoffee`).
pub fn camel_case<S: AsRef<str>>(words: &[S]) -> String {
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        let clean: String = word
            .as_ref()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let mut chars = clean.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.extend(chars.flat_map(char::to_lowercase));
        }
    }
    out
}

/// Make a word usable as a Python identifier.
pub fn python_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if PYTHON_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lemma_inflections() {
        assert_eq!(lemma("Moves"), "move");
        assert_eq!(lemma("moving"), "move");
        assert_eq!(lemma("grabbed"), "grab");
        assert_eq!(lemma("putting"), "put");
        assert_eq!(lemma("took"), "take");
        assert_eq!(lemma("pushes"), "push");
        assert_eq!(lemma("cups"), "cup");
        assert_eq!(lemma("glasses"), "glass");
        assert_eq!(lemma("gripper"), "gripper");
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value("3"), Some(3));
        assert_eq!(number_value("Three"), Some(3));
        assert_eq!(number_value("many"), None);
    }

    #[test]
    fn test_concurrency_marker_at() {
        let words = ["wave", "at", "the", "same", "time", "."];
        assert_eq!(concurrency_marker_at(&words, 1), Some(4));
        assert_eq!(concurrency_marker_at(&words, 0), None);
        assert_eq!(concurrency_marker_at(&["in"], 0), None);
    }

    #[test]
    fn test_is_predicate() {
        assert!(is_predicate(Some("VB"), "move"));
        assert!(is_predicate(Some("VBZ"), "moves"));
        assert!(!is_predicate(Some("VBZ"), "means"));
        assert!(!is_predicate(Some("NN"), "turn"));
        assert!(!is_predicate(None, "move"));
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case(&["make", "coffee"]), "makeCoffee");
        assert_eq!(camel_case(&["Set", "the", "TABLE"]), "setTheTable");
        assert_eq!(camel_case::<&str>(&[]), "");
    }

    #[test]
    fn test_python_identifier() {
        assert_eq!(python_identifier("move"), "move");
        assert_eq!(python_identifier("return"), "return_");
        assert_eq!(python_identifier("pick-up"), "pick_up");
        assert_eq!(python_identifier("3d"), "_3d");
    }
}
