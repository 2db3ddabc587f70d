//! Pre-processing stages: from raw input to the semantic graph.

mod graph_builder;
mod ner;
mod shallow_nlp;
mod srl;
mod transcription;

pub use graph_builder::{GraphBuilder, ROLE_VERB};
pub use ner::{LOCATION, NAMED, NUMBER, Ner, OBJECT};
pub use shallow_nlp::ShallowNlp;
pub use srl::{
    ROLE_DESTINATION, ROLE_EXTENT, ROLE_INSTRUMENT, ROLE_LOCATION, ROLE_PATIENT, ROLE_SOURCE, Srl,
};
pub use transcription::Transcription;
