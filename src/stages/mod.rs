//! The reference stage set: deterministic, rule-based implementations of
//! every stage a run needs.

pub mod agents;
pub mod lexicon;
pub mod post;
pub mod pre;

use crate::data::{Graph, PostPipelineData, PrePipelineData};
use crate::settings::Settings;
use crate::stage::Stage;

use agents::{
    ActionRecognizer, ConcurrencyDetector, ConditionDetector, ContextAnalyzer, CorefAnalyzer,
    LoopDetector, MethodSynthesizer, TeachingDetector, Wsd,
};
use post::{AstExtractor, AstSynthesizer, CodeGenerator, CodeInjector};
use pre::{GraphBuilder, Ner, ShallowNlp, Srl, Transcription};

/// The stages of a run, grouped by phase and listed in execution order.
///
/// `transcription` is only used for audio input; `pre` holds the text path
/// that follows it.
pub struct StageSet {
    pub transcription: Box<dyn Stage<PrePipelineData>>,
    pub pre: Vec<Box<dyn Stage<PrePipelineData>>>,
    pub agents: Vec<Box<dyn Stage<Graph>>>,
    pub post: Vec<Box<dyn Stage<PostPipelineData>>>,
}

impl StageSet {
    /// The reference stages, configured from `settings`.
    pub fn standard(settings: &Settings) -> Self {
        Self {
            transcription: Box::new(Transcription::new(settings.asr.clone())),
            pre: vec![
                Box::new(ShallowNlp::new()),
                Box::new(Ner::new()),
                Box::new(Srl::new()),
                Box::new(GraphBuilder::new()),
            ],
            agents: vec![
                Box::new(Wsd::new()),
                Box::new(ActionRecognizer::new()),
                Box::new(TeachingDetector::new()),
                Box::new(ContextAnalyzer::new()),
                Box::new(CorefAnalyzer::new()),
                Box::new(ConditionDetector::new()),
                Box::new(LoopDetector::new()),
                Box::new(ConcurrencyDetector::new()),
                Box::new(MethodSynthesizer::new(
                    settings.synthesis.method_name.clone(),
                )),
            ],
            post: vec![
                Box::new(AstSynthesizer::new()),
                Box::new(AstExtractor::new()),
                Box::new(CodeGenerator::new(settings.synthesis.receiver.clone())),
                Box::new(CodeInjector::new(settings.injection.clone())),
            ],
        }
    }
}
