use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::data::InputKind;
use crate::orchestrator::RunReport;
use crate::phase::{PhaseKind, PhasePlan, PhaseSummary, StageObserver, StageOutcome};
use crate::ui::icons::{CHECK, CLOCK, CROSS, MICROPHONE, RUNNING, SKIPPED, SPARKLE, TEXT};

/// Terminal UI for a pipeline run, rendered via `indicatif` progress bars.
///
/// Two bars are stacked vertically:
/// - Phase bar: stages completed within the current phase
/// - Stage spinner: the stage currently executing
///
/// Everything is drawn on stderr so generated code on stdout stays clean.
pub struct PipelineUI {
    multi: MultiProgress,
    phase_bar: ProgressBar,
    stage_bar: ProgressBar,
    verbose: bool,
}

impl PipelineUI {
    /// Create the UI and add both bars to the multiplex renderer.
    ///
    /// A hidden UI swallows all output; used with `--quiet`.
    pub fn new(verbose: bool, hidden: bool) -> Self {
        let target = if hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let multi = MultiProgress::with_draw_target(target);

        let phase_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let phase_bar = multi.add(ProgressBar::new(0));
        phase_bar.set_style(phase_style);
        phase_bar.set_prefix(" Phase");

        let stage_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let stage_bar = multi.add(ProgressBar::new_spinner());
        stage_bar.set_style(stage_style);
        stage_bar.set_prefix(" Stage");

        Self {
            multi,
            phase_bar,
            stage_bar,
            verbose,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!`.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() {
            return;
        }
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Print the header shown before initialization.
    pub fn print_header(&self, input: InputKind) {
        let icon = match input {
            InputKind::Text => TEXT,
            InputKind::Audio => MICROPHONE,
        };
        self.print_line(format!(
            "{} {} {} input",
            icon,
            style("synthflow").bold(),
            style(input).cyan()
        ));
    }

    /// Print the closing banner with timings.
    pub fn finish(&self, report: &RunReport) {
        self.stage_bar.finish_and_clear();
        self.phase_bar.finish_and_clear();

        let timing = format!(
            "{} init {} ms, run {} ms",
            CLOCK,
            report.init_duration.as_millis(),
            report.duration.as_millis()
        );
        if report.success {
            self.print_line(format!(
                "{} {} ({} stages) {}",
                SPARKLE,
                style("Run complete").green().bold(),
                report.stages_run(),
                style(timing).dim()
            ));
        } else {
            let reason = report.error.as_deref().unwrap_or("unknown error");
            self.print_line(format!(
                "{} {} {} {}",
                CROSS,
                style(format!("Run {}:", report.final_state)).red().bold(),
                reason,
                style(timing).dim()
            ));
        }
    }
}

/// Plain-text stage table of each phase, one stage per line.
pub fn render_plan(plan: &[PhasePlan]) -> String {
    let mut out = String::new();
    for phase in plan {
        let seed: Vec<String> = phase.seed.iter().map(|c| c.to_string()).collect();
        out.push_str(&format!(
            "{} ({} stages, seeded with {})\n",
            phase.phase.label(),
            phase.stages.len(),
            seed.join(", ")
        ));
        for (position, stage) in phase.stages.iter().enumerate() {
            out.push_str(&format!("  {:>2}. {}\n", position + 1, stage.name));
        }
    }
    out
}

impl StageObserver for PipelineUI {
    fn phase_started(&self, phase: PhaseKind, total_stages: usize) {
        self.phase_bar.reset();
        self.phase_bar.set_length(total_stages as u64);
        self.phase_bar
            .set_message(format!("{}", style(phase.label()).yellow()));
        self.stage_bar.reset();
        self.stage_bar
            .enable_steady_tick(Duration::from_millis(100));
    }

    fn stage_started(&self, _phase: PhaseKind, stage: &str, position: usize) {
        self.stage_bar.set_message(format!(
            "{} {}",
            style(stage).cyan(),
            style(format!("(#{})", position + 1)).dim()
        ));
        if self.verbose {
            self.print_line(format!("    {} {}", RUNNING, style(stage).dim()));
        }
    }

    fn stage_finished(&self, _phase: PhaseKind, outcome: &StageOutcome) {
        if outcome.success {
            self.phase_bar.inc(1);
            if self.verbose {
                self.print_line(format!(
                    "    {} {} {}",
                    CHECK,
                    outcome.stage,
                    style(format!("{} ms", outcome.duration.as_millis())).dim()
                ));
            }
        } else {
            self.print_line(format!(
                "    {} {}: {}",
                CROSS,
                style(&outcome.stage).red().bold(),
                outcome.error.as_deref().unwrap_or("failed")
            ));
        }
    }

    fn phase_finished(&self, summary: &PhaseSummary) {
        self.stage_bar.finish_and_clear();
        let label = summary.phase.label();
        if summary.all_success() {
            self.print_line(format!(
                "{} {} {}",
                CHECK,
                style(label).green().bold(),
                style(format!(
                    "{} stages in {} ms",
                    summary.completed(),
                    summary.duration.as_millis()
                ))
                .dim()
            ));
        } else {
            self.print_line(format!(
                "{} {} failed",
                CROSS,
                style(label).red().bold()
            ));
            if summary.skipped() > 0 {
                self.print_line(format!(
                    "    {} {} stages not run",
                    SKIPPED,
                    summary.skipped()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_ui_accepts_all_events() {
        let ui = PipelineUI::new(true, true);
        ui.print_header(InputKind::Text);
        ui.phase_started(PhaseKind::AgentAnalysis, 2);
        ui.stage_started(PhaseKind::AgentAnalysis, "wsd", 0);
        ui.stage_finished(
            PhaseKind::AgentAnalysis,
            &StageOutcome::success("wsd", 0, Duration::from_millis(3)),
        );
        ui.stage_finished(
            PhaseKind::AgentAnalysis,
            &StageOutcome::failure("action-recognizer", 1, "boom", Duration::ZERO),
        );
        let mut summary = PhaseSummary::new(PhaseKind::AgentAnalysis, 2);
        summary.add_outcome(StageOutcome::success("wsd", 0, Duration::ZERO));
        ui.phase_finished(&summary);
        assert_eq!(ui.phase_bar.position(), 1);
        ui.finish(&RunReport::new(InputKind::Text));
    }

    #[test]
    fn test_render_plan_lists_stages_in_order() {
        use crate::data::Capability;
        use crate::stage::StageDescriptor;

        const A: StageDescriptor = StageDescriptor::new("ner", &[], &[]);
        const B: StageDescriptor = StageDescriptor::new("srl", &[], &[]);
        let plan = vec![PhasePlan {
            phase: PhaseKind::PreProcessing,
            seed: vec![Capability::MainHypothesis],
            stages: vec![A, B],
        }];
        let text = render_plan(&plan);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Pre-processing (2 stages"));
        assert_eq!(lines[1], "   1. ner");
        assert_eq!(lines[2], "   2. srl");
    }
}
