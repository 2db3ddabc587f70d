//! Pipeline execution: `synthflow -t <TEXT>` and `synthflow -f <FILE>`.

use anyhow::{Context, Result};
use console::style;
use std::process::ExitCode;

use synthflow::data::InputSource;

use super::super::Cli;

pub fn run_pipeline(cli: &Cli, input: InputSource) -> Result<ExitCode> {
    use synthflow::config::{CliOverrides, RunConfig};
    use synthflow::data::PrePipelineData;
    use synthflow::logging::{Verbosity, init_tracing};
    use synthflow::orchestrator::Orchestrator;
    use synthflow::stages::StageSet;
    use synthflow::ui::{PipelineUI, render_plan};

    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let overrides = CliOverrides {
        config_file: cli.config.clone(),
        target: cli.target.clone(),
        json_logs: cli.json_logs,
    };
    let config = RunConfig::load(input, &project_dir, &overrides)?
        .with_output(cli.output.clone())
        .with_report_json(cli.report_json)
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet));

    if let Err(err) = init_tracing(config.verbosity, config.log_format()) {
        eprintln!("Warning: failed to initialize logging: {err}");
    }
    if let Some(file) = &config.settings_file {
        tracing::debug!(file = %file.display(), "Settings loaded");
    }
    for warning in config.settings.validate() {
        tracing::warn!("{}", warning);
    }

    let orchestrator = Orchestrator::new(&config.input, StageSet::standard(&config.settings))
        .context("Failed to construct the pipeline")?;

    if cli.plan {
        print!("{}", render_plan(&orchestrator.plan()));
        return Ok(ExitCode::SUCCESS);
    }

    let ui = PipelineUI::new(cli.verbose, !config.progress);
    ui.print_header(config.input.kind());

    let data = PrePipelineData::new(config.input.clone());
    let outcome = orchestrator.run(data, &ui);
    ui.finish(&outcome.report);

    if config.report_json {
        let json = serde_json::to_string_pretty(&outcome.report)
            .context("Failed to serialize run report")?;
        println!("{}", json);
    }

    match outcome.result {
        Ok(output) => {
            config.write_output(&output)?;
            if !config.report_json
                && let Some(code) = output.generated_code()
            {
                print!("{}", code);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{} {}", style("Error:").red().bold(), err);
            Ok(ExitCode::FAILURE)
        }
    }
}
