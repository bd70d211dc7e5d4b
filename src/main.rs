use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use promptetheus::config::{Backend, Config};
use promptetheus::error::{FlowError, SlotError};
use promptetheus::evaluation::LlmScorer;
use promptetheus::export::{ExportFormat, Exporter};
use promptetheus::flow::{ComparisonFlow, SingleFlow};
use promptetheus::notify::{ConsoleNotifier, Notifier};
use promptetheus::output::{self, OutputFormat, Report, SortKey};
use promptetheus::scoring::{MockScorer, Scorer};
use promptetheus::slots::{PromptSlots, SlotInput};

/// Prompt quality analyzer - score prompts across ten categories and compare them side by side
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML run file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain", global = true)]
    output: OutputFormat,

    /// Verbose output - log each scoring step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a single prompt
    Evaluate {
        /// Prompt text
        prompt: Option<String>,

        /// Read the prompt from a file instead
        #[arg(short, long, conflicts_with = "prompt")]
        file: Option<PathBuf>,

        /// Save the results as an image or PDF
        #[arg(short, long)]
        export: Option<ExportFormat>,
    },
    /// Score 2 to 5 prompts and pick a winner
    Compare {
        /// Prompt text; appended after the run file's [[prompts]]
        #[arg(short = 'p', long = "prompt")]
        prompts: Vec<String>,

        /// Table row order: input, total, name or a category
        #[arg(short, long, default_value = "input")]
        sort: SortKey,

        /// Save the results as an image or PDF
        #[arg(short, long)]
        export: Option<ExportFormat>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "promptetheus=debug" } else { "promptetheus=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_scorer(config: &Config) -> Result<Arc<dyn Scorer>> {
    match config.scorer.backend {
        Backend::Mock => Ok(Arc::new(MockScorer::new())),
        Backend::Llm => {
            let llm = config
                .llm
                .clone()
                .context("scorer backend \"llm\" requires an [llm] section")?;
            Ok(Arc::new(LlmScorer::new(llm)))
        }
    }
}

/// Validation and slot problems are the caller's to fix; everything else is a runtime failure
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<SlotError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<FlowError>() {
        Some(FlowError::Validation(_)) => 2,
        _ => 1,
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let scorer = build_scorer(&config)?;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let exporter = Exporter::new(&config.export, notifier.clone());
    let latency = config.scorer.latency();

    tracing::debug!(backend = ?config.scorer.backend, latency_ms = config.scorer.latency_ms, "configured scorer");

    match args.command {
        Command::Evaluate {
            prompt,
            file,
            export,
        } => {
            let prompt = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read prompt file: {}", path.display()))?,
                None => prompt.unwrap_or_default(),
            };

            let mut flow = SingleFlow::new(scorer, notifier, latency);
            let result = flow.submit(&prompt).await?;
            output::print_report(Report::Single(result), args.output);

            if let Some(format) = export {
                exporter.export(Report::Single(result), format).await?;
            }
        }
        Command::Compare {
            prompts,
            sort,
            export,
        } => {
            let inputs = config
                .prompts
                .into_iter()
                .map(SlotInput::from)
                .chain(prompts.into_iter().map(|value| SlotInput {
                    value,
                    ..SlotInput::default()
                }));
            let slots = PromptSlots::from_inputs(inputs)?;

            let mut flow = ComparisonFlow::new(scorer, notifier, latency);
            let results = flow.submit(&slots).await?;
            let report = Report::Comparison { results, sort };
            output::print_report(report, args.output);

            if let Some(format) = export {
                exporter.export(report, format).await?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptetheus::error::{ScoreError, ValidationError};
    use promptetheus::flow::Phase;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        let validation: anyhow::Error = FlowError::from(ValidationError::EmptyPrompt).into();
        assert_eq!(exit_code(&validation), 2);

        let slots: anyhow::Error = SlotError::Full { max: 5 }.into();
        assert_eq!(exit_code(&slots), 2);

        let scoring: anyhow::Error =
            FlowError::from(ScoreError::Request("timeout".to_string())).into();
        assert_eq!(exit_code(&scoring), 1);

        let config = anyhow::anyhow!("Failed to parse TOML config");
        assert_eq!(exit_code(&config), 1);
    }

    #[test]
    fn test_args_parse_compare() {
        let args = Args::try_parse_from([
            "promptetheus",
            "--output",
            "json",
            "compare",
            "-p",
            "Summarize.",
            "-p",
            "Summarize in three bullets.",
            "--sort",
            "clarity",
            "--export",
            "pdf",
        ])
        .unwrap();

        assert!(matches!(args.output, OutputFormat::Json));
        match args.command {
            Command::Compare {
                prompts,
                sort,
                export,
            } => {
                assert_eq!(prompts.len(), 2);
                assert_eq!(sort, SortKey::Category(promptetheus::models::Category::Clarity));
                assert_eq!(export, Some(ExportFormat::Pdf));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_args_reject_prompt_and_file_together() {
        let err = Args::try_parse_from(["promptetheus", "evaluate", "text", "--file", "p.txt"]);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_compare_through_library_api() {
        let mut slots = PromptSlots::from_inputs(
            ["Summarize.", "Summarize in three bullets.", "Summarize for a child."]
                .map(|value| SlotInput {
                    value: value.to_string(),
                    ..SlotInput::default()
                }),
        )
        .unwrap();
        assert!(slots.can_remove());
        let third = slots.entries()[2].id;
        slots.remove(third).unwrap();
        assert_eq!(slots.len(), 2);
        assert!(!slots.is_empty());
        let first = slots.entries()[0].id;
        assert!(matches!(slots.remove(first), Err(SlotError::AtMinimum { min: 2 })));

        let mut flow = ComparisonFlow::new(
            Arc::new(MockScorer::new()),
            Arc::new(ConsoleNotifier),
            Duration::ZERO,
        );
        assert_eq!(flow.phase(), Phase::Idle);
        flow.submit(&slots).await.unwrap();

        assert_eq!(flow.phase(), Phase::Complete);
        let results = flow.results().unwrap();
        assert_eq!(results.len(), 2);
        let best = flow.winner().unwrap();
        assert!(results.iter().all(|r| r.total_score() <= best.total_score()));
    }

    #[tokio::test]
    async fn test_evaluate_through_library_api() {
        let mut flow = SingleFlow::new(
            Arc::new(MockScorer::new()),
            Arc::new(ConsoleNotifier),
            Duration::ZERO,
        );
        assert!(flow.submit("   ").await.is_err());
        assert_eq!(flow.phase(), Phase::Idle);
        assert!(flow.result().is_none());

        let total = flow.submit("Write a haiku about rust").await.unwrap().total_score;
        assert_eq!(flow.phase(), Phase::Complete);
        assert_eq!(flow.result().map(|r| r.total_score), Some(total));

        let dir = tempfile::tempdir().unwrap();
        let config = promptetheus::config::ExportConfig {
            directory: dir.path().to_path_buf(),
            background: "#0a0a0f".to_string(),
        };
        let exporter = Exporter::new(&config, Arc::new(ConsoleNotifier));
        let report = Report::Single(flow.result().unwrap());
        let path = exporter.export(report, ExportFormat::Pdf).await.unwrap();
        assert!(path.exists());
        assert!(!exporter.is_exporting());
    }

    #[test]
    fn test_llm_backend_builds_from_config() {
        let config: Config = toml::from_str(
            r#"
[scorer]
backend = "llm"

[llm]
api_endpoint = "http://localhost:1234/v1"
env_var_api_key = "PROMPTETHEUS_TEST_KEY"
model = "test-model"
"#,
        )
        .unwrap();
        assert!(build_scorer(&config).is_ok());

        assert!(build_scorer(&Config::default()).is_ok());
    }
}
