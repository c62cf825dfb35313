use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use designscope_analyzer::{AnalysisEvent, AnalysisOptions, AnalysisOutcome, Analyzer, AnalyzerConfig};
use designscope_common::ErrorReport;
use designscope_core::{assemble_payload, AnalysisPayload, JsonDocument, PayloadLimits};
use designscope_llm::{
    AnalysisResult, AnalysisType, AnthropicClient, CostConfig, CostEstimator, LLMConfig, Priority,
    PromptBuilder, PromptConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Engineering-feasibility analysis for design documents.
///
/// Extracts a bounded structural summary of the selected layers, then asks a
/// language model how hard the design is to build.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. "debug", "designscope_core=trace").
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the structured payload for the selection
    Extract {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the token and cost estimate without calling the model
    Estimate {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Run the full analysis against the messages API
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, default_value = "full")]
        analysis_type: AnalysisType,

        #[arg(long, default_value = "all")]
        priority: Priority,

        /// Overrides ANTHROPIC_API_KEY.
        #[arg(long)]
        api_key: Option<String>,

        /// Overrides DESIGNSCOPE_MODEL.
        #[arg(long)]
        model: Option<String>,

        /// Overrides DESIGNSCOPE_BASE_URL.
        #[arg(long)]
        base_url: Option<String>,

        /// Overrides DESIGNSCOPE_TIMEOUT_SECS.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Design document (JSON export).
    #[arg(short, long)]
    document: PathBuf,

    /// Node ids to analyze. Defaults to the selection stored in the document.
    #[arg(short, long, num_args = 1..)]
    select: Vec<String>,

    /// Skip the rendered snapshots stored in the document.
    #[arg(long)]
    no_images: bool,

    /// Print machine-readable JSON instead of a report.
    #[arg(long)]
    json: bool,
}

impl InputArgs {
    fn load(&self) -> Result<(JsonDocument, Vec<String>)> {
        let doc = JsonDocument::load(&self.document)
            .with_context(|| format!("Failed to load design document {}", self.document.display()))?;
        let selection = if self.select.is_empty() {
            doc.selection().to_vec()
        } else {
            self.select.clone()
        };
        debug!("Selection: {:?}", selection);
        Ok((doc, selection))
    }

    fn images<'d>(&self, doc: &'d JsonDocument) -> &'d [designscope_core::ImageAttachment] {
        if self.no_images {
            &[]
        } else {
            doc.snapshots()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command {
        Command::Extract { input } => extract(&input),
        Command::Estimate { input } => estimate(&input),
        Command::Analyze {
            input,
            analysis_type,
            priority,
            api_key,
            model,
            base_url,
            timeout_secs,
        } => {
            let mut config = LLMConfig::from_env().context("Invalid environment configuration")?;
            if let Some(key) = api_key {
                config.api_key = key;
            }
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(url) = base_url {
                config.base_url = url;
            }
            if let Some(secs) = timeout_secs {
                config.timeout = Duration::from_secs(secs);
            }
            analyze(&input, config, AnalysisOptions { analysis_type, priority }).await
        }
    }
}

fn build_payload(input: &InputArgs) -> Result<AnalysisPayload> {
    let (doc, selection) = input.load()?;
    let payload = assemble_payload(&doc, &selection, input.images(&doc), PayloadLimits::default())
        .context("Extraction failed")?;
    Ok(payload)
}

fn extract(input: &InputArgs) -> Result<()> {
    let payload = build_payload(input)?;
    if input.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{}", "📐 Extracted selection".bold());
    for page in &payload.pages {
        println!("  Page {} ({} root layer(s))", page.name.cyan(), page.nodes.len());
        for root in &page.nodes {
            println!(
                "    {} {} - {} node(s)",
                format!("{:?}", root.kind).dimmed(),
                root.name,
                root.subtree_size()
            );
        }
    }
    println!("  Components:   {}", payload.components.len());
    println!("  Instances:    {}", payload.instances.len());
    println!("  Interactive:  {}", payload.interactions.len());
    println!(
        "  Tokens:       {} color, {} type, {} effect (consistency {:.0}%)",
        payload.styles.colors.len(),
        payload.styles.typography.len(),
        payload.styles.effects.len(),
        payload.styles.usage.consistency_score * 100.0
    );
    println!(
        "  Layout score: {}/10 (depth {}, {} auto-layout, {} responsive)",
        payload.layout.score,
        payload.layout.nesting_depth,
        payload.layout.auto_layout_usage,
        payload.layout.responsive_elements
    );
    Ok(())
}

fn estimate(input: &InputArgs) -> Result<()> {
    let payload = build_payload(input)?;
    let prompts = PromptBuilder::new(PromptConfig::default());
    let estimate = CostEstimator::new(CostConfig::default()).estimate(&payload, prompts.max_images())?;
    let blocks = prompts.build(&payload, AnalysisType::default(), Priority::default())?;

    if input.json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
        return Ok(());
    }

    println!("{}", "💰 Request estimate".bold());
    println!("  Nodes:          {}", payload.node_count());
    println!("  Content blocks: {}", blocks.len());
    println!("  Input tokens:   ~{}", estimate.input_tokens);
    println!("  Output cap:     {}", estimate.output_tokens);
    println!("  Max cost:       ${:.4}", estimate.estimated_cost);
    Ok(())
}

async fn analyze(input: &InputArgs, config: LLMConfig, options: AnalysisOptions) -> Result<()> {
    let (doc, selection) = input.load()?;
    let analyzer_config = AnalyzerConfig {
        timeout: config.timeout,
        cost: CostConfig {
            max_output_tokens: config.max_tokens,
            ..Default::default()
        },
        ..Default::default()
    };
    let client = AnthropicClient::new(config)?;
    let analyzer = Analyzer::new(Arc::new(client), analyzer_config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling request");
            ctrl_c.cancel();
        }
    });

    let (tx, rx) = unbounded_channel();
    let progress = tokio::spawn(print_progress(rx, input.json));

    let outcome = analyzer
        .run(&doc, &selection, input.images(&doc), options, &tx, &cancel)
        .await;
    drop(tx);
    progress.await.ok();

    match outcome {
        Ok(outcome) if input.json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Ok(outcome) => {
            print_report(&outcome);
            Ok(())
        }
        Err(err) => {
            if input.json {
                println!("{}", serde_json::to_string_pretty(&ErrorReport::from(&err))?);
            }
            Err(err).context("Analysis failed")
        }
    }
}

async fn print_progress(mut rx: UnboundedReceiver<AnalysisEvent>, quiet: bool) {
    while let Some(event) = rx.recv().await {
        if quiet {
            continue;
        }
        match event {
            AnalysisEvent::ExtractionStarted { request_id } => {
                eprintln!("{} [#{}] Extracting selection...", "⏳".dimmed(), request_id);
            }
            AnalysisEvent::PayloadReady {
                request_id,
                node_count,
                estimate,
            } => {
                eprintln!(
                    "{} [#{}] Payload ready: {} nodes, ~{} input tokens, up to ${:.4}",
                    "📦".dimmed(),
                    request_id,
                    node_count,
                    estimate.input_tokens,
                    estimate.estimated_cost
                );
                eprintln!("{} [#{}] Waiting for the model...", "🤖".dimmed(), request_id);
            }
            AnalysisEvent::Completed { request_id, .. } => {
                eprintln!("{} [#{}] Done", "✅".green(), request_id);
            }
            AnalysisEvent::Failed { request_id, error } => {
                eprintln!("{} [#{}] {}", "❌".red(), request_id, error.message.red());
            }
        }
    }
}

fn print_report(outcome: &AnalysisOutcome) {
    let AnalysisResult {
        feasibility,
        effort,
        coordination,
        recommendations,
        risks,
        confidence,
    } = &outcome.result;

    println!();
    println!("{}", "🔍 Feasibility".bold());
    println!("  Score: {}/10", score_colored(feasibility.score));
    println!("  {}", feasibility.technical);
    print_list("Challenges", &feasibility.challenges);
    print_list("Alternatives", &feasibility.alternatives);

    println!();
    println!("{}", "⏱  Effort".bold());
    println!(
        "  {} hours, {} story points, {} complexity",
        effort.hours, effort.story_points, effort.complexity
    );
    for item in &effort.breakdown {
        println!("    - {} ({}h)", item.task, item.hours);
    }

    println!();
    println!("{}", "🤝 Coordination".bold());
    println!("  Timeline: {}", coordination.timeline);
    print_list("Teams", &coordination.teams);
    print_list("Dependencies", &coordination.dependencies);
    print_list("Critical path", &coordination.critical_path);

    if !recommendations.is_empty() {
        println!();
        println!("{}", "💡 Recommendations".bold());
        for rec in recommendations {
            println!("  [{}] {}: {}", rec.priority.yellow(), rec.title.bold(), rec.description);
        }
    }

    if !risks.is_empty() {
        println!();
        println!("{}", "⚠️  Risks".bold());
        for risk in risks {
            println!("  [{}] {}", risk.severity.red(), risk.title.bold());
            if !risk.mitigation.is_empty() {
                println!("      mitigation: {}", risk.mitigation);
            }
        }
    }

    println!();
    println!("Confidence: {:.0}%", confidence * 100.0);
    match &outcome.actual {
        Some(actual) => println!(
            "Cost: ${:.4} ({} in / {} out tokens)",
            actual.estimated_cost, actual.input_tokens, actual.output_tokens
        ),
        None => println!("Cost: up to ${:.4} (estimated)", outcome.estimate.estimated_cost),
    }
}

fn print_list(label: &str, items: &[String]) {
    if !items.is_empty() {
        println!("  {}: {}", label, items.join(", "));
    }
}

fn score_colored(score: f64) -> colored::ColoredString {
    let text = format!("{}", score);
    if score >= 7.0 {
        text.green()
    } else if score >= 4.0 {
        text.yellow()
    } else {
        text.red()
    }
}
