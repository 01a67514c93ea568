//! Veracity CLI
//!
//! Command-line interface for scoring and correcting AI responses.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate a response against a ruleset
//! veracity evaluate --query "Is my deposit insured?" --response answer.txt --ruleset finance.yaml
//!
//! # Pipe from stdin, verify claims against a fact table, JSON output
//! cat answer.txt | veracity evaluate -q "rates?" --facts facts.json --format json
//!
//! # Rewrite a response that contradicts a policy
//! echo "we never guarantee returns" | veracity correct --rule-text "Always disclose risk"
//!
//! # Validate a ruleset
//! veracity ruleset validate finance.yaml
//! ```
//!
//! ## Exit Codes
//!
//! - 0: APPROVED
//! - 1: FLAGGED
//! - 2: BLOCKED
//! - 3: Error

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use veracity_core::{
    correct, correct_all, CorrectionResult, DetectionResult, EvaluationContext, Ruleset,
    Severity, Status, Violation, ViolationDetail, ViolationKind,
};
use veracity_runtime::{HttpCitationValidator, KnowledgeBaseVerifier, Orchestrator, RuntimeConfig};

/// Veracity: hallucination and compliance scoring for AI responses
#[derive(Parser)]
#[command(name = "veracity")]
#[command(version)]
#[command(about = "Score AI responses for hallucination and compliance risk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a response
    Evaluate {
        /// The query the response answers
        #[arg(short, long)]
        query: String,

        /// Path to the response text (reads from stdin if not provided)
        #[arg(short, long)]
        response: Option<PathBuf>,

        /// Compliance rules and policies (YAML or JSON)
        #[arg(long)]
        ruleset: Option<PathBuf>,

        /// Earlier responses in this conversation, as a JSON array of strings
        #[arg(long)]
        history: Option<PathBuf>,

        /// Fact table used to verify claims (JSON)
        #[arg(long)]
        facts: Option<PathBuf>,

        /// Runtime configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Show the confidence breakdown and explanation
        #[arg(long)]
        explain: bool,

        /// Also print a corrected response
        #[arg(long)]
        correct: bool,

        /// Fetch cited URLs instead of only checking their syntax
        #[arg(long)]
        check_urls: bool,

        /// Explicit timestamp for deterministic evaluation (RFC 3339).
        /// Example: --evaluated-at 2025-12-20T00:00:00Z
        #[arg(long, value_parser = parse_datetime)]
        evaluated_at: Option<DateTime<Utc>>,
    },

    /// Correct a response against a single rule or policy text
    Correct {
        /// Text of the rule or policy the response must follow
        #[arg(long)]
        rule_text: String,

        /// Kind of violation being corrected
        #[arg(long, default_value = "policy")]
        kind: CorrectableKind,

        /// Path to the response text (reads from stdin if not provided)
        #[arg(short, long)]
        response: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Ruleset management commands
    Ruleset {
        #[command(subcommand)]
        action: RulesetAction,
    },
}

#[derive(Subcommand)]
enum RulesetAction {
    /// Validate a ruleset file
    Validate {
        /// Path to the ruleset file
        path: PathBuf,
    },

    /// Show ruleset details
    Show {
        /// Path to the ruleset file
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum CorrectableKind {
    Policy,
    Compliance,
}

impl From<CorrectableKind> for ViolationKind {
    fn from(kind: CorrectableKind) -> Self {
        match kind {
            CorrectableKind::Policy => ViolationKind::Policy,
            CorrectableKind::Compliance => ViolationKind::Compliance,
        }
    }
}

/// Parse an RFC 3339 datetime string to DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid datetime format: {}. Expected RFC 3339 (e.g., 2025-12-20T00:00:00Z)", e))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(3)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            query,
            response,
            ruleset,
            history,
            facts,
            config,
            format,
            explain,
            correct,
            check_urls,
            evaluated_at,
        } => {
            let options = EvaluateOptions {
                ruleset,
                history,
                facts,
                config,
                format,
                explain,
                correct,
                check_urls,
                evaluated_at,
            };
            evaluate_command(&query, response, options).await
        }

        Commands::Correct {
            rule_text,
            kind,
            response,
            format,
        } => correct_command(&rule_text, kind, response, format),

        Commands::Ruleset { action } => match action {
            RulesetAction::Validate { path } => validate_ruleset(&path),
            RulesetAction::Show { path } => show_ruleset(&path),
        },
    }
}

struct EvaluateOptions {
    ruleset: Option<PathBuf>,
    history: Option<PathBuf>,
    facts: Option<PathBuf>,
    config: Option<PathBuf>,
    format: OutputFormat,
    explain: bool,
    correct: bool,
    check_urls: bool,
    evaluated_at: Option<DateTime<Utc>>,
}

async fn evaluate_command(
    query: &str,
    response_path: Option<PathBuf>,
    options: EvaluateOptions,
) -> Result<ExitCode> {
    let mut config = match &options.config {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => RuntimeConfig::default(),
    };
    // An explicit timestamp overrides the configured one
    if let Some(timestamp) = options.evaluated_at {
        config.determinism.evaluated_at = Some(timestamp);
    }

    let ruleset = match &options.ruleset {
        Some(path) => load_ruleset(path)?,
        None => Ruleset::empty("default"),
    };
    for warning in ruleset.warnings() {
        tracing::warn!(ruleset = %ruleset.name, "{}", warning);
    }

    let history: Vec<String> = match &options.history {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read history from {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("History in {:?} must be a JSON array of strings", path))?
        }
        None => Vec::new(),
    };

    let mut builder = Orchestrator::builder().config(config);
    if let Some(path) = &options.facts {
        let verifier = KnowledgeBaseVerifier::from_json_file(path)
            .with_context(|| format!("Failed to load facts from {:?}", path))?;
        builder = builder.verifier(Arc::new(verifier));
    }
    if options.check_urls {
        let validator =
            HttpCitationValidator::new().context("Failed to set up citation validator")?;
        builder = builder.citation_validator(Arc::new(validator));
    }
    let orchestrator = builder.build().context("Failed to build orchestrator")?;

    let response = read_input(response_path)?;
    let context = EvaluationContext::new()
        .with_ruleset(ruleset)
        .with_history(history);

    let result = orchestrator
        .evaluate(query, &response, &context)
        .await
        .context("Evaluation failed")?;

    let correction = if options.correct {
        Some(correct_all(&response, result.correctable_violations()))
    } else {
        None
    };

    match options.format {
        OutputFormat::Json => {
            let json = match &correction {
                Some(correction) => serde_json::to_string_pretty(&serde_json::json!({
                    "result": result,
                    "correction": correction,
                }))?,
                None => serde_json::to_string_pretty(&result)?,
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            print_text_result(&result, options.explain);
            if let Some(correction) = &correction {
                println!();
                print_correction(correction);
            }
        }
    }

    // Return appropriate exit code
    Ok(match result.status {
        Status::Approved => ExitCode::from(0),
        Status::Flagged => ExitCode::from(1),
        Status::Blocked => ExitCode::from(2),
    })
}

fn print_text_result(result: &DetectionResult, explain: bool) {
    println!("{}", result.status.as_str().to_uppercase());
    println!();
    println!("Confidence: {:.0}%", result.confidence_score * 100.0);
    println!("Decided by: {}", result.decided_by);

    if !result.violations.is_empty() {
        println!();
        println!("Violations:");
        for (i, v) in result.violations.iter().enumerate() {
            println!("  {}. [{}] {}: {}", i + 1, v.severity, v.kind, v.description);
        }
    }

    if !result.degradations.is_empty() {
        println!();
        println!("Degraded:");
        for d in &result.degradations {
            println!("  - {}: {}", d.component, d.message);
        }
    }

    if explain {
        println!();
        println!("--- Confidence Breakdown ---");
        println!();

        for component in result.breakdown.components.values() {
            match component.score {
                Some(score) => println!(
                    "{}: {:.0}% (weight {:.0}%, effective {:.1}%)",
                    component.label,
                    score * 100.0,
                    component.weight * 100.0,
                    component.effective_weight * 100.0
                ),
                None => println!(
                    "{}: not scored ({})",
                    component.label,
                    component.unscored_reason.as_deref().unwrap_or("unknown")
                ),
            }
        }

        let contributions = &result.breakdown.contributions;
        if !contributions.positive_factors.is_empty() {
            println!();
            println!("Positive factors:");
            for factor in &contributions.positive_factors {
                println!("  + {}", factor);
            }
        }
        if !contributions.negative_factors.is_empty() {
            println!();
            println!("Negative factors:");
            for factor in &contributions.negative_factors {
                println!("  - {}", factor);
            }
        }

        println!();
        println!("{}", result.explanation);
    }
}

fn print_correction(correction: &CorrectionResult) {
    if !correction.changed {
        println!("No correction needed.");
        return;
    }
    println!("Corrected response:");
    println!();
    println!("{}", correction.corrected);
    println!();
    println!("Changes:");
    for change in &correction.changes {
        println!("  - {}", change);
    }
}

fn correct_command(
    rule_text: &str,
    kind: CorrectableKind,
    response_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let response = read_input(response_path)?;
    let violation = Violation::new(kind.into(), Severity::Medium, "Response conflicts with rule")
        .with_detail(ViolationDetail {
            rule_text: Some(rule_text.to_string()),
            ..Default::default()
        });

    let correction = correct(&response, &violation);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&correction)?),
        OutputFormat::Text => print_correction(&correction),
    }

    Ok(ExitCode::from(0))
}

fn read_input(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read response from {:?}", path)),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

fn load_ruleset(path: &Path) -> Result<Ruleset> {
    Ruleset::from_file(path).with_context(|| format!("Failed to load ruleset from {:?}", path))
}

fn validate_ruleset(path: &Path) -> Result<ExitCode> {
    match Ruleset::from_file(path) {
        Ok(ruleset) => {
            println!("Ruleset is valid: {}", ruleset.name);
            println!();
            println!("Version: {}", ruleset.version);
            println!("Compliance rules: {}", ruleset.compliance_rules.len());
            println!("Policies: {}", ruleset.policies.len());
            for warning in ruleset.warnings() {
                println!("Warning: {}", warning);
            }
            Ok(ExitCode::from(0))
        }
        Err(e) => {
            eprintln!("Ruleset validation failed: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

fn show_ruleset(path: &Path) -> Result<ExitCode> {
    let ruleset = load_ruleset(path)?;

    println!("Ruleset: {}", ruleset.name);
    println!("Version: {}", ruleset.version);
    if let Some(description) = &ruleset.description {
        println!("Description: {}", description);
    }
    println!();

    println!("Compliance rules:");
    for rule in &ruleset.compliance_rules {
        println!(
            "  {} {} [{}] {:?}/{:?}{}",
            rule.id,
            rule.name,
            rule.severity,
            rule.rule_type,
            rule.action,
            if rule.active { "" } else { " (inactive)" }
        );
    }
    println!();

    println!("Policies:");
    for policy in &ruleset.policies {
        println!(
            "  {} {} ({}){}",
            policy.id,
            policy.name,
            policy.category,
            if policy.active { "" } else { " (inactive)" }
        );
    }

    Ok(ExitCode::from(0))
}
