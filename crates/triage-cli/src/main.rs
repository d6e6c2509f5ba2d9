// Triage CLI - incident extraction, log correlation and remediation suggestions

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;
use tracing::warn;

use triage_core::{join_labels, truncate_chars, Category, CorrelationVerdict, IncidentCase, RetrievalResult};
use triage_rag::classifier::Classification;
use triage_rag::correlator::find_hits;
use triage_rag::knowledge::{load_incident_records, save_incident_records};
use triage_rag::pipeline::{document_for, CaseOutcome, PipelineReport};
use triage_rag::{
    load_config, setup, DocumentExtractor, EnvSecrets, IngestReport, LogCorrelator, TriageConfig,
};

const DEFAULT_CONFIG: &str = "config/triage.toml";

#[derive(Parser)]
#[command(name = "triage")]
#[command(version = "0.1.0")]
#[command(about = "AI-assisted incident triage", long_about = None)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, global = true, env = "TRIAGE_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on a document
    Run {
        /// PDF or text document
        file: PathBuf,

        /// Override the content type inferred from the extension
        #[arg(short = 't', long)]
        content_type: Option<String>,
    },

    /// Extract incident cases from a document
    Extract {
        file: PathBuf,

        #[arg(short = 't', long)]
        content_type: Option<String>,
    },

    /// Check whether an incident refers to events in its category's logs
    Correlate {
        /// Category label (CNTR, VS, EA, ...)
        #[arg(long)]
        category: String,

        /// Incident description
        #[arg(short, long, required_unless_present = "hits")]
        text: Option<String>,

        /// Log directory (default: from config)
        #[arg(short, long)]
        log_dir: Option<PathBuf>,

        /// Only list log lines matching the category hints and signals
        #[arg(long)]
        hits: bool,

        /// Identifier-like signal to search for (repeatable)
        #[arg(short, long = "signal")]
        signals: Vec<String>,
    },

    /// Ask for remediation suggestions
    Suggest {
        /// Issue description
        query: String,
    },

    /// Build or refresh the knowledge index
    Ingest,

    /// Categorize an incident text, or every record of an incident log
    Categorize {
        /// Incident text
        #[arg(required_unless_present = "records", conflicts_with = "records")]
        text: Option<String>,

        /// Incident log (JSON array of records)
        #[arg(long, requires = "out")]
        records: Option<PathBuf>,

        /// Where to write the categorized records
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logs go to stderr so --json output stays clean
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let secrets = EnvSecrets::load();
    let config = read_config(&cli.config)?;

    match cli.command {
        Commands::Run { file, content_type } => {
            run_pipeline(&config, &secrets, &file, content_type, cli.json).await?;
        }
        Commands::Extract { file, content_type } => {
            extract_cases(&config, &secrets, &file, content_type, cli.json).await?;
        }
        Commands::Correlate {
            category,
            text,
            log_dir,
            hits,
            signals,
        } => match (hits, text) {
            (true, _) => {
                log_hits(&config, &category, &signals, log_dir, cli.json).await?;
            }
            (false, Some(text)) => {
                correlate(&config, &secrets, &category, &text, log_dir, cli.json).await?;
            }
            (false, None) => return Err("correlate needs --text unless --hits is given".into()),
        },
        Commands::Suggest { query } => {
            suggest(&config, &secrets, &query, cli.json).await?;
        }
        Commands::Ingest => {
            ingest(&config, &secrets, cli.json).await?;
        }
        Commands::Categorize { text, records, out } => match (text, records, out) {
            (_, Some(records), Some(out)) => {
                categorize_records(&config, &secrets, &records, &out, cli.json).await?;
            }
            (Some(text), _, _) => {
                categorize_text(&config, &secrets, &text, cli.json).await?;
            }
            _ => return Err("categorize needs <TEXT> or --records <IN> --out <OUT>".into()),
        },
    }

    Ok(())
}

fn read_config(path: &Path) -> Result<TriageConfig, Box<dyn std::error::Error>> {
    if path.exists() {
        return Ok(load_config(path)?);
    }
    if path != Path::new(DEFAULT_CONFIG) {
        return Err(format!("config file {} not found", path.display()).into());
    }
    warn!(path = %path.display(), "config file not found, using defaults");
    Ok(TriageConfig::default())
}

fn content_type_for(file: &Path, explicit: Option<String>) -> String {
    if let Some(ct) = explicit {
        return ct;
    }
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") | Some("log") => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn header(title: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", truncate_chars(text, max.saturating_sub(3)))
    } else {
        text.to_string()
    }
}

async fn run_pipeline(
    config: &TriageConfig,
    secrets: &EnvSecrets,
    file: &Path,
    content_type: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = setup::build_pipeline(config, secrets)?;
    let bytes = std::fs::read(file)?;

    let report = pipeline
        .process_upload(&content_type_for(file, content_type), bytes)
        .await?;

    if json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    header(&format!("🧾 Triage report ({} cases)", report.count));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Case", "Category", "Title", "In logs", "Matched files", "Status"]);

    for result in &report.results {
        let (in_logs, files, status) = match &result.outcome {
            CaseOutcome::Completed { verdict, .. } => (
                if verdict.refers_to_logs {
                    "yes".green().to_string()
                } else {
                    "no".yellow().to_string()
                },
                verdict.matched_log_files().join(", "),
                "completed".green().to_string(),
            ),
            CaseOutcome::Failed { kind, .. } => (
                "-".dimmed().to_string(),
                String::new(),
                kind.red().to_string(),
            ),
        };
        table.add_row(vec![
            result.case.id.clone(),
            result.case.category.to_string(),
            shorten(&result.case.title, 40),
            in_logs,
            files,
            status,
        ]);
    }
    println!("{table}");

    for result in &report.results {
        match &result.outcome {
            CaseOutcome::Completed { suggestion, .. } => {
                println!("\n{} {}", result.case.id.bold(), result.case.title.dimmed());
                println!("{}", suggestion.suggestion);
            }
            CaseOutcome::Failed { message, .. } => {
                println!("\n{} {} {}", result.case.id.bold(), "failed:".red().bold(), message);
            }
        }
    }

    println!(
        "\n{} {} | {} {} | {} {}",
        "Cases:".dimmed(),
        report.count.to_string().green(),
        "Failed:".dimmed(),
        report.failed().to_string().red(),
        "At:".dimmed(),
        report.processed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

async fn extract_cases(
    config: &TriageConfig,
    secrets: &EnvSecrets,
    file: &Path,
    content_type: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = DocumentExtractor::new(setup::build_llm(config, secrets)?, config.extraction.clone());
    let document = document_for(&content_type_for(file, content_type), std::fs::read(file)?)?;
    let cases = extractor.extract(&document).await?;

    if json {
        return print_json(&cases);
    }
    print_cases(&cases);
    Ok(())
}

fn print_cases(cases: &[IncidentCase]) {
    header(&format!("📄 Extracted cases ({})", cases.len()));
    if cases.is_empty() {
        println!("{}", "No test cases detected.".yellow());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Case", "Category", "Title", "Signals", "Query"]);
    for case in cases {
        table.add_row(vec![
            case.id.clone(),
            case.category.to_string(),
            shorten(&case.title, 40),
            shorten(&case.signals.join(", "), 40),
            shorten(case.retrieval_query(), 50),
        ]);
    }
    println!("{table}");
}

async fn correlate(
    config: &TriageConfig,
    secrets: &EnvSecrets,
    category: &str,
    text: &str,
    log_dir: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let correlator = LogCorrelator::new(setup::build_llm(config, secrets)?, config.correlation.clone());
    let category = Category::from(category.to_string());
    let dir = log_dir.unwrap_or_else(|| correlator.log_dir().to_path_buf());

    let verdict = correlator.correlate(category, text, &dir).await?;

    if json {
        return print_json(&verdict);
    }
    print_verdict(category, &verdict);
    Ok(())
}

fn print_verdict(category: Category, verdict: &CorrelationVerdict) {
    header(&format!("🔍 Log correlation ({})", category));

    let answer = if verdict.refers_to_logs {
        "refers to logged events".green().bold()
    } else {
        "no matching log events".yellow().bold()
    };
    println!("{} {}", "Verdict:".dimmed(), answer);
    if !verdict.signals.is_empty() {
        println!("{} {}", "Signals:".dimmed(), verdict.signals.join(", ").magenta());
    }

    if verdict.matched_logs.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["File", "Confidence", "Reasons"]);
    for m in &verdict.matched_logs {
        table.add_row(vec![
            m.file.clone(),
            format!("{:.2}", m.confidence),
            m.reasons.join("; "),
        ]);
    }
    println!("{table}");
}

async fn log_hits(
    config: &TriageConfig,
    category: &str,
    signals: &[String],
    log_dir: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let category = Category::from(category.to_string());
    let dir = log_dir.unwrap_or_else(|| config.correlation.log_dir.clone());

    let hits = find_hits(&config.correlation, category, signals, &dir).await;

    if json {
        return print_json(&hits);
    }
    header(&format!("🔎 Log hits ({})", category));
    if hits.is_empty() {
        println!("{}", "No candidate logs for this category".yellow());
        return Ok(());
    }
    for entry in &hits {
        println!(
            "{} {}",
            entry.file.cyan().bold(),
            format!("({} lines)", entry.lines.len()).dimmed()
        );
        for line in &entry.lines {
            println!("  {}", line);
        }
    }
    Ok(())
}

async fn suggest(
    config: &TriageConfig,
    secrets: &EnvSecrets,
    query: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let llm = setup::build_llm(config, secrets)?;
    let retriever = setup::build_retriever(config, secrets, llm)?;
    let result = retriever.suggest(query).await?;

    if json {
        return print_json(&result);
    }
    print_suggestion(&result);
    Ok(())
}

fn print_suggestion(result: &RetrievalResult) {
    header("🤖 Suggestions");
    println!("{}", result.suggestion);
    println!("\n{}", "─".repeat(60).dimmed());
    println!(
        "{} {} | {} {}",
        "Sources:".dimmed(),
        result.sources.join(", ").cyan(),
        "Chunks:".dimmed(),
        result.chunk_ids.len().to_string().yellow()
    );
}

async fn ingest(config: &TriageConfig, secrets: &EnvSecrets, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let llm = setup::build_llm(config, secrets)?;
    let retriever = setup::build_retriever(config, secrets, llm)?;

    if !json {
        header("📥 Ingesting knowledge");
        println!("{} {}", "Incidents:".dimmed(), config.knowledge.incidents.display());
        println!("{} {}", "Guidance:".dimmed(), config.knowledge.guidance.display());
    }

    let report: IngestReport = retriever.ingest().await?;

    if json {
        return print_json(&report);
    }
    println!(
        "\n{} Indexed {} chunks ({} incidents, {} guidance windows)",
        "✓".green().bold(),
        report.total(),
        report.incident_chunks,
        report.guidance_chunks
    );
    Ok(())
}

#[derive(Serialize)]
struct CategorizeOutput<'a> {
    text: &'a str,
    #[serde(flatten)]
    classification: &'a Classification,
}

async fn categorize_text(
    config: &TriageConfig,
    secrets: &EnvSecrets,
    text: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let classifier = setup::build_classifier(config, secrets)?;
    let classification = classifier.classify(text).await;

    if json {
        return print_json(&CategorizeOutput {
            text,
            classification: &classification,
        });
    }
    println!(
        "{} {} {}",
        "Category:".dimmed(),
        join_labels(&classification.categories).green().bold(),
        format!("({:?})", classification.method).dimmed()
    );
    Ok(())
}

async fn categorize_records(
    config: &TriageConfig,
    secrets: &EnvSecrets,
    input: &Path,
    output: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let classifier = setup::build_classifier(config, secrets)?;
    let mut records = load_incident_records(input)?;

    let pb = indicatif::ProgressBar::new(records.len() as u64);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    if json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut classifications = Vec::with_capacity(records.len());
    for batch in records.chunks_mut(10) {
        classifications.extend(classifier.categorize_records(batch).await);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    save_incident_records(output, &records)?;

    if json {
        return print_json(&records);
    }

    let mut counts: Vec<(Category, usize)> = Vec::new();
    for classification in &classifications {
        for category in &classification.categories {
            match counts.iter_mut().find(|(c, _)| c == category) {
                Some((_, n)) => *n += 1,
                None => counts.push((*category, 1)),
            }
        }
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Category", "Records"]);
    for (category, n) in &counts {
        table.add_row(vec![category.to_string(), n.to_string()]);
    }
    println!("{table}");
    println!(
        "\n{} Categorized {} records -> {}",
        "✓".green().bold(),
        records.len(),
        output.display()
    );
    Ok(())
}
