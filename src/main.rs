//! CLI entry point for `attachgrab`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use attachgrab::config::{self, Config, Credentials};
use attachgrab::export::naming::normalize_extension;
use attachgrab::export::{ExtractionStatus, Inspection};
use attachgrab::logging;
use attachgrab::mail::{self, CloseOutcome, ImapTlsSession, MailSession};
use attachgrab::pipeline::{self, MessageOutcome, RunOptions, RunSummary};
use attachgrab::search::SearchOutcome;

#[derive(Parser)]
#[command(
    name = "attachgrab",
    version,
    about = "Search an IMAP mailbox for a keyword and save matching attachments"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search and extract attachments (default)
    Run {
        #[command(flatten)]
        target: TargetArgs,
        /// Destination folder for attachments
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Only list messages with matching attachments; write nothing
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// List message ids matching the keyword
    Search {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration and test the connection
    Check,
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Overrides for what to search and where.
#[derive(Args)]
struct TargetArgs {
    /// Keyword to search for (any case)
    #[arg(short, long, env = "ATTACHGRAB_KEYWORD")]
    keyword: Option<String>,
    /// Attachment extension to extract, e.g. `pdf`
    #[arg(short, long, value_name = "EXT")]
    ext: Option<String>,
    /// Mailbox folder to search
    #[arg(long)]
    folder: Option<String>,
}

impl TargetArgs {
    fn apply(self, config: &mut Config) {
        if let Some(keyword) = self.keyword {
            config.search.keyword = keyword;
        }
        if let Some(ext) = self.ext {
            config.search.extension = ext;
        }
        if let Some(folder) = self.folder {
            config.imap.folder = folder;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, source) = config::load_config();

    let log = logging::init(&config, cli.verbose);
    log.scope(|| {
        source.report();
        dispatch(cli.command, config)
    })
}

fn dispatch(command: Option<Commands>, mut config: Config) -> anyhow::Result<()> {
    match command {
        None => cmd_run(&config, false, false),
        Some(Commands::Run {
            target,
            output,
            dry_run,
            json,
        }) => {
            target.apply(&mut config);
            if let Some(output) = output {
                config.files.downloads_dir = output;
            }
            cmd_run(&config, dry_run, json)
        }
        Some(Commands::Search { target, json }) => {
            target.apply(&mut config);
            cmd_search(&config, json)
        }
        Some(Commands::Check) => cmd_check(&config),
        Some(Commands::Config { save }) => cmd_config(&config, save),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Resolve credentials and open a session. The only hard failure of a run.
fn open_session(config: &Config) -> anyhow::Result<MailSession<ImapTlsSession>> {
    let credentials = Credentials::from_env(&config.imap)?;
    let session = mail::connect(&config.imap, &credentials).with_context(|| {
        format!(
            "failed to open mailbox {} on {}:{}",
            config.imap.folder, config.imap.host, config.imap.port
        )
    })?;
    Ok(session)
}

fn finish(mut session: MailSession<ImapTlsSession>) {
    if let CloseOutcome::Degraded(errors) = session.close() {
        for e in errors {
            eprintln!("  warning: {e}");
        }
    }
}

/// Search the mailbox and extract (or just list) matching attachments.
fn cmd_run(config: &Config, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let problems = config::validate(config);
    if !problems.is_empty() {
        anyhow::bail!("Invalid configuration:\n  - {}", problems.join("\n  - "));
    }

    let mut session = open_session(config)?;

    let options = RunOptions {
        dry_run,
        ..RunOptions::from_config(config)
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Processing [{bar:40.cyan/blue}] {pos}/{len} messages")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let result = pipeline::run(&mut session, &options, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    });
    pb.finish_and_clear();
    finish(session);

    let summary = result?;
    if json {
        print_run_json(&summary, &options)?;
    } else {
        print_run_table(&summary, &options);
    }
    Ok(())
}

/// Print the ids of messages matching the keyword.
fn cmd_search(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let outcome = attachgrab::search::search(&mut session, &config.search.keyword);
    finish(session);

    if json {
        let output = serde_json::json!({
            "keyword": config.search.keyword,
            "variants": outcome.variants,
            "result_count": outcome.ids.len(),
            "ids": outcome.ids,
            "failed_variants": outcome.failures.iter().map(|f| f.variant.as_str()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {} message(s) match '{}'", outcome.ids.len(), config.search.keyword.trim());
    for id in &outcome.ids {
        println!("    {id}");
    }
    for failure in &outcome.failures {
        println!("  warning: {failure}");
    }
    print_charset_hint(&outcome, &config.search.keyword);
    println!();
    Ok(())
}

/// Validate configuration and probe the server.
fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let problems = config::validate(config);
    if !problems.is_empty() {
        println!("  Configuration errors:");
        for p in &problems {
            println!("    - {p}");
        }
        anyhow::bail!("{} configuration problem(s)", problems.len());
    }
    println!("  Configuration valid");
    println!("  {:<16} {}", "Downloads", config.files.downloads_dir.display());
    println!("  {:<16} {}", "Logs", config.files.logs_dir.display());

    let mut session = open_session(config)?;
    let alive = session.is_alive();
    println!(
        "  {:<16} {}:{} / {} ({})",
        "Server",
        config.imap.host,
        config.imap.port,
        session.folder(),
        if alive { "alive" } else { "not responding" }
    );
    finish(session);
    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    if save {
        let path = config::save_config(config)?;
        println!("  Saved config to {}", path.display());
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "attachgrab", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print a run summary as a human-readable table.
fn print_run_table(summary: &RunSummary, options: &RunOptions) {
    use humansize::{format_size, BINARY};

    println!();
    println!(
        "  {} message(s) match '{}'",
        summary.search.ids.len(),
        options.keyword.trim()
    );
    for failure in &summary.search.failures {
        println!("  warning: {failure}");
    }
    print_charset_hint(&summary.search, &options.keyword);
    if summary.messages.is_empty() {
        println!();
        return;
    }

    println!();
    println!("  {:<8} {:<14} {}", "Id", "Status", "Detail");
    println!("  {}", "-".repeat(72));
    for (id, outcome) in &summary.messages {
        match outcome {
            MessageOutcome::Inspected(inspection) => {
                let (status, detail) = match inspection {
                    Inspection::Found { filename } => ("match", filename.clone()),
                    Inspection::NotFound => ("no match", String::new()),
                    Inspection::NotMultipart => ("single part", String::new()),
                    Inspection::FetchFailed(e) => ("fetch failed", e.to_string()),
                };
                println!("  {:<8} {:<14} {}", id, status, detail);
            }
            MessageOutcome::Extracted(report) => {
                let status = match &report.status {
                    ExtractionStatus::Completed if report.files.is_empty() => "no match",
                    ExtractionStatus::Completed => "saved",
                    ExtractionStatus::NotMultipart => "single part",
                    ExtractionStatus::FetchFailed(_) => "fetch failed",
                };
                if let ExtractionStatus::FetchFailed(e) = &report.status {
                    println!("  {:<8} {:<14} {}", id, status, e);
                } else if report.files.is_empty() && report.failures.is_empty() {
                    println!("  {:<8} {:<14}", id, status);
                }
                for file in &report.files {
                    println!(
                        "  {:<8} {:<14} {} ({})",
                        id,
                        status,
                        file.path.display(),
                        format_size(file.size, BINARY)
                    );
                }
                for failure in &report.failures {
                    println!("  {:<8} {:<14} {}", id, "failed", failure);
                }
            }
        }
    }

    println!();
    if options.dry_run {
        println!(
            "  {} message(s) have .{} attachments",
            summary.messages_with_attachments().len(),
            options.extension
        );
    } else {
        println!(
            "  Saved {} file(s) to {}",
            summary.files().count(),
            options.destination.display()
        );
    }
    if summary.fetch_failures() > 0 || summary.part_failures() > 0 {
        println!(
            "  {} message(s) unreachable, {} attachment(s) failed",
            summary.fetch_failures(),
            summary.part_failures()
        );
    }
    println!();
}

fn print_charset_hint(outcome: &SearchOutcome, keyword: &str) {
    if outcome.all_failed() && !keyword.is_ascii() {
        println!("  note: the server may not accept non-ASCII search text; try an ASCII keyword");
    }
}

/// Print a run summary as JSON.
fn print_run_json(summary: &RunSummary, options: &RunOptions) -> anyhow::Result<()> {
    let messages: Vec<serde_json::Value> = summary
        .messages
        .iter()
        .map(|(id, outcome)| match outcome {
            MessageOutcome::Inspected(inspection) => serde_json::json!({
                "id": id,
                "has_attachment": inspection.has_match(),
                "error": match inspection {
                    Inspection::FetchFailed(e) => Some(e.to_string()),
                    _ => None,
                },
            }),
            MessageOutcome::Extracted(report) => serde_json::json!({
                "id": id,
                "files": report.files,
                "errors": report.failures.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
                "fetch_error": match &report.status {
                    ExtractionStatus::FetchFailed(e) => Some(e.to_string()),
                    _ => None,
                },
            }),
        })
        .collect();

    let output = serde_json::json!({
        "keyword": options.keyword,
        "extension": normalize_extension(&options.extension),
        "dry_run": options.dry_run,
        "matched": summary.search.ids,
        "failed_variants": summary.search.failures.iter().map(|f| f.variant.as_str()).collect::<Vec<_>>(),
        "messages": messages,
        "files_saved": summary.files().count(),
        "fetch_failures": summary.fetch_failures(),
        "part_failures": summary.part_failures(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
