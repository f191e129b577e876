//! One complete run: search the mailbox, then inspect or extract every match.
//!
//! Messages are processed strictly one after another. Per-message problems
//! are collected in the summary; nothing short of failing to create the
//! destination folder stops the batch.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::export::naming::{normalize_extension, Clock, CollisionPolicy, SystemClock};
use crate::export::{inspect, AttachmentExtractor, ExtractionReport, ExtractionStatus, Inspection};
use crate::mail::{MailSession, MailTransport};
use crate::model::download::DownloadedFile;
use crate::model::message_id::MessageId;
use crate::search::{self, SearchOutcome};

/// Parameters of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub keyword: String,
    /// Attachment extension, normalized (no dot, lower-case).
    pub extension: String,
    pub destination: PathBuf,
    pub timestamp_format: String,
    pub collisions: CollisionPolicy,
    /// Only report which messages have matching attachments; write nothing.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keyword: config.search.keyword.clone(),
            extension: normalize_extension(&config.search.extension),
            destination: config.files.downloads_dir.clone(),
            timestamp_format: config.files.timestamp_format.clone(),
            collisions: config.files.on_collision,
            dry_run: false,
        }
    }
}

/// What happened to one message.
#[derive(Debug)]
pub enum MessageOutcome {
    Inspected(Inspection),
    Extracted(ExtractionReport),
}

impl MessageOutcome {
    /// `true` if the message could not be fetched or parsed.
    pub fn fetch_failed(&self) -> bool {
        matches!(
            self,
            Self::Inspected(Inspection::FetchFailed(_))
                | Self::Extracted(ExtractionReport {
                    status: ExtractionStatus::FetchFailed(_),
                    ..
                })
        )
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub search: SearchOutcome,
    /// One entry per matched message, in processing order.
    pub messages: Vec<(MessageId, MessageOutcome)>,
}

impl RunSummary {
    /// Every file written during the run.
    pub fn files(&self) -> impl Iterator<Item = &DownloadedFile> {
        self.messages.iter().flat_map(|(_, outcome)| match outcome {
            MessageOutcome::Extracted(report) => report.files.as_slice(),
            MessageOutcome::Inspected(_) => <&[DownloadedFile]>::default(),
        })
    }

    /// Messages that have a matching attachment (dry runs) or yielded a file.
    pub fn messages_with_attachments(&self) -> Vec<MessageId> {
        self.messages
            .iter()
            .filter(|(_, outcome)| match outcome {
                MessageOutcome::Inspected(inspection) => inspection.has_match(),
                MessageOutcome::Extracted(report) => !report.files.is_empty(),
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn fetch_failures(&self) -> usize {
        self.messages
            .iter()
            .filter(|(_, outcome)| outcome.fetch_failed())
            .count()
    }

    pub fn part_failures(&self) -> usize {
        self.messages
            .iter()
            .map(|(_, outcome)| match outcome {
                MessageOutcome::Extracted(report) => report.failures.len(),
                MessageOutcome::Inspected(_) => 0,
            })
            .sum()
    }
}

/// Run with the system clock. See [`run_with_clock`].
pub fn run<T: MailTransport>(
    session: &mut MailSession<T>,
    options: &RunOptions,
    progress: &dyn Fn(usize, usize),
) -> anyhow::Result<RunSummary> {
    run_with_clock(session, options, SystemClock, progress)
}

/// Search for `options.keyword`, then process every matched message in turn.
///
/// The progress callback receives `(processed, total)`.
pub fn run_with_clock<T: MailTransport, C: Clock>(
    session: &mut MailSession<T>,
    options: &RunOptions,
    clock: C,
    progress: &dyn Fn(usize, usize),
) -> anyhow::Result<RunSummary> {
    if !options.dry_run {
        std::fs::create_dir_all(&options.destination)?;
    }

    let outcome = search::search(session, &options.keyword);
    let ids: Vec<MessageId> = outcome.ids.iter().copied().collect();
    let total = ids.len();
    info!(
        keyword = %options.keyword,
        messages = total,
        dry_run = options.dry_run,
        "Processing matched messages"
    );

    let extractor = AttachmentExtractor::new(&options.extension, &options.destination)
        .with_timestamp_format(options.timestamp_format.clone())
        .with_collision_policy(options.collisions)
        .with_clock(clock);

    let mut messages = Vec::with_capacity(total);
    for (i, id) in ids.into_iter().enumerate() {
        progress(i, total);
        let result = if options.dry_run {
            MessageOutcome::Inspected(inspect(session, id, &options.extension))
        } else {
            MessageOutcome::Extracted(extractor.extract(session, id))
        };
        messages.push((id, result));
    }
    progress(total, total);

    let summary = RunSummary {
        search: outcome,
        messages,
    };
    info!(
        files = summary.files().count(),
        fetch_failures = summary.fetch_failures(),
        part_failures = summary.part_failures(),
        "Run finished"
    );
    Ok(summary)
}
