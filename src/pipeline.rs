use crate::fetch::CandidateFetcher;
use crate::http::redact_url_for_log;
use crate::models::{Candidate, ImageDimensions, SearchOutcome, SourceImage};
use crate::output::write_output;
use crate::scrape::ResultScraper;
use crate::upload::Uploader;
use crate::LookupError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// When no large result exists, keep the original instead of skipping the file.
    pub fallback_copy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    FallbackDisabled,
    AllCandidatesFailed { attempted: usize },
}

/// Per-file lookup state. `Done`, `Unresolved` and `Fatal` are terminal.
#[derive(Debug)]
pub enum FileState {
    Start,
    Uploaded { markup: String },
    Scraped(SearchOutcome),
    Copying,
    Selecting {
        remaining: VecDeque<Candidate>,
        attempted: usize,
    },
    Done { chosen: Candidate, fallback: bool },
    Unresolved(UnresolvedReason),
    Fatal(LookupError),
}

impl FileState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FileState::Done { .. } | FileState::Unresolved(_) | FileState::Fatal(_)
        )
    }
}

#[derive(Debug)]
pub enum FileReport {
    Upgraded {
        output: PathBuf,
        before: ImageDimensions,
        after: ImageDimensions,
    },
    Copied {
        output: PathBuf,
    },
    Unresolved(UnresolvedReason),
    /// File-scoped failure; the run continues.
    Failed(LookupError),
    /// The search service is refusing automated access; the run must stop.
    RunAborted(LookupError),
}

pub struct FilePipeline<'a> {
    uploader: &'a Uploader<'a>,
    scraper: &'a dyn ResultScraper,
    fetcher: &'a CandidateFetcher<'a>,
    policy: SelectionPolicy,
}

impl<'a> FilePipeline<'a> {
    pub fn new(
        uploader: &'a Uploader<'a>,
        scraper: &'a dyn ResultScraper,
        fetcher: &'a CandidateFetcher<'a>,
        policy: SelectionPolicy,
    ) -> Self {
        Self {
            uploader,
            scraper,
            fetcher,
            policy,
        }
    }

    /// Performs exactly one transition.
    pub fn advance(&self, source: &SourceImage, state: FileState) -> FileState {
        let file = source.file_name();
        match state {
            FileState::Start => {
                tracing::info!(file = %file, "image_upload_started");
                let bytes = match source.read_bytes() {
                    Ok(bytes) => bytes,
                    Err(err) => return FileState::Fatal(err),
                };
                match self.uploader.upload(&file, &bytes) {
                    Ok(markup) => FileState::Uploaded { markup },
                    Err(err) => FileState::Fatal(err),
                }
            }
            FileState::Uploaded { markup } => match self.scraper.scrape(&markup) {
                Ok(outcome) => FileState::Scraped(outcome),
                Err(err) => FileState::Fatal(err),
            },
            FileState::Scraped(SearchOutcome::Blocked) => FileState::Fatal(LookupError::Blocked),
            FileState::Scraped(SearchOutcome::NoLargeImageFound) => FileState::Copying,
            FileState::Scraped(SearchOutcome::Candidates(ranked)) => FileState::Selecting {
                remaining: ranked.into(),
                attempted: 0,
            },
            FileState::Copying => {
                if !self.policy.fallback_copy {
                    return FileState::Unresolved(UnresolvedReason::FallbackDisabled);
                }
                match source.as_fallback_candidate() {
                    Ok(chosen) => FileState::Done {
                        chosen,
                        fallback: true,
                    },
                    Err(err) => FileState::Fatal(err),
                }
            }
            FileState::Selecting {
                mut remaining,
                attempted,
            } => {
                let Some(candidate) = remaining.pop_front() else {
                    return FileState::Unresolved(UnresolvedReason::AllCandidatesFailed {
                        attempted,
                    });
                };
                tracing::debug!(file = %file, url = %candidate.url, "candidate_fetch_started");
                match self.fetcher.fetch(&candidate) {
                    Ok(chosen) => FileState::Done {
                        chosen,
                        fallback: false,
                    },
                    Err(err) => {
                        tracing::warn!(
                            file = %file,
                            url = %redact_url_for_log(&candidate.url),
                            error = %err,
                            "candidate_fetch_failed"
                        );
                        FileState::Selecting {
                            remaining,
                            attempted: attempted + 1,
                        }
                    }
                }
            }
            terminal => terminal,
        }
    }

    pub fn drive(&self, source: &SourceImage) -> FileState {
        let mut state = FileState::Start;
        while !state.is_terminal() {
            state = self.advance(source, state);
        }
        state
    }

    /// Runs the lookup for one file and writes the chosen image into `output_dir`.
    pub fn process(&self, source: &SourceImage, output_dir: &Path) -> FileReport {
        let file = source.file_name();
        match self.drive(source) {
            FileState::Done { chosen, fallback } => match write_output(output_dir, source, &chosen) {
                Ok(output) if fallback => {
                    tracing::info!(
                        file = %file,
                        output = %output.to_string_lossy(),
                        "high_resolution_not_found_copied_original"
                    );
                    FileReport::Copied { output }
                }
                Ok(output) => {
                    tracing::info!(
                        file = %file,
                        output = %output.to_string_lossy(),
                        report = %resize_report(source.dimensions, chosen.dimensions),
                        "high_resolution_image_saved"
                    );
                    FileReport::Upgraded {
                        output,
                        before: source.dimensions,
                        after: chosen.dimensions,
                    }
                }
                Err(err) => {
                    tracing::warn!(file = %file, error = %err, "output_write_failed");
                    FileReport::Failed(err)
                }
            },
            FileState::Unresolved(reason) => {
                tracing::warn!(file = %file, reason = ?reason, "no_output_for_file");
                FileReport::Unresolved(reason)
            }
            FileState::Fatal(err) if err.is_run_fatal() => {
                tracing::error!(file = %file, error = %err, "lookup_blocked_stopping_run");
                FileReport::RunAborted(err)
            }
            FileState::Fatal(err) => {
                tracing::warn!(file = %file, error = %err, "file_lookup_failed");
                FileReport::Failed(err)
            }
            other => unreachable!("drive returned non-terminal state {other:?}"),
        }
    }
}

/// Before/after line for a saved upgrade, e.g. `800x600 -> 1920x1080`.
pub fn resize_report(before: ImageDimensions, after: ImageDimensions) -> String {
    format!("{before} -> {after}")
}
