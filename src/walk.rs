use crate::config::LookupConfig;
use crate::fetch::CandidateFetcher;
use crate::http::HttpTransport;
use crate::pipeline::{FilePipeline, FileReport, SelectionPolicy};
use crate::probe::probe_file;
use crate::scrape::LargeImageScraper;
use crate::upload::Uploader;
use crate::{LookupError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SOURCE_EXTS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files_seen: usize,
    pub upgraded: usize,
    pub copied: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFiles {
    pub images: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// Entries the walk could not read; reported and left out.
    pub unreadable: usize,
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .map(|e| SOURCE_EXTS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Lists candidate source images under `root` (or `root` itself), in file-name order.
pub fn collect_source_files(root: &Path) -> SourceFiles {
    let mut files = SourceFiles::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(
                    path = %err.path().map(|p| p.to_string_lossy().to_string()).unwrap_or_default(),
                    error = %err,
                    "walk_entry_unreadable"
                );
                files.unreadable += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if has_source_extension(&path) {
            files.images.push(path);
        } else {
            files.skipped.push(path);
        }
    }
    files
}

/// Looks up every source image under `input` one at a time and writes results to `output_dir`.
///
/// Returns `Err(Blocked)` as soon as the search service serves a captcha; the files after it
/// are not attempted.
pub fn run_lookup(
    config: &LookupConfig,
    transport: &dyn HttpTransport,
    input: &Path,
    output_dir: &Path,
) -> Result<RunSummary> {
    config.validate()?;
    if !input.exists() {
        return Err(LookupError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input path does not exist: {}", input.to_string_lossy()),
        )));
    }

    let uploader = Uploader::new(transport, config);
    let scraper = LargeImageScraper::new(transport, config);
    let fetcher = CandidateFetcher::new(transport);
    let pipeline = FilePipeline::new(
        &uploader,
        &scraper,
        &fetcher,
        SelectionPolicy {
            fallback_copy: config.fallback_copy,
        },
    );

    let files = collect_source_files(input);
    let mut summary = RunSummary {
        failed: files.unreadable,
        skipped: files.skipped.len(),
        ..RunSummary::default()
    };
    for path in &files.skipped {
        tracing::debug!(path = %path.to_string_lossy(), "non_image_file_skipped");
    }

    for path in &files.images {
        summary.files_seen += 1;
        tracing::info!(path = %path.to_string_lossy(), "source_image_probe_started");
        let source = match probe_file(path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(path = %path.to_string_lossy(), error = %err, "source_image_unreadable");
                summary.failed += 1;
                continue;
            }
        };

        match pipeline.process(&source, output_dir) {
            FileReport::Upgraded { .. } => summary.upgraded += 1,
            FileReport::Copied { .. } => summary.copied += 1,
            FileReport::Unresolved(_) => summary.unresolved += 1,
            FileReport::Failed(_) => summary.failed += 1,
            FileReport::RunAborted(err) => return Err(err),
        }
    }

    tracing::info!(
        files = summary.files_seen,
        upgraded = summary.upgraded,
        copied = summary.copied,
        unresolved = summary.unresolved,
        failed = summary.failed,
        skipped = summary.skipped,
        "lookup_run_finished"
    );
    Ok(summary)
}
