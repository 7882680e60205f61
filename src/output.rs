use crate::models::{Candidate, SourceImage};
use crate::{LookupError, Result};
use std::path::{Path, PathBuf};

/// Original stem with the extension swapped for `extension`.
pub fn output_file_name(source: &Path, extension: &str) -> String {
    let stem = source
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}

pub fn write_output(output_dir: &Path, source: &SourceImage, chosen: &Candidate) -> Result<PathBuf> {
    let Some(body) = chosen.body.as_deref() else {
        return Err(LookupError::Fetch {
            url: chosen.url.clone(),
            reason: "candidate has no downloaded body".to_string(),
        });
    };
    let file_name = output_file_name(&source.path, chosen.extension.as_deref().unwrap_or(""));
    std::fs::create_dir_all(output_dir)?;
    let out_path = output_dir.join(file_name);
    std::fs::write(&out_path, body)?;
    Ok(out_path)
}
