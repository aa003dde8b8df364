//! Markdown export of run results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use topicforge_shared::{Result, TopicForgeError};

/// Render resolved titles as a markdown document, one `##` section per
/// title, in input order. Blank entries and titles with no resolved text
/// are skipped.
pub fn render_markdown(titles: &[String], results: &HashMap<String, String>) -> String {
    let mut out = String::new();
    for raw_title in titles {
        let title = raw_title.trim();
        if title.is_empty() {
            continue;
        }
        let Some(text) = results.get(title) else {
            continue;
        };
        out.push_str(&format!("## {title}\n\n{text}\n\n"));
    }
    out
}

/// Resolve the export destination: an explicit `out` wins, otherwise the
/// input path with its extension swapped to `md`. Refuses a destination
/// equal to the input, so an export can never clobber its own source.
pub fn output_path(input: &Path, out: Option<&Path>) -> Result<PathBuf> {
    let resolved = match out {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("md"),
    };

    if resolved == input {
        return Err(TopicForgeError::validation(format!(
            "output path '{}' would overwrite the input file",
            resolved.display()
        )));
    }

    Ok(resolved)
}
