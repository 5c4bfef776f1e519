/*!
 * File system helpers shared by the catalog, dictionary and config loaders.
 */

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Read a UTF-8 text file into a string
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories as needed
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Build the output path for a translated catalog.
///
/// `messages.po` translated to `fr` lands next to the input (or in
/// `output_dir` when given) as `messages.fr.po`.
pub fn translated_catalog_path(input: &Path, language: &str, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "messages".to_string());

    let file_name = format!("{}.{}.po", stem, language);

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}
