//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Number of characters in `text` once surrounding whitespace is removed.
pub fn trimmed_char_count(text: &str) -> usize {
    text.trim().chars().count()
}

/// Default output path: `<stem>-<suffix>.pdf` next to the input.
pub fn output_path_for(input: &std::path::Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}-{suffix}.pdf"))
}
