pub mod folder;
pub mod traits;

use crate::error::{GenerationError, Result};

pub use folder::FolderStore;
pub use traits::{ArtifactStore, SavedArtifacts};

const MAX_FILE_STEM_BYTES: usize = 200;

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turns a phrase into a file stem that stays inside the save folder on
/// every platform.
///
/// Path separators, characters Windows rejects and control characters become
/// `_`; surrounding whitespace and trailing dots are dropped; device names
/// such as `CON` get a leading `_`. A phrase with nothing usable left is
/// rejected rather than guessed at.
pub fn sanitize_file_name(phrase: &str) -> Result<String> {
    let replaced: String = phrase
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let mut name = replaced
        .trim()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string();

    if name.is_empty() || name.chars().all(|c| c == '_' || c == '.') {
        return Err(GenerationError::InvalidFileName(phrase.to_string()));
    }

    let stem = name.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        name.insert(0, '_');
    }

    if name.len() > MAX_FILE_STEM_BYTES {
        let mut cut = MAX_FILE_STEM_BYTES;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
        name = name.trim_end().to_string();
    }

    Ok(name)
}
