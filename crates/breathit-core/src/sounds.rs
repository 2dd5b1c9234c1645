//! Cycle sound discovery.

use std::path::Path;

const SOUND_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

/// File names of playable sounds in `dir`, sorted case-insensitively.
///
/// A missing or unreadable directory yields an empty list.
pub fn list_cycle_sounds(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "no cycle sounds available");
            return Vec::new();
        }
    };

    let mut sounds: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_sound_file(name))
        .collect();
    sounds.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    sounds
}

fn is_sound_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOUND_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
