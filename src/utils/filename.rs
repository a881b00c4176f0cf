//! Safe filename generation utilities

use crate::api::types::is_audio_quality;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const MAX_STEM_CHARS: usize = 200;

fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("static pattern"))
}

/// First eight characters of a task id, used in fallback titles and names
pub fn short_id(task_id: &str) -> &str {
    match task_id.char_indices().nth(8) {
        Some((idx, _)) => &task_id[..idx],
        None => task_id,
    }
}

/// Convert a title to a safe filename by removing/replacing invalid characters
pub fn to_safe_filename(title: &str, extension: &str) -> String {
    let mut safe_title = invalid_chars().replace_all(title, "_").to_string();

    // Remove leading/trailing dots and spaces
    safe_title = safe_title
        .trim_matches(|c: char| c == '.' || c == ' ')
        .to_string();

    if safe_title.chars().count() > MAX_STEM_CHARS {
        safe_title = safe_title.chars().take(MAX_STEM_CHARS).collect::<String>();
        safe_title = safe_title.trim_end().to_string();
    }

    if safe_title.is_empty() {
        safe_title = "video".to_string();
    }

    if extension.is_empty() {
        return safe_title;
    }
    let ext = extension.trim_start_matches('.');
    format!("{}.{}", safe_title, ext)
}

/// Name offered when saving a task's artifact.
///
/// Uses the cached title when one is known, otherwise `video-<short id>`.
/// Audio-only qualities get `.mp3`, everything else `.mp4`.
pub fn suggested_file_name(task_id: &str, title: Option<&str>, quality: Option<&str>) -> String {
    let ext = match quality {
        Some(q) if is_audio_quality(q) => "mp3",
        _ => "mp4",
    };
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => to_safe_filename(title, ext),
        None => format!("video-{}.{}", short_id(task_id), ext),
    }
}

/// Generate a unique filename by appending a number if the file already exists
pub fn generate_unique_filename(base_path: &Path, filename: &str) -> std::io::Result<String> {
    let mut counter = 1;
    let mut final_filename = filename.to_string();

    while base_path.join(&final_filename).exists() {
        let path = Path::new(filename);
        let stem = path.file_stem().unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        final_filename = format!("{} ({}){}", stem.to_string_lossy(), counter, extension);
        counter += 1;

        if counter > 10000 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "Too many files with similar names",
            ));
        }
    }

    Ok(final_filename)
}
