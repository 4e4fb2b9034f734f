//! URL modeling and filename derivation.
//!
//! Derives safe local filenames from unlock-service names or URL paths, and
//! normalises hostnames for the domain lookup tables (priority ranks and
//! hoster → unlock-service routes).

mod host;
mod path;
mod sanitize;

pub use host::{normalize_host, HostTable};
pub use path::filename_from_url_path;
pub use sanitize::{sanitize_filename, sanitize_folder_name};

/// Default filename when neither the unlock service nor the URL path yields anything usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Derives a safe filename for saving a download.
///
/// Prefers `hint` (the filename reported by the unlock service), otherwise
/// uses the last path segment of `url`. The result is sanitized so it can be
/// joined onto a download folder.
///
/// # Examples
///
/// - `derive_filename("https://cdn.example.com/x/Movie.part1.rar", None)` → `"Movie.part1.rar"`
/// - `derive_filename("https://cdn.example.com/dl/abc", Some("Movie.mkv"))` → `"Movie.mkv"`
pub fn derive_filename(url: &str, hint: Option<&str>) -> String {
    let from_hint = hint.map(sanitize_filename).filter(|s| is_usable(s));
    if let Some(name) = from_hint {
        return name;
    }

    match filename_from_url_path(url).map(|raw| sanitize_filename(&raw)) {
        Some(name) if is_usable(&name) => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}
