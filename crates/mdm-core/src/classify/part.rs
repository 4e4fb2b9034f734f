//! Archive part number detection from resolved filenames.

use regex::Regex;
use std::sync::OnceLock;

const VIDEO_EXTENSIONS: [&str; 4] = [".mkv", ".mp4", ".avi", ".iso"];

fn re_part_token() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(?:^|[^a-z0-9])(?:part|pt)\.?\s*(\d+)").expect("compile part token regex")
    })
}

fn re_numeric_ext() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\.[zr]?(\d{2,3})$").expect("compile numeric extension regex"))
}

/// Archive part a filename belongs to.
///
/// Checks a `part<N>` / `pt<N>` token first (`movie.part02.rar`, `movie.pt.3.rar`),
/// then a 2–3 digit extension (`.z01`, `.r00`, `.001`). Video files and
/// anything without a pattern count as part 1.
pub fn part_number(filename: &str) -> u32 {
    let name = filename.trim().to_lowercase();

    if let Some(n) = re_part_token()
        .captures(&name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
    {
        return n;
    }

    if VIDEO_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        return 1;
    }

    re_numeric_ext()
        .captures(&name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}
