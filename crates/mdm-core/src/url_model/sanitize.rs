//! Filename sanitization for names coming from unlock services and forum titles.

/// Characters rejected by NTFS/FAT and awkward in shell paths.
const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Folder name used when a movie title sanitizes to nothing.
const UNTITLED: &str = "untitled";

/// Sanitizes a candidate filename so it can be joined onto a download folder.
///
/// - Removes `< > : " / \ | ? *` and control characters
/// - Collapses whitespace runs into a single space
/// - Trims leading/trailing spaces and dots
/// - Limits length to 255 bytes (Linux NAME_MAX)
///
/// May return an empty string; callers pick their own fallback.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_space = false;

    for c in name.chars() {
        if ILLEGAL.contains(&c) || (c.is_control() && !c.is_whitespace()) {
            continue;
        }
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].trim_end().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitizes a movie title for use as (part of) a folder name. Never empty.
pub fn sanitize_folder_name(title: &str) -> String {
    let s = sanitize_filename(title);
    if s.is_empty() {
        UNTITLED.to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?.rar"), "abcde.rar");
        assert_eq!(sanitize_filename("\"Quoted\" <Title>|x"), "Quoted Titlex");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(
            sanitize_filename("  The   Movie\t(2020)  .mkv.. "),
            "The Movie (2020) .mkv"
        );
    }

    #[test]
    fn control_chars() {
        assert_eq!(sanitize_filename("file\x00name.rar"), "filename.rar");
    }

    #[test]
    fn limits_length_on_char_boundary() {
        let long = "é".repeat(200);
        let s = sanitize_filename(&long);
        assert!(s.len() <= 255);
        assert!(s.chars().all(|c| c == 'é'));
    }

    #[test]
    fn folder_name_never_empty() {
        assert_eq!(sanitize_folder_name("???"), "untitled");
        assert_eq!(sanitize_folder_name("Dune: Part Two (2024)"), "Dune Part Two (2024)");
    }
}
