use regex::Regex;
use std::sync::LazyLock;

static INVALID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("Failed to compile invalid chars regex")
});

static RESERVED_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$")
        .expect("Failed to compile reserved names regex")
});

const MAX_BASE_LEN: usize = 200;

/// Sanitize a filename for cross-platform compatibility
/// Removes/replaces characters that are invalid on Windows, macOS, or Linux
pub fn sanitize_filename(name: &str) -> String {
    // Invalid characters for Windows: < > : " / \ | ? *
    // Also remove control characters (0-31)
    let sanitized = INVALID_CHARS.replace_all(name, "_");

    // Trim leading/trailing spaces and dots (problematic on Windows)
    let sanitized = sanitized.trim_matches(|c| c == ' ' || c == '.');

    if RESERVED_NAMES.is_match(sanitized) {
        return format!("_{}", sanitized);
    }

    // Leave room for the "-pagN.jpg" / "-Imagens.zip" suffixes
    let sanitized = truncate_at_char_boundary(sanitized, MAX_BASE_LEN);

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized.to_string()
    }
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Name of the JPEG for page `page` (0-based): `{base}-pag{page+1}.jpg`
pub fn page_image_name(base_name: &str, page: usize) -> String {
    format!("{}-pag{}.jpg", base_name, page + 1)
}

/// Thumbnail file for page `page` (0-based); the display name is sanitized
pub fn thumbnail_name(display_name: &str, page: usize) -> String {
    format!("{}-thumb{}.jpg", sanitize_filename(display_name), page + 1)
}

/// Name of the archive holding several pages: `{base}-Imagens.zip`
pub fn archive_name(base_name: &str) -> String {
    format!("{}-Imagens.zip", base_name)
}
