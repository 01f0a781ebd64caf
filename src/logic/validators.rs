//! Input Validators
//!
//! Pure checks and sanitizers applied to a URL or a block of page/email text
//! before it leaves the client. None of these panic; malformed input yields
//! `false` or a cleaned string.
//!
//! Both sanitizers iterate to a fixpoint so applying them twice is the same as
//! applying them once.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Longest URL accepted for a scan (bytes)
pub const MAX_URL_LENGTH: usize = 2048;

/// Largest email / page body accepted for a scan (bytes)
pub const MAX_EMAIL_CONTENT_BYTES: usize = 100_000;

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("static regex")
});

// ============================================================================
// URL
// ============================================================================

/// Well-formed absolute http(s) URL with a host
pub fn is_valid_url(input: &str) -> bool {
    let candidate = input.trim();
    if candidate.is_empty() || candidate.len() > MAX_URL_LENGTH {
        return false;
    }

    match Url::parse(candidate) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().map_or(false, |h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Normalized form of a URL, safe to embed in a request body
pub fn sanitize_url(input: &str) -> String {
    let cleaned = fixpoint(input, |s| {
        let without_controls: String = s.chars().filter(|c| !c.is_control()).collect();
        strip_script_blocks(&without_controls).trim().to_string()
    });

    match Url::parse(&cleaned) {
        Ok(url) => url.to_string(),
        Err(_) => cleaned,
    }
}

// ============================================================================
// EMAIL / PAGE CONTENT
// ============================================================================

/// Non-empty and within [`MAX_EMAIL_CONTENT_BYTES`]
pub fn is_valid_email_content(input: &str) -> bool {
    !input.trim().is_empty() && input.len() <= MAX_EMAIL_CONTENT_BYTES
}

/// Strip script blocks and control characters, normalize line endings and
/// bound the size
pub fn sanitize_email_content(input: &str) -> String {
    fixpoint(input, |s| {
        let stripped = strip_script_blocks(s)
            .replace("\r\n", "\n")
            .replace('\r', "\n");

        let filtered: String = stripped
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();

        truncate_on_char_boundary(filtered.trim(), MAX_EMAIL_CONTENT_BYTES).to_string()
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn strip_script_blocks(input: &str) -> String {
    SCRIPT_BLOCK.replace_all(input, "").into_owned()
}

/// Apply `step` until the output stops changing. Every step either shortens
/// the string or leaves it untouched, so this terminates.
fn fixpoint<F>(input: &str, step: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut current = input.to_string();
    loop {
        let next = step(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn truncate_on_char_boundary(input: &str, max_bytes: usize) -> &str {
    if input.len() <= max_bytes {
        return input;
    }
    let mut end = max_bytes;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}

// ============================================================================
// TESTS
// ============================================================================
