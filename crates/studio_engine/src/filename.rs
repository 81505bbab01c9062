use sha2::{Digest, Sha256};

const MAX_STEM_CHARS: usize = 60;

/// Portable output name: `{sanitized_prompt}--{short_hash(fingerprint)}.{extension}`.
///
/// The fingerprint should identify the job (prompt, seed, timestamp) so that two
/// runs of the same prompt do not overwrite each other.
pub fn video_filename(prompt: &str, fingerprint: &str, extension: &str) -> String {
    let stem = sanitize_prompt(prompt);
    let hash = short_hash(fingerprint);
    format!("{stem}--{hash}.{extension}")
}

fn sanitize_prompt(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let trimmed = compacted.trim_matches(&['_', '.'][..]);
    let mut stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    while stem.ends_with(['_', '.']) {
        stem.pop();
    }
    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
