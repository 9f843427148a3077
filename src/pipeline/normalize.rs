use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Matching key for heading text: NFC, case fold, NFKD, drop combining
/// marks, collapse whitespace.
pub fn normalize_heading(input: &str) -> String {
    let composed = input.nfc().collect::<String>();
    let folded = composed.to_lowercase();
    let stripped = folded
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>();
    normalize_whitespace(&stripped)
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}
