//! Case variants of a search keyword.

/// Case forms queried for `keyword`, in a fixed order:
/// upper, lower, capitalized, title, and the keyword as given.
///
/// The keyword is trimmed first; an empty keyword yields no variants.
/// Forms that coincide are only listed once.
pub fn keyword_variants(keyword: &str) -> Vec<String> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Vec::new();
    }

    let candidates = [
        keyword.to_uppercase(),
        keyword.to_lowercase(),
        capitalize(keyword),
        title_case(keyword),
        keyword.to_string(),
    ];

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// First character upper-cased, the rest lower-cased: `"hELLO wORLD"` → `"Hello world"`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}

/// Every word capitalized. A word starts after any non-alphabetic character,
/// so `"o'neil-smith"` becomes `"O'Neil-Smith"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
