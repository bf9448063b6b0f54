//! Person-name normalization and matching
//!
//! Providers disagree on name shape: "DOE, JANE M.", "Rep. Jane Doe Jr.",
//! "Jane M. Doe". Everything here reduces names to lowercase word tokens
//! first and compares those.

const SUFFIXES: [&str; 7] = ["jr", "sr", "ii", "iii", "iv", "v", "esq"];
const HONORIFICS: [&str; 10] = [
    "rep", "sen", "senator", "representative", "hon", "dr", "mr", "mrs", "ms", "gov",
];

/// Threshold for fuzzy matches on normalized names
pub const NAME_MATCH_THRESHOLD: f64 = 0.93;

/// Normalize a person name for comparison
///
/// Lowercases, reorders "Last, First" to "First Last", strips punctuation,
/// honorifics, and generational suffixes, and collapses whitespace.
pub fn normalize_name(name: &str) -> String {
    name_tokens(name).join(" ")
}

/// Normalized word tokens of a name
pub fn name_tokens(name: &str) -> Vec<String> {
    let reordered = reorder_comma_name(name);

    let cleaned: String = reordered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c == '\'' || c == '\u{2019}' {
                '\0'
            } else {
                ' '
            }
        })
        .filter(|c| *c != '\0')
        .collect();

    let mut tokens: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();

    while tokens.len() > 1 && HONORIFICS.contains(&tokens[0].as_str()) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && tokens.last().is_some_and(|t| SUFFIXES.contains(&t.as_str())) {
        tokens.pop();
    }
    tokens
}

/// "Doe, Jane M." → "Jane M. Doe" (suffix after a second comma is kept last)
fn reorder_comma_name(name: &str) -> String {
    let parts: Vec<&str> = name.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [last, first] if !last.is_empty() && !first.is_empty() && !is_suffix(first) => {
            format!("{first} {last}")
        }
        [last, first, suffix] if !last.is_empty() && !first.is_empty() => {
            format!("{first} {last} {suffix}")
        }
        _ => name.to_string(),
    }
}

fn is_suffix(token: &str) -> bool {
    let t = token.trim_end_matches('.').to_lowercase();
    SUFFIXES.contains(&t.as_str())
}

/// Similarity of two names in [0, 1] (Jaro-Winkler on normalized form)
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(&a, &b)
}

/// Whether two names plausibly refer to the same person
///
/// Matches on identical normalized names, on identical first+last tokens
/// (middle names/initials ignored), or on high fuzzy similarity.
pub fn names_match(a: &str, b: &str) -> bool {
    let ta = name_tokens(a);
    let tb = name_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return false;
    }
    if ta == tb {
        return true;
    }
    if ta.len() >= 2 && tb.len() >= 2 && ta.first() == tb.first() && ta.last() == tb.last() {
        return true;
    }
    strsim::jaro_winkler(&ta.join(" "), &tb.join(" ")) >= NAME_MATCH_THRESHOLD
}

/// Display-case tokens of a raw name ("DOE, JANE" → ["Jane", "Doe"])
fn display_tokens(name: &str) -> Vec<String> {
    reorder_comma_name(name)
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c == ',' || c == '.' && t.len() > 2))
        .filter(|t| !t.is_empty())
        .filter(|t| !HONORIFICS.contains(&t.trim_end_matches('.').to_lowercase().as_str()))
        .map(title_case)
        .collect()
}

fn title_case(token: &str) -> String {
    if token.chars().any(|c| c.is_lowercase()) {
        return token.to_string();
    }
    let lower = token.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Query variants for name-based fallback searches, most specific first
///
/// "Jane M. Doe Jr." → ["Jane M. Doe Jr.", "Jane Doe"]
pub fn name_variants(name: &str) -> Vec<String> {
    let mut variants = Vec::new();
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return variants;
    }
    push_unique(&mut variants, trimmed.to_string());

    let tokens: Vec<String> = display_tokens(trimmed)
        .into_iter()
        .filter(|t| !is_suffix(t))
        .collect();
    if tokens.len() >= 2 {
        push_unique(&mut variants, tokens.join(" "));
        push_unique(
            &mut variants,
            format!("{} {}", tokens[0], tokens[tokens.len() - 1]),
        );
    }
    variants
}

/// "Last, First" form used by campaign-finance filings
pub fn last_first(name: &str) -> Option<String> {
    let tokens: Vec<String> = display_tokens(name)
        .into_iter()
        .filter(|t| !is_suffix(t))
        .collect();
    match tokens.as_slice() {
        [first, .., last] => Some(format!("{last}, {first}")),
        _ => None,
    }
}

/// Wikipedia title candidates: "First_Last", then "First_Last_(politician)"
pub fn wiki_title_variants(name: &str) -> Vec<String> {
    let mut titles = Vec::new();
    for variant in name_variants(name) {
        let base = variant.split_whitespace().collect::<Vec<_>>().join("_");
        push_unique(&mut titles, base.clone());
        push_unique(&mut titles, format!("{base}_(politician)"));
    }
    titles
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !value.is_empty() && !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_name("  Jane   DOE "), "jane doe");
        assert_eq!(normalize_name("Rep. Jane Doe, Jr."), "jane doe");
        assert_eq!(normalize_name("DOE, JANE"), "jane doe");
        assert_eq!(normalize_name("O'Brien, Pat"), "pat obrien");
    }

    #[test]
    fn test_normalize_keeps_single_token_honorific() {
        // A lone token is never stripped
        assert_eq!(normalize_name("Sen"), "sen");
    }

    #[test]
    fn test_names_match_middle_initial() {
        assert!(names_match("Jane M. Doe", "Jane Doe"));
        assert!(names_match("DOE, JANE MARIE", "Jane Doe"));
        assert!(!names_match("Jane Doe", "John Smith"));
        assert!(!names_match("", "Jane Doe"));
    }

    #[test]
    fn test_name_similarity_range() {
        assert_eq!(name_similarity("Jane Doe", "jane doe"), 1.0);
        let s = name_similarity("Jane Doe", "Jon Smith");
        assert!((0.0..1.0).contains(&s));
    }

    #[test]
    fn test_name_variants() {
        let variants = name_variants("Jane M. Doe Jr.");
        assert_eq!(variants[0], "Jane M. Doe Jr.");
        assert!(variants.contains(&"Jane Doe".to_string()));
    }

    #[test]
    fn test_last_first() {
        assert_eq!(last_first("Jane M. Doe"), Some("Doe, Jane".to_string()));
        assert_eq!(last_first("Cher"), None);
    }

    #[test]
    fn test_wiki_titles() {
        let titles = wiki_title_variants("Jane Doe");
        assert_eq!(titles[0], "Jane_Doe");
        assert_eq!(titles[1], "Jane_Doe_(politician)");
    }
}
