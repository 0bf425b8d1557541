//! Text normalization for code and label matching.
//!
//! Terminology labels are French clinical text; search must treat
//! `"Diabète"` and `"DIABETE"` as the same word. Normalization lowercases,
//! strips the Latin-1 diacritics that occur in these terminologies and
//! collapses whitespace, so that the same function can serve both substring
//! matching and search-cache keys.

/// Folds a single character to its undecorated lowercase ASCII base.
///
/// Characters outside the folded set are passed through lowercased.
pub fn fold_char(ch: char) -> char {
    let lower = ch.to_lowercase().next().unwrap_or(ch);
    match lower {
        'à' | 'â' | 'ä' | 'á' | 'ã' => 'a',
        'ç' => 'c',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' | 'õ' => 'o',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'ÿ' => 'y',
        'ñ' => 'n',
        other => other,
    }
}

/// Normalizes a query or label: casefold, diacritic fold, collapse runs of
/// whitespace to single spaces and trim.
///
/// # Example
///
/// ```rust
/// use cohort_terms::text::normalize;
///
/// assert_eq!(normalize("  Diabète   SUCRÉ "), "diabete sucre");
/// assert_eq!(normalize("E11"), "e11");
/// ```
pub fn normalize(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut prev_was_space = true;

    for ch in input.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(fold_char(ch));
            prev_was_space = false;
        }
    }

    if result.ends_with(' ') {
        result.pop();
    }
    result
}

/// Case- and diacritic-insensitive substring test.
///
/// `query` must already be normalized (callers normalize once per search,
/// not once per node).
pub fn contains_normalized(haystack: &str, normalized_query: &str) -> bool {
    if normalized_query.is_empty() {
        return true;
    }
    normalize(haystack).contains(normalized_query)
}
