//! Currency detection from recognized receipt text.
//!
//! Scores the text against two keyword sets and resolves to USD or MXN.
//! USD wins every tie, including the no-signal case. The tenant base is
//! US-side, so defaulting to USD is a deliberate policy, not a bug.

use super::types::ExtractionConfig;
use crate::models::enums::Currency;

/// Detect the document currency from raw recognized text.
///
/// Counts case-insensitive occurrences of each keyword (every occurrence
/// scores). Alphanumeric keywords match on token boundaries so that short
/// markers like `us` and `mx` do not fire inside `USD`/`MXN`. MXN is
/// returned only when its score strictly exceeds USD's.
pub fn detect_currency(text: &str, config: &ExtractionConfig) -> Currency {
    let lower = text.to_lowercase();

    let usd_score = count_keywords(&lower, &config.usd_keywords);
    let mxn_score = count_keywords(&lower, &config.mxn_keywords);

    if mxn_score > usd_score {
        Currency::Mxn
    } else {
        Currency::Usd
    }
}

fn count_keywords(lower_text: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .map(|k| count_occurrences(lower_text, k))
        .sum()
}

/// Count occurrences of `keyword`, requiring token boundaries on any end of
/// the keyword that is itself alphanumeric (`$` matches anywhere).
fn count_occurrences(lower_text: &str, keyword: &str) -> usize {
    let first_alnum = keyword.chars().next().is_some_and(|c| c.is_alphanumeric());
    let last_alnum = keyword.chars().last().is_some_and(|c| c.is_alphanumeric());

    lower_text
        .match_indices(keyword)
        .filter(|(start, _)| {
            let before_ok = !first_alnum
                || lower_text[..*start]
                    .chars()
                    .next_back()
                    .map_or(true, |c| !c.is_alphanumeric());
            let after_ok = !last_alnum
                || lower_text[start + keyword.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !c.is_alphanumeric());
            before_ok && after_ok
        })
        .count()
}
