//! Field extraction engine: layered pattern-matching heuristics that pull
//! vendor, date, total, tax and tip out of noisy recognized text.
//!
//! Pure function of (text, currency, tables) with no hidden state: identical
//! input always yields an identical result. Every parse failure is recovered
//! locally: the field stays absent and extraction continues.

use std::sync::LazyLock;

use regex::Regex;

use super::corrections::apply_corrections;
use super::types::{ExtractedFields, ExtractionConfig};
use crate::config::round2;
use crate::models::enums::Currency;

/// Every amount-looking substring: optional `$`, digits with thousands
/// separators, exactly two decimals. This set backs all monetary heuristics.
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\s*([\d,]+\.\d{2})").unwrap());

/// Keyword-anchored total. The amount printed after the *last* keyword wins —
/// totals sit near the bottom of the page.
static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:total\s+a\s+pagar|importe\s+total|total\s+amount|amount\s+due|balance|total)[:\s]*\$?\s*([\d,]+\.\d{2})",
    )
    .unwrap()
});

/// Keyword-anchored tax, tolerating an inline rate token (`IVA 16% 30.40`).
static TAX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:sales\s+tax|tax\s+amount|stax|tax|i\.v\.a\.|iva|impuesto)\s*(?:\d{1,3}(?:\.\d+)?\s*%)?[:\s]*\$?\s*([\d,]+\.\d{2})",
    )
    .unwrap()
});

/// Tip lines allow 0–2 decimal digits (`TIP 20` is common on hand-written slips).
static TIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:tip|propina|gratuity)[:\s]*\$?\s*([\d,]+\.?\d{0,2})").unwrap()
});

/// Four-digit-year date, tried first (unambiguous).
static DATE_ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})[/-](\d{1,2})[/-](\d{1,2})").unwrap());

/// Slash/dash date with the year last. Read month-first: a fixed US-style
/// convention even for Mexico-origin documents — known ambiguity, the system
/// carries no locale signal to resolve it.
static DATE_AMBIGUOUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})").unwrap());

/// Line consisting only of digits and currency punctuation, never a vendor.
static NUMERIC_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s$.,\-/]+$").unwrap());

static VENDOR_LEADING_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^a-zA-Z0-9]+").unwrap());

static VENDOR_TRAILING_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s.]+$").unwrap());

/// Absolute tolerance for the regional-tax inference check.
const TAX_INFERENCE_TOLERANCE: f64 = 0.10;

/// How many leading lines are scanned for the vendor name.
const VENDOR_SCAN_LINES: usize = 10;

/// Vendor lines shorter than this are preferred; long lines are slogans.
const VENDOR_SHORT_LINE: usize = 30;

/// Extract all structured fields from recognized text.
pub fn extract_fields(
    text: &str,
    currency: Currency,
    config: &ExtractionConfig,
) -> ExtractedFields {
    let amounts = monetary_candidates(text);

    let mut fields = ExtractedFields {
        vendor: extract_vendor(text, &config.vendor_stop_words),
        date: extract_date(text),
        total: extract_total(text, &amounts),
        ..Default::default()
    };

    fields.tax = extract_tax(text, currency, fields.total, &amounts, config);
    fields.tip = extract_tip(text);

    // Subtotal is derived only, never independently pattern-matched.
    if let (Some(total), Some(tax)) = (fields.total, fields.tax) {
        fields.subtotal = Some(round2(total - tax - fields.tip.unwrap_or(0.0)));
    }

    apply_corrections(&mut fields, &config.corrections);
    fields
}

/// Parse one matched amount string: strip thousands separators, parse as f64.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

/// All parseable amounts in the text, in document order.
pub fn monetary_candidates(text: &str) -> Vec<f64> {
    AMOUNT_RE
        .captures_iter(text)
        .filter_map(|c| parse_amount(&c[1]))
        .collect()
}

/// Vendor name: scan the first lines, drop doc-type headers and numeric
/// noise, prefer the first short candidate (long lines are usually slogans).
fn extract_vendor(text: &str, stop_words: &[String]) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut candidates: Vec<&str> = Vec::new();
    for line in lines.iter().take(VENDOR_SCAN_LINES) {
        if line.chars().count() < 3 || NUMERIC_LINE_RE.is_match(line) {
            continue;
        }
        let lower = line.to_lowercase();
        if stop_words.iter().any(|w| lower.contains(w.as_str())) {
            continue;
        }
        candidates.push(line);
    }

    if let Some(&first) = candidates.first() {
        let chosen = candidates
            .iter()
            .find(|c| c.chars().count() < VENDOR_SHORT_LINE)
            .copied()
            .unwrap_or(first);
        return Some(clean_vendor(chosen));
    }

    // Nothing survived the filters: fall back to the very first line.
    lines.first().map(|l| truncate_chars(l, 255))
}

/// Strip logo noise from the ends, cap at 255 chars.
fn clean_vendor(raw: &str) -> String {
    let stripped = VENDOR_LEADING_NOISE_RE.replace(raw, "");
    let stripped = VENDOR_TRAILING_NOISE_RE.replace(&stripped, "");
    truncate_chars(stripped.trim(), 255)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim().to_string()
}

/// Extract and normalize a date to `YYYY-MM-DD`.
///
/// The unambiguous four-digit-year pattern is tried first; the slash form is
/// read month-first with 2-digit years expanded into the 2000s. Candidates
/// that fail integer parsing or calendar validation are skipped and scanning
/// continues.
fn extract_date(text: &str) -> Option<String> {
    for caps in DATE_ISO_RE.captures_iter(text) {
        if let Some(date) = normalize_date(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }
    for caps in DATE_AMBIGUOUS_RE.captures_iter(text) {
        let year = expand_year(&caps[3]);
        if let Some(date) = normalize_date(&year, &caps[1], &caps[2]) {
            return Some(date);
        }
    }
    None
}

fn expand_year(raw: &str) -> String {
    if raw.len() == 2 {
        format!("20{raw}")
    } else {
        raw.to_string()
    }
}

fn normalize_date(year: &str, month: &str, day: &str) -> Option<String> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    // Reject impossible calendar dates so scanning can continue.
    chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Total: last keyword-anchored match, else the largest amount on the page.
fn extract_total(text: &str, amounts: &[f64]) -> Option<f64> {
    let keyword_hit = TOTAL_RE
        .captures_iter(text)
        .filter_map(|c| parse_amount(&c[1]))
        .last();
    if keyword_hit.is_some() {
        return keyword_hit;
    }
    amounts.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    })
}

/// Tax: last keyword-anchored match; for USD receipts with a total but no
/// tax line, infer it — find the amount that solves `tax ≈ subtotal × rate`
/// where `subtotal = total − tax`.
fn extract_tax(
    text: &str,
    currency: Currency,
    total: Option<f64>,
    amounts: &[f64],
    config: &ExtractionConfig,
) -> Option<f64> {
    let keyword_hit = TAX_RE
        .captures_iter(text)
        .filter_map(|c| parse_amount(&c[1]))
        .last();
    if keyword_hit.is_some() {
        return keyword_hit;
    }

    if currency != Currency::Usd {
        return None;
    }
    let total = total?;
    let rate = config.regional_sales_tax_rate;
    amounts
        .iter()
        .copied()
        .find(|&amt| (amt - (total - amt) * rate).abs() < TAX_INFERENCE_TOLERANCE)
}

/// Tip: first keyword-anchored match wins.
fn extract_tip(text: &str) -> Option<f64> {
    TIP_RE
        .captures_iter(text)
        .filter_map(|c| parse_amount(&c[1]))
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    fn extract(text: &str, currency: Currency) -> ExtractedFields {
        extract_fields(text, currency, &config())
    }

    // ── amounts ──

    #[test]
    fn amount_strips_thousands_separators() {
        let fields = extract("Total: $1,234.56", Currency::Usd);
        assert_eq!(fields.total, Some(1234.56));
    }

    #[test]
    fn candidates_collected_in_document_order() {
        let amounts = monetary_candidates("$10.00 then 2,500.75 then 3.99");
        assert_eq!(amounts, vec![10.0, 2500.75, 3.99]);
    }

    #[test]
    fn malformed_amounts_are_skipped() {
        assert!(monetary_candidates("$abc $1.2 no amounts").is_empty());
    }

    // ── vendor ──

    #[test]
    fn vendor_prefers_short_line_over_slogan() {
        let text = "Serving the border region since 1985 every day\nACME STORE\n01/15/2024";
        let fields = extract(text, Currency::Usd);
        assert_eq!(fields.vendor.as_deref(), Some("ACME STORE"));
    }

    #[test]
    fn vendor_skips_stop_word_lines() {
        let text = "FACTURA ORIGINAL\nFerreteria Juarez\nRFC XAXX010101000";
        let fields = extract(text, Currency::Mxn);
        assert_eq!(fields.vendor.as_deref(), Some("Ferreteria Juarez"));
    }

    #[test]
    fn vendor_strips_logo_noise() {
        let text = "|| ACME STORE #42 ||\n01/15/2024";
        let fields = extract(text, Currency::Usd);
        assert_eq!(fields.vendor.as_deref(), Some("ACME STORE #42"));
    }

    #[test]
    fn vendor_falls_back_to_first_line() {
        // Every line is a stop-word line: fall back to the first one.
        let text = "RECEIPT\nTICKET 9912";
        let fields = extract(text, Currency::Usd);
        assert_eq!(fields.vendor.as_deref(), Some("RECEIPT"));
    }

    #[test]
    fn vendor_none_on_empty_text() {
        assert_eq!(extract("", Currency::Usd).vendor, None);
        assert_eq!(extract("   \n  \n", Currency::Usd).vendor, None);
    }

    // ── date ──

    #[test]
    fn iso_date_normalized() {
        let fields = extract("Fecha: 2024-3-7", Currency::Mxn);
        assert_eq!(fields.date.as_deref(), Some("2024-03-07"));
    }

    #[test]
    fn slash_date_read_month_first() {
        let fields = extract("01/15/2024", Currency::Usd);
        assert_eq!(fields.date.as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn two_digit_year_expands_to_2000s() {
        let fields = extract("Date 3/9/24", Currency::Usd);
        assert_eq!(fields.date.as_deref(), Some("2024-03-09"));
    }

    #[test]
    fn impossible_date_is_skipped_for_later_candidate() {
        // 25/40/2024 fails month validation; scanning continues to the next one.
        let fields = extract("25/40/2024 then 01/15/2024", Currency::Usd);
        assert_eq!(fields.date.as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn no_date_stays_absent() {
        assert_eq!(extract("no dates here", Currency::Usd).date, None);
    }

    // ── total ──

    #[test]
    fn last_total_keyword_wins() {
        let text = "Total 50.00\nmore items\nTotal 75.25";
        assert_eq!(extract(text, Currency::Usd).total, Some(75.25));
    }

    #[test]
    fn spanish_total_keywords_recognized() {
        let text = "IMPORTE TOTAL: $ 1,188.00";
        assert_eq!(extract(text, Currency::Mxn).total, Some(1188.0));
    }

    #[test]
    fn total_falls_back_to_largest_amount() {
        let text = "Items\n12.50\n99.99\n5.00";
        assert_eq!(extract(text, Currency::Usd).total, Some(99.99));
    }

    // ── tax ──

    #[test]
    fn tax_tolerates_inline_rate_token() {
        let text = "Subtotal 190.00\nIVA 16% 30.40\nTotal 220.40";
        let fields = extract(text, Currency::Mxn);
        assert_eq!(fields.tax, Some(30.40));
    }

    #[test]
    fn tax_inference_finds_regional_rate_amount() {
        // No tax keyword anywhere; 8.25 ≈ (108.25 − 8.25) × 0.0825.
        let text = "ACME\n100.00\n8.25\nAmount 108.25";
        let fields = extract(text, Currency::Usd);
        assert_eq!(fields.total, Some(108.25));
        assert_eq!(fields.tax, Some(8.25));
    }

    #[test]
    fn tax_inference_skipped_for_mxn() {
        let text = "TIENDA\n100.00\n8.25\n108.25";
        let fields = extract_fields(text, Currency::Mxn, &config());
        assert_eq!(fields.tax, None);
    }

    // ── tip ──

    #[test]
    fn first_tip_match_wins() {
        let text = "PROPINA: 20\nTip 35.00";
        assert_eq!(extract(text, Currency::Mxn).tip, Some(20.0));
    }

    // ── subtotal law ──

    #[test]
    fn subtotal_is_total_minus_tax_minus_tip() {
        let text = "DINER\nTotal 120.00\nTax 8.00\nTip 12.00";
        let fields = extract(text, Currency::Usd);
        assert_eq!(fields.subtotal, Some(100.0));
    }

    #[test]
    fn subtotal_absent_without_tax() {
        let text = "STORE\nTotal 120.00";
        assert_eq!(extract(text, Currency::Mxn).subtotal, None);
    }

    // ── whole-engine properties ──

    #[test]
    fn extraction_is_idempotent() {
        let text = "ACME STORE\n01/15/2024\nSubtotal 100.00\nSales Tax 8.25\nTotal 108.25";
        let first = extract(text, Currency::Usd);
        let second = extract(text, Currency::Usd);
        assert_eq!(first, second);
    }

    #[test]
    fn end_to_end_acme_receipt() {
        let text = "ACME STORE\n01/15/2024\nSubtotal 100.00\nSales Tax 8.25\nTotal 108.25";
        let fields = extract(text, Currency::Usd);
        assert_eq!(fields.vendor.as_deref(), Some("ACME STORE"));
        assert_eq!(fields.date.as_deref(), Some("2024-01-15"));
        assert_eq!(fields.total, Some(108.25));
        assert_eq!(fields.tax, Some(8.25));
        assert_eq!(fields.subtotal, Some(100.0));
        assert_eq!(fields.tip, None);
    }

    #[test]
    fn empty_text_yields_empty_fields() {
        let fields = extract("", Currency::Usd);
        assert_eq!(fields, ExtractedFields::default());
    }
}
