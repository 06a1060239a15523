//! Extraction confidence classification.
//!
//! A coarse completeness proxy, not a statistical confidence: count how many
//! fields the engine managed to populate and bucket the result. Results land
//! in the review screen either way; the bucket just steers attention.

use super::types::ExtractedFields;
use crate::models::enums::ExtractionConfidence;

/// Populated-field thresholds for the confidence buckets.
pub mod thresholds {
    /// At least this many fields: `high`.
    pub const HIGH: usize = 4;

    /// At least this many fields: `medium`. Below: `low`.
    pub const MEDIUM: usize = 2;
}

/// Bucket an extraction result by how many fields were populated.
pub fn classify(fields: &ExtractedFields) -> ExtractionConfidence {
    let populated = fields.populated_count();
    if populated >= thresholds::HIGH {
        ExtractionConfidence::High
    } else if populated >= thresholds::MEDIUM {
        ExtractionConfidence::Medium
    } else {
        ExtractionConfidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_populated(n: usize) -> ExtractedFields {
        let mut fields = ExtractedFields::default();
        let setters: Vec<Box<dyn Fn(&mut ExtractedFields)>> = vec![
            Box::new(|f| f.vendor = Some("ACME".into())),
            Box::new(|f| f.date = Some("2024-01-15".into())),
            Box::new(|f| f.total = Some(108.25)),
            Box::new(|f| f.tax = Some(8.25)),
            Box::new(|f| f.subtotal = Some(100.0)),
            Box::new(|f| f.tip = Some(5.0)),
        ];
        for setter in setters.iter().take(n) {
            setter(&mut fields);
        }
        fields
    }

    #[test]
    fn five_fields_is_high() {
        assert_eq!(classify(&with_populated(5)), ExtractionConfidence::High);
    }

    #[test]
    fn four_fields_is_high() {
        assert_eq!(classify(&with_populated(4)), ExtractionConfidence::High);
    }

    #[test]
    fn three_fields_is_medium() {
        assert_eq!(classify(&with_populated(3)), ExtractionConfidence::Medium);
    }

    #[test]
    fn two_fields_is_medium() {
        assert_eq!(classify(&with_populated(2)), ExtractionConfidence::Medium);
    }

    #[test]
    fn one_field_is_low() {
        assert_eq!(classify(&with_populated(1)), ExtractionConfidence::Low);
    }

    #[test]
    fn empty_result_is_low() {
        assert_eq!(classify(&ExtractedFields::default()), ExtractionConfidence::Low);
    }
}
