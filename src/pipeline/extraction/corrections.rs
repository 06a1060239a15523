//! Vendor-specific misread overrides.
//!
//! A small, auditable table for recurring, confirmed recognition errors:
//! when a known vendor's receipt produces a specific garbled total, the
//! registered total/tax/subtotal triple replaces the extracted values.
//! Anything short of an exact hit passes through unmodified, so the table
//! cannot mask genuine extraction errors.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::ExtractedFields;

/// One registered correction. Fires only when the detected vendor contains
/// `vendor_contains` (case-insensitive) AND the extracted total equals
/// `garbled_total` to the cent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorCorrection {
    pub vendor_contains: String,
    pub garbled_total: f64,
    pub corrected_total: f64,
    pub corrected_tax: Option<f64>,
    pub corrected_subtotal: Option<f64>,
}

impl VendorCorrection {
    /// Load a correction table from a JSON file (array of entries).
    pub fn load_from_file(path: &Path) -> Result<Vec<Self>, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn matches(&self, vendor: &str, total: f64) -> bool {
        vendor
            .to_lowercase()
            .contains(&self.vendor_contains.to_lowercase())
            && cents(total) == cents(self.garbled_total)
    }
}

/// Compare currency amounts at cent granularity.
fn cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Apply the first matching correction, if any. Logs every hit so
/// overrides stay visible in the audit trail.
pub fn apply_corrections(fields: &mut ExtractedFields, table: &[VendorCorrection]) {
    let Some(vendor) = &fields.vendor else { return };
    let Some(total) = fields.total else { return };

    for correction in table {
        if correction.matches(vendor, total) {
            tracing::info!(
                vendor = %vendor,
                garbled = correction.garbled_total,
                corrected = correction.corrected_total,
                "Applying registered vendor misread correction"
            );
            fields.total = Some(correction.corrected_total);
            if correction.corrected_tax.is_some() {
                fields.tax = correction.corrected_tax;
            }
            if correction.corrected_subtotal.is_some() {
                fields.subtotal = correction.corrected_subtotal;
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<VendorCorrection> {
        vec![VendorCorrection {
            vendor_contains: "oxxo".into(),
            garbled_total: 18825.0,
            corrected_total: 188.25,
            corrected_tax: Some(25.97),
            corrected_subtotal: Some(162.28),
        }]
    }

    fn fields(vendor: &str, total: f64) -> ExtractedFields {
        ExtractedFields {
            vendor: Some(vendor.into()),
            total: Some(total),
            ..Default::default()
        }
    }

    #[test]
    fn exact_registered_match_fires() {
        let mut f = fields("OXXO Tienda 4412", 18825.0);
        apply_corrections(&mut f, &table());
        assert_eq!(f.total, Some(188.25));
        assert_eq!(f.tax, Some(25.97));
        assert_eq!(f.subtotal, Some(162.28));
    }

    #[test]
    fn near_miss_total_passes_through() {
        let mut f = fields("OXXO Tienda 4412", 18825.5);
        apply_corrections(&mut f, &table());
        assert_eq!(f.total, Some(18825.5));
        assert_eq!(f.tax, None);
    }

    #[test]
    fn other_vendor_passes_through() {
        let mut f = fields("ACME STORE", 18825.0);
        apply_corrections(&mut f, &table());
        assert_eq!(f.total, Some(18825.0));
    }

    #[test]
    fn missing_total_never_fires() {
        let mut f = ExtractedFields {
            vendor: Some("OXXO".into()),
            ..Default::default()
        };
        apply_corrections(&mut f, &table());
        assert_eq!(f.total, None);
    }

    #[test]
    fn empty_table_is_a_no_op() {
        let mut f = fields("OXXO", 18825.0);
        apply_corrections(&mut f, &[]);
        assert_eq!(f.total, Some(18825.0));
    }
}
