use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Frontera";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,frontera=debug".to_string()
}

/// Get the application data directory (~/Frontera on all platforms).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Frontera")
}

/// Runtime configuration, loaded once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Directory where uploaded receipts are stored.
    pub upload_dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_upload_size: usize,
    /// Regional US sales-tax rate applied to invoice subtotals and mirrored
    /// by the extraction engine's tax-inference fallback.
    pub regional_sales_tax_rate: f64,
    /// Tesseract language string for recognition.
    pub ocr_languages: String,
    /// Hard ceiling on one recognition call; OCR latency is unbounded for
    /// large multi-page documents.
    pub recognition_timeout_secs: u64,
    /// Optional JSON file with vendor-specific misread corrections.
    pub corrections_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_path: app_data_dir().join("frontera.db"),
            upload_dir: app_data_dir().join("uploads"),
            max_upload_size: 10 * 1024 * 1024,
            regional_sales_tax_rate: 0.0825,
            ocr_languages: "eng+spa".to_string(),
            recognition_timeout_secs: 120,
            corrections_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("FRONTERA_HOST").unwrap_or(defaults.host),
            port: std::env::var("FRONTERA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_path: std::env::var("FRONTERA_DATABASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            upload_dir: std::env::var("FRONTERA_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_size: std::env::var("FRONTERA_MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_size),
            regional_sales_tax_rate: std::env::var("FRONTERA_SALES_TAX_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.regional_sales_tax_rate),
            ocr_languages: std::env::var("FRONTERA_OCR_LANGUAGES")
                .unwrap_or(defaults.ocr_languages),
            recognition_timeout_secs: std::env::var("FRONTERA_RECOGNITION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.recognition_timeout_secs),
            corrections_file: std::env::var("FRONTERA_CORRECTIONS_FILE")
                .ok()
                .map(PathBuf::from),
        }
    }

    /// Invoice tax policy: tax and total derived from subtotal, 2-decimal
    /// rounding. The extraction engine's inference fallback mirrors this rate.
    pub fn compute_invoice_tax(&self, subtotal: f64) -> (f64, f64) {
        let tax = round2(subtotal * self.regional_sales_tax_rate);
        let total = round2(subtotal + tax);
        (tax, total)
    }
}

/// Round to 2 decimal places (currency precision).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Frontera"));
    }

    #[test]
    fn default_rate_is_regional() {
        let config = AppConfig::default();
        assert!((config.regional_sales_tax_rate - 0.0825).abs() < f64::EPSILON);
    }

    #[test]
    fn invoice_tax_rounds_to_cents() {
        let config = AppConfig::default();
        let (tax, total) = config.compute_invoice_tax(100.0);
        assert_eq!(tax, 8.25);
        assert_eq!(total, 108.25);

        let (tax, total) = config.compute_invoice_tax(19.99);
        assert_eq!(tax, 1.65); // 1.649175 rounds to 1.65
        assert_eq!(total, 21.64);
    }

    #[test]
    fn round2_truncates_sub_cent_noise() {
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(2.346), 2.35);
        assert_eq!(round2(108.25), 108.25);
    }
}
