//! Route table and middleware stack.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use super::endpoints::{companies, customs, expenses, health, invoices, reconciliation};
use super::AppState;

/// Body-limit headroom over the upload cap for multipart framing.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.max_upload_size + BODY_OVERHEAD_BYTES;
    let uploads_dir = state.uploads.dir().to_path_buf();

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/companies",
            post(companies::create_company).get(companies::list_companies),
        )
        .route(
            "/api/companies/:id",
            get(companies::get_company)
                .put(companies::update_company)
                .delete(companies::delete_company),
        )
        .route(
            "/api/invoices",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route(
            "/api/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/api/expenses/upload", post(expenses::upload_receipt))
        .route(
            "/api/expenses",
            post(expenses::create_expense).get(expenses::list_expenses),
        )
        .route(
            "/api/expenses/:id",
            get(expenses::get_expense)
                .put(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        .route(
            "/api/customs",
            post(customs::create_customs_log).get(customs::list_customs_logs),
        )
        .route(
            "/api/customs/:id",
            get(customs::get_customs_log)
                .put(customs::update_customs_log)
                .delete(customs::delete_customs_log),
        )
        .route("/api/reconciliation", get(reconciliation::get_reconciliation))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::db::open_memory_database;
    use crate::models::Expense;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::MockPageRasterizer;
    use crate::pipeline::extraction::{ExtractionConfig, ReceiptProcessor};
    use crate::pipeline::import::UploadStore;
    use crate::pipeline::reconcile::{BankFeed, BankTransaction};

    const ACME: &str = "ACME STORE\n01/15/2024\nSubtotal 100.00\nSales Tax 8.25\nTotal 108.25";

    struct StubFeed(Vec<BankTransaction>);

    impl BankFeed for StubFeed {
        fn transactions_for(&self, _expenses: &[Expense]) -> Vec<BankTransaction> {
            self.0.clone()
        }
    }

    fn test_app(feed: Vec<BankTransaction>) -> (tempfile::TempDir, Router) {
        let uploads_dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            upload_dir: uploads_dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let db = open_memory_database().unwrap();
        let processor = ReceiptProcessor::new(
            Box::new(MockOcrEngine::new(ACME)),
            Box::new(MockPageRasterizer::new(1)),
            ExtractionConfig::default(),
        );
        let uploads = UploadStore::new(uploads_dir.path(), config.max_upload_size).unwrap();
        let state = AppState::new(config, db, processor, uploads, Arc::new(StubFeed(feed)));
        (uploads_dir, build_router(state))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_test_company(app: &Router) -> i64 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/companies",
                serde_json::json!({"name": "Laredo Freight LLC", "ein": "12-3456789"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (_guard, app) = test_app(vec![]);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn duplicate_ein_is_rejected() {
        let (_guard, app) = test_app(vec![]);
        create_test_company(&app).await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/companies",
                serde_json::json!({"name": "Other", "ein": "12-3456789"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invoice_gets_server_side_tax() {
        let (_guard, app) = test_app(vec![]);
        let company_id = create_test_company(&app).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/invoices",
                serde_json::json!({
                    "company_id": company_id,
                    "invoice_number": "INV-0001",
                    "date": "2024-01-15",
                    "subtotal": 100.0
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["tax_amount"], 8.25);
        assert_eq!(json["total"], 108.25);
        assert_eq!(json["currency"], "USD");
    }

    #[tokio::test]
    async fn missing_company_yields_404() {
        let (_guard, app) = test_app(vec![]);
        let response = app
            .oneshot(Request::get("/api/companies/99").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn multipart_upload(uri: &str, company_id: i64, filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "frontera-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"company_id\"\r\n\r\n{company_id}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn small_png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(120, 80, image::Luma([255]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut cursor, image::ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[tokio::test]
    async fn upload_returns_reviewable_extraction() {
        let (_guard, app) = test_app(vec![]);
        let company_id = create_test_company(&app).await;

        let request = multipart_upload(
            "/api/expenses/upload",
            company_id,
            "receipt.png",
            "image/png",
            &small_png(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["detected_currency"], "USD");
        assert_eq!(json["extracted_fields"]["vendor"], "ACME STORE");
        assert_eq!(json["extracted_fields"]["date"], "2024-01-15");
        assert_eq!(json["extracted_fields"]["total"], 108.25);
        assert_eq!(json["extracted_fields"]["tax"], 8.25);
        assert_eq!(json["extracted_fields"]["subtotal"], 100.0);
        assert_eq!(json["confidence"], "high");
    }

    #[tokio::test]
    async fn upload_with_bad_extension_is_rejected() {
        let (_guard, app) = test_app(vec![]);
        let company_id = create_test_company(&app).await;

        let request = multipart_upload(
            "/api/expenses/upload",
            company_id,
            "receipt.exe",
            "image/png",
            &small_png(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reconciliation_matches_expense_to_stub_feed() {
        let txn = BankTransaction {
            transaction_id: "TXN-1".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            description: "Card purchase".into(),
            amount: 50.0,
            currency: crate::models::enums::Currency::Usd,
        };
        let (_guard, app) = test_app(vec![txn]);
        let company_id = create_test_company(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/expenses",
                serde_json::json!({
                    "company_id": company_id,
                    "description": "Fuel",
                    "amount": 50.0,
                    "date": "2024-01-10"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::get(format!("/api/reconciliation?company_id={company_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json[0]["match_confidence"], "exact");
        assert_eq!(
            json[0]["matching_transaction"]["transaction_id"],
            "TXN-1"
        );
    }
}
