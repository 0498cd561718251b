//! End-to-end checks against a stand-in classification service on loopback.

use actix_multipart::Multipart;
use actix_web::{web, App, HttpResponse, HttpServer};
use cleancar_backend::classifier::{Classifier, HttpClassifier, RemoteError};
use cleancar_backend::pipeline::ImageUpload;
use cleancar_backend::{ClassificationRequest, Orchestrator, PipelineConfig};
use futures::TryStreamExt;
use serde_json::{json, Value};
use shared::{BackendStatus, ResultSource};
use std::time::Duration;

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "service": "CleanCar Classifier API",
        "status": "running",
        "model_loaded": true,
        "num_classes": 196,
        "eligible_count": 41,
        "csv_entries": 1200,
        "version": "1.0.0"
    }))
}

async fn model_info() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "num_classes": 196,
        "eligible_count": 41,
        "model_type": "MobileNetV2 Transfer Learning",
        "input_size": [224, 224, 3],
        "has_class_names": false,
        "has_csv_data": true
    }))
}

fn tesla_verdict() -> Value {
    json!({
        "name": "Tesla Model S Sedan 2012",
        "qualified": true,
        "confidence": 91.3,
        "class_index": 188,
        "eligibility_reason": "Tesla Model S is eligible for Clean Cars 4 All"
    })
}

async fn predict(mut payload: Multipart) -> Result<HttpResponse, actix_web::Error> {
    while let Some(mut field) = payload.try_next().await? {
        let is_image = field
            .content_type()
            .map(|mime| mime.type_() == "image")
            .unwrap_or(false);
        let mut size = 0;
        while let Some(chunk) = field.try_next().await? {
            size += chunk.len();
        }
        if !is_image {
            return Ok(HttpResponse::BadRequest()
                .json(json!({"detail": "File must be an image (JPG, PNG, etc.)"})));
        }
        if size == 0 {
            return Ok(HttpResponse::InternalServerError()
                .json(json!({"detail": "Prediction failed: empty image"})));
        }
        return Ok(HttpResponse::Ok().json(tesla_verdict()));
    }
    Ok(HttpResponse::UnprocessableEntity().json(json!({"detail": "file missing"})))
}

async fn predict_url(body: web::Json<Value>) -> HttpResponse {
    let url = body.get("url").and_then(Value::as_str).unwrap_or_default();
    if url.contains("broken") {
        HttpResponse::BadRequest()
            .json(json!({"detail": "Failed to fetch image from URL: 404 Client Error"}))
    } else if url.contains("garbage") {
        HttpResponse::Ok()
            .content_type("application/json")
            .body("<html>not json</html>")
    } else if url.contains("slow") {
        actix_web::rt::time::sleep(Duration::from_secs(3)).await;
        HttpResponse::Ok().json(tesla_verdict())
    } else if url.contains("unsure") {
        HttpResponse::Ok().json(json!({
            "name": "Ford F-150 Regular Cab 2012",
            "qualified": false,
            "confidence": 0.9,
            "class_index": 77,
            "eligibility_reason": "Not eligible"
        }))
    } else if url.contains("plain") {
        HttpResponse::BadGateway().body("upstream exploded")
    } else {
        HttpResponse::Ok().json(tesla_verdict())
    }
}

fn spawn_classifier() -> String {
    let server = HttpServer::new(|| {
        App::new()
            .route("/", web::get().to(root))
            .route("/model-info", web::get().to(model_info))
            .route("/predict", web::post().to(predict))
            .route("/predict-url", web::post().to(predict_url))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

/// A loopback address nothing listens on.
fn dead_backend() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn client(base_url: &str) -> HttpClassifier {
    HttpClassifier::new(base_url, Duration::from_millis(1500)).unwrap()
}

fn jpeg(name: &str) -> ImageUpload {
    ImageUpload::new(name, "image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0])
}

#[actix_web::test]
async fn health_reports_missing_metadata_as_warning() {
    let base = spawn_classifier();
    let info = client(&base).health().await.unwrap();
    assert_eq!(info.service, "CleanCar Classifier API");
    assert_eq!(info.num_classes, 196);
    assert_eq!(info.version.as_deref(), Some("1.0.0"));

    let model = info.model.as_ref().unwrap();
    assert!(model.has_eligibility_table());
    assert!(!model.has_class_names);
    assert_eq!(info.warnings.len(), 1);
    assert!(info.warnings[0].contains("Class-name table"));
}

#[actix_web::test]
async fn classify_file_returns_verdict() {
    let base = spawn_classifier();
    let verdict = client(&base)
        .classify_file(&jpeg("car.jpg"))
        .await
        .unwrap();
    assert_eq!(verdict.name, "Tesla Model S Sedan 2012");
    assert_eq!(verdict.class_index, 188);
    assert!(verdict.qualified);
}

#[actix_web::test]
async fn error_detail_is_surfaced_verbatim() {
    let base = spawn_classifier();
    let upload = ImageUpload::new("doc.pdf", "application/pdf", vec![1, 2, 3]);
    let err = client(&base).classify_file(&upload).await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::HttpStatus {
            status: 400,
            detail: "File must be an image (JPG, PNG, etc.)".to_string()
        }
    );

    let err = client(&base)
        .classify_url("https://example.com/broken.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::HttpStatus { status: 400, ref detail } if detail.contains("404 Client Error")));
}

#[actix_web::test]
async fn non_json_error_body_gets_generic_detail() {
    let base = spawn_classifier();
    let err = client(&base)
        .classify_url("https://example.com/plain.jpg")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RemoteError::HttpStatus {
            status: 502,
            detail: "Backend error: 502".to_string()
        }
    );
}

#[actix_web::test]
async fn malformed_body_is_reported() {
    let base = spawn_classifier();
    let err = client(&base)
        .classify_url("https://example.com/garbage.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::MalformedResponse(_)), "{err:?}");
}

#[actix_web::test]
async fn timeout_maps_to_unreachable() {
    let base = spawn_classifier();
    let client = HttpClassifier::new(&base, Duration::from_millis(200)).unwrap();
    let err = client
        .classify_url("https://example.com/slow.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Unreachable(_)), "{err:?}");
}

#[actix_web::test]
async fn refused_connection_maps_to_unreachable() {
    let err = client(&dead_backend()).health().await.unwrap_err();
    assert!(matches!(err, RemoteError::Unreachable(_)), "{err:?}");
}

#[actix_web::test]
async fn live_pipeline_uses_remote_verdict() {
    let base = spawn_classifier();
    let pipeline =
        Orchestrator::from_config(&PipelineConfig::default().with_backend_url(base)).unwrap();
    assert_eq!(pipeline.health().await, BackendStatus::Connected);

    let request = ClassificationRequest::file("img001.jpg", "image/jpeg", vec![0xff, 0xd8]);
    let result = pipeline.resolve(&request).await.unwrap();
    assert_eq!(result.source, ResultSource::Remote);
    assert!(result.qualified);
    assert!((result.confidence - 0.913).abs() < 1e-6);
    assert_eq!(result.eligible_years.unwrap().to_string(), "2015-2025");
    assert!(result.notice.is_none());
}

#[actix_web::test]
async fn sub_one_percent_confidence_stays_small() {
    let base = spawn_classifier();
    let pipeline =
        Orchestrator::from_config(&PipelineConfig::default().with_backend_url(base)).unwrap();
    let request = ClassificationRequest::url("https://example.com/unsure.jpg");
    let result = pipeline.resolve(&request).await.unwrap();
    assert_eq!(result.source, ResultSource::Remote);
    assert!((result.confidence - 0.009).abs() < 1e-6, "{}", result.confidence);
}

#[actix_web::test]
async fn remote_http_error_falls_back() {
    let base = spawn_classifier();
    let pipeline =
        Orchestrator::from_config(&PipelineConfig::default().with_backend_url(base)).unwrap();
    let request = ClassificationRequest::url("https://example.com/broken/rivian_r1t.jpg");
    let result = pipeline.resolve(&request).await.unwrap();
    assert_eq!(result.source, ResultSource::LocalMatch);
    assert_eq!(result.name, "Rivian R1T");
    assert!(result.backend_error.unwrap().contains("404 Client Error"));
}

#[actix_web::test]
async fn unreachable_backend_matches_file_name() {
    let pipeline =
        Orchestrator::from_config(&PipelineConfig::default().with_backend_url(dead_backend()))
            .unwrap();
    assert_eq!(pipeline.health().await, BackendStatus::Unreachable);

    let request = ClassificationRequest::file("tesla_model3.jpg", "image/jpeg", vec![0xff, 0xd8]);
    let result = pipeline.resolve(&request).await.unwrap();
    assert_eq!(result.source, ResultSource::LocalMatch);
    assert!(result.qualified);
    assert!(!result.requires_manual_input);
}

#[actix_web::test]
async fn unreachable_backend_with_opaque_name_needs_manual_input() {
    let pipeline =
        Orchestrator::from_config(&PipelineConfig::default().with_backend_url(dead_backend()))
            .unwrap();

    let request = ClassificationRequest::file("img001.jpg", "image/jpeg", vec![0xff, 0xd8]);
    let pending = pipeline.resolve(&request).await.unwrap();
    assert!(pending.requires_manual_input);
    assert!(!pending.qualified);

    let manual = pipeline.resolve_manual("Nissan", "Leaf");
    assert_eq!(manual.source, ResultSource::ManualEntry);
    assert!(manual.qualified);
    assert_eq!(manual, pipeline.resolve_manual("Nissan", "Leaf"));
}
