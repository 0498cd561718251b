use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse};
use futures::TryStreamExt;
use log::{info, warn};
use shared::{
    ErrorResponse, HealthResponse, ManualEntryRequest, SearchQuery, UrlRequest, ValidationResponse,
};
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::pipeline::request::media_type_for_filename;
use crate::pipeline::validator::MAX_UPLOAD_BYTES;
use crate::pipeline::{ClassificationRequest, ImageUpload, Orchestrator, ValidationError};

const UPLOAD_FIELDS: &[&str] = &["file", "image"];

pub fn configure_routes<C: Classifier + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health::<C>)))
        .service(web::resource("/api/vehicles").route(web::get().to(list_vehicles::<C>)))
        .service(web::resource("/api/vehicles/search").route(web::get().to(search_vehicles::<C>)))
        .service(web::resource("/api/validate").route(web::post().to(validate_upload::<C>)))
        .service(web::resource("/api/resolve").route(web::post().to(resolve_upload::<C>)))
        .service(web::resource("/api/resolve-url").route(web::post().to(resolve_url::<C>)))
        .service(web::resource("/api/resolve-manual").route(web::post().to(resolve_manual::<C>)));
}

async fn health<C: Classifier + 'static>(pipeline: web::Data<Orchestrator<C>>) -> HttpResponse {
    let status = pipeline.health().await;
    HttpResponse::Ok().json(HealthResponse {
        status,
        info: pipeline.service_info().cloned(),
    })
}

async fn list_vehicles<C: Classifier + 'static>(
    pipeline: web::Data<Orchestrator<C>>,
) -> HttpResponse {
    HttpResponse::Ok().json(pipeline.list_eligible_vehicles())
}

async fn search_vehicles<C: Classifier + 'static>(
    pipeline: web::Data<Orchestrator<C>>,
    query: web::Query<SearchQuery>,
) -> HttpResponse {
    HttpResponse::Ok().json(pipeline.search(&query.q))
}

async fn validate_upload<C: Classifier + 'static>(
    pipeline: web::Data<Orchestrator<C>>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let request = read_upload(payload).await?;
    let response = match pipeline.validate(&request) {
        Ok(()) => ValidationResponse {
            valid: true,
            error: None,
        },
        Err(err) => ValidationResponse {
            valid: false,
            error: Some(err.to_string()),
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

async fn resolve_upload<C: Classifier + 'static>(
    pipeline: web::Data<Orchestrator<C>>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let request = read_upload(payload).await?;
    if let ClassificationRequest::File(upload) = &request {
        info!(
            "[{}] Resolving upload {:?} ({} bytes)",
            request_id,
            upload.filename,
            upload.size()
        );
    }
    Ok(respond(request_id, pipeline.resolve(&request).await))
}

async fn resolve_url<C: Classifier + 'static>(
    pipeline: web::Data<Orchestrator<C>>,
    body: web::Json<UrlRequest>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    info!("[{}] Resolving URL {}", request_id, body.url);
    let request = ClassificationRequest::url(body.into_inner().url);
    respond(request_id, pipeline.resolve(&request).await)
}

async fn resolve_manual<C: Classifier + 'static>(
    pipeline: web::Data<Orchestrator<C>>,
    body: web::Json<ManualEntryRequest>,
) -> HttpResponse {
    let entry = body.into_inner();
    let result = pipeline.resolve_manual_with_confidence(&entry.make, &entry.model, entry.confidence);
    HttpResponse::Ok().json(result)
}

fn respond(
    request_id: Uuid,
    outcome: Result<shared::ClassificationResult, ValidationError>,
) -> HttpResponse {
    match outcome {
        Ok(result) => HttpResponse::Ok()
            .insert_header(("x-request-id", request_id.to_string()))
            .json(result),
        Err(err) => {
            warn!("[{}] Rejected input: {}", request_id, err);
            HttpResponse::BadRequest()
                .insert_header(("x-request-id", request_id.to_string()))
                .json(ErrorResponse {
                    error: err.to_string(),
                })
        }
    }
}

/// Reads the first `file`/`image` part. Buffering stops one byte past the
/// upload limit; validation reports the oversize.
async fn read_upload(mut payload: Multipart) -> Result<ClassificationRequest, Error> {
    while let Some(mut field) = payload.try_next().await? {
        let is_upload = field
            .name()
            .map(|name| UPLOAD_FIELDS.contains(&name))
            .unwrap_or(false);
        if !is_upload {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|disposition| disposition.get_filename())
            .unwrap_or_default()
            .to_string();
        let media_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .filter(|mime| mime != "application/octet-stream")
            .or_else(|| media_type_for_filename(&filename).map(str::to_string))
            .unwrap_or_default();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            let room = (MAX_UPLOAD_BYTES + 1).saturating_sub(bytes.len());
            bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }
        return Ok(ClassificationRequest::File(ImageUpload::new(
            filename, media_type, bytes,
        )));
    }

    Ok(ClassificationRequest::File(ImageUpload::new(
        String::new(),
        String::new(),
        Vec::new(),
    )))
}
