use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use shared::{HelloResponse, LabelsResponse, PredictionResponse};
use uuid::Uuid;

use crate::error::InferenceError;
use crate::inference::InferenceService;

pub const IMAGE_FIELD: &str = "file";

#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

pub fn configure_routes(cfg: &mut web::ServiceConfig, max_upload_bytes: usize) {
    cfg.app_data(web::Data::new(UploadLimit(max_upload_bytes)))
        .service(web::resource("/").route(web::get().to(hello)))
        .service(web::resource("/api/labels").route(web::get().to(labels)))
        .service(web::resource("/api/predict").route(web::post().to(predict)));
}

async fn hello() -> HttpResponse {
    HttpResponse::Ok().json(HelloResponse::default())
}

async fn labels(service: web::Data<InferenceService>) -> HttpResponse {
    HttpResponse::Ok().json(LabelsResponse {
        labels: service.labels().iter().map(|l| l.to_string()).collect(),
    })
}

async fn predict(
    service: web::Data<InferenceService>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> Result<HttpResponse, InferenceError> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let image = read_image_field(payload, limit.0).await?;
    log::info!("[{}] Received {} byte upload", request_id, image.len());

    let service = service.into_inner();
    let prediction = web::block(move || service.predict(&image)).await??;

    log::info!(
        "[{}] Predicted {} (class {}, {:.4}) in {:?}",
        request_id,
        prediction.label,
        prediction.index,
        prediction.confidence,
        started.elapsed()
    );
    Ok(HttpResponse::Ok().json(PredictionResponse {
        predicted_disease: prediction.label.to_string(),
        confidence_score: prediction.confidence,
    }))
}

/// Returns the bytes of the `file` field, or of the first field carrying a
/// filename when no `file` field is present.
async fn read_image_field(mut payload: Multipart, limit: usize) -> Result<Vec<u8>, InferenceError> {
    let mut fallback: Option<Vec<u8>> = None;

    while let Some(mut field) = payload.try_next().await? {
        let is_image_field = field.name() == Some(IMAGE_FIELD);
        let has_filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > limit {
                return Err(InferenceError::PayloadTooLarge(limit));
            }
            data.extend_from_slice(&chunk);
        }

        if is_image_field {
            return Ok(data);
        }
        if has_filename && fallback.is_none() {
            fallback = Some(data);
        }
    }

    fallback.ok_or_else(|| {
        InferenceError::Decode(format!(
            "Multipart form has no `{}` field or file upload",
            IMAGE_FIELD
        ))
    })
}
