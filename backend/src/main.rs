mod config;
mod error;
mod inference;
mod routes;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use config::ServiceConfig;
use inference::InferenceService;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServiceConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::from(e)
    })?;
    log::info!(
        "Model: {}, input {}x{} ({:?}), output {:?}",
        config.model_path.display(),
        config.image.width,
        config.image.height,
        config.image.interpolation,
        config.model.output
    );

    // Refuse to serve anything until the classifier is loaded and validated.
    let service = match InferenceService::from_config(&config) {
        Ok(service) => web::Data::new(service),
        Err(e) => {
            log::error!("Failed to load model at startup: {}", e);
            return Err(e.into());
        }
    };

    let bind_address = config.bind_address();
    let max_upload_bytes = config.max_upload_bytes;
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(service.clone())
            .configure(|cfg| configure_routes(cfg, max_upload_bytes))
    })
    .bind(&bind_address)?
    .run()
    .await
}
