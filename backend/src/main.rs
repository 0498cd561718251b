use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use cleancar_backend::routes::configure_routes;
use cleancar_backend::{Backend, Orchestrator, PipelineConfig};
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = PipelineConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let pipeline = Orchestrator::from_config(&config).map_err(|e| {
        log::error!("Failed to build classifier client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    log::info!(
        "Classifier: {} (mode: {}, timeout: {}s)",
        config.backend_url,
        pipeline.mode(),
        config.request_timeout_secs
    );

    let status = pipeline.health().await;
    log::info!("Classifier status: {}", status);
    if let Some(info) = pipeline.service_info() {
        log::info!(
            "{} {} - {} classes, {} eligible",
            info.service,
            info.version.as_deref().unwrap_or("unknown"),
            info.num_classes,
            info.eligible_count
        );
    } else {
        log::warn!("Classifier unreachable at startup; requests will attempt it and fall back to offline matching");
    }

    let pipeline = web::Data::new(pipeline);

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting gateway on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .expose_headers(vec!["x-request-id"])
                    .max_age(3600),
            )
            .app_data(pipeline.clone())
            .configure(configure_routes::<Backend>)
    })
    .bind(&bind_address)?
    .run()
    .await
}
