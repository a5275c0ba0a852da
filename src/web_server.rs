use crate::config::AppConfig;
use crate::dispatcher::{BatchDispatcher, BatchRequest};
use crate::error::AppError;
use actix_web::{http::Method, middleware::DefaultHeaders, web, App, HttpResponse, HttpServer};
use std::path::Path;
use std::sync::Arc;

fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
        .add(("Access-Control-Allow-Methods", "POST, GET, OPTIONS"))
}

fn parse_batch(body: &[u8]) -> Result<BatchRequest, AppError> {
    let request: BatchRequest = serde_json::from_slice(body)?;
    log::debug!(
        "Received batch with {} queries and {:?} categories",
        request.queries.len(),
        request.categories.as_ref().map(Vec::len)
    );
    Ok(request)
}

async fn batch(
    dispatcher: web::Data<BatchDispatcher>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request = parse_batch(&body)?;
    let outcome = dispatcher.dispatch(request).await?;
    Ok(HttpResponse::Ok().json(outcome.results))
}

async fn batch_report(
    dispatcher: web::Data<BatchDispatcher>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request = parse_batch(&body)?;
    let outcome = dispatcher.dispatch(request).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/batch")
            .route(web::post().to(batch))
            .route(web::get().to(batch))
            .route(web::method(Method::OPTIONS).to(preflight)),
    )
    .service(
        web::resource("/batch/report")
            .route(web::post().to(batch_report))
            .route(web::method(Method::OPTIONS).to(preflight)),
    );
}

pub async fn start_web_server(
    config: Arc<AppConfig>,
    dispatcher: BatchDispatcher,
) -> std::io::Result<()> {
    let port = config.web_port;
    let static_dir = config.static_directory.clone();
    let serve_static = Path::new(&static_dir).is_dir();
    let dispatcher_data = web::Data::new(dispatcher);

    log::info!("Starting web server on port: {}", port);
    if serve_static {
        log::debug!("Serving static files from {}", static_dir);
    } else {
        log::warn!("Static directory {} not found; only /batch endpoints are served", static_dir);
    }

    HttpServer::new(move || {
        let app = App::new()
            .wrap(cors_headers())
            .app_data(dispatcher_data.clone())
            .configure(configure);
        if serve_static {
            app.service(actix_files::Files::new("/", &static_dir).index_file("index.html"))
        } else {
            app
        }
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
