use actix_web::HttpResponse;

/// Liveness probe; always succeeds while the process is serving.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
