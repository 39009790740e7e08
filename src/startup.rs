use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenBlocklist;
use crate::configuration::Settings;
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{current_user, health_check, login, logout, refresh, signup};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
    blocklist: Arc<dyn TokenBlocklist>,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config = web::Data::new(settings.jwt.clone());
    let revocation = web::Data::new(settings.revocation.clone());
    let blocklist_data: web::Data<dyn TokenBlocklist> = web::Data::from(blocklist.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)

            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config.clone())
            .app_data(revocation.clone())
            .app_data(blocklist_data.clone())

            // Public routes; refresh and logout validate their own bearer
            // tokens (refresh-kind and access-kind respectively)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))

            // Protected routes (require a valid, unrevoked access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(
                        settings.jwt.clone(),
                        settings.revocation.clone(),
                        blocklist.clone(),
                    ))
                    .route("/me", web::get().to(current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
