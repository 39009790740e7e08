/// JWT Authentication Middleware
///
/// Runs the access-token validator (including the revocation check)
/// against the Authorization header and injects the decoded claims into
/// request extensions for use by route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{validate_bearer, TokenBlocklist, TokenKind};
use crate::configuration::{JwtSettings, RevocationSettings};

/// JWT middleware for protecting routes
///
/// Must be applied to routes that require authentication.
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
    revocation: RevocationSettings,
    blocklist: Arc<dyn TokenBlocklist>,
}

impl JwtMiddleware {
    /// Create new JWT middleware instance
    pub fn new(
        jwt_config: JwtSettings,
        revocation: RevocationSettings,
        blocklist: Arc<dyn TokenBlocklist>,
    ) -> Self {
        Self {
            jwt_config,
            revocation,
            blocklist,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
            revocation: self.revocation.clone(),
            blocklist: self.blocklist.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
    revocation: RevocationSettings,
    blocklist: Arc<dyn TokenBlocklist>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth_header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned);

        let jwt_config = self.jwt_config.clone();
        let revocation = self.revocation.clone();
        let blocklist = self.blocklist.clone();
        let service = self.service.clone();

        Box::pin(async move {
            match validate_bearer(
                auth_header.as_deref(),
                TokenKind::Access,
                &jwt_config,
                &revocation,
                blocklist.as_ref(),
            )
            .await
            {
                Ok(claims) => {
                    tracing::debug!(
                        user_id = %claims.sub,
                        email = %claims.email,
                        "access token validated"
                    );
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}
