use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;

use super::identity::{IdentityProvider, Principal};
use crate::errors::AppError;

/// Extractor for routes that require a verified bearer token.
/// Answers 401 before the handler runs when the token is missing or rejected.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl AuthUser {
    pub fn id(&self) -> uuid::Uuid {
        self.0.id
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate(&req).await.map(AuthUser) })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verify the request's bearer token with the configured identity provider.
/// Used directly by routes that are public unless a management flag is set.
pub async fn authenticate(req: &HttpRequest) -> Result<Principal, AppError> {
    let token = bearer_token(req).ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let provider = req
        .app_data::<web::Data<dyn IdentityProvider>>()
        .ok_or_else(|| AppError::Internal {
            context: "Authentication failed",
            detail: "no identity provider registered".into(),
        })?;

    match provider.verify(token).await {
        Ok(Some(principal)) => Ok(principal),
        Ok(None) => Err(AppError::Unauthorized("Invalid token".into())),
        Err(e) => {
            log::warn!("Token verification failed: {e}");
            Err(AppError::Unauthorized("Authentication failed".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_token_parsing() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default().insert_header(("Authorization", "Bearer ")).to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
