use actix_web::HttpResponse;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::templates_structs::{MeResponse, MessageResponse};

/// GET /api/auth/me - The verified caller
pub async fn me(user: AuthUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(MeResponse { user: user.0 }))
}

/// POST /api/auth/logout - Tokens are held by the client, so there is nothing to revoke here
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::new("Logged out successfully"))
}
