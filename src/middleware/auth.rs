use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

// Everything except the login/register flow and the stylesheet requires
// a logged-in session.
pub async fn require_auth(
    session: Session,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();

    if path == "/login" || path == "/register" || path.starts_with("/static") {
        return next.run(req).await;
    }

    match session.get::<String>("user_session").await {
        Ok(Some(_)) => next.run(req).await,
        _ => Redirect::to("/login").into_response(),
    }
}
