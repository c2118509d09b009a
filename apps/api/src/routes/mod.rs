pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::export::handlers as export;
use crate::preferences::handlers as preferences;
use crate::resume::handlers as resume;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route(
            "/api/users/me",
            post(users::handle_onboard)
                .get(users::handle_get_me)
                .delete(users::handle_delete_me),
        )
        // Resumes
        .route(
            "/api/resume",
            get(resume::handle_list_resumes).post(resume::handle_save_resume),
        )
        .route(
            "/api/resume/:id",
            get(resume::handle_get_resume).delete(resume::handle_delete_resume),
        )
        // Preferences
        .route(
            "/api/user/preferences",
            get(preferences::handle_get_preferences).patch(preferences::handle_patch_palette),
        )
        .route(
            "/api/user/preferences/full",
            patch(preferences::handle_put_preferences),
        )
        // Export
        .route("/api/export/resume/pdf", get(export::handle_export_pdf))
        .route("/api/export/resume/docx", get(export::handle_export_docx))
        .route("/api/export/banner", get(export::handle_export_banner))
        // Loaded by the headless browser, no session
        .route("/render/banner", get(export::handle_render_banner))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::issue_token;
    use crate::export::browser::fake::{FakeLauncher, Outcome, PNG_STUB};
    use crate::models::resume::fixtures::sample_resume;
    use crate::models::{NewUser, Resume};
    use crate::repository::{MemoryRepository, UserRepository};
    use crate::state::testing::{memory_state, TEST_SECRET};

    struct Harness {
        app: Router,
        repo: Arc<MemoryRepository>,
        browser: Arc<FakeLauncher>,
        user_id: Uuid,
        token: String,
    }

    async fn harness(outcome: Outcome) -> Harness {
        let repo = Arc::new(MemoryRepository::new());
        let user_id = Uuid::new_v4();
        UserRepository::create(
            repo.as_ref(),
            user_id,
            &NewUser {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
            },
        )
        .await
        .unwrap();

        let browser = Arc::new(FakeLauncher::new(outcome));
        let state = memory_state(repo.clone(), browser.clone());
        Harness {
            app: build_router(state),
            repo,
            browser,
            user_id,
            token: issue_token(user_id, TEST_SECRET).unwrap(),
        }
    }

    impl Harness {
        async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.app.clone().oneshot(request).await.unwrap()
        }

        async fn seed_resume(&self) -> Resume {
            crate::resume::service::save_resume(self.repo.as_ref(), self.user_id, sample_resume(self.user_id))
                .await
                .unwrap()
                .resume
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let h = harness(Outcome::Capture).await;
        let response = h
            .app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let h = harness(Outcome::Capture).await;
        let response = h
            .app
            .clone()
            .oneshot(Request::builder().uri("/api/resume").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_save_creates_then_updates() {
        let h = harness(Outcome::Capture).await;
        let snapshot = serde_json::to_value(sample_resume(h.user_id)).unwrap();

        let created = h.send(Method::POST, "/api/resume", Some(snapshot)).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let saved = json_body(created).await;
        assert!(saved["id"].is_string());

        let updated = h.send(Method::POST, "/api/resume", Some(saved)).await;
        assert_eq!(updated.status(), StatusCode::OK);

        let listed = json_body(h.send(Method::GET, "/api/resume", None).await).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_foreign_user_id_is_forbidden() {
        let h = harness(Outcome::Capture).await;
        let uri = format!("/api/resume?user_id={}", Uuid::new_v4());
        let response = h.send(Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_palette_patch_round_trips() {
        let h = harness(Outcome::Capture).await;
        let patched = h
            .send(
                Method::PATCH,
                "/api/user/preferences",
                Some(serde_json::json!({ "palette": "forest" })),
            )
            .await;
        assert_eq!(patched.status(), StatusCode::OK);

        let prefs = json_body(h.send(Method::GET, "/api/user/preferences", None).await).await;
        assert_eq!(prefs["palette"], "forest");
    }

    #[tokio::test]
    async fn test_pdf_export_with_unknown_template_uses_default() {
        let h = harness(Outcome::Capture).await;
        h.seed_resume().await;
        let response = h
            .send(Method::GET, "/api/export/resume/pdf?template=baroque", None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("ada-lovelace-resume.pdf"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_unknown_palette_is_rejected() {
        let h = harness(Outcome::Capture).await;
        h.seed_resume().await;
        let response = h.send(Method::GET, "/api/export/resume/docx?palette=neon", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_without_resume_is_not_found() {
        let h = harness(Outcome::Capture).await;
        let response = h.send(Method::GET, "/api/export/resume/pdf", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_banner_export_returns_png() {
        let h = harness(Outcome::Capture).await;
        h.seed_resume().await;
        let response = h
            .send(Method::GET, "/api/export/banner?bannerColor=teal", None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], PNG_STUB);

        let urls = h.browser.counters.urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("http://127.0.0.1:8080/render/banner?"));
        assert!(urls[0].contains("bannerColor=teal"));
        assert!(urls[0].contains("name=Ada+Lovelace"));
        assert_eq!(h.browser.counters.closes(), 1);
    }

    #[tokio::test]
    async fn test_banner_failure_releases_browser() {
        let h = harness(Outcome::NeverReady).await;
        let response = h.send(Method::GET, "/api/export/banner", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"]["code"], "EXPORT_FAILED");
        assert_eq!(h.browser.counters.closes(), 1);
    }

    #[tokio::test]
    async fn test_banner_rejects_non_http_logo() {
        let h = harness(Outcome::Capture).await;
        let response = h
            .send(Method::GET, "/api/export/banner?logo=javascript:alert(1)", None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.browser.counters.launches(), 0);
    }

    #[tokio::test]
    async fn test_render_page_is_public() {
        let h = harness(Outcome::Capture).await;
        let response = h
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/render/banner?name=Ada&palette=sunset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Ada"));
    }

    #[tokio::test]
    async fn test_delete_account_cascades() {
        let h = harness(Outcome::Capture).await;
        h.seed_resume().await;
        assert_eq!(
            h.send(Method::DELETE, "/api/users/me", None).await.status(),
            StatusCode::NO_CONTENT
        );
        assert_eq!(
            h.send(Method::GET, "/api/users/me", None).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
