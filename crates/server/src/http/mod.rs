use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{DeploymentImpl, routes};

pub mod auth;
pub mod extract;

pub fn router(deployment: DeploymentImpl) -> Router {
    let protected_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::tickets::router(&deployment))
        .merge(routes::users::router(&deployment))
        .layer(from_fn_with_state(
            deployment.clone(),
            auth::require_api_auth,
        ));

    let api_routes = Router::new()
        .merge(routes::auth::public_router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use db::models::user::Profile;
    use deployment::Deployment;
    use serde_json::{Value, json};
    use services::services::user::UserPayload;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{DeploymentImpl, test_support::TestEnvGuard};

    const PASSWORD: &str = "pa55word";

    async fn setup_deployment() -> (TestEnvGuard, DeploymentImpl) {
        let temp_root = std::env::temp_dir().join(format!("helpdesk-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_root).unwrap();
        std::fs::write(
            temp_root.join("config.json"),
            r#"{ "auth": { "bcryptCost": 4 }, "pagination": { "maxPageSize": 20 } }"#,
        )
        .unwrap();

        let db_path = temp_root.join("db.sqlite");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let env_guard = TestEnvGuard::new(&temp_root, db_url);

        let deployment = DeploymentImpl::new().await.unwrap();

        (env_guard, deployment)
    }

    async fn create_user(deployment: &DeploymentImpl, email: &str, profile: Profile) {
        deployment
            .users()
            .create(
                &deployment.db().pool,
                &UserPayload {
                    id: None,
                    email: Some(email.to_string()),
                    password: Some(PASSWORD.to_string()),
                    profile: Some(profile),
                },
            )
            .await
            .unwrap();
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn login(app: &Router, email: &str) -> String {
        let (status, json) = send(
            app,
            Method::POST,
            "/api/auth",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {json}");
        json["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_ticket(app: &Router, token: &str, title: &str) -> String {
        let (status, json) = send(
            app,
            Method::POST,
            "/api/ticket",
            Some(token),
            Some(json!({ "title": title, "priority": "High" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "create failed: {json}");
        json["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (status, json) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn api_requires_a_valid_token() {
        let (_env_guard, deployment) = setup_deployment().await;
        create_user(&deployment, "customer@helpdesk.com", Profile::Customer).await;
        let app = super::router(deployment);

        let (status, json) = send(&app, Method::GET, "/api/ticket/summary", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Unauthorized");

        let (status, _) = send(
            &app,
            Method::GET,
            "/api/ticket/summary",
            Some("not-a-token"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth",
            None,
            Some(json!({ "email": "customer@helpdesk.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login(&app, "customer@helpdesk.com").await;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/ticket/summary")
                    .header(header::AUTHORIZATION, token.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, json) = send(&app, Method::POST, "/api/refresh", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["user"]["email"], "customer@helpdesk.com");
        assert!(json["data"]["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn ticket_lifecycle_over_http() {
        let (_env_guard, deployment) = setup_deployment().await;
        create_user(&deployment, "customer@helpdesk.com", Profile::Customer).await;
        create_user(&deployment, "tech@helpdesk.com", Profile::Technician).await;
        let app = super::router(deployment);
        let customer = login(&app, "customer@helpdesk.com").await;
        let tech = login(&app, "tech@helpdesk.com").await;

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/ticket",
            Some(&customer),
            Some(json!({ "description": "no title" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"], json!(["Title no information"]));

        let id = create_ticket(&app, &customer, "Printer jam").await;

        let (status, json) = send(
            &app,
            Method::PUT,
            &format!("/api/ticket/{id}/Assigned"),
            Some(&tech),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["status"], "Assigned");
        assert_eq!(json["data"]["assigned_user"]["email"], "tech@helpdesk.com");

        let (status, json) = send(
            &app,
            Method::PUT,
            "/api/ticket",
            Some(&customer),
            Some(json!({ "id": id, "title": "Printer still jammed", "priority": "Low" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["status"], "Assigned");
        assert_eq!(json["data"]["priority"], "Low");
        assert_eq!(json["data"]["assigned_user"]["email"], "tech@helpdesk.com");

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/api/ticket/{id}"),
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["title"], "Printer still jammed");
        let changes = json["data"]["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0]["user_change"]["email"], "tech@helpdesk.com");

        let (status, json) = send(&app, Method::GET, "/api/ticket/0/10", Some(&tech), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_elements"], 1);

        let (status, json) = send(
            &app,
            Method::GET,
            "/api/ticket/0/10/0/printer/Assigned/uninformed/true",
            Some(&tech),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["content"][0]["id"], id.as_str());

        let (status, json) = send(
            &app,
            Method::GET,
            "/api/ticket/0/10/0/uninformed/Pending/uninformed/false",
            Some(&tech),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"], json!(["Invalid status: Pending"]));

        let (status, json) = send(&app, Method::GET, "/api/ticket/summary", Some(&tech), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["amount_assigned"], 1);
        assert_eq!(json["data"]["amount_new"], 0);

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/ticket/{id}"),
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/api/ticket/{id}"),
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], format!("Register not found id: {id}"));
    }

    #[tokio::test]
    async fn malformed_paths_and_pages_use_the_envelope() {
        let (_env_guard, deployment) = setup_deployment().await;
        create_user(&deployment, "tech@helpdesk.com", Profile::Technician).await;
        let app = super::router(deployment);
        let tech = login(&app, "tech@helpdesk.com").await;

        for uri in ["/api/ticket/abc", "/api/ticket/x/10", "/api/user/abc"] {
            let (status, json) = send(&app, Method::GET, uri, Some(&tech), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["success"], false, "{uri}");
            assert!(json["message"].as_str().is_some(), "{uri}");
        }

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/api/ticket/{}/10", u64::MAX),
            Some(&tech),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"], json!(["Invalid page"]));
    }

    #[tokio::test]
    async fn roles_gate_ticket_and_user_endpoints() {
        let (_env_guard, deployment) = setup_deployment().await;
        create_user(&deployment, "alice@helpdesk.com", Profile::Customer).await;
        create_user(&deployment, "bob@helpdesk.com", Profile::Customer).await;
        create_user(&deployment, "tech@helpdesk.com", Profile::Technician).await;
        create_user(&deployment, "boss@helpdesk.com", Profile::Admin).await;
        let app = super::router(deployment);
        let alice = login(&app, "alice@helpdesk.com").await;
        let bob = login(&app, "bob@helpdesk.com").await;
        let tech = login(&app, "tech@helpdesk.com").await;
        let admin = login(&app, "boss@helpdesk.com").await;

        let id = create_ticket(&app, &alice, "Alice's laptop").await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/ticket",
            Some(&tech),
            Some(json!({ "title": "tech ticket" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/ticket/{id}"),
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(&app, Method::GET, "/api/ticket/0/10", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_elements"], 0);

        let (status, _) = send(&app, Method::GET, "/api/user/0/10", Some(&alice), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(&app, Method::GET, "/api/user/0/10", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        // four test accounts plus the seeded administrator
        assert_eq!(json["data"]["total_elements"], 5);

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/user",
            Some(&admin),
            Some(json!({ "email": "new@helpdesk.com", "password": "pw", "profile": "ROLE_TECHNICIAN" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["profile"], "TECHNICIAN");
        let new_id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/user",
            Some(&admin),
            Some(json!({ "email": "new@helpdesk.com", "password": "pw", "profile": "CUSTOMER" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"], json!(["E-mail already registered"]));

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/user/{new_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/user/{new_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
