use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_password, MEDIA_TYPE};
use serde_json::{json, Value};
use tower::{Service, ServiceExt};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::ACCEPT, MEDIA_TYPE)
        .body(String::new())
        .unwrap()
}

fn api_request(method: &str, uri: &str, body: Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, MEDIA_TYPE)
        .header(http::header::ACCEPT, MEDIA_TYPE)
        .body(body.to_string())
        .unwrap()
}

fn new_user(id: &str, name: &str) -> Value {
    json!({"data": {"type": "users", "id": id, "attributes": {"name": name}}})
}

fn new_team(name: &str, member: &str) -> Value {
    json!({"data": {
        "type": "teams",
        "attributes": {"name": name},
        "relationships": {"members": {"data": [{"type": "users", "id": member}]}}
    }})
}

async fn send(
    app: &mut axum::routing::RouterIntoService<String>,
    request: Request<String>,
) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app).await.unwrap().call(request).await.unwrap()
}

fn service() -> axum::routing::RouterIntoService<String> {
    app().into_service()
}

// --- api root ---

#[tokio::test]
async fn api_root_returns_200() {
    let resp = app().oneshot(get("/api")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], MEDIA_TYPE);
    let body = body_json(resp).await;
    assert_eq!(body["jsonapi"]["version"], "1.0");
}

// --- users ---

#[tokio::test]
async fn get_user_not_found_returns_error_document() {
    let resp = app().oneshot(get("/users/U_missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["status"], "404");
}

#[tokio::test]
async fn create_user_returns_201_then_409() {
    let mut app = service();

    let resp = send(&mut app, api_request("POST", "/users", new_user("U1", "Ada"))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], "U1");
    assert!(body["data"]["relationships"]["team"]["data"].is_null());

    let resp = send(&mut app, api_request("POST", "/users", new_user("U1", "Ada"))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_user_with_wrong_type_returns_409() {
    let body = json!({"data": {"type": "teams", "id": "U1", "attributes": {"name": "Ada"}}});
    let resp = app().oneshot(api_request("POST", "/users", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_user_malformed_body_returns_422() {
    let resp = app()
        .oneshot(api_request("POST", "/users", json!({"data": {"type": "users"}})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- teams ---

#[tokio::test]
async fn get_team_not_found() {
    let resp = app().oneshot(get("/teams/T_missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_team_with_unknown_member_returns_404() {
    let resp = app()
        .oneshot(api_request("POST", "/teams", new_team("Ghosts", "U_missing")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_members_to_missing_team_returns_404() {
    let resp = app()
        .oneshot(api_request(
            "POST",
            "/teams/T_missing/members",
            json!([{"type": "users", "id": "U1"}]),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn find_teams_empty() {
    let resp = app().oneshot(get("/teams?filter[name]=anything")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"], json!([]));
}

// --- auth ---

#[tokio::test]
async fn password_protected_app_rejects_missing_credentials() {
    let resp = app_with_password("pw")
        .oneshot(api_request("POST", "/users", new_user("U1", "Ada")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_protected_app_accepts_basic_credentials() {
    // base64("ada@example.com:pw")
    let mut request = api_request("POST", "/users", new_user("U1", "Ada"));
    request.headers_mut().insert(
        http::header::AUTHORIZATION,
        "Basic YWRhQGV4YW1wbGUuY29tOnB3".parse().unwrap(),
    );
    let resp = app_with_password("pw").oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn password_protected_app_allows_reads() {
    let resp = app_with_password("pw").oneshot(get("/api")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- full membership lifecycle ---

#[tokio::test]
async fn membership_lifecycle() {
    let mut app = service();

    for (id, name) in [("U1", "Ada"), ("U2", "Grace"), ("U3", "Barbara")] {
        let resp = send(&mut app, api_request("POST", "/users", new_user(id, name))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // create team with U1
    let request = api_request("POST", "/teams", new_team("Pineapple Express", "U1"));
    let resp = send(&mut app, request).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    let team_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["attributes"]["name"], "Pineapple Express");

    // duplicate name
    let request = api_request("POST", "/teams", new_team("Pineapple Express", "U2"));
    let resp = send(&mut app, request).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // add U2
    let resp = send(
        &mut app,
        api_request(
            "POST",
            &format!("/teams/{team_id}/members"),
            json!([{"type": "users", "id": "U2"}]),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // U1 cannot join a second team
    let resp = send(&mut app, api_request("POST", "/teams", new_team("Other", "U1"))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // user document includes team and the other member, not the user itself
    let resp = send(&mut app, get("/users/U1")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(
        body["data"]["relationships"]["team"]["data"],
        json!({"type": "teams", "id": team_id})
    );
    let included: Vec<(String, String)> = body["included"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["type"].as_str().unwrap().to_string(), r["id"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        included,
        vec![("teams".to_string(), team_id.clone()), ("users".to_string(), "U2".to_string())]
    );

    // team document lists members in join order
    let resp = send(&mut app, get(&format!("/teams/{team_id}"))).await;
    let body = body_json(resp).await;
    assert_eq!(
        body["data"]["relationships"]["members"]["data"],
        json!([{"type": "users", "id": "U1"}, {"type": "users", "id": "U2"}])
    );
    assert_eq!(body["included"].as_array().unwrap().len(), 2);

    // update motto
    let resp = send(
        &mut app,
        api_request(
            "PATCH",
            &format!("/teams/{team_id}"),
            json!({"data": {
                "type": "teams",
                "id": team_id,
                "attributes": {"motto": "Stay crunchy"}
            }}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["attributes"]["motto"], "Stay crunchy");

    // patch with mismatched id
    let resp = send(
        &mut app,
        api_request(
            "PATCH",
            &format!("/teams/{team_id}"),
            json!({"data": {"type": "teams", "id": "nope", "attributes": {"motto": "x"}}}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // find by partial name
    let resp = send(&mut app, get("/teams?filter[name]=Pineapple")).await;
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], team_id.as_str());

    // remove U1
    let resp = send(
        &mut app,
        api_request(
            "DELETE",
            &format!("/teams/{team_id}/members"),
            json!({"data": [{"type": "users", "id": "U1"}]}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&mut app, get("/users/U1")).await;
    let body = body_json(resp).await;
    assert!(body["data"]["relationships"]["team"]["data"].is_null());
    assert_eq!(body["included"], json!([]));

    // remove from a team that does not exist
    let resp = send(
        &mut app,
        api_request("DELETE", "/teams/T_missing/members", json!({"data": []})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
