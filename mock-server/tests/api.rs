use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Bundle, DEFAULT_TOKEN};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {DEFAULT_TOKEN}"))
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    authed(method, uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    authed(method, uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401_with_status_field() {
    let resp = app()
        .oneshot(Request::builder().uri("/v1/bundles").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"], "Unauthorized");
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v1/bundles")
                .header(http::header::AUTHORIZATION, "Bearer nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- bundles ---

#[tokio::test]
async fn list_bundles_empty() {
    let resp = app().oneshot(empty_request("GET", "/v1/bundles")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["total"], 0);
    assert!(body["_links"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_bundle_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/v1/bundles",
            r#"{"name":"Test","media_url":"http://media/a.wav"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let bundle: Bundle = body_json(resp).await;
    assert_eq!(bundle.name, "Test");
    assert!(!bundle.id.is_empty());
}

#[tokio::test]
async fn get_bundle_not_found() {
    let resp = app()
        .oneshot(empty_request("GET", "/v1/bundles/missing"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"], "Not Found");
    assert_eq!(body["message"], "bundle missing not found");
}

#[tokio::test]
async fn delete_bundle_not_found() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/v1/bundles/missing"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unversioned_path_is_not_routed() {
    let resp = app().oneshot(empty_request("GET", "/bundles")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full lifecycle ---

#[tokio::test]
async fn bundle_track_metadata_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/bundles",
            r#"{"name":"Walk dog","media_url":"http://media/1.wav"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Bundle = body_json(resp).await;
    let id = created.id;

    // add a labelled track
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            &format!("/v1/bundles/{id}/tracks"),
            r#"{"label":"voice","media_url":"http://media/2.wav"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let tracks: Value = body_json(resp).await;
    assert_eq!(tracks["tracks"].as_array().unwrap().len(), 2);
    assert_eq!(tracks["tracks"][1]["label"], "voice");

    // update track by label
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/v1/bundles/{id}/tracks/voice"),
            r#"{"label":"speech"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let tracks: Value = body_json(resp).await;
    assert_eq!(tracks["tracks"][1]["label"], "speech");
    assert_eq!(tracks["tracks"][0]["label"], "");

    // delete track 0, the labelled track shifts down
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/v1/bundles/{id}/tracks/0")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/v1/bundles/{id}/tracks")))
        .await
        .unwrap();
    let tracks: Value = body_json(resp).await;
    assert_eq!(tracks["tracks"].as_array().unwrap().len(), 1);
    assert_eq!(tracks["tracks"][0]["label"], "speech");

    // metadata must be an object
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("/v1/bundles/{id}/metadata"), r#"[1,2]"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // metadata replace
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("/v1/bundles/{id}/metadata"), r#"{"test":"test"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let metadata: Value = body_json(resp).await;
    assert_eq!(metadata["bundle_id"], id.as_str());
    assert_eq!(metadata["data"]["test"], "test");

    // delete bundle
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/v1/bundles/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // get after delete is 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/v1/bundles/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_matches_bundle_names() {
    use tower::Service;

    let mut app = app().into_service();

    for name in ["qwerty bundle", "sssss bundle"] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request("POST", "/v1/bundles", &format!(r#"{{"name":"{name}"}}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/v1/search?query=qwerty&query_fields=bundle.name"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: Value = body_json(resp).await;
    assert_eq!(result["total"], 1);
    assert_eq!(result["item_results"].as_array().unwrap().len(), 1);
    assert_eq!(result["_links"]["items"].as_array().unwrap().len(), 1);
}
