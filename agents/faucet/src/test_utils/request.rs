use axum::body::Body;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

pub async fn parse_body_to_json<T: DeserializeOwned>(body: Body) -> T {
    let resp_body = body
        .collect()
        .await
        .expect("Failed to collect body data")
        .to_bytes();
    serde_json::from_slice(&resp_body).expect("Failed to deserialize response body")
}

pub async fn parse_body_to_string(body: Body) -> String {
    let resp_body = body
        .collect()
        .await
        .expect("Failed to collect body data")
        .to_bytes();
    String::from_utf8(resp_body.to_vec()).expect("Failed to parse body string to UTF-8")
}
