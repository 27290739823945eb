mod common;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image_gen_gateway::tools::{
    GenerateImageRequest, ListImagesRequest, generate_image, list_images,
};
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, ErrorCode},
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{Harness, PNG_BYTES, server_credentials};

fn request(provider: &str, width: u32, height: u32) -> GenerateImageRequest {
    GenerateImageRequest {
        prompt: "a lighthouse at dusk".into(),
        provider: provider.into(),
        width,
        height,
        negative_prompt: None,
        num_outputs: None,
        style: None,
        seed: None,
        steps: None,
        guidance_scale: None,
    }
}

fn text_json(result: &CallToolResult) -> Value {
    let text = &result.content[0].as_text().unwrap().text;
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn generate_tool_returns_the_stored_location() {
    let harness = Harness::new(server_credentials()).await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": STANDARD.encode(PNG_BYTES) }]
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let result = generate_image(&harness.service, Parameters(request("openai", 1024, 1024)))
        .await
        .unwrap();
    let body = text_json(&result);

    let storage_path = body["storage_path"].as_str().unwrap();
    assert!(storage_path.starts_with("public/openai-gpt-image-1-"));
    assert_eq!(
        body["url"],
        format!("http://localhost:3000/storage/{storage_path}").as_str()
    );
    assert_eq!(body["image_count"], 1);
    assert_eq!(body["persistence"]["status"], "saved");
    assert_eq!(body["persistence"]["id"], 1);
}

#[tokio::test]
async fn generate_tool_reports_caller_mistakes_as_invalid_params() {
    let harness = Harness::new(server_credentials()).await;
    let err = generate_image(&harness.service, Parameters(request("openai", 512, 512)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    assert!(err.message.contains("512x512"));
    assert!(harness.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn generate_tool_reports_upstream_failures_as_internal() {
    let harness = Harness::new(server_credentials()).await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&harness.server)
        .await;

    let err = generate_image(&harness.service, Parameters(request("openai", 1024, 1024)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    assert!(err.message.contains("Failed to generate image via OpenAI"));
}

#[tokio::test]
async fn list_tool_returns_rows_with_public_urls() {
    let harness = Harness::new(server_credentials()).await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": STANDARD.encode(PNG_BYTES) }]
        })))
        .mount(&harness.server)
        .await;
    generate_image(&harness.service, Parameters(request("openai", 1024, 1024)))
        .await
        .unwrap();

    let result = list_images(
        harness.records.as_ref(),
        harness.store.as_ref(),
        Parameters(ListImagesRequest {
            query: Some("LIGHTHOUSE".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    let rows = text_json(&result);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["provider"], "OpenAI");
    assert!(
        rows[0]["public_url"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:3000/storage/public/")
    );
}
