//! Fallback chain behaviour against a mocked inference endpoint

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{GrayImage, ImageFormat, Luma};
use serde_json::json;
use std::io::Cursor;
use tracing_subscriber::EnvFilter;
use wildfire_risk_core::segmentation::{DetectionSource, SegmentCategory};
use wildfire_risk_core::{
    AnalysisContext, ImageSample, InferenceConfig, SegmentationModel, Segmenter,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(server: &MockServer, token: Option<&str>) -> InferenceConfig {
    InferenceConfig {
        base_url: server.uri(),
        token: token.map(str::to_string),
        primary_model: "primary-seg".to_string(),
        secondary_model: "secondary-seg".to_string(),
        tertiary_model: "tertiary-cls".to_string(),
        fire_model: None,
        timeout_secs: 5,
        ..InferenceConfig::default()
    }
}

fn green_field() -> ImageSample {
    ImageSample::solid(16, 16, [60, 110, 50]).unwrap()
}

/// Base64 PNG mask with the top `on_rows` of 4 rows set
fn mask(on_rows: u32) -> String {
    let img = GrayImage::from_fn(4, 4, |_, y| {
        if y < on_rows {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
    STANDARD.encode(png)
}

fn hosted(server: &MockServer) -> Segmenter {
    Segmenter::from_config(&config(server, Some("secret")), reqwest::Client::new())
}

async fn mount_status(server: &MockServer, model: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(format!("/{model}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_all_hosted_failures_fall_back_to_heuristic() {
    let server = MockServer::start().await;
    mount_status(&server, "primary-seg", 500).await;
    mount_status(&server, "secondary-seg", 503).await;
    Mock::given(method("POST"))
        .and(path("/tertiary-cls"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let segmenter = hosted(&server);
    let result = segmenter
        .analyze(&green_field(), &AnalysisContext::new())
        .await
        .unwrap();

    assert_eq!(result.model, SegmentationModel::Heuristic);
    assert_eq!(result.declined.len(), 3);
    assert!(result.declined[0].reason.contains("500"));
    assert!(result.fallback_reason().unwrap().starts_with("primary"));
    assert!(!result.regions_of(SegmentCategory::Trees).is_empty());
}

#[tokio::test]
async fn test_primary_outage_accepts_secondary() {
    let server = MockServer::start().await;
    mount_status(&server, "primary-seg", 503).await;
    Mock::given(method("POST"))
        .and(path("/secondary-seg"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "tree-merged", "score": 0.92, "mask": mask(2)},
            {"label": "grass-merged", "score": 0.81, "mask": mask(1)},
            {"label": "sky-other-merged", "score": 0.99, "mask": mask(1)},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let segmenter = hosted(&server);
    let result = segmenter
        .analyze(&green_field(), &AnalysisContext::new())
        .await
        .unwrap();

    assert_eq!(result.model, SegmentationModel::Secondary);
    assert_eq!(result.model_id.as_deref(), Some("secondary-seg"));
    assert_eq!(result.declined.len(), 1);
    assert!((result.confidence - 0.865).abs() < 1e-4);

    let trees = result.regions_of(SegmentCategory::Trees);
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].coverage, Some(0.5));
    assert!(result.regions_of(SegmentCategory::Grass)[0].coverage == Some(0.25));
}

#[tokio::test]
async fn test_model_error_and_low_confidence_decline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/primary-seg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"error": "Model is currently loading"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/secondary-seg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "sky", "score": 0.95}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tertiary-cls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "lakeside", "score": 0.6},
            {"label": "palm tree", "score": 0.3}
        ])))
        .mount(&server)
        .await;

    let segmenter = hosted(&server);
    let result = segmenter
        .analyze(&green_field(), &AnalysisContext::new())
        .await
        .unwrap();

    assert_eq!(result.model, SegmentationModel::Heuristic);
    let reasons: Vec<_> = result.declined.iter().map(|a| a.reason.as_str()).collect();
    assert!(reasons[0].contains("loading"));
    assert!(reasons[1].contains("confidence"));
    assert!(reasons[2].contains("confidence"));
}

#[tokio::test]
async fn test_missing_token_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let segmenter = Segmenter::from_config(&config(&server, None), reqwest::Client::new());
    let result = segmenter
        .analyze(&green_field(), &AnalysisContext::new().with_filename("dry_brush.jpg"))
        .await
        .unwrap();

    assert_eq!(result.model, SegmentationModel::Heuristic);
    assert!(result
        .declined
        .iter()
        .all(|a| a.reason.starts_with("not configured")));
}

#[tokio::test]
async fn test_hosted_fire_classifier_overrides_colour() {
    let server = MockServer::start().await;
    mount_status(&server, "primary-seg", 500).await;
    mount_status(&server, "secondary-seg", 500).await;
    mount_status(&server, "tertiary-cls", 500).await;
    Mock::given(method("POST"))
        .and(path("/fire-cls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "smoke", "score": 0.88},
            {"label": "normal", "score": 0.12}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server, Some("secret"));
    config.fire_model = Some("fire-cls".to_string());
    let segmenter = Segmenter::from_config(&config, reqwest::Client::new());
    let result = segmenter
        .analyze(&green_field(), &AnalysisContext::new())
        .await
        .unwrap();

    assert!(result.fire.smoke_detected);
    assert!(!result.fire.fire_detected);
    assert_eq!(result.fire.source, DetectionSource::HostedClassifier);
    assert!((result.fire.smoke_probability - 0.88).abs() < 1e-6);
}

#[tokio::test]
async fn test_fire_named_objects_do_not_raise_alarm() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/primary-seg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "grass", "score": null},
            {"label": "fireplace", "score": null},
            {"label": "fire hydrant", "score": null},
            {"label": "wall", "score": null}
        ])))
        .mount(&server)
        .await;

    let result = hosted(&server)
        .analyze(&green_field(), &AnalysisContext::new())
        .await
        .unwrap();

    assert_eq!(result.model, SegmentationModel::Primary);
    assert!(result.regions_of(SegmentCategory::Fire).is_empty());
    assert!(!result.fire.fire_detected);
    assert_eq!(result.fire.fire_probability, 0.0);
    assert_eq!(result.regions_of(SegmentCategory::Structures).len(), 1);
}
