use std::{
    collections::HashMap,
    io::Cursor,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use safehome_risk::Config;

// ---

const API_KEY: &str = "test-key";
const MAX_UPLOAD: usize = 100_000;
const MAX_IMAGE_SIDE: u32 = 2_000;

/// Mock provider behaviour is selected by the integer part of `lat`.
async fn mock_weather(
    State(hits): State<Arc<AtomicUsize>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    // ---
    hits.fetch_add(1, Ordering::SeqCst);

    if q.get("appid").map(String::as_str) != Some(API_KEY) || q.get("units").is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let lat: f64 = q.get("lat").and_then(|v| v.parse().ok()).unwrap_or(0.0);
    match lat as i64 {
        1 => Json(json!({
            "weather": [{"main": "Clear", "description": "clear sky"}],
            "wind": {"speed": 3.0},
            "main": {"temp": 22.0, "humidity": 40}
        }))
        .into_response(),
        2 => Json(json!({
            "weather": [{"main": "Thunderstorm", "description": "thunderstorm with heavy rain"}],
            "wind": {"speed": 16.0},
            "main": {"temp": 20.0, "humidity": 90}
        }))
        .into_response(),
        3 => (StatusCode::INTERNAL_SERVER_ERROR, "provider exploded").into_response(),
        4 => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK.into_response()
        }
        _ => (StatusCode::OK, "not json").into_response(),
    }
}

async fn serve(router: Router) -> SocketAddr {
    // ---
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

struct Harness {
    base: String,
    hits: Arc<AtomicUsize>,
    client: Client,
    upload_dir: PathBuf,
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// Start a mock provider and the application pointed at it.
async fn start() -> Harness {
    // ---
    let hits = Arc::new(AtomicUsize::new(0));
    let provider = Router::new()
        .route("/weather", get(mock_weather))
        .with_state(hits.clone());
    let provider_addr = serve(provider).await;

    let upload_dir =
        std::env::temp_dir().join(format!("safehome-it-{}", uuid::Uuid::new_v4()));
    let config = Config {
        port: 0,
        upload_dir: upload_dir.clone(),
        max_upload_bytes: MAX_UPLOAD,
        weather_api_url: format!("http://{provider_addr}/weather"),
        weather_api_key: Some(API_KEY.to_string()),
        weather_timeout: Duration::from_secs(1),
        max_image_width: MAX_IMAGE_SIDE,
        max_image_height: MAX_IMAGE_SIDE,
        ..Config::default()
    };
    let app_addr = serve(safehome_risk::app(config).unwrap()).await;

    Harness {
        base: format!("http://{app_addr}"),
        hits,
        client: Client::new(),
        upload_dir,
    }
}

fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([shade, shade, shade]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Files currently in the upload directory (none if it was never created).
fn stored_files(h: &Harness) -> usize {
    std::fs::read_dir(&h.upload_dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

fn image_form(name: &str, bytes: Vec<u8>) -> Form {
    Form::new().part("image", Part::bytes(bytes).file_name(name.to_string()))
}

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    // ---
    let h = start().await;
    let body: Value = h
        .client
        .get(format!("{}/health", h.base))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["weather_configured"], true);
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_json_404() -> Result<()> {
    // ---
    let h = start().await;
    let resp = h.client.get(format!("{}/nope", h.base)).send().await?;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "not_found");
    Ok(())
}

#[tokio::test]
async fn analyze_quality_mode() -> Result<()> {
    // ---
    let h = start().await;
    let bytes = png(300, 200, 255);

    let resp = h
        .client
        .post(format!("{}/analyze", h.base))
        .multipart(image_form("house.png", bytes.clone()))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["mode"], "quality");
    assert_eq!(body["simulated"], false);
    // Tiny white PNG: only the low-resolution flag
    assert_eq!(body["risk_level"], "Moderate");
    assert_eq!(body["risk_score"].as_f64(), Some(1.0));
    assert_eq!(body["issues_detected"][0]["category"], "low resolution");
    assert_eq!(body["technical_data"]["image_resolution"], "300x200");
    assert!(body["analysis_id"].as_str().is_some());
    assert!(body["timestamp"].as_str().is_some());

    // Stored upload is served back unchanged
    let url = body["image_url"].as_str().unwrap();
    assert!(url.starts_with("/static/uploads/"));
    let served = h.client.get(format!("{}{}", h.base, url)).send().await?;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await?.to_vec(), bytes);
    Ok(())
}

#[tokio::test]
async fn analyze_simulated_mode_is_marked() -> Result<()> {
    // ---
    let h = start().await;
    let body: Value = h
        .client
        .post(format!("{}/analyze?mode=simulated", h.base))
        .multipart(image_form("house.jpg.png", png(64, 64, 128)))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "success");
    assert_eq!(body["simulated"], true);
    assert_eq!(body["crack_analysis"]["crack_count"], 3);
    assert_eq!(body["risk_level"], "Low");
    Ok(())
}

#[tokio::test]
async fn analyze_rejects_bad_uploads() -> Result<()> {
    // ---
    let h = start().await;
    let url = format!("{}/analyze", h.base);

    // Extension outside the allow-list
    let resp = h
        .client
        .post(&url)
        .multipart(image_form("house.tiff", png(8, 8, 0)))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // No image field at all
    let form = Form::new().text("comment", "forgot the photo");
    let resp = h.client.post(&url).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "error");

    // Unknown mode
    let resp = h
        .client
        .post(format!("{url}?mode=xray"))
        .multipart(image_form("house.png", png(8, 8, 0)))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Over the cap but within the multipart allowance, so the body is read fully
    let resp = h
        .client
        .post(&url)
        .multipart(image_form("house.png", vec![0u8; MAX_UPLOAD + 20_000]))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}

#[tokio::test]
async fn analyze_corrupt_image_is_structured_failure() -> Result<()> {
    // ---
    let h = start().await;
    let resp = h
        .client
        .post(format!("{}/analyze", h.base))
        .multipart(image_form("house.png", b"not an image at all".to_vec()))
        .send()
        .await?;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "analysis_failed");
    assert!(body.get("risk_level").is_none());
    assert_eq!(stored_files(&h), 0);

    // The service keeps answering
    let resp = h.client.get(format!("{}/health", h.base)).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn analyze_oversized_dimensions_are_rejected_and_not_stored() -> Result<()> {
    // ---
    let h = start().await;
    let url = format!("{}/analyze", h.base);

    for mode in ["quality", "quality_structure", "simulated"] {
        let resp = h
            .client
            .post(format!("{url}?mode={mode}"))
            .multipart(image_form("wide.png", png(MAX_IMAGE_SIDE + 1, 4, 200)))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{mode}");
        let body: Value = resp.json().await?;
        assert_eq!(body["error"], "analysis_failed");
    }
    assert_eq!(stored_files(&h), 0);

    // A successful analysis is the only thing that lands on disk
    let resp = h
        .client
        .post(&url)
        .multipart(image_form("house.png", png(MAX_IMAGE_SIDE, 4, 200)))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stored_files(&h), 1);
    Ok(())
}

#[tokio::test]
async fn weather_alerts_from_provider() -> Result<()> {
    // ---
    let h = start().await;

    let calm: Value = h
        .client
        .get(format!("{}/weather-alerts?lat=1&lng=10", h.base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(calm["status"], "success");
    assert_eq!(calm["alerts"].as_array().map(Vec::len), Some(0));
    assert_eq!(calm["conditions"]["condition"], "Clear");

    let storm: Value = h
        .client
        .get(format!("{}/weather-alerts?lat=2&lng=10", h.base))
        .send()
        .await?
        .json()
        .await?;
    let alerts = storm["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["type"], "rain");
    assert_eq!(alerts[0]["severity"], "High");
    assert_eq!(alerts[1]["type"], "wind");
    assert_eq!(alerts[1]["severity"], "High");
    assert!(!alerts[0]["actions"].as_array().unwrap().is_empty());

    assert_eq!(h.hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn invalid_coordinates_never_reach_provider() -> Result<()> {
    // ---
    let h = start().await;

    for query in ["lat=91&lng=0", "lat=0&lng=181", "lat=10", "lat=abc&lng=1"] {
        let resp = h
            .client
            .get(format!("{}/weather-alerts?{query}", h.base))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{query}");
        let body: Value = resp.json().await?;
        assert_eq!(body["status"], "error");
    }

    let resp = h
        .client
        .post(format!("{}/combined-risk", h.base))
        .json(&json!({"risk_level": "High", "lat": 91.0, "lng": 0.0}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn provider_failures_are_distinguishable() -> Result<()> {
    // ---
    let h = start().await;

    for (query, status) in [
        ("lat=3&lng=0", StatusCode::BAD_GATEWAY),
        ("lat=5&lng=0", StatusCode::BAD_GATEWAY),
        ("lat=4&lng=0", StatusCode::GATEWAY_TIMEOUT),
    ] {
        let resp = h
            .client
            .get(format!("{}/weather-alerts?{query}", h.base))
            .send()
            .await?;
        assert_eq!(resp.status(), status, "{query}");
        let body: Value = resp.json().await?;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "weather_unavailable");
        assert!(body.get("alerts").is_none());
    }
    Ok(())
}

#[tokio::test]
async fn combined_risk_endpoint() -> Result<()> {
    // ---
    let h = start().await;
    let url = format!("{}/combined-risk", h.base);

    // High structure + storm (rain High + wind High, capped at 3)
    let body: Value = h
        .client
        .post(&url)
        .json(&json!({"risk_level": "High", "lat": 2.0, "lng": 0.0}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["structural_ordinal"], 3);
    assert_eq!(body["weather_ordinal"], 3);
    assert_eq!(body["total"], 6);
    assert_eq!(body["category"], "Critical");
    assert_eq!(body["weather_status"], "available");
    assert!(body["recommendation"].as_str().unwrap().starts_with("Evacuate"));

    // Provider down: weather contributes nothing, request still succeeds
    let body: Value = h
        .client
        .post(&url)
        .json(&json!({"risk_level": "Moderate-High", "lat": 3.0, "lng": 0.0}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["weather_status"], "unavailable");
    assert!(body["weather_error"].as_str().is_some());
    assert_eq!(body["total"], 2);
    assert_eq!(body["category"], "Moderate");

    // No coordinates at all
    let body: Value = h
        .client
        .post(&url)
        .json(&json!({"risk_level": "None"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["category"], "Minimal");
    assert!(body["recommendation"]
        .as_str()
        .unwrap()
        .starts_with("Continue routine"));

    // Unknown risk level
    let resp = h
        .client
        .post(&url)
        .json(&json!({"risk_level": "Apocalyptic"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
