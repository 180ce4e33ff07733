//! Icon downloads and full lookups through `WeatherSession` against a mock server.

use std::{io::Cursor, sync::Arc};

use cityweather_core::{
    FetchState, HttpImageFetcher, ImageError, ImageFetcher, WeatherApiClient, WeatherError,
    WeatherSession,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([255, 200, 0, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn weather_body(icon: &str) -> serde_json::Value {
    serde_json::json!({
        "location": { "name": "London", "region": "", "country": "United Kingdom" },
        "current": {
            "temp_c": 14.0,
            "feelslike_c": 12.5,
            "humidity": 82,
            "wind_kph": 13.0,
            "wind_dir": "SW",
            "is_day": 1,
            "condition": { "text": "Cloudy", "icon": icon }
        }
    })
}

async fn mount_icon(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET")).and(path("/icons/64.png")).respond_with(response).mount(server).await;
}

fn session_for(server: &MockServer) -> WeatherSession {
    let client = WeatherApiClient::new("KEY".into()).with_base_url(&server.uri());
    WeatherSession::new(Arc::new(client), Arc::new(HttpImageFetcher::default()))
}

#[tokio::test]
async fn fetch_image_decodes_png() {
    let server = MockServer::start().await;
    mount_icon(
        &server,
        ResponseTemplate::new(200).set_body_bytes(png(64, 64)).insert_header("content-type", "image/png"),
    )
    .await;

    let image = HttpImageFetcher::default()
        .fetch_image(&format!("{}/icons/64.png", server.uri()))
        .await
        .expect("icon should decode");

    assert_eq!((image.width(), image.height()), (64, 64));
}

#[tokio::test]
async fn fetch_image_rejects_html() {
    let server = MockServer::start().await;
    mount_icon(
        &server,
        ResponseTemplate::new(200)
            .set_body_string("<!doctype html><title>Moved</title>")
            .insert_header("content-type", "text/html"),
    )
    .await;

    let result = HttpImageFetcher::default()
        .fetch_image(&format!("{}/icons/64.png", server.uri()))
        .await;

    assert!(matches!(result, Err(ImageError::Decode(_))), "Expected Decode, got: {result:?}");
}

#[tokio::test]
async fn fetch_image_reports_http_status() {
    let server = MockServer::start().await;
    mount_icon(&server, ResponseTemplate::new(404)).await;

    let result = HttpImageFetcher::default()
        .fetch_image(&format!("{}/icons/64.png", server.uri()))
        .await;

    assert_eq!(result, Err(ImageError::Status(404)));
}

#[tokio::test]
async fn repeated_image_fetches_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/icons/64.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png(8, 8)))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = HttpImageFetcher::default();
    let url = format!("{}/icons/64.png", server.uri());
    fetcher.fetch_image(&url).await.unwrap();
    fetcher.fetch_image(&url).await.unwrap();
}

#[tokio::test]
async fn session_loads_weather_and_icon() {
    let server = MockServer::start().await;
    let icon_url = format!("{}/icons/64.png", server.uri());

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(&icon_url)))
        .expect(1)
        .mount(&server)
        .await;
    mount_icon(&server, ResponseTemplate::new(200).set_body_bytes(png(64, 64))).await;

    let session = session_for(&server);
    session.search("London").await.unwrap();
    let snapshot = session.snapshot();

    let weather = snapshot.weather.as_ref().and_then(FetchState::content).expect("weather content");
    assert_eq!(weather.current.condition, "Cloudy");
    assert!(weather.is_day);

    let icon = snapshot.icon.as_ref().and_then(FetchState::content).expect("icon content");
    assert_eq!(icon.width(), 64);
}

#[tokio::test]
async fn session_reports_unknown_city() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    session.search("Atlantis").await.unwrap();
    let snapshot = session.snapshot();

    assert_eq!(
        snapshot.weather,
        Some(FetchState::Error(WeatherError::NotFound("Atlantis".into())))
    );
    assert!(snapshot.icon.is_none());
}

#[tokio::test]
async fn session_never_reaches_content_when_offline() {
    let client = WeatherApiClient::new("KEY".into()).with_base_url("http://127.0.0.1:1");
    let session = WeatherSession::new(Arc::new(client), Arc::new(HttpImageFetcher::default()));

    session.search("London").await.unwrap();
    let weather = session.snapshot().weather.expect("settled");

    assert!(matches!(weather, FetchState::Error(WeatherError::Network(_))));
}
