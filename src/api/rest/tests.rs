use super::anpr_controller::{UploadResponse, PROCESSED_MESSAGE};
use super::RestApi;
use crate::capture::UNKNOWN_PLATE;
use crate::config::Config;
use crate::storage::image_writer::tests::sample_image;
use crate::storage::Capture;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tower::ServiceExt;

const BOUNDARY: &str = "----anpr-test-boundary";

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.root = root.to_path_buf();
    config
}

fn test_app(root: &Path) -> Router {
    RestApi::new(&test_config(root)).unwrap().router()
}

fn metadata_xml(plate: &str, abs_time: &str, lane: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<EventNotificationAlert version="2.0" xmlns="http://www.isapi.org/ver20/XMLSchema">
  <ANPR><licensePlate>{}</licensePlate><line>{}</line></ANPR>
  <absTime>{}</absTime>
</EventNotificationAlert>"#,
        plate, lane, abs_time
    )
}

/// Assemble a multipart/form-data body from (field, optional file name, bytes)
fn multipart_body(parts: &[(&str, Option<&str>, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        field, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/anpr")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn upload(app: Router, request: Request<Body>) -> UploadResponse {
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn list(app: Router) -> Vec<Capture> {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/anpr/capturas")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn find_files(root: &Path, name: &str) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_str() == Some(name))
        .map(|e| e.into_path())
        .collect()
}

#[tokio::test]
async fn test_upload_with_both_pictures() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = multipart_body(&[
        (
            "metadata",
            Some("anpr.xml"),
            metadata_xml("KGB015", "20250925165706970", "1").into_bytes(),
        ),
        (
            "licensePlatePicture",
            Some("licensePlatePicture.jpg"),
            sample_image(ImageFormat::Jpeg),
        ),
        (
            "detectionPicture",
            Some("detectionPicture.jpg"),
            sample_image(ImageFormat::Jpeg),
        ),
    ]);

    let response = upload(app, upload_request(body)).await;

    assert_eq!(
        response,
        UploadResponse {
            message: PROCESSED_MESSAGE.to_string(),
            placa: "KGB015".to_string(),
            abs_time: "20250925165706970".to_string(),
            lane: "1".to_string(),
        }
    );

    let mut stored = find_files(dir.path(), "20250925165706970_KGB015_1.jpg");
    stored.sort();
    assert_eq!(stored.len(), 2);
    let folders: Vec<String> = stored
        .iter()
        .map(|p| {
            p.strip_prefix(dir.path())
                .unwrap()
                .components()
                .next()
                .unwrap()
                .as_os_str()
                .to_string_lossy()
                .to_string()
        })
        .collect();
    assert_eq!(folders, vec!["Camara1", "Camara1X"]);
    assert!(dir.path().join("logs/api_log.txt").is_file());
}

#[tokio::test]
async fn test_upload_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = multipart_body(&[(
        "licensePlatePicture",
        Some("licensePlatePicture.jpg"),
        sample_image(ImageFormat::Jpeg),
    )]);

    let response = upload(app.clone(), upload_request(body)).await;

    assert_eq!(response.placa, UNKNOWN_PLATE);
    assert_eq!(response.lane, "0");
    assert_eq!(response.abs_time.len(), 17);
    assert!(dir.path().join("raw/licensePlatePicture.jpg").is_file());
    assert!(list(app).await.is_empty());
}

#[tokio::test]
async fn test_non_multipart_upload_still_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/anpr")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = upload(app, request).await;

    assert_eq!(response.message, PROCESSED_MESSAGE);
    assert_eq!(response.placa, UNKNOWN_PLATE);
    let log = std::fs::read_to_string(dir.path().join("logs/api_log.txt")).unwrap();
    assert!(log.contains("not multipart/form-data"));
}

#[tokio::test]
async fn test_truncated_multipart_still_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let mut body = multipart_body(&[(
        "metadata",
        Some("anpr.xml"),
        metadata_xml("KGB015", "20250925165706970", "1").into_bytes(),
    )]);
    body.truncate(body.len() / 2);

    let response = upload(app, upload_request(body)).await;

    assert_eq!(response.placa, UNKNOWN_PLATE);
    let log = std::fs::read_to_string(dir.path().join("logs/api_log.txt")).unwrap();
    assert!(log.contains("Error:"));
}

#[tokio::test]
async fn test_oversized_upload_still_ok() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.api.max_body_bytes = 1024;
    let app = RestApi::new(&config).unwrap().router();

    let body = multipart_body(&[
        (
            "metadata",
            Some("anpr.xml"),
            metadata_xml("KGB015", "20250925165706970", "1").into_bytes(),
        ),
        (
            "licensePlatePicture",
            Some("licensePlatePicture.jpg"),
            vec![0xAB; 8 * 1024],
        ),
    ]);

    let response = upload(app, upload_request(body)).await;

    assert_eq!(response.message, PROCESSED_MESSAGE);
    assert_eq!(response.placa, UNKNOWN_PLATE);
    assert_eq!(response.lane, "0");
    assert!(find_files(dir.path(), "20250925165706970_KGB015_1.jpg").is_empty());
    let log = std::fs::read_to_string(dir.path().join("logs/api_log.txt")).unwrap();
    assert!(log.contains("Error:"));
}

#[tokio::test]
async fn test_list_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir.path().join("not-created"));

    assert!(list(app).await.is_empty());
}

#[tokio::test]
async fn test_list_sorted_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    for relative in [
        "Camara1/20250925/20250925165706970_KGB015_1.jpg",
        "Camara2/20250925/20250925170000000_ABC999_2.jpg",
    ] {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, sample_image(ImageFormat::Jpeg)).unwrap();
    }

    let captures = list(test_app(dir.path())).await;

    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0].plate, "ABC999");
    assert_eq!(captures[0].abs_time, "20250925170000000");
    assert_eq!(captures[1].plate, "KGB015");
    assert_eq!(
        captures[1].image_url,
        "/capturas/Camara1/20250925/20250925165706970_KGB015_1.jpg"
    );
}

#[tokio::test]
async fn test_upload_then_list_and_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = multipart_body(&[
        (
            "metadata",
            Some("anpr.xml"),
            metadata_xml("ABC999", "20250925170000000", "2").into_bytes(),
        ),
        (
            "detectionPicture",
            Some("detectionPicture.jpg"),
            sample_image(ImageFormat::Png),
        ),
    ]);
    upload(app.clone(), upload_request(body)).await;

    let captures = list(app.clone()).await;
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].plate, "ABC999");
    assert_eq!(captures[0].lane, "2");
    assert_eq!(captures[0].abs_time, "20250925170000000");
    assert!(captures[0].image_url.starts_with("/capturas/Camara2X/"));

    let response = app
        .oneshot(
            Request::builder()
                .uri(captures[0].image_url.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
}
