//! Integration tests for the upload-and-convert endpoint.

use std::io::{Cursor, Write};

use bytes::Bytes;
use http::Request;
use http_body_util::{BodyExt, Full};
use tower::ServiceExt;
use zip::write::{FileOptions, ZipWriter};

use html2epub_server::app;

const BOUNDARY: &str = "X-TEST-BOUNDARY";

async fn body_to_bytes<B>(body: B) -> Bytes
where
    B: http_body::Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Debug + std::fmt::Display,
{
    body.collect().await.unwrap().to_bytes()
}

fn zipped_book() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<'_, ()> = FileOptions::default();
    writer.start_file("book.ini", options).unwrap();
    writer
        .write_all(b"[book]\nname=Uploaded\nauthor=Nobody\n")
        .unwrap();
    writer.start_file("book.html", options).unwrap();
    writer
        .write_all(
            b"<html><head><title>U</title></head><body><h1>A</h1><p>x</p></body></html>",
        )
        .unwrap();
    writer.finish().unwrap().into_inner()
}

fn multipart_upload(data: &[u8]) -> Request<Full<Bytes>> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"input\"; filename=\"book.zip\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/zip\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .uri("/")
        .method("POST")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[tokio::test]
async fn home_serves_the_upload_form() {
    let req = Request::builder()
        .uri("/")
        .body(Full::<Bytes>::new(Bytes::new()))
        .unwrap();
    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), 200);
    let (_, body) = response.into_parts();
    let body = body_to_bytes(body).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("<form"), "{html}");
    assert!(html.contains("name=\"input\""), "{html}");
}

#[tokio::test]
async fn uploading_a_zipped_book_returns_an_epub() {
    let response = app().oneshot(multipart_upload(&zipped_book())).await.unwrap();
    assert_eq!(response.status(), 200);

    let (parts, body) = response.into_parts();
    assert_eq!(
        parts.headers.get("content-type").unwrap(),
        "application/epub+zip"
    );
    let disposition = parts
        .headers
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.contains("Uploaded.epub"), "{disposition}");

    let body = body_to_bytes(body).await;
    assert_eq!(&body[..2], b"PK");
}

#[tokio::test]
async fn invalid_upload_returns_error_page() {
    let response = app()
        .oneshot(multipart_upload(b"not a zip archive"))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let (_, body) = response.into_parts();
    let body = body_to_bytes(body).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("Conversion failed"), "{html}");
}

#[tokio::test]
async fn missing_field_returns_error_page() {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"other\"\r\n\r\n");
    body.extend_from_slice(b"x");
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    let req = Request::builder()
        .uri("/")
        .method("POST")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Full::new(Bytes::from(body)))
        .unwrap();

    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), 400);
}
