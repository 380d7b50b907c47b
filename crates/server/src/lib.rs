//! Upload-and-convert HTTP front end: POST a zipped book folder to `/`,
//! get the finished EPUB back as a download. `GET /` serves a minimal
//! upload form for manual use.

pub mod config;

use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use html2epub_core::error::MakeError;
use html2epub_core::folder::InputFolder;
use html2epub_core::job::make_book;

/// Uploads larger than this are rejected outright.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Multipart field name carrying the zipped book folder.
const UPLOAD_FIELD: &str = "input";

pub fn app() -> Router {
    Router::new()
        .route("/", get(home).post(convert))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn home() -> Html<&'static str> {
    Html(
        "<html>\n\
         <head><title>html2epub</title></head>\n\
         <body>\n\
         <h1>html2epub</h1>\n\
         <p>Zip the book folder (book.ini, book.html, assets) and upload it:</p>\n\
         <form action=\"/\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"input\"/>\n\
         <input type=\"submit\" value=\"Convert\"/>\n\
         </form>\n\
         </body>\n\
         </html>\n",
    )
}

async fn convert(mut multipart: Multipart) -> Response {
    let mut upload: Option<Bytes> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some(UPLOAD_FIELD) {
                    match field.bytes().await {
                        Ok(bytes) => upload = Some(bytes),
                        Err(e) => {
                            return error_page(StatusCode::BAD_REQUEST, &e.to_string())
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(e) => return error_page(StatusCode::BAD_REQUEST, &e.to_string()),
        }
    }
    let Some(upload) = upload else {
        return error_page(StatusCode::BAD_REQUEST, "missing \"input\" file field");
    };
    tracing::info!(bytes = upload.len(), "upload received");

    let result = InputFolder::from_zip_bytes(upload.to_vec())
        .map_err(MakeError::from)
        .and_then(|mut folder| make_book(&mut folder));

    match result {
        Ok(result) => {
            let disposition =
                format!("attachment; filename=\"{}\"", result.suggested_name());
            (
                [
                    (header::CONTENT_TYPE, "application/epub+zip".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                result.data,
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "conversion failed");
            error_page(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let escaped = message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let body = format!(
        "<html>\n\
         <head><title>html2epub - error</title></head>\n\
         <body>\n\
         <h1>Conversion failed</h1>\n\
         <p>{}</p>\n\
         <p><a href=\"/\">Back</a></p>\n\
         </body>\n\
         </html>\n",
        escaped
    );
    (status, Html(body)).into_response()
}
