//! Translate route - upload a PDF, get the translated PDF back.

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::Response,
};
use axum_extra::extract::Multipart;
use std::sync::Arc;
use tarjama_core::{Canvas, PageLayout, PdfDocument};
use tracing::{error, info, warn};

use crate::helpers::{OptionExt, ResultExt, RouteResult, download_name};
use crate::state::AppState;

/// Translate an uploaded PDF.
///
/// Multipart fields: `file` (required), `layout` and `canvas` (optional,
/// defaulting to the server configuration). Responds with the translated
/// document as an attachment.
pub async fn translate_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<Response> {
    let mut options = state.default_options();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("document.pdf").to_string();
                let data = field.bytes().await.or_bad_request()?;
                upload = Some((filename, data.to_vec()));
            }
            "layout" => {
                let value = field.text().await.or_bad_request()?;
                options.layout = value.trim().parse::<PageLayout>().or_bad_request()?;
            }
            "canvas" => {
                let value = field.text().await.or_bad_request()?;
                options.canvas = value.trim().parse::<Canvas>().or_bad_request()?;
            }
            other => warn!("Ignoring unknown form field {:?}", other),
        }
    }

    let (filename, data) = upload.or_bad_request("No file uploaded")?;
    if data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Uploaded file is empty".to_string()));
    }

    // Parse PDF in a blocking task to avoid blocking the async runtime
    let doc = tokio::task::spawn_blocking(move || PdfDocument::from_bytes(data))
        .await
        .map_err(|e| {
            error!("PDF parsing task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PDF parsing failed".to_string(),
            )
        })?
        .map_err(|e| {
            error!("Failed to parse PDF: {}", e);
            (StatusCode::BAD_REQUEST, format!("Invalid PDF: {e}"))
        })?;

    info!(
        "Translating {} ({} pages, {:?})",
        filename,
        doc.page_count(),
        options.layout
    );

    let result = state
        .translator
        .translate_with(&doc, &options, None)
        .await
        .map_err(|e| {
            error!("Translation of {} failed: {}", filename, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name(&filename)),
        )
        .body(Body::from(result.pdf_bytes))
        .or_internal_error()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::fixtures;
    use crate::routes::router;
    use crate::state::AppState;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use std::sync::Arc;
    use tarjama_core::{
        AppConfig, ArabicFont, BatchConfig, Lang, PdfTranslator, Result, Translator, TranslatorInfo,
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "tarjama-test-boundary";

    struct EchoArabic;

    #[async_trait]
    impl Translator for EchoArabic {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "mock",
                requires_api_key: false,
                supports_batch: false,
            }
        }

        async fn translate(&self, _text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
            Ok("مرحبا".to_string())
        }
    }

    fn test_state() -> Arc<AppState> {
        let config = AppConfig {
            batch: BatchConfig {
                inter_batch_delay_ms: 0,
                ..BatchConfig::default()
            },
            ..AppConfig::default()
        };
        let font = ArabicFont::from_bytes(fixtures::minimal_font()).unwrap();
        let translator = PdfTranslator::with_font(Arc::new(EchoArabic), font, config).unwrap();
        Arc::new(AppState::from_translator(translator))
    }

    fn sample_pdf() -> Vec<u8> {
        let (mut doc, _) = fixtures::single_page_document("Hello");
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// Multipart body with an optional file part and extra text fields.
    fn multipart_body(file: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(data) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"report.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn translate_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/translate")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(test_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_translate_returns_pdf_attachment() {
        let body = multipart_body(Some(&sample_pdf()), &[("layout", "interleaved")]);
        let response = router(test_state())
            .oneshot(translate_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"translated_report.pdf\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let body = multipart_body(None, &[("layout", "overwrite")]);
        let response = router(test_state())
            .oneshot(translate_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_bad_request() {
        let body = multipart_body(Some(b"definitely not a pdf"), &[]);
        let response = router(test_state())
            .oneshot(translate_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_layout_is_bad_request() {
        let body = multipart_body(Some(&sample_pdf()), &[("layout", "sideways")]);
        let response = router(test_state())
            .oneshot(translate_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
