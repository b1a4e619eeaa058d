//! Parsing uploaded documents into plain text.
//!
//! Strategy per format: PDF goes through native text extraction first and
//! falls back to OCR when the text layer is missing; DOCX is read as the
//! packaged XML with the same OCR fallback; HTML is handed to the OCR
//! provider as a rendered capture, with tag-stripping as the last resort.
//! OCR itself is a pluggable provider.

use crate::strip_tags;
use async_trait::async_trait;
use pravo_core::{classify_status, Error, Result};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use serde::Deserialize;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::debug;

/// Minimum extracted length before the native path is trusted.
const MIN_NATIVE_TEXT: usize = 50;

/// How the text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    PdfNative,
    PdfOcr,
    DocxNative,
    DocxOcr,
    Html,
    HtmlOcr,
    PlainText,
}

/// Result of parsing an upload.
#[derive(Debug, Clone)]
pub struct ParsedUpload {
    pub text: String,
    pub page_count: Option<usize>,
    pub source: ExtractionSource,
}

/// Pluggable OCR seam.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Recognizes text in a binary document or rendered page.
    async fn recognize(&self, bytes: &[u8], mime: &str) -> Result<String>;
}

/// OCR over a remote recognition service.
pub struct RemoteOcrClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OcrResponse {
    text: String,
}

impl RemoteOcrClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OcrProvider for RemoteOcrClient {
    async fn recognize(&self, bytes: &[u8], mime: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", mime.to_string())
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("ocr request: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }
        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| Error::Unavailable(format!("ocr decode: {e}")))?;
        Ok(parsed.text)
    }
}

/// The uploaded-document adapter.
pub struct UploadParser {
    ocr: Option<Arc<dyn OcrProvider>>,
}

impl UploadParser {
    pub fn new() -> Self {
        Self { ocr: None }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrProvider>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Parses an upload into plain text.
    pub async fn parse(&self, bytes: &[u8], mime: &str) -> Result<ParsedUpload> {
        match mime {
            "application/pdf" => self.parse_pdf(bytes).await,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                self.parse_docx(bytes).await
            }
            "text/html" => self.parse_html(bytes).await,
            "text/plain" => Ok(ParsedUpload {
                text: String::from_utf8_lossy(bytes).into_owned(),
                page_count: None,
                source: ExtractionSource::PlainText,
            }),
            other => Err(Error::invalid_argument(format!(
                "unsupported upload mime type: {other}"
            ))),
        }
    }

    async fn parse_pdf(&self, bytes: &[u8]) -> Result<ParsedUpload> {
        let owned = bytes.to_vec();
        let native = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!("pdf task: {e}")))?;

        match native {
            Ok(text) if text.trim().len() >= MIN_NATIVE_TEXT => {
                let page_count = text.matches('\u{c}').count().checked_add(1);
                Ok(ParsedUpload {
                    text,
                    page_count,
                    source: ExtractionSource::PdfNative,
                })
            }
            Ok(_) | Err(_) => {
                debug!("pdf text layer missing, falling back to ocr");
                let text = self.run_ocr(bytes, "application/pdf").await?;
                Ok(ParsedUpload {
                    text,
                    page_count: None,
                    source: ExtractionSource::PdfOcr,
                })
            }
        }
    }

    async fn parse_docx(&self, bytes: &[u8]) -> Result<ParsedUpload> {
        match extract_docx_text(bytes) {
            Ok(text) if text.trim().len() >= MIN_NATIVE_TEXT => Ok(ParsedUpload {
                text,
                page_count: None,
                source: ExtractionSource::DocxNative,
            }),
            Ok(short) if !short.trim().is_empty() => Ok(ParsedUpload {
                // Genuinely short documents are not an extraction failure.
                text: short,
                page_count: None,
                source: ExtractionSource::DocxNative,
            }),
            _ => {
                debug!("docx extraction failed, falling back to ocr");
                let text = self
                    .run_ocr(
                        bytes,
                        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                    )
                    .await?;
                Ok(ParsedUpload {
                    text,
                    page_count: None,
                    source: ExtractionSource::DocxOcr,
                })
            }
        }
    }

    async fn parse_html(&self, bytes: &[u8]) -> Result<ParsedUpload> {
        if self.ocr.is_some() {
            let text = self.run_ocr(bytes, "text/html").await?;
            return Ok(ParsedUpload {
                text,
                page_count: None,
                source: ExtractionSource::HtmlOcr,
            });
        }
        let html = String::from_utf8_lossy(bytes);
        Ok(ParsedUpload {
            text: strip_tags(&html),
            page_count: None,
            source: ExtractionSource::Html,
        })
    }

    async fn run_ocr(&self, bytes: &[u8], mime: &str) -> Result<String> {
        match &self.ocr {
            Some(ocr) => ocr.recognize(bytes, mime).await,
            None => Err(Error::Unavailable(
                "no ocr provider configured for scanned document".into(),
            )),
        }
    }
}

impl Default for UploadParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads `word/document.xml` out of the package and collects run text.
fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::invalid_argument(format!("not a docx package: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::invalid_argument(format!("docx missing document part: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::invalid_argument(format!("docx document part: {e}")))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(XmlEvent::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(XmlEvent::Text(t)) if in_text_run => {
                out.push_str(&t.unescape().map_err(|e| {
                    Error::invalid_argument(format!("docx text escape: {e}"))
                })?);
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => return Err(Error::invalid_argument(format!("docx xml: {e}"))),
            _ => {}
        }
    }
    Ok(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FakeOcr;

    #[async_trait]
    impl OcrProvider for FakeOcr {
        async fn recognize(&self, _bytes: &[u8], _mime: &str) -> Result<String> {
            Ok("розпізнаний текст".to_string())
        }
    }

    fn docx_with(text: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            write!(
                writer,
                r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>"#
            )
            .unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_plain_text_passthrough() {
        let parser = UploadParser::new();
        let parsed = parser.parse("умови договору".as_bytes(), "text/plain").await.unwrap();
        assert_eq!(parsed.text, "умови договору");
        assert_eq!(parsed.source, ExtractionSource::PlainText);
    }

    #[tokio::test]
    async fn test_docx_native_extraction() {
        let bytes = docx_with(
            "Постачальник зобов'язується передати товар у власність Покупця в обумовлений строк.",
        );
        let parser = UploadParser::new();
        let parsed = parser
            .parse(
                &bytes,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            )
            .await
            .unwrap();
        assert_eq!(parsed.source, ExtractionSource::DocxNative);
        assert!(parsed.text.contains("Постачальник"));
    }

    #[tokio::test]
    async fn test_html_without_ocr_strips_tags() {
        let parser = UploadParser::new();
        let parsed = parser
            .parse(
                "<html><body><p>Текст угоди</p></body></html>".as_bytes(),
                "text/html",
            )
            .await
            .unwrap();
        assert_eq!(parsed.source, ExtractionSource::Html);
        assert_eq!(parsed.text, "Текст угоди");
    }

    #[tokio::test]
    async fn test_html_with_ocr_uses_ocr() {
        let parser = UploadParser::new().with_ocr(Arc::new(FakeOcr));
        let parsed = parser.parse(b"<html></html>", "text/html").await.unwrap();
        assert_eq!(parsed.source, ExtractionSource::HtmlOcr);
        assert_eq!(parsed.text, "розпізнаний текст");
    }

    #[tokio::test]
    async fn test_unknown_mime_rejected() {
        let parser = UploadParser::new();
        let err = parser.parse(b"...", "image/tiff").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_broken_pdf_without_ocr_is_unavailable() {
        let parser = UploadParser::new();
        let err = parser.parse(b"not a pdf", "application/pdf").await.unwrap_err();
        assert_eq!(err.code(), "UNAVAILABLE");
    }
}
