//! Upload processing: classify browser-supplied files and turn them into prompt context.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, instrument, warn};

use crate::config::Limits;
use crate::domain::{FileKind, ProcessedFile};
use crate::error::{AppError, AppResult};
use crate::protocol::FileUploadIn;
use crate::util::truncate_chars;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "json", "xml", "html", "htm", "tex"];
const TEXT_MIME_TYPES: &[&str] = &[
  "application/json",
  "application/xml",
  "application/x-tex",
  "application/x-latex",
  "application/csv",
];

fn extension(name: &str) -> Option<String> {
  name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Coarse classification from MIME type, falling back to the file extension.
pub fn classify(name: &str, mime_type: &str) -> FileKind {
  let mime = mime_type.trim().to_ascii_lowercase();
  let ext = extension(name);

  if mime.starts_with("image/") {
    FileKind::Image
  } else if mime == "application/pdf" || ext.as_deref() == Some("pdf") {
    FileKind::Pdf
  } else if mime.starts_with("text/")
    || TEXT_MIME_TYPES.contains(&mime.as_str())
    || ext.as_deref().map(|e| TEXT_EXTENSIONS.contains(&e)).unwrap_or(false)
  {
    FileKind::Text
  } else {
    FileKind::Unknown
  }
}

pub fn pdf_placeholder(name: &str) -> String {
  format!("[PDF document: {}. Content not extracted; use the file name as a topic hint.]", name)
}

/// Decode and classify one upload.
#[instrument(level = "debug", skip(upload, limits), fields(name = %upload.name, mime = %upload.mime_type))]
pub fn process_upload(upload: &FileUploadIn, limits: &Limits) -> AppResult<ProcessedFile> {
  // Browsers hand us data URLs from FileReader; accept both forms.
  let payload = match upload.data.split_once(";base64,") {
    Some((_, b64)) => b64,
    None => upload.data.as_str(),
  };
  let bytes = BASE64
    .decode(payload.trim())
    .map_err(|e| AppError::Validation(format!("file '{}' is not valid base64: {}", upload.name, e)))?;
  if bytes.len() > limits.max_file_bytes {
    return Err(AppError::Validation(format!(
      "file '{}' is {} bytes; the limit is {}",
      upload.name,
      bytes.len(),
      limits.max_file_bytes
    )));
  }

  let kind = classify(&upload.name, &upload.mime_type);
  let content = match kind {
    FileKind::Text => {
      let text = String::from_utf8_lossy(&bytes);
      let total = text.chars().count();
      if total > limits.max_text_chars {
        warn!(target: "quizcraft_backend", name = %upload.name, total, kept = limits.max_text_chars, "Text file truncated for prompt");
      }
      truncate_chars(&text, limits.max_text_chars)
    }
    // Re-encode so data-URL prefixes and whitespace never reach the AI request.
    FileKind::Image => BASE64.encode(&bytes),
    FileKind::Pdf => pdf_placeholder(&upload.name),
    FileKind::Unknown => format!("[Unsupported file: {} ({})]", upload.name, upload.mime_type),
  };

  debug!(target: "quizcraft_backend", kind = kind.as_str(), bytes = bytes.len(), "File processed");
  Ok(ProcessedFile {
    name: upload.name.clone(),
    mime_type: upload.mime_type.clone(),
    kind,
    content,
  })
}

pub fn process_uploads(uploads: &[FileUploadIn], limits: &Limits) -> AppResult<Vec<ProcessedFile>> {
  if uploads.len() > limits.max_files {
    return Err(AppError::Validation(format!(
      "{} files attached; at most {} are allowed",
      uploads.len(),
      limits.max_files
    )));
  }
  uploads.iter().map(|u| process_upload(u, limits)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn upload(name: &str, mime: &str, bytes: &[u8]) -> FileUploadIn {
    FileUploadIn { name: name.into(), mime_type: mime.into(), data: BASE64.encode(bytes) }
  }

  #[test]
  fn classification() {
    assert_eq!(classify("notes.txt", "text/plain"), FileKind::Text);
    assert_eq!(classify("lesson.md", ""), FileKind::Text);
    assert_eq!(classify("data.json", "application/json"), FileKind::Text);
    assert_eq!(classify("scan.PDF", "application/octet-stream"), FileKind::Pdf);
    assert_eq!(classify("photo.jpg", "image/jpeg"), FileKind::Image);
    assert_eq!(classify("slides.pptx", "application/vnd.ms-powerpoint"), FileKind::Unknown);
    assert_eq!(classify("noext", ""), FileKind::Unknown);
  }

  #[test]
  fn text_is_decoded_and_truncated() {
    let limits = Limits { max_text_chars: 5, ..Limits::default() };
    let f = process_upload(&upload("a.txt", "text/plain", "héllo world".as_bytes()), &limits).unwrap();
    assert_eq!(f.kind, FileKind::Text);
    assert_eq!(f.content, "héllo");
  }

  #[test]
  fn data_url_prefix_is_accepted() {
    let mut u = upload("p.png", "image/png", &[1, 2, 3, 4]);
    u.data = format!("data:image/png;base64,{}", u.data);
    let f = process_upload(&u, &Limits::default()).unwrap();
    assert_eq!(f.kind, FileKind::Image);
    assert_eq!(BASE64.decode(&f.content).unwrap(), vec![1, 2, 3, 4]);
  }

  #[test]
  fn pdf_and_unknown_get_placeholders() {
    let limits = Limits::default();
    let pdf = process_upload(&upload("unit3.pdf", "application/pdf", b"%PDF-1.4"), &limits).unwrap();
    assert_eq!(pdf.content, pdf_placeholder("unit3.pdf"));
    let other = process_upload(&upload("x.bin", "application/octet-stream", b"\0\0"), &limits).unwrap();
    assert!(other.content.starts_with("[Unsupported file: x.bin"));
  }

  #[test]
  fn rejects_bad_base64_oversize_and_too_many() {
    let limits = Limits { max_file_bytes: 3, max_files: 1, ..Limits::default() };
    let mut bad = upload("a.txt", "text/plain", b"ok");
    bad.data = "!!!not base64".into();
    assert!(matches!(process_upload(&bad, &limits), Err(AppError::Validation(_))));

    let big = upload("a.txt", "text/plain", b"too big");
    assert!(matches!(process_upload(&big, &limits), Err(AppError::Validation(_))));

    let two = vec![upload("a.txt", "text/plain", b"a"), upload("b.txt", "text/plain", b"b")];
    assert!(matches!(process_uploads(&two, &limits), Err(AppError::Validation(_))));
  }
}
