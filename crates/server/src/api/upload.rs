//! Multipart upload parsing and image validation.
//!
//! Both API operations accept a multipart form with a `file` part. The part
//! must declare an accepted image content type, fit within the configured
//! size, and decode as a JPEG, PNG or WebP image. Only then are its bytes
//! handed to the identification service.

use crate::api::errors::ApiError;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use charid_core::config::ACCEPTED_CONTENT_TYPES;
use std::collections::HashMap;

/// Name of the multipart part carrying the image.
pub const FILE_FIELD: &str = "file";

/// An uploaded file part.
#[derive(Debug)]
pub struct FilePart {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A parsed multipart form: the file part plus any text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<FilePart>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Takes the file part, failing if the form had none.
    pub fn take_file(&mut self) -> Result<FilePart, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::BadRequest(format!("Missing '{FILE_FIELD}' part")))
    }
}

/// Message returned for uploads above the configured limit.
fn too_large(max_bytes: usize) -> ApiError {
    ApiError::BadRequest(format!(
        "File exceeds {}MB limit",
        max_bytes / (1024 * 1024)
    ))
}

/// Maps a multipart read failure. A body cut off by the request body limit
/// gets the same message as a file that was read fully but is too large.
fn multipart_error(e: MultipartError, max_bytes: usize, context: &str) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(max_bytes);
    }
    ApiError::BadRequest(format!("{context}: {e}"))
}

/// Reads every part of the form into memory.
pub async fn read_form(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes, "Invalid multipart body"))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == FILE_FIELD {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, max_bytes, "Invalid file part"))?;
            form.file = Some(FilePart {
                content_type,
                bytes,
            });
        } else {
            let value = field.text().await.map_err(|e| {
                multipart_error(e, max_bytes, &format!("Invalid field '{name}'"))
            })?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

/// Returns whether `content_type` names an accepted image type.
///
/// Comparison ignores case and any `;`-separated parameters.
pub fn is_accepted_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES.contains(&essence.as_str())
}

fn check_declared(file: &FilePart, max_bytes: usize) -> Result<(), ApiError> {
    if !file
        .content_type
        .as_deref()
        .is_some_and(is_accepted_content_type)
    {
        return Err(ApiError::BadRequest("Unsupported file type".into()));
    }
    if file.bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(())
}

fn check_decodes(bytes: &[u8]) -> Result<(), ApiError> {
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|_| ApiError::BadRequest("Invalid image file".into()))
}

/// Validates an uploaded image part. Checks run cheapest first; decoding
/// runs on the blocking pool.
pub async fn validate_image(file: &FilePart, max_bytes: usize) -> Result<(), ApiError> {
    check_declared(file, max_bytes)?;
    let bytes = file.bytes.clone();
    tokio::task::spawn_blocking(move || check_decodes(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Image validation task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Bytes {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    fn part(content_type: Option<&str>, bytes: Bytes) -> FilePart {
        FilePart {
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    #[test]
    fn test_content_type_allow_list() {
        assert!(is_accepted_content_type("image/png"));
        assert!(is_accepted_content_type("IMAGE/JPEG"));
        assert!(is_accepted_content_type("image/webp; charset=binary"));
        assert!(!is_accepted_content_type("image/gif"));
        assert!(!is_accepted_content_type("text/plain"));
    }

    #[tokio::test]
    async fn test_valid_png_passes() {
        assert!(validate_image(&part(Some("image/png"), png_bytes()), 1024 * 1024)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_content_type_rejected() {
        let err = validate_image(&part(None, png_bytes()), 1024 * 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Unsupported file type"));
    }

    #[tokio::test]
    async fn test_oversized_rejected() {
        let bytes = png_bytes();
        let err = validate_image(&part(Some("image/png"), bytes.clone()), bytes.len() - 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.starts_with("File exceeds")));
    }

    #[tokio::test]
    async fn test_corrupt_image_rejected() {
        let err = validate_image(
            &part(Some("image/png"), Bytes::from_static(b"not-an-image")),
            1024 * 1024,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Invalid image file"));
    }
}
