//! Image upload gate for the facility/media step
//!
//! Uploads are validated here, before they can reach form state: anything
//! oversized or not an image is rejected with a descriptive error.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};

/// Maximum accepted image size.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5 MB

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("image is {size} bytes, maximum is {MAX_IMAGE_BYTES}")]
    TooLarge { size: usize },

    #[error("unsupported file type '{content_type}', expected an image")]
    NotAnImage { content_type: String },

    #[error("uploaded file is empty")]
    Empty,
}

/// A validated image held in form state.
///
/// Constructing one through [`ImageUpload::from_bytes`] is the only way to
/// get an image into the form, so state never holds a rejected upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Validate and wrap raw upload bytes.
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, MediaError> {
        let content_type = content_type.into();
        if !content_type.starts_with("image/") {
            return Err(MediaError::NotAnImage { content_type });
        }
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(MediaError::TooLarge { size: bytes.len() });
        }
        Ok(Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 data-URL preview, also used by backends without file parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, B64.encode(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_images() {
        let bytes = vec![0u8; MAX_IMAGE_BYTES + 1];
        let err = ImageUpload::from_bytes("centre.jpg", "image/jpeg", bytes).unwrap_err();
        assert_eq!(
            err,
            MediaError::TooLarge {
                size: MAX_IMAGE_BYTES + 1
            }
        );
    }

    #[test]
    fn accepts_images_at_the_size_bound() {
        let bytes = vec![0u8; MAX_IMAGE_BYTES];
        let upload = ImageUpload::from_bytes("centre.jpg", "image/jpeg", bytes).unwrap();
        assert_eq!(upload.len(), MAX_IMAGE_BYTES);
    }

    #[test]
    fn rejects_non_image_content_types() {
        let err = ImageUpload::from_bytes("notes.pdf", "application/pdf", vec![1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            MediaError::NotAnImage {
                content_type: "application/pdf".to_string()
            }
        );
    }

    #[test]
    fn data_url_carries_content_type_and_base64_body() {
        let upload = ImageUpload::from_bytes("dot.png", "image/png", vec![137, 80, 78, 71]).unwrap();
        let url = upload.data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.len() > "data:image/png;base64,".len());
    }
}
