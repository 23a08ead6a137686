//! Reading multipart forms with image files.
//!
//! Product and banner forms mix text fields with `<input type="file">`
//! parts. Files pass through to the backend unchanged; only the content
//! type is checked here.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::api::ImageUpload;
use crate::error::AppError;

/// Content types the backend stores as images.
const IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Text fields and image files from one multipart submission.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: Vec<(String, ImageUpload)>,
    /// File parts dropped for not being images.
    pub rejected: Vec<String>,
}

impl UploadForm {
    /// Drain a multipart body.
    ///
    /// Empty file inputs (no file chosen) are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is malformed or too large.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Dữ liệu tải lên không hợp lệ: {e}")))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let content_type = field.content_type().unwrap_or_default().to_owned();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Không đọc được tệp: {e}")))?;
                    if file_name.is_empty() || bytes.is_empty() {
                        continue;
                    }
                    form.push_file(
                        name,
                        ImageUpload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Dữ liệu biểu mẫu không hợp lệ: {e}")))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    fn push_file(&mut self, field: String, upload: ImageUpload) {
        if IMAGE_TYPES.contains(&upload.content_type.as_str()) {
            self.files.push((field, upload));
        } else {
            tracing::info!(file = %upload.file_name, content_type = %upload.content_type, "Rejected non-image upload");
            self.rejected.push(upload.file_name);
        }
    }

    /// A text field, empty when absent.
    #[must_use]
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }

    /// Checkbox state: present means checked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Take every image sent under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<ImageUpload> {
        let (taken, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.files).into_iter().partition(|(f, _)| f == name);
        self.files = kept;
        taken.into_iter().map(|(_, upload)| upload).collect()
    }
}

#[cfg(test)]
impl UploadForm {
    pub(crate) fn with_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn add_file(&mut self, field: &str, file_name: &str, content_type: &str) {
        self.push_file(
            field.to_string(),
            ImageUpload {
                file_name: file_name.to_string(),
                content_type: content_type.to_string(),
                bytes: vec![1, 2, 3],
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_images_are_kept() {
        let mut form = UploadForm::with_fields(&[("name", "Áo dài")]);
        form.add_file("images", "a.jpg", "image/jpeg");
        form.add_file("images", "notes.pdf", "application/pdf");
        form.add_file("image", "b.png", "image/png");

        assert_eq!(form.text("name"), "Áo dài");
        assert_eq!(form.text("missing"), "");
        assert_eq!(form.rejected, vec!["notes.pdf"]);

        let images = form.take_files("images");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].file_name, "a.jpg");
        assert_eq!(form.take_files("image").len(), 1);
        assert!(form.take_files("images").is_empty());
    }
}
