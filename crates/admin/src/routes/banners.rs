//! Home page banners.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::Banner;
use sgshop_core::{BannerId, FieldErrors, Flash};

use crate::api::{BannerPayload, ImageUpload};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireStaff};
use crate::state::AppState;

use super::upload::UploadForm;
use super::{degrade, finish};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerForm {
    pub title: String,
    pub link: String,
    pub active: bool,
}

impl BannerForm {
    fn from_upload(form: &UploadForm) -> Self {
        Self {
            title: form.text("title").to_string(),
            link: form.text("link").to_string(),
            active: form.checked("active"),
        }
    }

    /// # Errors
    ///
    /// Returns the field errors: a title and an image are required, and a
    /// link must point at this site or an http(s) URL.
    pub fn validate(&self, image: Option<ImageUpload>) -> Result<(BannerPayload, ImageUpload), FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = errors.require_text("title", &self.title, "Tiêu đề là bắt buộc");

        let link = FieldErrors::optional_text(Some(&self.link));
        if let Some(link) = &link {
            if !(link.starts_with('/') || link.starts_with("http://") || link.starts_with("https://")) {
                errors.add("link", "Liên kết phải bắt đầu bằng / hoặc http(s)://");
            }
        }

        if image.is_none() {
            errors.add("image", "Vui lòng chọn ảnh banner");
        }

        match (title, image) {
            (Some(title), Some(image)) if errors.is_empty() => Ok((
                BannerPayload {
                    title,
                    link,
                    active: self.active,
                },
                image,
            )),
            _ => Err(errors),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "banners/index.html")]
pub struct BannersTemplate {
    pub ctx: PageContext,
    pub banners: Vec<Banner>,
    pub form: BannerForm,
    pub errors: FieldErrors,
}

/// Banner list with the upload form.
#[instrument(skip(state, staff, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let banners = degrade(state.api().banners(staff.token()).await, "banners")?;
    Ok(BannersTemplate {
        ctx,
        banners: banners.to_vec(),
        form: BannerForm {
            active: true,
            ..BannerForm::default()
        },
        errors: FieldErrors::new(),
    })
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    mut ctx: PageContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = UploadForm::read(multipart).await?;
    let image = upload.take_files("image").into_iter().next();
    let form = BannerForm::from_upload(&upload);

    let (payload, image) = match form.validate(image) {
        Ok(valid) => valid,
        Err(mut errors) => {
            if !upload.rejected.is_empty() {
                errors.add("image", "Tệp đã chọn không phải ảnh");
            }
            let banners = degrade(state.api().banners(staff.token()).await, "banners")?;
            ctx.show(Flash::error("Vui lòng kiểm tra lại thông tin banner"));
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                BannersTemplate {
                    ctx,
                    banners: banners.to_vec(),
                    form,
                    errors,
                },
            )
                .into_response());
        }
    };

    let result = state.api().create_banner(staff.token(), &payload, image).await;
    Ok(finish(&session, result, "Đã thêm banner", "Không thể thêm banner", "/banners")
        .await?
        .into_response())
}

/// Flip a banner between shown and hidden.
#[instrument(skip(state, staff, session))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    Path(id): Path<BannerId>,
) -> Result<Redirect, AppError> {
    let token = staff.token();
    let banners = state.api().banners(token).await?;
    let banner = banners
        .iter()
        .find(|b| b.id == id)
        .ok_or_else(|| AppError::NotFound(format!("banner {id}")))?;

    let active = !banner.active;
    let result = state.api().set_banner_active(token, id, active).await;
    let success = if active { "Đã hiển thị banner" } else { "Đã ẩn banner" };
    finish(&session, result, success, "Không thể cập nhật banner", "/banners").await
}

#[instrument(skip(state, staff, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    Path(id): Path<BannerId>,
) -> Result<Redirect, AppError> {
    let result = state.api().delete_banner(staff.token(), id).await;
    finish(&session, result, "Đã xoá banner", "Không thể xoá banner", "/banners").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn image() -> ImageUpload {
        ImageUpload {
            file_name: "tet.webp".to_string(),
            content_type: "image/webp".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_banner_from_upload() {
        let mut upload = UploadForm::with_fields(&[("title", " Sale Tết "), ("link", "/products?category=2"), ("active", "on")]);
        upload.add_file("image", "tet.webp", "image/webp");
        let image = upload.take_files("image").into_iter().next();

        let (payload, image) = BannerForm::from_upload(&upload).validate(image).unwrap();
        assert_eq!(payload.title, "Sale Tết");
        assert_eq!(payload.link.as_deref(), Some("/products?category=2"));
        assert!(payload.active);
        assert_eq!(image.file_name, "tet.webp");
    }

    #[test]
    fn test_banner_needs_image_and_sane_link() {
        let form = BannerForm {
            title: "Sale".to_string(),
            link: "javascript:alert(1)".to_string(),
            active: false,
        };
        let errors = form.validate(None).unwrap_err();
        assert!(errors.has("image"));
        assert!(errors.has("link"));

        let ok = BannerForm {
            link: String::new(),
            ..form
        };
        let (payload, _) = ok.validate(Some(image())).unwrap();
        assert_eq!(payload.link, None);
        assert!(!payload.active);
    }

    #[test]
    fn test_non_image_upload_is_rejected() {
        let mut upload = UploadForm::with_fields(&[("title", "Sale")]);
        upload.add_file("image", "virus.exe", "application/octet-stream");
        assert!(upload.take_files("image").is_empty());
        assert_eq!(upload.rejected, vec!["virus.exe".to_string()]);
    }
}
