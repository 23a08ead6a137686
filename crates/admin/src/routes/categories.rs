//! Category management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::Category;
use sgshop_core::{CategoryId, FieldErrors};

use crate::api::CategoryPayload;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireStaff};
use crate::state::AppState;

use super::{degrade, finish};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CategoryForm {
    fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            description: category.description.clone().unwrap_or_default(),
        }
    }

    /// # Errors
    ///
    /// Returns the field errors when the name is blank.
    pub fn validate(&self) -> Result<CategoryPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.require_text("name", &self.name, "Tên danh mục là bắt buộc");
        match name {
            Some(name) => Ok(CategoryPayload {
                name,
                description: FieldErrors::optional_text(Some(&self.description)),
            }),
            None => Err(errors),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesTemplate {
    pub ctx: PageContext,
    pub categories: Vec<Category>,
    pub form: CategoryForm,
    pub errors: FieldErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "categories/edit.html")]
pub struct CategoryEditTemplate {
    pub ctx: PageContext,
    pub category_id: CategoryId,
    pub form: CategoryForm,
    pub errors: FieldErrors,
}

/// Category list with the create form.
#[instrument(skip(state, staff, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let categories = degrade(state.api().categories(staff.token()).await, "categories")?;
    Ok(CategoriesTemplate {
        ctx,
        categories: categories.to_vec(),
        form: CategoryForm::default(),
        errors: FieldErrors::new(),
    })
}

#[instrument(skip(state, staff, session, ctx, form))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    ctx: PageContext,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => {
            let categories = degrade(state.api().categories(staff.token()).await, "categories")?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                CategoriesTemplate {
                    ctx,
                    categories: categories.to_vec(),
                    form,
                    errors,
                },
            )
                .into_response());
        }
    };

    let result = state.api().create_category(staff.token(), &payload).await;
    let success = format!("Đã thêm danh mục \"{}\"", payload.name);
    Ok(finish(&session, result, &success, "Không thể thêm danh mục", "/categories")
        .await?
        .into_response())
}

#[instrument(skip(state, staff, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
    Path(id): Path<CategoryId>,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.api().categories(staff.token()).await?;
    let category = categories
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;

    Ok(CategoryEditTemplate {
        ctx,
        category_id: id,
        form: CategoryForm::from_category(category),
        errors: FieldErrors::new(),
    })
}

#[instrument(skip(state, staff, session, ctx, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    ctx: PageContext,
    Path(id): Path<CategoryId>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                CategoryEditTemplate {
                    ctx,
                    category_id: id,
                    form,
                    errors,
                },
            )
                .into_response());
        }
    };

    let result = state.api().update_category(staff.token(), id, &payload).await;
    Ok(finish(&session, result, "Đã cập nhật danh mục", "Không thể cập nhật danh mục", "/categories")
        .await?
        .into_response())
}

/// The backend refuses to delete a category that still has products; its
/// message is flashed as is.
#[instrument(skip(state, staff, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    Path(id): Path<CategoryId>,
) -> Result<Redirect, AppError> {
    let result = state.api().delete_category(staff.token(), id).await;
    finish(&session, result, "Đã xoá danh mục", "Không thể xoá danh mục", "/categories").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_form() {
        let payload = CategoryForm {
            name: "  Áo khoác ".to_string(),
            description: String::new(),
        }
        .validate()
        .unwrap();
        assert_eq!(payload.name, "Áo khoác");
        assert_eq!(payload.description, None);

        let errors = CategoryForm::default().validate().unwrap_err();
        assert_eq!(errors.message("name"), "Tên danh mục là bắt buộc");
    }
}
