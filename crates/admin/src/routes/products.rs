//! Product management.
//!
//! Create and update are multipart: text fields plus `images` files. The
//! form is validated here and only a clean [`ProductPayload`] reaches the
//! backend.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::{Category, Product};
use sgshop_core::{CategoryId, FieldErrors, Flash, Money, ProductId};

use crate::api::{ApiError, ProductFilter, ProductPayload};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireStaff, set_flash};
use crate::state::AppState;

use super::upload::UploadForm;
use super::{Pager, degrade, finish, non_blank};

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub category: String,
    pub price: String,
    pub sale_price: Option<String>,
    pub stock: i64,
    pub sold: i64,
}

impl From<&Product> for ProductRowView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            image: filters::image_url(product.primary_image().unwrap_or_default()),
            category: product.category_name.clone().unwrap_or_default(),
            price: product.price.to_string(),
            sale_price: product.is_on_sale().then(|| product.effective_price().to_string()),
            stock: product.stock,
            sold: product.sold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub id: CategoryId,
    pub name: String,
    pub selected: bool,
}

fn category_options(categories: &[Category], selected: Option<CategoryId>) -> Vec<CategoryOption> {
    categories
        .iter()
        .map(|c| CategoryOption {
            id: c.id,
            name: c.name.clone(),
            selected: selected == Some(c.id),
        })
        .collect()
}

// =============================================================================
// Form
// =============================================================================

/// Raw product form values, kept as typed for re-rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub sale_price: String,
    pub stock: String,
    pub category_id: String,
}

impl ProductForm {
    fn from_upload(form: &UploadForm) -> Self {
        Self {
            name: form.text("name").to_string(),
            description: form.text("description").to_string(),
            price: form.text("price").to_string(),
            sale_price: form.text("sale_price").to_string(),
            stock: form.text("stock").to_string(),
            category_id: form.text("category_id").to_string(),
        }
    }

    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.as_dong().to_string(),
            sale_price: product
                .sale_price
                .map(|p| p.as_dong().to_string())
                .unwrap_or_default(),
            stock: product.stock.to_string(),
            category_id: product.category_id.map(|c| c.to_string()).unwrap_or_default(),
        }
    }

    fn selected_category(&self) -> Option<CategoryId> {
        self.category_id.parse().ok()
    }

    /// Check the form. `new_images` counts the files sent with it; a new
    /// product needs at least one.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self, creating: bool, new_images: usize) -> Result<ProductPayload, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = errors.require_text("name", &self.name, "Tên sản phẩm là bắt buộc");
        let price = match errors.parse_money("price", &self.price, "Giá") {
            Some(p) if p.is_positive() => Some(p),
            Some(_) => {
                errors.add("price", "Giá phải lớn hơn 0");
                None
            }
            None => None,
        };

        let sale_price = match non_blank(Some(&self.sale_price)) {
            None => None,
            Some(raw) => errors.parse_money("sale_price", raw, "Giá khuyến mãi"),
        };
        if let (Some(sale), Some(price)) = (sale_price, price) {
            if sale >= price {
                errors.add("sale_price", "Giá khuyến mãi phải nhỏ hơn giá gốc");
            }
        }

        let stock = errors.parse_int_at_least("stock", &self.stock, 0, "Tồn kho");

        let category_id = self.selected_category();
        if category_id.is_none() {
            errors.add("category_id", "Vui lòng chọn danh mục");
        }

        if creating && new_images == 0 {
            errors.add("images", "Cần ít nhất một ảnh sản phẩm");
        }

        match (name, price, stock, category_id) {
            (Some(name), Some(price), Some(stock), Some(category_id)) if errors.is_empty() => {
                Ok(ProductPayload {
                    name,
                    description: FieldErrors::optional_text(Some(&self.description)),
                    price,
                    sale_price: sale_price.filter(Money::is_positive),
                    stock,
                    category_id,
                })
            }
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductRowView>,
    pub categories: Vec<CategoryOption>,
    pub keyword: String,
    pub pager: Pager,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub ctx: PageContext,
    /// `None` when creating.
    pub product_id: Option<ProductId>,
    pub form: ProductForm,
    pub categories: Vec<CategoryOption>,
    /// Images already stored, shown on edit.
    pub images: Vec<String>,
    pub errors: FieldErrors,
}

impl ProductFormTemplate {
    #[must_use]
    pub fn action(&self) -> String {
        self.product_id
            .map_or_else(|| "/products".to_string(), |id| format!("/products/{id}"))
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
}

/// Product list handler.
#[instrument(skip(state, staff, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let token = staff.token();
    let filter = ProductFilter {
        page: query.page.unwrap_or(1).max(1),
        keyword: non_blank(query.keyword.as_deref()).map(str::to_owned),
        category_id: non_blank(query.category.as_deref()).and_then(|c| c.parse().ok()),
        ..ProductFilter::default()
    };

    let (page, categories) = tokio::join!(
        state.api().products(token, &filter),
        state.api().categories(token),
    );
    let page = degrade(page, "products")?;
    let categories = degrade(categories, "categories")?;

    let keyword = filter.keyword.clone().unwrap_or_default();
    let category = filter.category_id.map(|c| c.to_string()).unwrap_or_default();
    let pager = Pager::new(
        page.view(),
        "/products",
        &[("keyword", &keyword), ("category", &category)],
    );

    Ok(ProductsIndexTemplate {
        ctx,
        products: page.content.iter().map(ProductRowView::from).collect(),
        categories: category_options(&categories, filter.category_id),
        keyword,
        pager,
    })
}

/// New product form handler.
#[instrument(skip(state, staff, ctx))]
pub async fn new_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let categories = degrade(state.api().categories(staff.token()).await, "categories")?;
    Ok(ProductFormTemplate {
        ctx,
        product_id: None,
        form: ProductForm {
            stock: "0".to_string(),
            ..ProductForm::default()
        },
        categories: category_options(&categories, None),
        images: Vec::new(),
        errors: FieldErrors::new(),
    })
}

/// Edit product form handler.
#[instrument(skip(state, staff, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ctx: PageContext,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let token = staff.token();
    let product = state.api().product(token, id).await?;
    let categories = degrade(state.api().categories(token).await, "categories")?;

    Ok(ProductFormTemplate {
        ctx,
        product_id: Some(id),
        form: ProductForm::from_product(&product),
        categories: category_options(&categories, product.category_id),
        images: stored_images(&product),
        errors: FieldErrors::new(),
    })
}

/// Create product handler.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    ctx: PageContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = UploadForm::read(multipart).await?;
    let images = upload.take_files("images");
    let form = ProductForm::from_upload(&upload);

    let payload = match form.validate(true, images.len()) {
        Ok(payload) => payload,
        Err(errors) => {
            return rerender(&state, staff.token(), ctx, None, form, Vec::new(), errors, &upload.rejected).await;
        }
    };

    match state.api().create_product(staff.token(), &payload, images).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, name = %product.name, "Product created");
            set_flash(&session, Flash::success(format!("Đã thêm sản phẩm \"{}\"", product.name))).await;
            Ok(Redirect::to("/products").into_response())
        }
        Err(e) => {
            api_failure(&state, staff.token(), ctx, None, form, Vec::new(), e, "Không thể thêm sản phẩm").await
        }
    }
}

/// Update product handler.
#[instrument(skip(state, staff, session, ctx, multipart))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    ctx: PageContext,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let token = staff.token();
    let mut upload = UploadForm::read(multipart).await?;
    let images = upload.take_files("images");
    let form = ProductForm::from_upload(&upload);

    let current_images = stored_images(&state.api().product(token, id).await?);

    let payload = match form.validate(false, images.len()) {
        Ok(payload) => payload,
        Err(errors) => {
            return rerender(&state, token, ctx, Some(id), form, current_images, errors, &upload.rejected).await;
        }
    };

    match state.api().update_product(token, id, &payload, images).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product updated");
            set_flash(&session, Flash::success(format!("Đã cập nhật \"{}\"", payload.name))).await;
            Ok(Redirect::to("/products").into_response())
        }
        Err(e) => {
            api_failure(&state, token, ctx, Some(id), form, current_images, e, "Không thể cập nhật sản phẩm").await
        }
    }
}

/// Delete product handler.
#[instrument(skip(state, staff, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    let result = state.api().delete_product(staff.token(), id).await;
    finish(&session, result, "Đã xoá sản phẩm", "Không thể xoá sản phẩm", "/products").await
}

fn stored_images(product: &Arc<Product>) -> Vec<String> {
    product.images.iter().map(|i| filters::image_url(i)).collect()
}

#[allow(clippy::too_many_arguments)]
async fn rerender(
    state: &AppState,
    token: &str,
    mut ctx: PageContext,
    product_id: Option<ProductId>,
    form: ProductForm,
    images: Vec<String>,
    errors: FieldErrors,
    rejected: &[String],
) -> Result<Response, AppError> {
    if !rejected.is_empty() {
        ctx.show(Flash::error(format!("Bỏ qua tệp không phải ảnh: {}", rejected.join(", "))));
    }
    let categories = degrade(state.api().categories(token).await, "categories")?;
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        ProductFormTemplate {
            ctx,
            product_id,
            categories: category_options(&categories, form.selected_category()),
            form,
            images,
            errors,
        },
    )
        .into_response())
}

#[allow(clippy::too_many_arguments)]
async fn api_failure(
    state: &AppState,
    token: &str,
    mut ctx: PageContext,
    product_id: Option<ProductId>,
    form: ProductForm,
    images: Vec<String>,
    error: ApiError,
    fallback: &str,
) -> Result<Response, AppError> {
    if error.is_unauthorized() {
        return Err(error.into());
    }
    tracing::warn!(error = %error, "{fallback}");
    ctx.show(Flash::error(error.user_message(fallback)));
    rerender(state, token, ctx, product_id, form, images, FieldErrors::new(), &[]).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: "Áo thun trắng".to_string(),
            description: "  ".to_string(),
            price: "250.000".to_string(),
            sale_price: "199000".to_string(),
            stock: "12".to_string(),
            category_id: "3".to_string(),
        }
    }

    #[test]
    fn test_valid_product() {
        let payload = form().validate(true, 1).unwrap();
        assert_eq!(payload.price, Money::from_dong(250_000));
        assert_eq!(payload.sale_price, Some(Money::from_dong(199_000)));
        assert_eq!(payload.category_id, CategoryId::new(3));
        assert_eq!(payload.description, None);
    }

    #[test]
    fn test_create_needs_an_image_but_update_does_not() {
        let errors = form().validate(true, 0).unwrap_err();
        assert!(errors.has("images"));
        assert!(form().validate(false, 0).is_ok());
    }

    #[test]
    fn test_sale_price_must_undercut_price() {
        let errors = ProductForm {
            sale_price: "250000".to_string(),
            ..form()
        }
        .validate(false, 0)
        .unwrap_err();
        assert_eq!(errors.message("sale_price"), "Giá khuyến mãi phải nhỏ hơn giá gốc");
    }

    #[test]
    fn test_price_stock_and_category_rules() {
        let errors = ProductForm {
            price: "0".to_string(),
            stock: "-1".to_string(),
            category_id: String::new(),
            ..form()
        }
        .validate(false, 0)
        .unwrap_err();
        assert_eq!(errors.message("price"), "Giá phải lớn hơn 0");
        assert!(errors.has("stock"));
        assert!(errors.has("category_id"));

        let fractional = ProductForm {
            stock: "1.5".to_string(),
            ..form()
        }
        .validate(false, 0)
        .unwrap_err();
        assert_eq!(fractional.message("stock"), "Tồn kho phải là số nguyên");
    }

    #[test]
    fn test_blank_sale_price_is_none() {
        let payload = ProductForm {
            sale_price: String::new(),
            ..form()
        }
        .validate(false, 0)
        .unwrap();
        assert_eq!(payload.sale_price, None);
    }
}
