//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use sgshop_core::records::{Category, Product};
use sgshop_core::{CategoryId, ProductId};

use crate::api::{ProductQuery, ProductSort};
use crate::error::AppError;
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

use super::{Pager, non_blank};

/// Related products shown under a product.
const RELATED_LIMIT: usize = 4;

/// Product card display data for templates.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub price: String,
    /// List price, shown struck through when on sale.
    pub original_price: Option<String>,
    pub in_stock: bool,
    pub sold: i64,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            image: filters::image_url(product.primary_image().unwrap_or_default()),
            price: product.effective_price().to_string(),
            original_price: product.is_on_sale().then(|| product.price.to_string()),
            in_stock: product.in_stock(),
            sold: product.sold,
        }
    }
}

/// Product detail display data.
#[derive(Debug, Clone)]
pub struct ProductDetailView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub price: String,
    pub original_price: Option<String>,
    pub stock: i64,
    pub sold: i64,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
}

impl ProductDetailView {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

impl From<&Product> for ProductDetailView {
    fn from(product: &Product) -> Self {
        let mut images: Vec<String> = product.images.iter().map(|i| filters::image_url(i)).collect();
        if images.is_empty() {
            images.push(filters::image_url(""));
        }
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            images,
            price: product.effective_price().to_string(),
            original_price: product.is_on_sale().then(|| product.price.to_string()),
            stock: product.stock,
            sold: product.sold,
            category_id: product.category_id,
            category_name: product.category_name.clone(),
        }
    }
}

/// Sort option for the listing's select.
#[derive(Debug, Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Category filter option.
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
            selected: Some(c.id) == selected,
        })
        .collect()
}

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
}

impl ListParams {
    /// Backend query for these parameters. Unparseable values are ignored.
    #[must_use]
    pub fn to_query(&self) -> ProductQuery {
        ProductQuery {
            page: self.page.unwrap_or(1).max(1),
            keyword: non_blank(self.keyword.as_deref()).map(String::from),
            category_id: non_blank(self.category.as_deref()).and_then(|c| c.parse().ok()),
            sort: ProductSort::parse(self.sort.as_deref()),
            ..ProductQuery::default()
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductCardView>,
    pub keyword: String,
    pub categories: Vec<CategoryOption>,
    pub sorts: Vec<SortOption>,
    pub total_items: u64,
    pub pager: Pager,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub ctx: PageContext,
    pub product: ProductDetailView,
    pub related: Vec<ProductCardView>,
}

/// Display product listing with search, category filter, sort and paging.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.to_query();

    let (products, categories) = tokio::join!(state.api().list_products(&query), state.api().categories());
    let products = products?;
    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!("Failed to load categories: {e}");
        std::sync::Arc::default()
    });

    let category = query.category_id.map(|id| id.to_string()).unwrap_or_default();
    let keyword = query.keyword.clone().unwrap_or_default();
    let pager = Pager::new(
        products.view(),
        "/products",
        &[
            ("keyword", keyword.as_str()),
            ("category", category.as_str()),
            ("sort", query.sort.as_str()),
        ],
    );

    Ok(ProductsIndexTemplate {
        ctx,
        products: products.content.iter().map(ProductCardView::from).collect(),
        keyword,
        categories: category_options(&categories, query.category_id),
        sorts: ProductSort::ALL
            .iter()
            .map(|s| SortOption {
                value: s.as_str(),
                label: s.label(),
                selected: *s == query.sort,
            })
            .collect(),
        total_items: products.total_elements,
        pager,
    })
}

/// Display product detail with related products from the same category.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.api().get_product(id).await?;

    let related = match product.category_id {
        Some(category_id) => {
            let query = ProductQuery {
                category_id: Some(category_id),
                size: u32::try_from(RELATED_LIMIT + 1).unwrap_or(5),
                ..ProductQuery::default()
            };
            match state.api().list_products(&query).await {
                Ok(page) => related_cards(&page.content, product.id),
                Err(e) => {
                    tracing::warn!("Failed to load related products: {e}");
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    Ok(ProductShowTemplate {
        ctx,
        product: ProductDetailView::from(product.as_ref()),
        related,
    })
}

/// Up to four other products.
fn related_cards(products: &[Product], exclude: ProductId) -> Vec<ProductCardView> {
    products
        .iter()
        .filter(|p| p.id != exclude)
        .take(RELATED_LIMIT)
        .map(ProductCardView::from)
        .collect()
}
