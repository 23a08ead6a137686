//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use sgshop_core::records::{Banner, Category};

use crate::api::{ProductQuery, ProductSort};
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

use super::products::ProductCardView;

/// Products per home page section.
const SECTION_SIZE: u32 = 8;

/// A hero slide.
#[derive(Debug, Clone)]
pub struct BannerView {
    pub title: String,
    pub image: String,
    pub link: String,
}

impl From<&Banner> for BannerView {
    fn from(banner: &Banner) -> Self {
        Self {
            title: banner.title.clone(),
            image: filters::image_url(&banner.image_url),
            link: banner
                .link
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or("/products")
                .to_string(),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub banners: Vec<BannerView>,
    pub categories: Vec<Category>,
    pub newest: Vec<ProductCardView>,
    pub best_sellers: Vec<ProductCardView>,
}

/// Display the home page.
///
/// Each section degrades to empty when its backend call fails so one bad
/// endpoint does not take the whole page down.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let api = state.api();
    let newest_query = ProductQuery {
        size: SECTION_SIZE,
        ..ProductQuery::default()
    };
    let best_query = ProductQuery {
        size: SECTION_SIZE,
        sort: ProductSort::BestSelling,
        ..ProductQuery::default()
    };

    let (banners, categories, newest, best) = tokio::join!(
        api.active_banners(),
        api.categories(),
        api.list_products(&newest_query),
        api.list_products(&best_query),
    );

    let banners = banners
        .map(|b| b.iter().map(BannerView::from).collect())
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load banners: {e}");
            Vec::new()
        });
    let categories = categories.map(|c| c.as_ref().clone()).unwrap_or_else(|e| {
        tracing::warn!("Failed to load categories: {e}");
        Vec::new()
    });
    let newest = newest
        .map(|p| p.content.iter().map(ProductCardView::from).collect())
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load newest products: {e}");
            Vec::new()
        });
    let best_sellers = best
        .map(|p| p.content.iter().map(ProductCardView::from).collect())
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load best sellers: {e}");
            Vec::new()
        });

    HomeTemplate {
        ctx,
        banners,
        categories,
        newest,
        best_sellers,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_link_defaults_to_catalog() {
        let banner: Banner = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Sale hè",
            "imageUrl": "banners/summer.jpg",
            "link": " ",
            "active": true,
        }))
        .unwrap();
        let view = BannerView::from(&banner);
        assert_eq!(view.link, "/products");
        assert_eq!(view.image, "/static/banners/summer.jpg");
    }
}
