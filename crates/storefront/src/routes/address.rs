//! Address cascade fragments for the checkout form.
//!
//! Picking a province loads its districts (and empties the ward list out of
//! band); picking a district loads its wards.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use sgshop_core::records::Region;

use crate::state::AppState;

use super::non_blank;

pub const PROVINCE_PLACEHOLDER: &str = "Chọn tỉnh/thành phố";
pub const DISTRICT_PLACEHOLDER: &str = "Chọn quận/huyện";
pub const WARD_PLACEHOLDER: &str = "Chọn phường/xã";

/// `<option>` list fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/region_options.html")]
pub struct RegionOptionsTemplate {
    pub placeholder: &'static str,
    pub options: Arc<Vec<Region>>,
    pub selected: String,
    /// Also clear the ward select (out-of-band swap).
    pub reset_wards: bool,
    pub ward_placeholder: &'static str,
}

impl RegionOptionsTemplate {
    fn new(placeholder: &'static str, options: Arc<Vec<Region>>, reset_wards: bool) -> Self {
        Self {
            placeholder,
            options,
            selected: String::new(),
            reset_wards,
            ward_placeholder: WARD_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DistrictParams {
    pub province: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WardParams {
    pub district: Option<String>,
}

/// Districts of a province.
///
/// A missing province or a backend failure yields only the placeholder so
/// the form stays usable.
#[instrument(skip(state))]
pub async fn districts(State(state): State<AppState>, Query(params): Query<DistrictParams>) -> impl IntoResponse {
    let options = match non_blank(params.province.as_deref()) {
        Some(code) => state.api().districts(code).await.unwrap_or_else(|e| {
            tracing::warn!(province = code, "Failed to load districts: {e}");
            Arc::default()
        }),
        None => Arc::default(),
    };
    RegionOptionsTemplate::new(DISTRICT_PLACEHOLDER, options, true)
}

/// Wards of a district.
#[instrument(skip(state))]
pub async fn wards(State(state): State<AppState>, Query(params): Query<WardParams>) -> impl IntoResponse {
    let options = match non_blank(params.district.as_deref()) {
        Some(code) => state.api().wards(code).await.unwrap_or_else(|e| {
            tracing::warn!(district = code, "Failed to load wards: {e}");
            Arc::default()
        }),
        None => Arc::default(),
    };
    RegionOptionsTemplate::new(WARD_PLACEHOLDER, options, false)
}
