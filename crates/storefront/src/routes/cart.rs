//! Cart route handlers.
//!
//! The cart lives in the session. Cart operations use HTMX for dynamic
//! updates without full page reloads and fall back to redirects for plain
//! form posts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::{Flash, ProductId};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, load_cart, save_cart, set_flash};
use crate::models::{Cart, CartError, CartLine};
use crate::state::AppState;

use super::{is_htmx, referer_path};

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub unit_price: String,
    pub quantity: u32,
    pub stock: u32,
    pub line_total: String,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            image: filters::image_url(line.image.as_deref().unwrap_or_default()),
            unit_price: line.unit_price.to_string(),
            quantity: line.quantity,
            stock: line.stock,
            line_total: line.line_total().to_string(),
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines.iter().map(CartItemView::from).collect(),
            subtotal: cart.subtotal().to_string(),
            item_count: cart.item_count(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Toast fragment swapped into `#toast` (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/toast.html")]
pub struct ToastTemplate {
    pub flash: Flash,
}

impl ToastTemplate {
    /// Retarget the response into the toast area, whatever the trigger
    /// element's own target was.
    pub fn into_retargeted_response(self) -> Response {
        (
            AppendHeaders([("HX-Retarget", "#toast"), ("HX-Reswap", "innerHTML")]),
            self,
        )
            .into_response()
    }
}

/// Display cart page.
#[instrument(skip(session, ctx))]
pub async fn show(session: Session, ctx: PageContext) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    CartShowTemplate {
        ctx,
        cart: CartView::from(&cart),
    }
}

/// Add item to cart.
///
/// The product is re-read from the backend so the line carries its current
/// price and stock. HTMX requests get the new count badge and a
/// `cart-updated` trigger; refusals come back as a toast.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let htmx = is_htmx(&headers);
    let back = referer_path(&headers, &state.config().base_url);

    let product = match state.api().get_product(form.product_id).await {
        Ok(product) => product,
        Err(e) if e.is_not_found() => {
            return Ok(refuse(&session, htmx, &back, "Sản phẩm không còn tồn tại").await);
        }
        Err(e) => return Err(e.into()),
    };

    let mut cart = load_cart(&session).await;
    match cart.add(&product, form.quantity.unwrap_or(1)) {
        Ok(quantity) => {
            save_cart(&session, &cart).await?;
            tracing::debug!(product_id = %product.id, quantity, "Added to cart");

            if htmx {
                return Ok((
                    AppendHeaders([("HX-Trigger", "cart-updated")]),
                    CartCountTemplate {
                        count: cart.item_count(),
                    },
                )
                    .into_response());
            }
            set_flash(&session, Flash::success(format!("Đã thêm \"{}\" vào giỏ hàng", product.name))).await;
            Ok(Redirect::to(&back).into_response())
        }
        Err(CartError::OutOfStock) => Ok(refuse(&session, htmx, &back, "Sản phẩm đã hết hàng").await),
    }
}

async fn refuse(session: &Session, htmx: bool, back: &str, message: &str) -> Response {
    if htmx {
        return ToastTemplate {
            flash: Flash::error(message),
        }
        .into_retargeted_response();
    }
    set_flash(session, Flash::error(message)).await;
    Redirect::to(back).into_response()
}

/// Update cart item quantity. Zero removes the line.
#[instrument(skip(session, headers))]
pub async fn update(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    cart.set_quantity(form.product_id, form.quantity);
    save_cart(&session, &cart).await?;
    Ok(cart_changed(&cart, is_htmx(&headers)))
}

/// Remove item from cart.
#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    cart.remove(form.product_id);
    save_cart(&session, &cart).await?;
    Ok(cart_changed(&cart, is_htmx(&headers)))
}

fn cart_changed(cart: &Cart, htmx: bool) -> Response {
    if htmx {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate {
                cart: CartView::from(cart),
            },
        )
            .into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}
