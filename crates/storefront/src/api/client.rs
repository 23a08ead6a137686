//! `StoreApiClient` implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sgshop_core::records::{
    AuthTokens, Banner, Category, CreateOrderRequest, LoginRequest, Order, Product, RefreshRequest,
    Region, RegisterRequest, User, Voucher,
};
use sgshop_core::{CategoryId, OrderId, OrderStatus, Page, ProductId, TaggedCache, TaggedCacheBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::{ApiError, CacheTag, CacheValue, Envelope, ErrorBody, PaymentUrl};
use crate::config::ApiConfig;

/// Catalog responses live for five minutes.
const CATALOG_TTL: Duration = Duration::from_secs(5 * 60);

/// Administrative divisions barely change.
const ADDRESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Products per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

// =============================================================================
// Queries
// =============================================================================

/// Product listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    BestSelling,
}

impl ProductSort {
    pub const ALL: [Self; 4] = [Self::Newest, Self::PriceAsc, Self::PriceDesc, Self::BestSelling];

    /// Name used in storefront URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::BestSelling => "best_selling",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Mới nhất",
            Self::PriceAsc => "Giá tăng dần",
            Self::PriceDesc => "Giá giảm dần",
            Self::BestSelling => "Bán chạy",
        }
    }

    /// Spring `sort` parameter.
    const fn backend_param(self) -> &'static str {
        match self {
            Self::Newest => "createdAt,desc",
            Self::PriceAsc => "price,asc",
            Self::PriceDesc => "price,desc",
            Self::BestSelling => "sold,desc",
        }
    }

    /// Unknown values fall back to newest.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| Some(s.as_str()) == value.map(str::trim))
            .unwrap_or_default()
    }
}

/// Filters for `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
    pub keyword: Option<String>,
    pub category_id: Option<CategoryId>,
    pub sort: ProductSort,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            keyword: None,
            category_id: None,
            sort: ProductSort::Newest,
        }
    }
}

impl ProductQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", Page::<()>::to_backend_index(self.page).to_string()),
            ("size", self.size.to_string()),
            ("sort", self.sort.backend_param().to_string()),
        ];
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            pairs.push(("keyword", keyword.to_string()));
        }
        if let Some(category) = self.category_id {
            pairs.push(("categoryId", category.to_string()));
        }
        pairs
    }

    fn cache_key(&self) -> String {
        let parts: Vec<String> = self
            .pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("list?{}", parts.join("&"))
    }
}

// =============================================================================
// StoreApiClient
// =============================================================================

/// Client for the backend REST API, as used by the storefront.
///
/// Cheap to clone. Catalog and address reads are cached; everything that
/// carries a customer token goes straight to the backend.
#[derive(Clone)]
pub struct StoreApiClient {
    inner: Arc<StoreApiClientInner>,
}

struct StoreApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    cache: TaggedCache<CacheTag, CacheValue>,
}

impl StoreApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sgshop-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = TaggedCacheBuilder::new()
            .capacity(1000)
            .ttl(CATALOG_TTL)
            .tag_ttl(CacheTag::Address, ADDRESS_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(StoreApiClientInner {
                http,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    // -------------------------------------------------------------------------
    // Request plumbing
    // -------------------------------------------------------------------------

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn url_with_query(&self, path: &str, pairs: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.url(path)?;
        if !pairs.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let builder = self.inner.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the response body after checking status.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let body = ErrorBody::parse(&text);
        match status {
            StatusCode::UNAUTHORIZED => Err(unauthorized(&path, body.message)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(body.message.unwrap_or(path))),
            _ => {
                if status.is_server_error() {
                    tracing::error!(
                        status = %status,
                        path = %path,
                        body = %text.chars().take(500).collect::<String>(),
                        "Backend returned server error"
                    );
                } else {
                    debug!(status = %status, path = %path, message = ?body.message, "Backend rejected request");
                }
                Err(ApiError::Api {
                    status: status.as_u16(),
                    message: body.message,
                })
            }
        }
    }

    /// Send a request and unwrap the `data` field of the envelope.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let text = self.send(request).await?;
        match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) => Ok(envelope.data),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %text.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Send a request whose response body is not needed.
    async fn execute_discard(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, token: Option<&str>) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, url, token)).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(self.request(method, url, token).json(body)).await
    }

    // -------------------------------------------------------------------------
    // Catalog (cached)
    // -------------------------------------------------------------------------

    /// Get a page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Arc<Page<Product>>, ApiError> {
        let value = self
            .inner
            .cache
            .get_or_load(CacheTag::Products, query.cache_key(), async {
                let url = self.url_with_query("products", &query.pairs())?;
                let page: Page<Product> = self.get_json(url, None).await?;
                Ok::<_, ApiError>(CacheValue::Products(Arc::new(page)))
            })
            .await
            .map_err(ApiError::from_shared)?;

        match value {
            CacheValue::Products(page) => Ok(page),
            _ => Err(cache_mismatch("products")),
        }
    }

    /// Get one product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Arc<Product>, ApiError> {
        let value = self
            .inner
            .cache
            .get_or_load(CacheTag::Products, format!("id:{id}"), async {
                let url = self.url(&format!("products/{id}"))?;
                let product: Product = self.get_json(url, None).await?;
                Ok::<_, ApiError>(CacheValue::Product(Arc::new(product)))
            })
            .await
            .map_err(ApiError::from_shared)?;

        match value {
            CacheValue::Product(product) => Ok(product),
            _ => Err(cache_mismatch("product")),
        }
    }

    /// Get every category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, ApiError> {
        let value = self
            .inner
            .cache
            .get_or_load(CacheTag::Categories, "all", async {
                let categories: Vec<Category> = self.get_json(self.url("categories")?, None).await?;
                Ok::<_, ApiError>(CacheValue::Categories(Arc::new(categories)))
            })
            .await
            .map_err(ApiError::from_shared)?;

        match value {
            CacheValue::Categories(categories) => Ok(categories),
            _ => Err(cache_mismatch("categories")),
        }
    }

    /// Get the banners currently switched on.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn active_banners(&self) -> Result<Arc<Vec<Banner>>, ApiError> {
        let value = self
            .inner
            .cache
            .get_or_load(CacheTag::Banners, "active", async {
                let url = self.url_with_query("banners", &[("active", "true".to_string())])?;
                let banners: Vec<Banner> = self.get_json(url, None).await?;
                Ok::<_, ApiError>(CacheValue::Banners(Arc::new(banners)))
            })
            .await
            .map_err(ApiError::from_shared)?;

        match value {
            CacheValue::Banners(banners) => Ok(banners),
            _ => Err(cache_mismatch("banners")),
        }
    }

    /// Get the vouchers customers can redeem right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn available_vouchers(&self) -> Result<Arc<Vec<Voucher>>, ApiError> {
        let value = self
            .inner
            .cache
            .get_or_load(CacheTag::Vouchers, "available", async {
                let vouchers: Vec<Voucher> = self.get_json(self.url("vouchers/available")?, None).await?;
                Ok::<_, ApiError>(CacheValue::Vouchers(Arc::new(vouchers)))
            })
            .await
            .map_err(ApiError::from_shared)?;

        match value {
            CacheValue::Vouchers(vouchers) => Ok(vouchers),
            _ => Err(cache_mismatch("vouchers")),
        }
    }

    // -------------------------------------------------------------------------
    // Address cascade (cached)
    // -------------------------------------------------------------------------

    async fn regions(&self, key: String, path: String) -> Result<Arc<Vec<Region>>, ApiError> {
        let value = self
            .inner
            .cache
            .get_or_load(CacheTag::Address, key, async {
                let regions: Vec<Region> = self.get_json(self.url(&path)?, None).await?;
                Ok::<_, ApiError>(CacheValue::Regions(Arc::new(regions)))
            })
            .await
            .map_err(ApiError::from_shared)?;

        match value {
            CacheValue::Regions(regions) => Ok(regions),
            _ => Err(cache_mismatch("regions")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn provinces(&self) -> Result<Arc<Vec<Region>>, ApiError> {
        self.regions("provinces".to_string(), "address/provinces".to_string())
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn districts(&self, province_code: &str) -> Result<Arc<Vec<Region>>, ApiError> {
        let code = urlencoding::encode(province_code.trim());
        self.regions(
            format!("districts:{code}"),
            format!("address/provinces/{code}/districts"),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn wards(&self, district_code: &str) -> Result<Arc<Vec<Region>>, ApiError> {
        let code = urlencoding::encode(district_code.trim());
        self.regions(
            format!("wards:{code}"),
            format!("address/districts/{code}/wards"),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// Exchange credentials for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, ApiError> {
        let body = LoginRequest { email, password };
        self.send_json(Method::POST, self.url("auth/login")?, None, &body)
            .await
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, self.url("auth/register")?, None)
            .json(request);
        self.execute_discard(builder).await
    }

    /// Trade a refresh token for a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is no longer valid.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, ApiError> {
        let body = RefreshRequest { refresh_token };
        self.send_json(Method::POST, self.url("auth/refresh")?, None, &body)
            .await
    }

    /// Invalidate the access token on the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, self.url("auth/logout")?, Some(token));
        self.execute_discard(builder).await
    }

    /// Profile of the token's owner.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip_all)]
    pub async fn me(&self, token: &str) -> Result<User, ApiError> {
        self.get_json(self.url("users/me")?, Some(token)).await
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Place an order. Drops cached products and vouchers since stock and
    /// voucher quantities changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order.
    #[instrument(skip(self, token, request), fields(items = request.items.len(), payment = %request.payment_method))]
    pub async fn place_order(&self, token: &str, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        let order: Order = self
            .send_json(Method::POST, self.url("orders")?, Some(token), request)
            .await?;
        self.inner
            .cache
            .invalidate_tags(&[CacheTag::Products, CacheTag::Vouchers]);
        Ok(order)
    }

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn my_orders(
        &self,
        token: &str,
        page: u32,
        size: u32,
        status: Option<OrderStatus>,
    ) -> Result<Page<Order>, ApiError> {
        let mut pairs = vec![
            ("page", Page::<()>::to_backend_index(page).to_string()),
            ("size", size.to_string()),
        ];
        if let Some(status) = status {
            pairs.push(("status", status.as_str().to_string()));
        }
        let url = self.url_with_query("orders/me", &pairs)?;
        self.get_json(url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist or is not
    /// the customer's.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn get_order(&self, token: &str, id: OrderId) -> Result<Order, ApiError> {
        self.get_json(self.url(&format!("orders/{id}"))?, Some(token))
            .await
    }

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the cancellation.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn cancel_order(&self, token: &str, id: OrderId) -> Result<(), ApiError> {
        let builder = self.request(
            Method::PUT,
            self.url(&format!("orders/{id}/cancel"))?,
            Some(token),
        );
        self.execute_discard(builder).await?;
        // Stock and voucher quantity go back up
        self.inner
            .cache
            .invalidate_tags(&[CacheTag::Products, CacheTag::Vouchers]);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------

    /// Ask the backend for a VNPay payment URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    pub async fn vnpay_url(&self, token: &str, order_id: OrderId) -> Result<String, ApiError> {
        let url = self.url_with_query("payment/vn-pay", &[("orderId", order_id.to_string())])?;
        let payment: PaymentUrl = self.get_json(url, Some(token)).await?;
        Ok(payment.into_string())
    }

    /// Forward the VNPay return query so the backend records the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the callback.
    #[instrument(skip(self, token, raw_query))]
    pub async fn vnpay_callback(&self, token: Option<&str>, raw_query: &str) -> Result<(), ApiError> {
        let mut url = self.url("payment/vn-pay-callback")?;
        url.set_query(Some(raw_query));
        let builder = self.request(Method::GET, url, token);
        self.execute_discard(builder).await
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    /// Uncached round trip used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let builder = self.request(Method::GET, self.url("categories")?, None);
        self.execute_discard(builder).await
    }
}

fn cache_mismatch(what: &str) -> ApiError {
    ApiError::Shared(format!("unexpected cached value for {what}"))
}

/// Endpoints where 401 means "wrong credentials" rather than "session over".
const CREDENTIAL_PATHS: &[&str] = &["/auth/login", "/auth/register"];

/// Classify a 401, keeping the backend's message for credential forms.
fn unauthorized(path: &str, message: Option<String>) -> ApiError {
    if CREDENTIAL_PATHS.iter().any(|p| path.ends_with(p)) {
        ApiError::Api { status: 401, message }
    } else {
        ApiError::Unauthorized
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_401_keeps_backend_message() {
        let err = unauthorized("/api/v1/auth/login", Some("Tài khoản đã bị khóa".to_string()));
        assert_eq!(err.user_message("Email hoặc mật khẩu không đúng"), "Tài khoản đã bị khóa");
        assert!(!err.is_unauthorized());

        assert!(unauthorized("/api/v1/orders/me", Some("Token expired".to_string())).is_unauthorized());
    }

    fn client() -> StoreApiClient {
        StoreApiClient::new(&ApiConfig {
            base_url: Url::parse("http://localhost:8080/api/v1/").unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_urls_keep_api_prefix() {
        let client = client();
        assert_eq!(
            client.url("/products/5").unwrap().as_str(),
            "http://localhost:8080/api/v1/products/5"
        );
        let url = client
            .url_with_query("orders/me", &[("page", "0".to_string()), ("status", "PENDING".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/orders/me?page=0&status=PENDING");
    }

    #[test]
    fn test_product_query_pairs() {
        let query = ProductQuery {
            page: 3,
            keyword: Some("  áo  ".to_string()),
            category_id: Some(CategoryId::new(4)),
            sort: ProductSort::PriceAsc,
            ..ProductQuery::default()
        };
        let pairs = query.pairs();
        assert!(pairs.contains(&("page", "2".to_string())));
        assert!(pairs.contains(&("size", DEFAULT_PAGE_SIZE.to_string())));
        assert!(pairs.contains(&("sort", "price,asc".to_string())));
        assert!(pairs.contains(&("keyword", "áo".to_string())));
        assert!(pairs.contains(&("categoryId", "4".to_string())));
    }

    #[test]
    fn test_product_query_blank_keyword_is_dropped() {
        let query = ProductQuery {
            keyword: Some("   ".to_string()),
            ..ProductQuery::default()
        };
        assert!(query.pairs().iter().all(|(k, _)| *k != "keyword"));
        assert_eq!(query.cache_key(), ProductQuery::default().cache_key());
    }

    #[test]
    fn test_product_sort_parse() {
        assert_eq!(ProductSort::parse(Some("price_desc")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::parse(Some("best_selling")), ProductSort::BestSelling);
        assert_eq!(ProductSort::parse(Some("bogus")), ProductSort::Newest);
        assert_eq!(ProductSort::parse(None), ProductSort::Newest);
    }
}
