//! `AdminApiClient` implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sgshop_core::records::{
    AuthTokens, Banner, Category, LoginRequest, Order, Permission, Product, RevenuePoint,
    RevenueSummary, Role, TopProduct, User, Voucher,
};
use sgshop_core::{
    BannerId, CategoryId, OrderId, OrderStatus, Page, ProductId, TaggedCache, TaggedCacheBuilder,
    UserId, VoucherId,
};
use tracing::{debug, instrument};
use url::Url;

use super::requests::{ActiveUpdate, RolesUpdate, StatusUpdate};
use super::{
    ApiError, BannerPayload, CacheTag, CacheValue, CategoryPayload, Envelope, ErrorBody, ImageUpload,
    PermissionPayload, ProductPayload, RolePayload, VoucherPayload,
};
use crate::config::ApiConfig;

/// Back-office lists go stale quickly; other staff edit the same data.
const LIST_TTL: Duration = Duration::from_secs(60);

/// Rows per back-office table page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// =============================================================================
// Filters
// =============================================================================

/// Filters for the product table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
    pub keyword: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            keyword: None,
            category_id: None,
        }
    }
}

impl ProductFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = page_pairs(self.page, self.size);
        pairs.push(("sort", "createdAt,desc".to_string()));
        push_keyword(&mut pairs, self.keyword.as_deref());
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

/// Filters for the order table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
    pub page: u32,
    pub size: u32,
    pub status: Option<OrderStatus>,
    /// Order code, receiver name or phone.
    pub keyword: Option<String>,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            status: None,
            keyword: None,
        }
    }
}

impl OrderFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = page_pairs(self.page, self.size);
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        push_keyword(&mut pairs, self.keyword.as_deref());
        pairs
    }
}

/// Filters for the user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    pub page: u32,
    pub size: u32,
    pub keyword: Option<String>,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            keyword: None,
        }
    }
}

impl UserFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = page_pairs(self.page, self.size);
        push_keyword(&mut pairs, self.keyword.as_deref());
        pairs
    }
}

fn page_pairs(page: u32, size: u32) -> Vec<(&'static str, String)> {
    vec![
        ("page", Page::<()>::to_backend_index(page).to_string()),
        ("size", size.to_string()),
    ]
}

fn push_keyword(pairs: &mut Vec<(&'static str, String)>, keyword: Option<&str>) {
    if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
        pairs.push(("keyword", keyword.to_string()));
    }
}

// =============================================================================
// AdminApiClient
// =============================================================================

/// Client for the backend REST API, as used by the back office.
///
/// Cheap to clone. Every method takes the caller's access token.
#[derive(Clone)]
pub struct AdminApiClient {
    inner: Arc<AdminApiClientInner>,
}

struct AdminApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    cache: TaggedCache<CacheTag, CacheValue>,
}

impl AdminApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sgshop-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = TaggedCacheBuilder::new().capacity(500).ttl(LIST_TTL).build();

        Ok(Self {
            inner: Arc::new(AdminApiClientInner {
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

        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let body = ErrorBody::parse(&text);
        match status {
            StatusCode::UNAUTHORIZED => Err(unauthorized(&path, body.message)),
            StatusCode::FORBIDDEN => {
                tracing::warn!(path = %path, "Backend refused staff request");
                Err(ApiError::Forbidden)
            }
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

    async fn execute_discard(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, token: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, url, Some(token))).await
    }

    /// Send a JSON body, ignore the response, then drop stale cache tags.
    async fn mutate<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<&B>,
        tag: CacheTag,
    ) -> Result<(), ApiError> {
        let mut builder = self.request(method, self.url(path)?, Some(token));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute_discard(builder).await?;
        self.invalidate(tag);
        Ok(())
    }

    /// Drop every cache tag a mutation in `tag`'s area makes stale.
    pub fn invalidate(&self, tag: CacheTag) {
        debug!(?tag, "Invalidating cached lists");
        self.inner.cache.invalidate_tags(tag.affected());
    }

    /// Cached read of a token-independent list.
    async fn cached<T, F>(&self, tag: CacheTag, key: &str, path: &str, token: &str, wrap: F) -> Result<CacheValue, ApiError>
    where
        T: DeserializeOwned,
        F: FnOnce(T) -> CacheValue,
    {
        self.inner
            .cache
            .get_or_load(tag, key, async {
                let value: T = self.get_json(self.url(path)?, token).await?;
                Ok::<_, ApiError>(wrap(value))
            })
            .await
            .map_err(ApiError::from_shared)
    }

    fn multipart_form<B: Serialize>(part_name: &str, body: &B, files: Vec<(&'static str, ImageUpload)>) -> Result<Form, ApiError> {
        let json = Part::text(serde_json::to_string(body)?).mime_str("application/json")?;
        let mut form = Form::new().part(part_name.to_string(), json);
        for (name, upload) in files {
            let part = Part::bytes(upload.bytes)
                .file_name(upload.file_name)
                .mime_str(&upload.content_type)?;
            form = form.part(name, part);
        }
        Ok(form)
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// Exchange staff credentials for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, ApiError> {
        let body = LoginRequest { email, password };
        let builder = self
            .request(Method::POST, self.url("auth/login")?, None)
            .json(&body);
        self.execute(builder).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, self.url("auth/logout")?, Some(token));
        self.execute_discard(builder).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip_all)]
    pub async fn me(&self, token: &str) -> Result<User, ApiError> {
        self.get_json(self.url("users/me")?, token).await
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn products(&self, token: &str, filter: &ProductFilter) -> Result<Arc<Page<Product>>, ApiError> {
        let value = self
            .inner
            .cache
            .get_or_load(CacheTag::Products, filter.cache_key(), async {
                let url = self.url_with_query("products", &filter.pairs())?;
                let page: Page<Product> = self.get_json(url, token).await?;
                Ok::<_, ApiError>(CacheValue::Products(Arc::new(page)))
            })
            .await
            .map_err(ApiError::from_shared)?;

        match value {
            CacheValue::Products(page) => Ok(page),
            _ => Err(cache_mismatch("products")),
        }
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn product(&self, token: &str, id: ProductId) -> Result<Arc<Product>, ApiError> {
        let value = self
            .cached(CacheTag::Products, &format!("id:{id}"), &format!("products/{id}"), token, |p: Product| {
                CacheValue::Product(Arc::new(p))
            })
            .await?;
        match value {
            CacheValue::Product(product) => Ok(product),
            _ => Err(cache_mismatch("product")),
        }
    }

    /// Create a product with its images.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, token, payload, images), fields(name = %payload.name, images = images.len()))]
    pub async fn create_product(
        &self,
        token: &str,
        payload: &ProductPayload,
        images: Vec<ImageUpload>,
    ) -> Result<Product, ApiError> {
        let files = images.into_iter().map(|i| ("images", i)).collect();
        let form = Self::multipart_form("product", payload, files)?;
        let builder = self
            .request(Method::POST, self.url("products")?, Some(token))
            .multipart(form);
        let product = self.execute(builder).await?;
        self.invalidate(CacheTag::Products);
        Ok(product)
    }

    /// Update a product. Without new images the backend keeps the old ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, payload, images), fields(product_id = %id, images = images.len()))]
    pub async fn update_product(
        &self,
        token: &str,
        id: ProductId,
        payload: &ProductPayload,
        images: Vec<ImageUpload>,
    ) -> Result<(), ApiError> {
        let files = images.into_iter().map(|i| ("images", i)).collect();
        let form = Self::multipart_form("product", payload, files)?;
        let builder = self
            .request(Method::PUT, self.url(&format!("products/{id}"))?, Some(token))
            .multipart(form);
        self.execute_discard(builder).await?;
        self.invalidate(CacheTag::Products);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, token: &str, id: ProductId) -> Result<(), ApiError> {
        self.mutate::<()>(Method::DELETE, &format!("products/{id}"), token, None, CacheTag::Products)
            .await
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn categories(&self, token: &str) -> Result<Arc<Vec<Category>>, ApiError> {
        let value = self
            .cached(CacheTag::Categories, "all", "categories", token, |c: Vec<Category>| {
                CacheValue::Categories(Arc::new(c))
            })
            .await?;
        match value {
            CacheValue::Categories(categories) => Ok(categories),
            _ => Err(cache_mismatch("categories")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the category.
    #[instrument(skip(self, token))]
    pub async fn create_category(&self, token: &str, payload: &CategoryPayload) -> Result<(), ApiError> {
        self.mutate(Method::POST, "categories", token, Some(payload), CacheTag::Categories)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token), fields(category_id = %id))]
    pub async fn update_category(&self, token: &str, id: CategoryId, payload: &CategoryPayload) -> Result<(), ApiError> {
        self.mutate(Method::PUT, &format!("categories/{id}"), token, Some(payload), CacheTag::Categories)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses, e.g. products still use it.
    #[instrument(skip(self, token), fields(category_id = %id))]
    pub async fn delete_category(&self, token: &str, id: CategoryId) -> Result<(), ApiError> {
        self.mutate::<()>(Method::DELETE, &format!("categories/{id}"), token, None, CacheTag::Categories)
            .await
    }

    // -------------------------------------------------------------------------
    // Vouchers
    // -------------------------------------------------------------------------

    /// Every voucher, including expired and inactive ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn vouchers(&self, token: &str) -> Result<Arc<Vec<Voucher>>, ApiError> {
        let value = self
            .cached(CacheTag::Vouchers, "all", "vouchers", token, |v: Vec<Voucher>| {
                CacheValue::Vouchers(Arc::new(v))
            })
            .await?;
        match value {
            CacheValue::Vouchers(vouchers) => Ok(vouchers),
            _ => Err(cache_mismatch("vouchers")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the voucher.
    #[instrument(skip(self, token, payload), fields(code = %payload.code))]
    pub async fn create_voucher(&self, token: &str, payload: &VoucherPayload) -> Result<(), ApiError> {
        self.mutate(Method::POST, "vouchers", token, Some(payload), CacheTag::Vouchers)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, payload), fields(voucher_id = %id))]
    pub async fn update_voucher(&self, token: &str, id: VoucherId, payload: &VoucherPayload) -> Result<(), ApiError> {
        self.mutate(Method::PUT, &format!("vouchers/{id}"), token, Some(payload), CacheTag::Vouchers)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(voucher_id = %id))]
    pub async fn delete_voucher(&self, token: &str, id: VoucherId) -> Result<(), ApiError> {
        self.mutate::<()>(Method::DELETE, &format!("vouchers/{id}"), token, None, CacheTag::Vouchers)
            .await
    }

    // -------------------------------------------------------------------------
    // Orders (never cached)
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn orders(&self, token: &str, filter: &OrderFilter) -> Result<Page<Order>, ApiError> {
        let url = self.url_with_query("orders", &filter.pairs())?;
        self.get_json(url, token).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn order(&self, token: &str, id: OrderId) -> Result<Order, ApiError> {
        self.get_json(self.url(&format!("orders/{id}"))?, token).await
    }

    /// Move an order to `status`. Callers check the transition first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the transition.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(&self, token: &str, id: OrderId, status: OrderStatus) -> Result<(), ApiError> {
        let body = StatusUpdate { status };
        self.mutate(Method::PUT, &format!("orders/{id}/status"), token, Some(&body), CacheTag::Orders)
            .await
    }

    // -------------------------------------------------------------------------
    // Users (never cached)
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn users(&self, token: &str, filter: &UserFilter) -> Result<Page<User>, ApiError> {
        let url = self.url_with_query("users", &filter.pairs())?;
        self.get_json(url, token).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the user does not exist.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn user(&self, token: &str, id: UserId) -> Result<User, ApiError> {
        self.get_json(self.url(&format!("users/{id}"))?, token).await
    }

    /// Replace a user's roles.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects a role name.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn assign_roles(&self, token: &str, id: UserId, roles: &[String]) -> Result<(), ApiError> {
        let body = RolesUpdate { roles };
        self.mutate(Method::PUT, &format!("users/{id}/roles"), token, Some(&body), CacheTag::Users)
            .await
    }

    // -------------------------------------------------------------------------
    // Roles and permissions
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn roles(&self, token: &str) -> Result<Arc<Vec<Role>>, ApiError> {
        let value = self
            .cached(CacheTag::Roles, "all", "roles", token, |r: Vec<Role>| {
                CacheValue::Roles(Arc::new(r))
            })
            .await?;
        match value {
            CacheValue::Roles(roles) => Ok(roles),
            _ => Err(cache_mismatch("roles")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the role.
    #[instrument(skip(self, token, payload), fields(role = %payload.name))]
    pub async fn create_role(&self, token: &str, payload: &RolePayload) -> Result<(), ApiError> {
        self.mutate(Method::POST, "roles", token, Some(payload), CacheTag::Roles)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token))]
    pub async fn delete_role(&self, token: &str, name: &str) -> Result<(), ApiError> {
        let path = format!("roles/{}", urlencoding::encode(name));
        self.mutate::<()>(Method::DELETE, &path, token, None, CacheTag::Roles)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn permissions(&self, token: &str) -> Result<Arc<Vec<Permission>>, ApiError> {
        let value = self
            .cached(CacheTag::Permissions, "all", "permissions", token, |p: Vec<Permission>| {
                CacheValue::Permissions(Arc::new(p))
            })
            .await?;
        match value {
            CacheValue::Permissions(permissions) => Ok(permissions),
            _ => Err(cache_mismatch("permissions")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the permission.
    #[instrument(skip(self, token, payload), fields(permission = %payload.name))]
    pub async fn create_permission(&self, token: &str, payload: &PermissionPayload) -> Result<(), ApiError> {
        self.mutate(Method::POST, "permissions", token, Some(payload), CacheTag::Permissions)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token))]
    pub async fn delete_permission(&self, token: &str, name: &str) -> Result<(), ApiError> {
        let path = format!("permissions/{}", urlencoding::encode(name));
        self.mutate::<()>(Method::DELETE, &path, token, None, CacheTag::Permissions)
            .await
    }

    // -------------------------------------------------------------------------
    // Banners
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn banners(&self, token: &str) -> Result<Arc<Vec<Banner>>, ApiError> {
        let value = self
            .cached(CacheTag::Banners, "all", "banners", token, |b: Vec<Banner>| {
                CacheValue::Banners(Arc::new(b))
            })
            .await?;
        match value {
            CacheValue::Banners(banners) => Ok(banners),
            _ => Err(cache_mismatch("banners")),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the banner or its image.
    #[instrument(skip(self, token, payload, image), fields(title = %payload.title))]
    pub async fn create_banner(&self, token: &str, payload: &BannerPayload, image: ImageUpload) -> Result<(), ApiError> {
        let form = Self::multipart_form("banner", payload, vec![("image", image)])?;
        let builder = self
            .request(Method::POST, self.url("banners")?, Some(token))
            .multipart(form);
        self.execute_discard(builder).await?;
        self.invalidate(CacheTag::Banners);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    #[instrument(skip(self, token), fields(banner_id = %id))]
    pub async fn set_banner_active(&self, token: &str, id: BannerId, active: bool) -> Result<(), ApiError> {
        let body = ActiveUpdate { active };
        self.mutate(Method::PUT, &format!("banners/{id}/active"), token, Some(&body), CacheTag::Banners)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(banner_id = %id))]
    pub async fn delete_banner(&self, token: &str, id: BannerId) -> Result<(), ApiError> {
        self.mutate::<()>(Method::DELETE, &format!("banners/{id}"), token, None, CacheTag::Banners)
            .await
    }

    // -------------------------------------------------------------------------
    // Revenue (never cached)
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn revenue_summary(&self, token: &str) -> Result<RevenueSummary, ApiError> {
        self.get_json(self.url("revenue/summary")?, token).await
    }

    /// Months of `year` that had orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn revenue_yearly(&self, token: &str, year: i32) -> Result<Vec<RevenuePoint>, ApiError> {
        let url = self.url_with_query("revenue/yearly", &[("year", year.to_string())])?;
        self.get_json(url, token).await
    }

    /// Days of the month that had orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn revenue_monthly(&self, token: &str, year: i32, month: u32) -> Result<Vec<RevenuePoint>, ApiError> {
        let url = self.url_with_query(
            "revenue/monthly",
            &[("year", year.to_string()), ("month", month.to_string())],
        )?;
        self.get_json(url, token).await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn top_products(&self, token: &str, limit: u32) -> Result<Vec<TopProduct>, ApiError> {
        let url = self.url_with_query("revenue/top-products", &[("limit", limit.to_string())])?;
        self.get_json(url, token).await
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

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &TaggedCache<CacheTag, CacheValue> {
        &self.inner.cache
    }
}

fn cache_mismatch(what: &str) -> ApiError {
    ApiError::Shared(format!("unexpected cached value for {what}"))
}

/// A 401 from the login form is a wrong password, not an ended session.
fn unauthorized(path: &str, message: Option<String>) -> ApiError {
    if path.ends_with("/auth/login") {
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

        assert!(unauthorized("/api/v1/orders", Some("Token expired".to_string())).is_unauthorized());
    }

    fn client() -> AdminApiClient {
        AdminApiClient::new(&ApiConfig {
            base_url: Url::parse("http://localhost:8080/api/v1/").unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_filters_send_zero_based_pages() {
        let filter = OrderFilter {
            page: 3,
            status: Some(OrderStatus::Delivering),
            keyword: Some("  0901  ".to_string()),
            ..OrderFilter::default()
        };
        let url = client().url_with_query("orders", &filter.pairs()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/orders?page=2&size=20&status=DELIVERING&keyword=0901"
        );

        let users = UserFilter {
            keyword: Some("   ".to_string()),
            ..UserFilter::default()
        };
        assert_eq!(users.pairs().len(), 2);
    }

    #[test]
    fn test_product_cache_key_reflects_filter() {
        let a = ProductFilter::default();
        let b = ProductFilter {
            category_id: Some(CategoryId::new(4)),
            ..ProductFilter::default()
        };
        assert_ne!(a.cache_key(), b.cache_key());
        assert!(b.cache_key().contains("categoryId=4"));
    }

    #[test]
    fn test_role_path_is_encoded() {
        let client = client();
        let path = format!("roles/{}", urlencoding::encode("KHO HANG"));
        assert_eq!(
            client.url(&path).unwrap().as_str(),
            "http://localhost:8080/api/v1/roles/KHO%20HANG"
        );
    }

    #[tokio::test]
    async fn test_order_mutation_drops_revenue_but_keeps_banners() {
        let client = client();
        let cache = client.cache();
        cache
            .insert(CacheTag::Revenue, "summary", CacheValue::Banners(Arc::default()))
            .await;
        cache
            .insert(CacheTag::Banners, "all", CacheValue::Banners(Arc::default()))
            .await;

        client.invalidate(CacheTag::Orders);
        cache.sync().await;

        assert!(cache.get(CacheTag::Revenue, "summary").await.is_none());
        assert!(cache.get(CacheTag::Banners, "all").await.is_some());
    }

    #[tokio::test]
    async fn test_cached_list_survives_until_invalidated() {
        let client = client();
        let cache = client.cache();
        let roles = Arc::new(vec![Role {
            name: "STAFF".to_string(),
            description: None,
            permissions: Vec::new(),
        }]);
        cache
            .insert(CacheTag::Roles, "all", CacheValue::Roles(Arc::clone(&roles)))
            .await;

        // Served from cache; the backend at :8080 is never contacted
        assert_eq!(client.roles("t").await.unwrap(), roles);

        client.invalidate(CacheTag::Permissions);
        cache.sync().await;
        assert!(cache.get(CacheTag::Roles, "all").await.is_none());
    }
}
