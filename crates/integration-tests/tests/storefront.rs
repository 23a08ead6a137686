//! Live tests for the storefront.
//!
//! Requires the backend and the storefront (`cargo run -p sgshop-storefront`).

use reqwest::StatusCode;
use sgshop_integration_tests::{Credentials, TestContext, client, header};

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_health_and_readiness() {
    let ctx = TestContext::from_env();
    let client = client();

    let resp = client.get(ctx.storefront("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!header(&resp, "x-request-id").is_empty());

    let resp = client.get(ctx.storefront("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "backend should be reachable");
}

#[tokio::test]
#[ignore = "Requires running storefront and backend"]
async fn test_home_and_catalog_render() {
    let ctx = TestContext::from_env();
    let client = client();

    let resp = client.get(ctx.storefront("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(ctx.storefront("/products?keyword=%C3%A1o&page=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Sài Gòn Shop"));
}

#[tokio::test]
#[ignore = "Requires running storefront and backend with at least one product"]
async fn test_cart_add_updates_count() {
    let ctx = TestContext::from_env();
    let client = client();
    let Some(product) = ctx.first_product().await.filter(|p| p.stock > 0) else {
        return;
    };

    let resp = client
        .get(ctx.storefront(&format!("/products/{}", product.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let id = product.id.to_string();
    let resp = client
        .post(ctx.storefront("/cart/add"))
        .header("hx-request", "true")
        .form(&[("product_id", id.as_str()), ("quantity", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let count = client
        .get(ctx.storefront("/cart/count"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(count.contains(">1<"), "badge should show one item: {count}");
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_checkout_redirects_anonymous_to_login() {
    let ctx = TestContext::from_env();
    let resp = client().get(ctx.storefront("/checkout")).send().await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(header(&resp, "location"), "/auth/login?next=%2Fcheckout");
}

#[tokio::test]
#[ignore = "Requires running storefront, backend and SGSHOP_TEST_CUSTOMER_* credentials"]
async fn test_customer_login_and_order_history() {
    let ctx = TestContext::from_env();
    let Some(creds) = Credentials::from_env("SGSHOP_TEST_CUSTOMER") else {
        return;
    };
    let client = client();

    let resp = client
        .post(ctx.storefront("/auth/login"))
        .form(&creds.form())
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection(), "login should redirect");

    let resp = client.get(ctx.storefront("/account/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_bad_login_is_rejected() {
    let ctx = TestContext::from_env();
    let resp = client()
        .post(ctx.storefront("/auth/login"))
        .form(&[("email", "khong-ton-tai@example.com"), ("password", "sai-mat-khau")])
        .send()
        .await
        .unwrap();
    assert!(!resp.status().is_redirection());
}
