//! Live tests for the back office.
//!
//! Requires the backend and the admin (`cargo run -p sgshop-admin`).

use reqwest::{Client, StatusCode};
use sgshop_integration_tests::{Credentials, TestContext, client, header};

async fn signed_in_admin(ctx: &TestContext) -> Option<Client> {
    let creds = Credentials::from_env("SGSHOP_TEST_ADMIN")?;
    let client = client();
    let resp = client
        .post(ctx.admin("/auth/login"))
        .form(&creds.form())
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection(), "admin login should redirect");
    Some(client)
}

#[tokio::test]
#[ignore = "Requires running admin"]
async fn test_health() {
    let ctx = TestContext::from_env();
    let resp = client().get(ctx.admin("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "referrer-policy"), "no-referrer");
}

#[tokio::test]
#[ignore = "Requires running admin"]
async fn test_anonymous_requests_go_to_login() {
    let ctx = TestContext::from_env();
    let client = client();

    for path in ["/", "/orders", "/products", "/revenue", "/users"] {
        let resp = client.get(ctx.admin(path)).send().await.unwrap();
        assert!(resp.status().is_redirection(), "{path} should redirect");
        assert!(header(&resp, "location").starts_with("/auth/login"));
    }
}

#[tokio::test]
#[ignore = "Requires running admin, backend and SGSHOP_TEST_CUSTOMER_* credentials"]
async fn test_customer_account_is_refused() {
    let ctx = TestContext::from_env();
    let Some(creds) = Credentials::from_env("SGSHOP_TEST_CUSTOMER") else {
        return;
    };

    let resp = client()
        .post(ctx.admin("/auth/login"))
        .form(&creds.form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running admin, backend and SGSHOP_TEST_ADMIN_* credentials"]
async fn test_admin_pages_render() {
    let ctx = TestContext::from_env();
    let Some(client) = signed_in_admin(&ctx).await else {
        return;
    };

    for path in [
        "/",
        "/orders",
        "/products",
        "/products/new",
        "/categories",
        "/vouchers",
        "/vouchers/new",
        "/banners",
        "/users",
        "/roles",
        "/permissions",
        "/revenue",
        "/revenue/monthly?year=2024&month=2",
    ] {
        let resp = client.get(ctx.admin(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin, backend and SGSHOP_TEST_ADMIN_* credentials"]
async fn test_invalid_month_is_bad_request() {
    let ctx = TestContext::from_env();
    let Some(client) = signed_in_admin(&ctx).await else {
        return;
    };

    let resp = client
        .get(ctx.admin("/revenue/monthly?year=2024&month=13"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running admin, backend and SGSHOP_TEST_ADMIN_* credentials"]
async fn test_invalid_voucher_is_not_sent() {
    let ctx = TestContext::from_env();
    let Some(client) = signed_in_admin(&ctx).await else {
        return;
    };

    let resp = client
        .post(ctx.admin("/vouchers"))
        .form(&[
            ("code", "X"),
            ("discount_type", "PERCENTAGE"),
            ("discount_value", "150"),
            ("quantity", "0"),
            ("start_date", "2024-06-30T00:00"),
            ("end_date", "2024-06-01T00:00"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Ngày kết thúc phải sau ngày bắt đầu"));
}

#[tokio::test]
#[ignore = "Requires running admin, backend and SGSHOP_TEST_ADMIN_* credentials"]
async fn test_logout_ends_session() {
    let ctx = TestContext::from_env();
    let Some(client) = signed_in_admin(&ctx).await else {
        return;
    };

    let resp = client.post(ctx.admin("/auth/logout")).send().await.unwrap();
    assert!(resp.status().is_redirection());

    let resp = client.get(ctx.admin("/orders")).send().await.unwrap();
    assert!(resp.status().is_redirection());
}
