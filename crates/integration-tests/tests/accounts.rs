//! Registration, login and logout through the HTTP surface.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use kiln_integration_tests::TestContext;

#[tokio::test]
async fn test_register_logs_in_and_redirects_home() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    let resp = client.register("a@b.com", "pw123", "Asha").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/"));

    let home = client.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("Hi, Asha"));
}

#[tokio::test]
async fn test_duplicate_registration_goes_to_login() {
    let ctx = TestContext::new();
    ctx.client().register("a@b.com", "pw123", "Asha").await;

    let mut other = ctx.client();
    let resp = other.register("a@b.com", "different", "Someone").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/login?error=already_registered"));

    let page = other.get(resp.location().unwrap()).await;
    assert!(page.body.contains("already signed up with that email"));

    // The original account still logs in with its own password.
    let login = other.login("a@b.com", "pw123").await;
    assert_eq!(login.location(), Some("/"));
}

#[tokio::test]
async fn test_register_with_missing_fields_rerenders_form() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    let resp = client.register("a@b.com", "", "  ").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body.contains("This field is required."));
    assert!(resp.body.contains("value=\"a@b.com\""));

    let cart = client.get("/cart").await;
    assert_eq!(cart.location(), Some("/login"));
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let ctx = TestContext::new();
    ctx.client().register("a@b.com", "pw123", "Asha").await;
    let mut client = ctx.client();

    let wrong_password = client.login("a@b.com", "nope").await;
    let unknown_email = client.login("nobody@b.com", "pw123").await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert!(wrong_password.body.contains("Invalid email or password."));
    assert!(unknown_email.body.contains("Invalid email or password."));

    let cart = client.get("/cart").await;
    assert_eq!(cart.location(), Some("/login"));
}

#[tokio::test]
async fn test_login_then_logout() {
    let ctx = TestContext::new();
    ctx.client().register("a@b.com", "pw123", "Asha").await;
    let mut client = ctx.client();

    let resp = client.login("a@b.com", "pw123").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/"));
    assert_eq!(client.get("/cart").await.status, StatusCode::OK);

    let resp = client.get("/logout").await;
    assert_eq!(resp.location(), Some("/"));

    let cart = client.get("/cart").await;
    assert_eq!(cart.status, StatusCode::SEE_OTHER);
    assert_eq!(cart.location(), Some("/login"));
}

#[tokio::test]
async fn test_session_required_routes_redirect_anonymous_visitors() {
    let ctx = TestContext::new();
    let mut client = ctx.client();

    for uri in ["/cart", "/success", "/logout", "/create-checkout-session"] {
        let resp = client.get(uri).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(resp.location(), Some("/login"), "{uri}");
    }
}
