//! Cart adds, removals and totals.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use kiln_integration_tests::TestContext;

#[tokio::test]
async fn test_anonymous_add_redirects_to_login() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "10.00").await;

    let resp = ctx.client().post(&format!("/addcart/{}", mug.id)).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/login"));
}

#[tokio::test]
async fn test_duplicate_adds_count_twice_in_total() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "10.00").await;
    let bowl = ctx.seed_product("Bowl", "2.55").await;
    let mut client = ctx.client();
    client.register("a@b.com", "pw123", "Asha").await;

    for id in [mug.id, mug.id, bowl.id] {
        let resp = client.post(&format!("/addcart/{id}")).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert_eq!(resp.location(), Some("/"));
    }

    let cart = client.get("/cart").await;
    assert_eq!(cart.status, StatusCode::OK);
    assert_eq!(cart.body.matches("<td>Mug</td>").count(), 2);
    assert!(cart.body.contains("22.55"));
}

#[tokio::test]
async fn test_adding_unknown_product_is_not_found() {
    let ctx = TestContext::new();
    let mut client = ctx.client();
    client.register("a@b.com", "pw123", "Asha").await;

    let resp = client.post("/addcart/999").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_deletes_one_line() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "10.00").await;
    let mut client = ctx.client();
    client.register("a@b.com", "pw123", "Asha").await;
    client.post(&format!("/addcart/{}", mug.id)).await;
    client.post(&format!("/addcart/{}", mug.id)).await;

    let resp = client.post(&format!("/product/{}/user/1", mug.id)).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/cart"));

    let cart = client.get("/cart").await;
    assert_eq!(cart.body.matches("<td>Mug</td>").count(), 1);
    assert!(cart.body.contains("10.00"));
}

#[tokio::test]
async fn test_removing_absent_product_is_a_no_op() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "10.00").await;
    let bowl = ctx.seed_product("Bowl", "5.00").await;
    let mut client = ctx.client();
    client.register("a@b.com", "pw123", "Asha").await;
    client.post(&format!("/addcart/{}", mug.id)).await;

    let resp = client.post(&format!("/product/{}/user/1", bowl.id)).await;
    assert_eq!(resp.location(), Some("/cart"));

    let cart = client.get("/cart").await;
    assert_eq!(cart.body.matches("<td>Mug</td>").count(), 1);
}

#[tokio::test]
async fn test_cannot_remove_from_another_users_cart() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "10.00").await;

    let mut owner = ctx.client();
    owner.register("owner@b.com", "pw123", "Owner").await;
    owner.post(&format!("/addcart/{}", mug.id)).await;

    let mut intruder = ctx.client();
    intruder.register("intruder@b.com", "pw123", "Intruder").await;
    let resp = intruder.post(&format!("/product/{}/user/1", mug.id)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let cart = owner.get("/cart").await;
    assert_eq!(cart.body.matches("<td>Mug</td>").count(), 1);
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let ctx = TestContext::new();
    let mug = ctx.seed_product("Mug", "10.00").await;

    let mut first = ctx.client();
    first.register("first@b.com", "pw123", "First").await;
    first.post(&format!("/addcart/{}", mug.id)).await;

    let mut second = ctx.client();
    second.register("second@b.com", "pw123", "Second").await;
    let cart = second.get("/cart").await;
    assert!(cart.body.contains("Your cart is empty."));
}
