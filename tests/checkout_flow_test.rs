//! Checkout flow against a real (in-memory) database.
//!
//! Covers pricing with and without vouchers, stock movement, rollback on
//! every failure path, address defaults and concurrent checkouts competing
//! for the same stock.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shopcart_api::{
    errors::{Resource, ServiceError},
    repositories::{
        ItemPatch, ItemRepository, OrderItemRepository, OrderRepository, OrderVoucherRepository,
    },
    services::{checkout::CheckoutRequest, inventory::InventoryLedger},
};

fn request(email: &str) -> CheckoutRequest {
    CheckoutRequest {
        account_email: email.to_string(),
        ..Default::default()
    }
}

fn with_voucher(email: &str, code: &str) -> CheckoutRequest {
    CheckoutRequest {
        voucher_code: Some(code.to_string()),
        ..request(email)
    }
}

#[tokio::test]
async fn checkout_without_voucher_charges_subtotal_and_moves_stock() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Kettle", dec!(100), 10).await;
    app.seed_cart_line(buyer.id, item.id, 2).await;

    let receipt = app
        .state
        .services
        .checkout
        .checkout(request(&buyer.email))
        .await
        .expect("checkout succeeds");

    assert_eq!(receipt.subtotal, dec!(200));
    assert_eq!(receipt.discount, Decimal::ZERO);
    assert_eq!(receipt.total, dec!(200));
    assert_eq!(receipt.lines.len(), 1);
    assert_eq!(receipt.lines[0].quantity, 2);
    assert_eq!(receipt.lines[0].name, "Kettle");

    assert_eq!(app.item_quantity(item.id).await, 8);
    assert_eq!(app.cart_len(buyer.id).await, 0);

    let order = OrderRepository::new(&*app.state.db)
        .one_for_account(buyer.id, receipt.order_id)
        .await
        .expect("order persisted");
    assert_eq!(order.total, dec!(200));
    assert_eq!(order.status, "ORDERED");
}

#[tokio::test]
async fn voucher_discount_is_capped_at_max() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Kettle", dec!(100), 10).await;
    app.seed_voucher("SAVE10", dec!(10), dec!(15)).await;
    app.seed_cart_line(buyer.id, item.id, 2).await;

    let receipt = app
        .state
        .services
        .checkout
        .checkout(with_voucher(&buyer.email, "SAVE10"))
        .await
        .expect("checkout succeeds");

    assert_eq!(receipt.subtotal, dec!(200));
    assert_eq!(receipt.discount, dec!(15));
    assert_eq!(receipt.total, dec!(185));

    let record = OrderVoucherRepository::new(&*app.state.db)
        .find_by_order(receipt.order_id)
        .await
        .expect("query")
        .expect("voucher recorded against the order");
    assert_eq!(record.applied, dec!(15));
    assert_eq!(record.code, "SAVE10");
}

#[tokio::test]
async fn voucher_code_matches_case_insensitively() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Mug", dec!(40), 10).await;
    app.seed_voucher("SPRING", dec!(25), dec!(100)).await;
    app.seed_cart_line(buyer.id, item.id, 1).await;

    let receipt = app
        .state
        .services
        .checkout
        .checkout(with_voucher(&buyer.email, "  spring "))
        .await
        .expect("checkout succeeds");

    assert_eq!(receipt.discount, dec!(10));
    assert_eq!(receipt.total, dec!(30));
}

#[tokio::test]
async fn insufficient_stock_rolls_back_everything() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let plenty = app.seed_item("Plenty", dec!(5), 50).await;
    let scarce = app.seed_item("Scarce", dec!(100), 2).await;
    // The first line succeeds before the second one fails.
    app.seed_cart_line(buyer.id, plenty.id, 4).await;
    app.seed_cart_line(buyer.id, scarce.id, 3).await;

    let err = app
        .state
        .services
        .checkout
        .checkout(request(&buyer.email))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    assert_eq!(app.item_quantity(plenty.id).await, 50);
    assert_eq!(app.item_quantity(scarce.id).await, 2);
    assert_eq!(app.cart_len(buyer.id).await, 2);

    let (orders, total) = OrderRepository::new(&*app.state.db)
        .list_by_account(buyer.id, 1, 10)
        .await
        .expect("list orders");
    assert!(orders.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn unknown_voucher_fails_before_touching_the_cart() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Kettle", dec!(100), 10).await;
    app.seed_cart_line(buyer.id, item.id, 2).await;

    let err = app
        .state
        .services
        .checkout
        .checkout(with_voucher(&buyer.email, "NOPE"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(Resource::Voucher, _));

    assert_eq!(app.item_quantity(item.id).await, 10);
    assert_eq!(app.cart_len(buyer.id).await, 1);
}

#[tokio::test]
async fn voucher_deactivated_before_checkout_is_not_found() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Kettle", dec!(100), 10).await;
    let voucher = app.seed_voucher("GONE", dec!(10), dec!(50)).await;
    app.seed_cart_line(buyer.id, item.id, 1).await;

    app.state
        .services
        .vouchers
        .delete(voucher.id, "admin@example.com")
        .await
        .expect("soft delete");

    let err = app
        .state
        .services
        .checkout
        .checkout(with_voucher(&buyer.email, "GONE"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(Resource::Voucher, _));
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;

    let err = app
        .state
        .services
        .checkout
        .checkout(request(&buyer.email))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::EmptyCart);
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .checkout
        .checkout(request("ghost@example.com"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(Resource::Account, _));
}

#[tokio::test]
async fn total_never_goes_negative() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Sticker", dec!(3), 10).await;
    app.seed_voucher("FREE", dec!(100), dec!(1000)).await;
    app.seed_cart_line(buyer.id, item.id, 2).await;

    let receipt = app
        .state
        .services
        .checkout
        .checkout(with_voucher(&buyer.email, "FREE"))
        .await
        .expect("checkout succeeds");

    assert_eq!(receipt.discount, dec!(6));
    assert_eq!(receipt.total, Decimal::ZERO);
}

#[tokio::test]
async fn order_lines_snapshot_the_item_at_checkout() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let kettle = app.seed_item("Kettle", dec!(100), 10).await;
    let mug = app.seed_item("Mug", dec!(12), 10).await;
    app.seed_cart_line(buyer.id, kettle.id, 1).await;
    app.seed_cart_line(buyer.id, mug.id, 3).await;

    let receipt = app
        .state
        .services
        .checkout
        .checkout(request(&buyer.email))
        .await
        .expect("checkout succeeds");
    assert_eq!(receipt.subtotal, dec!(136));

    // Later catalogue edits do not rewrite history.
    app.state
        .services
        .items
        .update(
            kettle.id,
            ItemPatch {
                price: Some(dec!(150)),
                ..Default::default()
            },
            "admin@example.com",
        )
        .await
        .expect("price change");

    let lines = OrderItemRepository::new(&*app.state.db)
        .all_by_order(receipt.order_id)
        .await
        .expect("order lines");
    assert_eq!(lines.len(), 2);
    let kettle_line = lines.iter().find(|l| l.item_id == kettle.id).expect("kettle line");
    assert_eq!(kettle_line.price, dec!(100));

    let sum: Decimal = lines
        .iter()
        .map(|l| l.price * Decimal::from(l.quantity))
        .sum();
    assert_eq!(sum, receipt.subtotal);
}

#[tokio::test]
async fn address_and_phone_default_to_account_details() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Kettle", dec!(10), 10).await;
    app.seed_cart_line(buyer.id, item.id, 1).await;

    let receipt = app
        .state
        .services
        .checkout
        .checkout(CheckoutRequest {
            phone_number: Some("   ".to_string()),
            address: Some("9 Dock Rd".to_string()),
            ..request(&buyer.email)
        })
        .await
        .expect("checkout succeeds");

    let order = OrderRepository::new(&*app.state.db)
        .one_for_account(buyer.id, receipt.order_id)
        .await
        .expect("order");
    assert_eq!(order.address, "9 Dock Rd");
    assert_eq!(order.phone_number, buyer.phone_number);
}

#[tokio::test]
async fn soft_deleted_item_in_cart_blocks_checkout() {
    let app = TestApp::new().await;
    let buyer = app.seed_user("buyer@example.com").await;
    let item = app.seed_item("Retired", dec!(10), 10).await;
    app.seed_cart_line(buyer.id, item.id, 1).await;

    app.state
        .services
        .items
        .delete(item.id, "admin@example.com")
        .await
        .expect("soft delete");

    let err = app
        .state
        .services
        .checkout
        .checkout(request(&buyer.email))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(Resource::Item, _));
    assert_eq!(app.cart_len(buyer.id).await, 1);
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    let app = TestApp::new().await;
    let first = app.seed_user("first@example.com").await;
    let second = app.seed_user("second@example.com").await;
    let item = app.seed_item("Last Two", dec!(50), 2).await;
    app.seed_cart_line(first.id, item.id, 2).await;
    app.seed_cart_line(second.id, item.id, 2).await;

    let checkout = app.state.services.checkout.clone();
    let (a, b) = tokio::join!(
        checkout.checkout(request(&first.email)),
        checkout.checkout(request(&second.email)),
    );

    let outcomes = [a, b];
    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(ServiceError::InsufficientStock(_)))));
    assert_eq!(app.item_quantity(item.id).await, 0);
}

#[tokio::test]
async fn stock_commit_rejects_a_stale_read() {
    let app = TestApp::new().await;
    let item = app.seed_item("Kettle", dec!(100), 5).await;
    let stale = ItemRepository::new(&*app.state.db)
        .one_by_id(item.id)
        .await
        .expect("read item");

    // Another writer moves the stock after the read.
    app.state
        .services
        .items
        .update(
            item.id,
            ItemPatch {
                quantity: Some(3),
                ..Default::default()
            },
            "admin@example.com",
        )
        .await
        .expect("restock");

    let err = InventoryLedger::new(&*app.state.db)
        .commit(&stale, 1, "buyer@example.com")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(app.item_quantity(item.id).await, 3);

    let fresh = ItemRepository::new(&*app.state.db)
        .one_by_id(item.id)
        .await
        .expect("read item");
    let remaining = InventoryLedger::new(&*app.state.db)
        .commit(&fresh, 1, "buyer@example.com")
        .await
        .expect("commit on a fresh read");
    assert_eq!(remaining, 2);
    assert_eq!(app.item_quantity(item.id).await, 2);
}
