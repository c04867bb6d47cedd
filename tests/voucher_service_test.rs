//! Voucher lifecycle against a real (in-memory) database.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use shopcart_api::{errors::ServiceError, repositories::NewVoucher};

fn save10() -> NewVoucher {
    NewVoucher {
        code: "save10".to_string(),
        name: "Ten percent".to_string(),
        description: String::new(),
        percentage: dec!(10),
        max: dec!(15),
        is_active: true,
    }
}

#[tokio::test]
async fn live_code_cannot_be_issued_twice() {
    let app = TestApp::new().await;
    app.seed_voucher("SAVE10", dec!(5), dec!(5)).await;

    assert_matches!(
        app.state.services.vouchers.create(save10(), "admin@example.com").await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn deleted_code_can_be_issued_again() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;
    let old = app.seed_voucher("SAVE10", dec!(5), dec!(5)).await;
    vouchers.delete(old.id, "admin@example.com").await.expect("delete");

    let new = vouchers
        .create(save10(), "admin@example.com")
        .await
        .expect("re-create");
    assert_ne!(new.id, old.id);

    let applied = vouchers.apply("SAVE10", dec!(200)).await.expect("apply");
    assert_eq!(applied.voucher.id, new.id);
    assert_eq!(applied.applied, dec!(15));
}
