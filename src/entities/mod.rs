pub mod account;
pub mod cart;
pub mod item;
pub mod order;
pub mod order_item;
pub mod order_voucher;
pub mod voucher;

/// Audit identity recorded when no account is acting.
pub const SYSTEM_ACTOR: &str = "SYSTEM";
