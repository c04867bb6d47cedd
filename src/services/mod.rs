pub mod accounts;
pub mod carts;
pub mod checkout;
pub mod inventory;
pub mod items;
pub mod orders;
pub mod vouchers;
