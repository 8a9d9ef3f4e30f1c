//! Business services behind the HTTP handlers

pub mod autoresponder;
pub mod checkout;
pub mod phone;
pub mod reconcile;
pub mod sweeper;
