//! Authentication middleware for staff endpoints

pub mod staff_auth;

pub use staff_auth::{StaffIdentity, StaffRole};
