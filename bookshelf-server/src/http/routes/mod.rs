//! Route handlers, one module per resource

pub mod books;
pub mod health;
pub mod home;
