//! API route handlers

pub mod facts;
pub mod health;
