//! Route modules for Docserve

pub mod documents;
pub mod health;
