//! Core value objects shared across the domain

pub mod model;

pub use model::Model;
