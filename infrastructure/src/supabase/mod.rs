//! Supabase adapters
//!
//! Storage goes through PostgREST with the service-role key; identity
//! validation goes through the GoTrue `/auth/v1/user` endpoint with the
//! caller's token.

pub mod identity;
pub mod rest;
pub mod store;

pub use identity::SupabaseIdentity;
pub use rest::SupabaseRest;
pub use store::SupabaseStore;
