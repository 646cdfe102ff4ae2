//! Port definitions (interfaces for external collaborators)
//!
//! Ports define the contracts that infrastructure adapters must implement:
//! the model collaborator, durable conversation/quota storage, identity
//! verification, and payment processing.

pub mod conversation_store;
pub mod identity;
pub mod model_gateway;
pub mod payment;
