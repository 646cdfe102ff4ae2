//! Application layer for llm-council
//!
//! This crate contains use cases, port definitions, and the resolved
//! runtime configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::CouncilConfig;
pub use ports::{
    conversation_store::{ConversationStore, PaymentRecord, StoreError},
    identity::{AccountProfile, AccountRole, BillingProfile, IdentityError, IdentityPort},
    model_gateway::{GatewayError, ModelGateway, ModelReply, QueryOptions},
    payment::{CheckoutCompleted, CheckoutSession, PaymentError, PaymentPort, Subscription},
};
pub use use_cases::payments::{CheckoutError, CheckoutOutcome, ProcessCheckoutUseCase};
pub use use_cases::quota::{QuotaError, QuotaLedger};
pub use use_cases::run_council::{CouncilOrchestrator, RunTurnError, TurnInput, TurnOutput};
pub use use_cases::stream_turn::{StreamTurnInput, StreamTurnUseCase, TurnError, TurnStream};
pub use use_cases::title::{TitleGenerator, TitleResult};
