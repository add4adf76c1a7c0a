pub mod models;
pub mod builder;
pub mod status;
pub mod settlement;
pub mod deletion;
pub mod engine;

pub use models::{CartLine, CreateOrderRequest, CustomerSummary, SettledOrder, SettlementResult};
pub use builder::{generate_order_number, OrderBuilder};
pub use status::{allowed_targets, can_transition, StatusMachine, TransitionCause, TransitionOutcome};
pub use settlement::{DebtLedger, CREDIT_PAYMENT_METHOD};
pub use deletion::{default_tiers, DeletionGuard, DeletionOutcome, DeletionTier, DELETED_MARKER};
pub use engine::LedgerEngine;
