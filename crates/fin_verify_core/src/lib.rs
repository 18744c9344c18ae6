//! fin_verify_core: third-party verification pipeline.
//!
//! Pure domain types, port traits and the services that drive a two-phase
//! OTP challenge against an external verification provider:
//!
//! - [`gateway`] - authenticated provider calls with timeout and error translation
//! - [`normalize`] - rule-based canonical summary extraction from raw payloads
//! - [`consent`] - per-user, per-source consent ledger
//! - [`orchestrator`] - initiate / resolve state machine, passbook and tax pulls
//! - [`ports`] - storage traits implemented by `fin_verify_postgres` and [`memory`]
//!
//! Nothing in this crate touches sqlx; the server wires concrete stores in.

pub mod config;
pub mod consent;
pub mod error;
pub mod gateway;
pub mod inflight;
pub mod memory;
pub mod normalize;
pub mod orchestrator;
pub mod ports;
pub mod principal;
pub mod types;
pub mod validate;

pub use consent::ConsentLedger;
pub use error::{Result, VerifyError};
pub use gateway::{HttpGateway, ProviderReply, VerificationGateway};
pub use memory::MemoryStore;
pub use normalize::{normalize, NormalizedSummary};
pub use orchestrator::ChallengeOrchestrator;
pub use principal::Principal;
