//! Conversation runtime for the order copilot.
//!
//! This crate turns inbound buyer messages into outbound chat actions:
//! - Extracts a structured intent from free text (`intent`), optionally through a
//!   completion service (`llm`) with a deterministic keyword fallback
//! - Tracks each buyer's position in the order dialogue (`session`)
//! - Drives the dialogue through the core transition table (`conversation`)
//! - Produces transport-neutral replies (`actions`)
//!
//! # Safety Principle
//!
//! The completion service only translates text into an intent. Prices, totals and
//! confirmation requirements are always computed by the core crate.

pub mod actions;
pub mod conversation;
pub mod intent;
pub mod llm;
pub mod prompts;
pub mod session;

pub use actions::{Button, ListRow, OutboundAction};
pub use conversation::{best_candidates, ConversationEngine, MatchingSettings};
pub use intent::{IntentExtractor, IntentPayload};
pub use llm::{completion_service_from_config, CompletionService, HttpCompletionService, PatternCompletionService};
pub use session::{InMemorySessionStore, Session, SessionStore};
