pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod ordering;

pub use audit::{AuditEvent, AuditKind, AuditSink, InMemoryAuditSink, OrderSnapshot};
pub use catalog::{CatalogIndex, MatchCandidate, MatchQuery, MatchResult, ProductMatcher};
pub use domain::intent::{
    DeliveryPreference, IntentKind, ParsedIntent, ProductMention, Urgency,
};
pub use domain::order::{DeliveryDetails, Order, OrderId, OrderLine, OrderStatus, OrderTotals};
pub use domain::product::{CatalogRecord, ProductId};
pub use errors::{ApplicationError, DomainError};
pub use flows::{ConversationEvent, ConversationState, FlowAction, TransitionOutcome};
pub use ordering::{OrderAssembler, PricingPolicy};
