pub mod assembler;
pub mod pricing;

pub use assembler::{OrderAssembler, LOW_CONFIDENCE_THRESHOLD};
pub use pricing::{apply_discount, compute_totals, round_money, PricingPolicy};
