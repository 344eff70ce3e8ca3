use rust_decimal::Decimal;
use serde::Serialize;

use ordercopilot_agent::{best_candidates, completion_service_from_config, IntentExtractor};
use ordercopilot_core::config::AppConfig;
use ordercopilot_core::{Order, OrderAssembler, ProductMatcher};

use super::{load_catalog, CommandResult, EXIT_FAILURE};

#[derive(Debug, Serialize)]
struct QuoteOutput {
    order: Order,
    summary: String,
}

/// One-shot inquiry: parse, match, assemble and price without a conversation.
pub async fn run(config: &AppConfig, message: &str, discount_percent: Option<Decimal>) -> CommandResult {
    let catalog = match load_catalog("quote", config) {
        Ok(catalog) => catalog,
        Err(failure) => return failure,
    };
    let service = match completion_service_from_config(&config.llm) {
        Ok(service) => service,
        Err(error) => {
            return CommandResult::integration_failure("quote", &error);
        }
    };

    let intent = IntentExtractor::new(service).extract(message).await;
    let matcher = ProductMatcher::new(catalog);
    let candidates = best_candidates(&matcher, &intent, config.matching.min_score);

    let assembler = OrderAssembler::new(config.pricing_policy(), config.ordering.order_id_prefix.clone());
    let mut order = assembler.extract(&intent, &candidates, message);
    if let Some(percent) = discount_percent {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return CommandResult::failure(
                "quote",
                "invalid_arguments",
                format!("discount must be between 0 and 100, got {percent}"),
                EXIT_FAILURE,
            );
        }
        assembler.apply_discount(&mut order, percent);
    }

    let summary = assembler.render_summary(&order);
    let message = format!("draft {} totals {} {}", order.order_id, order.totals.total, order.totals.currency);
    CommandResult::success_with_data("quote", message, &QuoteOutput { order, summary })
}
