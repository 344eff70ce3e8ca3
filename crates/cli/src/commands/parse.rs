use ordercopilot_agent::{completion_service_from_config, IntentExtractor};
use ordercopilot_core::config::AppConfig;

use super::CommandResult;

pub async fn run(config: &AppConfig, message: &str) -> CommandResult {
    let service = match completion_service_from_config(&config.llm) {
        Ok(service) => service,
        Err(error) => {
            return CommandResult::integration_failure("parse", &error);
        }
    };

    let intent = IntentExtractor::new(service).extract(message).await;
    CommandResult::success_with_data("parse", intent.summary.clone(), &intent)
}
