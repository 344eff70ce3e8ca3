use clap::Args;

use ordercopilot_core::catalog::matcher::DEFAULT_LISTING_LIMIT;
use ordercopilot_core::config::AppConfig;
use ordercopilot_core::{ProductId, ProductMatcher};

use super::{load_catalog, CommandResult, EXIT_FAILURE};

#[derive(Clone, Debug, Default, Args)]
pub struct MatchArgs {
    #[arg(help = "Free-text product query")]
    pub query: Option<String>,
    #[arg(long, help = "Brand hint; detected from the query when omitted")]
    pub brand: Option<String>,
    #[arg(long, help = "Category hint; detected from the query when omitted")]
    pub category: Option<String>,
    #[arg(long, help = "Maximum candidates to return")]
    pub max_results: Option<usize>,
    #[arg(long, help = "Discard candidates scoring below this value")]
    pub min_score: Option<f64>,
    #[arg(long, help = "Look up one catalog record by id")]
    pub id: Option<String>,
    #[arg(long, help = "List records by --category or --brand without scoring")]
    pub list: bool,
    #[arg(long, default_value_t = DEFAULT_LISTING_LIMIT, help = "Row limit for --list")]
    pub limit: usize,
}

pub fn run(config: &AppConfig, args: &MatchArgs) -> CommandResult {
    let catalog = match load_catalog("match", config) {
        Ok(catalog) => catalog,
        Err(failure) => return failure,
    };
    let matcher = ProductMatcher::new(catalog);

    if let Some(id) = args.id.as_deref() {
        return match matcher.get_by_id(&ProductId(id.to_string())) {
            Some(candidate) => CommandResult::success_with_data("match", "exact id match", &candidate),
            None => CommandResult::failure("match", "not_found", format!("no catalog record `{id}`"), EXIT_FAILURE),
        };
    }

    if args.list {
        let listed = match (args.category.as_deref(), args.brand.as_deref()) {
            (Some(category), _) => matcher.get_by_category(category, args.limit),
            (None, Some(brand)) => matcher.get_by_brand(brand, args.limit),
            (None, None) => {
                return CommandResult::failure(
                    "match",
                    "invalid_arguments",
                    "--list needs --category or --brand",
                    EXIT_FAILURE,
                );
            }
        };
        return CommandResult::success_with_data("match", format!("{} records listed", listed.len()), &listed);
    }

    let Some(query) = args.query.as_deref().filter(|query| !query.trim().is_empty()) else {
        return CommandResult::failure("match", "invalid_arguments", "a query is required", EXIT_FAILURE);
    };

    let result = matcher.match_products(
        query,
        args.brand.as_deref(),
        args.category.as_deref(),
        args.max_results.unwrap_or(config.matching.max_results),
        args.min_score.unwrap_or(config.matching.min_score),
    );
    CommandResult::success_with_data("match", format!("{} candidates found", result.total_found), &result)
}
