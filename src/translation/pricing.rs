/*!
 * Per-model token pricing.
 *
 * Cost is modeled from observed usage, never predicted, so the numbers here
 * only need to be close enough for budget ceilings and end-of-run summaries.
 */

use crate::providers::TokenUsage;

/// Price per 1000 tokens for one model, in USD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Cost per 1000 prompt tokens
    pub input_cost_per_1k: f64,

    /// Cost per 1000 completion tokens
    pub output_cost_per_1k: f64,
}

/// Applied when the model name is not in the table
pub const FALLBACK_PRICING: ModelPricing = ModelPricing {
    input_cost_per_1k: 0.001,
    output_cost_per_1k: 0.002,
};

/// Look up pricing by model name.
///
/// Prefix matching, longest prefix first, so dated variants like
/// "gpt-4o-2024-08-06" resolve to their base model.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    if model.starts_with("gpt-4o-mini") {
        ModelPricing {
            input_cost_per_1k: 0.00015,
            output_cost_per_1k: 0.0006,
        }
    } else if model.starts_with("gpt-4o") {
        ModelPricing {
            input_cost_per_1k: 0.0025,
            output_cost_per_1k: 0.01,
        }
    } else if model.starts_with("gpt-4.1-mini") {
        ModelPricing {
            input_cost_per_1k: 0.0004,
            output_cost_per_1k: 0.0016,
        }
    } else if model.starts_with("gpt-4.1") {
        ModelPricing {
            input_cost_per_1k: 0.002,
            output_cost_per_1k: 0.008,
        }
    } else if model.starts_with("gpt-4-turbo") {
        ModelPricing {
            input_cost_per_1k: 0.01,
            output_cost_per_1k: 0.03,
        }
    } else if model.starts_with("gpt-4") {
        ModelPricing {
            input_cost_per_1k: 0.03,
            output_cost_per_1k: 0.06,
        }
    } else if model.starts_with("gpt-3.5-turbo") {
        ModelPricing {
            input_cost_per_1k: 0.0005,
            output_cost_per_1k: 0.0015,
        }
    } else {
        FALLBACK_PRICING
    }
}

/// Estimated cost in USD for one call's observed usage
pub fn cost_for_usage(model: &str, usage: &TokenUsage) -> f64 {
    let pricing = pricing_for_model(model);
    usage.prompt_tokens as f64 / 1000.0 * pricing.input_cost_per_1k
        + usage.completion_tokens as f64 / 1000.0 * pricing.output_cost_per_1k
}
