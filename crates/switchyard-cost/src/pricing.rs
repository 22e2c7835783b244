// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token pricing and cost calculation.
//!
//! Prices come from the provider table in configuration, in USD per million
//! tokens. Costs are rounded to eight decimal places so ledger sums stay
//! stable.

use switchyard_config::model::ModelConfig;

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl ModelPricing {
    pub fn from_model(model: &ModelConfig) -> Self {
        Self {
            input_per_mtok: model.price_input_per_1m,
            output_per_mtok: model.price_output_per_1m,
        }
    }
}

/// Cost of one call in USD.
pub fn calculate_cost(pricing: &ModelPricing, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    let input = f64::from(prompt_tokens) / 1_000_000.0 * pricing.input_per_mtok;
    let output = f64::from(completion_tokens) / 1_000_000.0 * pricing.output_per_mtok;
    round_usd(input + output)
}

/// Round to eight decimal places.
pub fn round_usd(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}
