//! Model pricing definitions
//!
//! Prices are USD per million tokens, keyed by provider and then by model
//! family. Lookups try the exact model id, then the longest family key the
//! model id contains, then the provider's default model.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Price per 1M tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    /// Price per 1M input tokens (USD)
    pub input: f64,
    /// Price per 1M output tokens (USD)
    pub output: f64,
}

impl TokenPrice {
    pub const fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Calculate cost for given token counts
    pub fn calculate(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output;
        input_cost + output_cost
    }
}

/// Prices for one provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderPricing {
    /// Model family → price
    pub models: BTreeMap<String, TokenPrice>,
    /// Family used when a model id matches nothing
    pub default_model: Option<String>,
}

impl ProviderPricing {
    fn lookup(&self, model: &str) -> Option<TokenPrice> {
        let model = model.to_lowercase();
        if let Some(price) = self.models.get(&model) {
            return Some(*price);
        }

        let family = self
            .models
            .iter()
            .filter(|(family, _)| model.contains(family.as_str()))
            .max_by_key(|(family, _)| family.len());
        if let Some((_, price)) = family {
            return Some(*price);
        }

        self.default_model
            .as_ref()
            .and_then(|default| self.models.get(default))
            .copied()
    }
}

/// Injectable price table
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    providers: HashMap<String, ProviderPricing>,
    aliases: HashMap<String, String>,
}

impl PricingTable {
    /// Create an empty table; every lookup costs zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create table with default pricing
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register_defaults();
        table
    }

    /// Register a model family price
    pub fn register(&mut self, provider: &str, model: &str, price: TokenPrice) {
        self.providers
            .entry(provider.to_lowercase())
            .or_default()
            .models
            .insert(model.to_lowercase(), price);
    }

    /// Set the fallback model for a provider
    pub fn set_default_model(&mut self, provider: &str, model: &str) {
        self.providers
            .entry(provider.to_lowercase())
            .or_default()
            .default_model = Some(model.to_lowercase());
    }

    /// Register an alternative provider name
    pub fn register_alias(&mut self, alias: &str, provider: &str) {
        self.aliases
            .insert(alias.to_lowercase(), provider.to_lowercase());
    }

    /// Canonical provider name after alias resolution
    pub fn resolve_provider(&self, provider: &str) -> String {
        let provider = provider.to_lowercase();
        self.aliases.get(&provider).cloned().unwrap_or(provider)
    }

    /// Get pricing for a provider/model pair
    pub fn price_for(&self, provider: &str, model: &str) -> Option<TokenPrice> {
        self.providers
            .get(&self.resolve_provider(provider))
            .and_then(|pricing| pricing.lookup(model))
    }

    /// Calculate cost; unknown providers cost nothing
    pub fn calculate_cost(
        &self,
        provider: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> f64 {
        self.price_for(provider, model)
            .map(|price| price.calculate(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }

    /// Iterate over registered providers
    pub fn providers(&self) -> impl Iterator<Item = (&str, &ProviderPricing)> {
        self.providers.iter().map(|(name, p)| (name.as_str(), p))
    }

    fn register_defaults(&mut self) {
        // Anthropic
        self.register("anthropic", "claude-sonnet-4", TokenPrice::new(3.0, 15.0));
        self.register("anthropic", "claude-opus-4", TokenPrice::new(15.0, 75.0));
        self.register("anthropic", "claude-3-5-haiku", TokenPrice::new(0.80, 4.0));
        self.set_default_model("anthropic", "claude-sonnet-4");
        self.register_alias("claude", "anthropic");

        // Google
        self.register("gemini", "gemini-2.5-pro", TokenPrice::new(1.25, 10.0));
        self.register("gemini", "gemini-2.5-flash", TokenPrice::new(0.30, 2.50));
        self.register("gemini", "gemini-1.5-pro", TokenPrice::new(1.25, 5.0));
        self.set_default_model("gemini", "gemini-2.5-flash");
        self.register_alias("google", "gemini");

        // Azure OpenAI
        self.register("azure", "gpt-4o", TokenPrice::new(2.50, 10.0));
        self.register("azure", "gpt-4o-mini", TokenPrice::new(0.15, 0.60));
        self.register("azure", "gpt-4.1", TokenPrice::new(2.0, 8.0));
        self.set_default_model("azure", "gpt-4o");
        self.register_alias("azure-openai", "azure");
        self.register_alias("openai", "azure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_price_calculation() {
        let price = TokenPrice::new(3.0, 15.0);
        assert_eq!(price.calculate(1_000_000, 0), 3.0);
        assert_eq!(price.calculate(0, 1_000_000), 15.0);
        assert!((price.calculate(1000, 500) - 0.0105).abs() < 1e-12);
    }

    #[test]
    fn test_lookup_order() {
        let table = PricingTable::with_defaults();

        // exact
        assert_eq!(
            table.price_for("azure", "gpt-4o-mini"),
            Some(TokenPrice::new(0.15, 0.60))
        );
        // longest family wins over "gpt-4o"
        assert_eq!(
            table.price_for("azure", "gpt-4o-mini-2024-07-18"),
            Some(TokenPrice::new(0.15, 0.60))
        );
        assert_eq!(
            table.price_for("anthropic", "claude-opus-4-20250514"),
            Some(TokenPrice::new(15.0, 75.0))
        );
        // provider default
        assert_eq!(
            table.price_for("gemini", "gemini-exp-1206"),
            Some(TokenPrice::new(0.30, 2.50))
        );
    }

    #[test]
    fn test_provider_aliases_and_unknown() {
        let table = PricingTable::with_defaults();
        assert_eq!(
            table.price_for("Claude", "claude-sonnet-4-20250514"),
            table.price_for("anthropic", "claude-sonnet-4")
        );
        assert_eq!(table.resolve_provider("Google"), "gemini");
        assert_eq!(table.calculate_cost("mistral", "large", 1_000_000, 0), 0.0);
    }

    #[test]
    fn test_synthetic_table() {
        let mut table = PricingTable::new();
        table.register("test", "tiny", TokenPrice::new(1.0, 2.0));
        assert_eq!(table.calculate_cost("test", "tiny-v2", 500_000, 500_000), 1.5);
        assert_eq!(table.price_for("test", "other"), None);
    }
}
