// Settings read from the environment once, after `.env` has been loaded.

use std::env;

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Models offered in the picker, as (id, label).
pub const SUPPORTED_MODELS: &[(&str, &str)] = &[
    ("claude-3-5-haiku-20241022", "Claude 3.5 Haiku (Fast)"),
    ("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet (Balanced)"),
    ("claude-3-opus-20240229", "Claude 3 Opus (Most Capable)"),
];

lazy_static::lazy_static! {
    pub static ref ANTHROPIC_API_URL: String = env::var("ANTHROPIC_API_URL").unwrap_or_else(|_| "https://api.anthropic.com".to_string());
    pub static ref ANTHROPIC_API_KEY: String = env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    pub static ref ANTHROPIC_VERSION: String = env::var("ANTHROPIC_VERSION").unwrap_or_else(|_| "2023-06-01".to_string());
}

pub fn is_supported_model(model: &str) -> bool {
    SUPPORTED_MODELS.iter().any(|(id, _)| *id == model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_supported() {
        assert!(is_supported_model(DEFAULT_MODEL));
        assert!(!is_supported_model("gpt-4"));
    }
}
