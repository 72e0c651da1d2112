//! Token estimation. Grounded on the donor's `memory/context.rs::TokenCounter`
//! `text.len()/4` approximation — kept as-is rather than pulling in a real
//! tokenizer, since the budget arithmetic only needs to be roughly right.

/// Rough token estimate: ~4 characters per token for English prose.
// TODO: swap for a real tokenizer (tiktoken-rs) once budget overruns are
// observed in practice; the donor carried the same placeholder.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_length() {
        assert!(estimate_tokens("a longer piece of text") > estimate_tokens("short"));
    }

    #[test]
    fn empty_text_is_at_least_one() {
        assert_eq!(estimate_tokens(""), 1);
    }
}
