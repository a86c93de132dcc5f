//! Reconstruction of the ordered token sequence from raw tokenizer output.

use crate::provider::RawTokenization;

/// Model-ready inputs for a single sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedTokens {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
}

impl OrderedTokens {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Transient pairing of a token id with its target position.
#[derive(Debug, Clone, Copy)]
struct TokenIndexPair {
    token: i64,
    position: i64,
}

/// Order `tokens` by their `positions` and synthesize an all-ones mask.
///
/// Only the first `positions.len()` tokens are paired; trailing tokens
/// without a position are dropped. The sort is stable, so tokens sharing a
/// position keep their emission order. No padding or truncation happens here.
pub fn reorder_tokens(tokens: &[i64], positions: &[i64]) -> OrderedTokens {
    let mut pairs: Vec<TokenIndexPair> = tokens
        .iter()
        .zip(positions)
        .map(|(&token, &position)| TokenIndexPair { token, position })
        .collect();

    pairs.sort_by_key(|pair| pair.position);

    let input_ids: Vec<i64> = pairs.into_iter().map(|pair| pair.token).collect();
    let attention_mask = vec![1; input_ids.len()];

    OrderedTokens {
        input_ids,
        attention_mask,
    }
}

/// Convenience wrapper over [`reorder_tokens`] for a [`RawTokenization`].
pub fn reorder(raw: &RawTokenization) -> OrderedTokens {
    reorder_tokens(&raw.tokens, &raw.positions)
}
