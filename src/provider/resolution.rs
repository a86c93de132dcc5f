//! Provider chain resolution for the model session.

use crate::config::ExecutionProvider;

/// Build the ordered provider chain: the primary first, then each fallback
/// that is not already present, then CPU if nothing has added it yet.
///
/// The result never contains duplicates and always contains
/// [`ExecutionProvider::Cpu`], so a chain can always run somewhere. An
/// explicitly listed CPU keeps its position; providers after it are never
/// reached since CPU session creation does not fall through.
pub fn resolve_providers(
    primary: ExecutionProvider,
    fallbacks: &[ExecutionProvider],
) -> Vec<ExecutionProvider> {
    let mut chain = Vec::with_capacity(fallbacks.len() + 2);
    chain.push(primary);
    for &provider in fallbacks {
        if !chain.contains(&provider) {
            chain.push(provider);
        }
    }
    if !chain.contains(&ExecutionProvider::Cpu) {
        chain.push(ExecutionProvider::Cpu);
    }
    chain
}
