//! Thread-safe handle over a single [`M3Embedder`].

use crate::config::ExecutionProvider;
use crate::embedder::M3Embedder;
use crate::error::{M3EmbedError, Result};
use crate::output::{EmbeddingOutput, ProviderInfo};
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Cloneable handle that serializes calls on one embedder.
///
/// Calls from different clones never overlap. For parallel throughput,
/// create one embedder per worker instead.
#[derive(Debug, Clone)]
pub struct SharedEmbedder {
    inner: Arc<Mutex<M3Embedder>>,
}

impl SharedEmbedder {
    pub fn new(embedder: M3Embedder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(embedder)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, M3Embedder> {
        // Calls never leave the embedder half-updated
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Embedder lock was poisoned by a panicking caller; continuing");
            poisoned.into_inner()
        })
    }

    pub fn generate_embeddings(&self, text: &str) -> Result<EmbeddingOutput> {
        self.lock().generate_embeddings(text)
    }

    /// Run [`M3Embedder::generate_embeddings`] on the blocking pool and give
    /// up after `timeout`.
    ///
    /// On timeout the native call keeps running to completion in the
    /// background and holds the lock until it finishes.
    pub async fn generate_embeddings_with_timeout(
        &self,
        text: &str,
        timeout: Duration,
    ) -> Result<EmbeddingOutput> {
        let handle = self.clone();
        let text = text.to_string();
        let task = tokio::task::spawn_blocking(move || handle.generate_embeddings(&text));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(M3EmbedError::inference(format!(
                "Embedding task failed: {}",
                join_error
            ))),
            Err(_) => {
                debug!("Embedding generation exceeded {:?}", timeout);
                Err(M3EmbedError::timeout(timeout))
            }
        }
    }

    pub fn execution_provider(&self) -> ExecutionProvider {
        self.lock().execution_provider()
    }

    pub fn provider_info(&self) -> ProviderInfo {
        self.lock().provider_info()
    }

    /// Release the sessions for every clone of this handle.
    pub fn close(&self) {
        self.lock().close();
    }
}

impl From<M3Embedder> for SharedEmbedder {
    fn from(embedder: M3Embedder) -> Self {
        Self::new(embedder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbedderConfig;
    use crate::provider::{MockModelSession, MockTokenizerSession, RawModelOutputs, RawTokenization};
    use ndarray::{Array2, Array3};
    use std::thread;

    fn shared_embedder(model_delay: Duration) -> SharedEmbedder {
        let mut tokenizer = MockTokenizerSession::new();
        tokenizer
            .expect_tokenize()
            .returning(|_| Ok(RawTokenization::new(vec![0, 42, 2], vec![0, 1, 2])));

        let mut model = MockModelSession::new();
        model
            .expect_execution_provider()
            .return_const(ExecutionProvider::Cpu);
        model.expect_run().returning(move |ids, _| {
            thread::sleep(model_delay);
            Ok(RawModelOutputs {
                dense: Array2::from_elem((1, 3), 1.0),
                sparse: Array3::from_elem((1, ids.len(), 1), 0.25),
                multi_vector: Array3::from_elem((1, ids.len(), 3), 0.5),
            })
        });

        M3Embedder::from_sessions(
            Box::new(tokenizer),
            Box::new(model),
            EmbedderConfig::default(),
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_concurrent_callers_all_succeed() {
        let shared = shared_embedder(Duration::from_millis(5));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || shared.generate_embeddings(&format!("text {}", i)))
            })
            .collect();

        for handle in handles {
            let output = handle.join().unwrap().unwrap();
            assert_eq!(output.token_ids(), &[0, 42, 2]);
            assert_eq!(output.sparse_weights().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_timeout_returns_error() {
        let shared = shared_embedder(Duration::from_millis(300));

        let err = shared
            .generate_embeddings_with_timeout("slow", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, M3EmbedError::Timeout { elapsed_ms: 20 }));
        assert!(err.is_inference());
    }

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let shared = shared_embedder(Duration::from_millis(1));

        let output = shared
            .generate_embeddings_with_timeout("fast", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.multi_vectors().len(), 3);
    }

    #[test]
    fn test_close_applies_to_all_clones() {
        let shared = shared_embedder(Duration::ZERO);
        let other = shared.clone();

        shared.close();
        assert!(matches!(
            other.generate_embeddings("x"),
            Err(M3EmbedError::SessionClosed)
        ));
        assert_eq!(other.provider_info().model_provider, ExecutionProvider::Cpu);
    }
}
