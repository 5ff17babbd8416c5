//! Constraint Manager
//!
//! Uniqueness constraints on node identity must exist before any merge runs;
//! without them repeated or concurrent loads could duplicate nodes.

use crate::errors::{ImportError, ImportResult};
use crate::graph_store::{GraphStore, NodeLabel};
use crate::retry::RetryPolicy;
use tracing::info;

/// Declare one uniqueness constraint per label. Safe to call on every run.
pub async fn ensure_constraints(
    store: &dyn GraphStore,
    labels: &[NodeLabel],
    retry: &RetryPolicy,
) -> ImportResult<()> {
    info!("🔒 Creating constraints...");
    for &label in labels {
        let what = format!("constraint {}", label.constraint_name());
        retry
            .run(&what, move || store.ensure_unique_constraint(label))
            .await
            .map_err(|source| ImportError::Constraint { label, source })?;

        info!(
            "   Ensured unique {}.{}",
            label.as_str(),
            label.key_property()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{instant_retry, FlakyStore};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_repeated_declaration_is_harmless() {
        let store = FlakyStore::counting();
        let retry = instant_retry(1);

        ensure_constraints(&store, &NodeLabel::ALL, &retry).await.unwrap();
        ensure_constraints(&store, &NodeLabel::ALL, &retry).await.unwrap();

        assert_eq!(store.constraint_calls.load(Ordering::SeqCst), 4);
        assert!(store.inner.has_constraint(NodeLabel::User));
        assert!(store.inner.has_constraint(NodeLabel::Property));
    }

    #[tokio::test]
    async fn test_failure_names_the_label() {
        let store = FlakyStore::failing_constraints();

        let err = ensure_constraints(&store, &NodeLabel::ALL, &instant_retry(2))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Constraint { label: NodeLabel::User, .. }));
        assert_eq!(store.constraint_calls.load(Ordering::SeqCst), 2);
    }
}
