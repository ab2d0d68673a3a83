//! Least-loaded queue selection.

use std::sync::Arc;

use tenantq_platform::{QueueService, QueueTarget};

use crate::error::{DispatchError, Result};

/// Index of the first strict minimum in `depths`.
///
/// The first element is the initial minimum and is only replaced by a
/// strictly smaller value, so the earliest of equal minima wins. Returns
/// `None` for an empty slice.
///
/// ```
/// use tenantq_dispatch::selector::least_loaded_index;
///
/// assert_eq!(least_loaded_index(&[5, 3, 3]), Some(1));
/// assert_eq!(least_loaded_index(&[]), None);
/// ```
#[must_use]
pub fn least_loaded_index(depths: &[u64]) -> Option<usize> {
    let (first, rest) = depths.split_first()?;
    let mut best = (0, *first);
    for (offset, &depth) in rest.iter().enumerate() {
        if depth < best.1 {
            best = (offset + 1, depth);
        }
    }
    Some(best.0)
}

/// Picks the candidate queue with the smallest backlog.
#[derive(Clone)]
pub struct LoadAwareSelector {
    queues: Arc<dyn QueueService>,
}

impl LoadAwareSelector {
    /// Creates a selector querying depths through `queues`.
    pub fn new(queues: Arc<dyn QueueService>) -> Self {
        Self { queues }
    }

    /// Selects among `candidates`, in declared order.
    ///
    /// A single candidate is returned without any depth query. Otherwise
    /// every candidate is queried in order and the first strict minimum wins.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidRequest`] if `candidates` is empty.
    /// - [`DispatchError::QueueAttributesUnavailable`] if any depth query
    ///   fails; no candidate is skipped.
    #[tracing::instrument(
        skip_all,
        fields(candidates = candidates.len(), selected = tracing::field::Empty)
    )]
    pub async fn select(&self, candidates: &[QueueTarget]) -> Result<QueueTarget> {
        let selected = match candidates {
            [] => return Err(DispatchError::invalid_request("no candidate queues")),
            [only] => only.clone(),
            _ => {
                let mut depths = Vec::with_capacity(candidates.len());
                for queue in candidates {
                    let depth = self.queues.approximate_depth(queue).await.map_err(|source| {
                        tracing::warn!(queue = %queue, error = %source, "depth query failed");
                        DispatchError::queue_attributes_unavailable(queue.as_str(), source)
                    })?;
                    tracing::debug!(queue = %queue, depth, "queue depth");
                    depths.push(depth);
                }
                let index = least_loaded_index(&depths)
                    .ok_or_else(|| DispatchError::invalid_request("no candidate queues"))?;
                candidates[index].clone()
            },
        };
        tracing::Span::current().record("selected", selected.name());
        Ok(selected)
    }
}
