//! Shared test utilities for collaborator fakes.
//!
//! Feature-gated behind `testutil`.
//!
//! ```toml
//! [dev-dependencies]
//! tenantq-platform = { path = "../platform", features = ["testutil"] }
//! ```

use crate::{memory::MemoryQueueService, types::ScopedCredentials};

/// Credentials that look like a real temporary key pair.
#[must_use]
pub fn test_credentials(region: &str) -> ScopedCredentials {
    ScopedCredentials::new(
        "ASIATESTACCESSKEY001",
        "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
        "FwoGZXIvYXdzEXAMPLESESSIONTOKEN",
        region,
    )
}

/// Creates a [`MemoryQueueService`] holding `queues` with their depths.
#[must_use]
pub fn queues_with_depths(queues: &[(&str, u64)]) -> MemoryQueueService {
    let service = MemoryQueueService::new();
    for (name, depth) in queues {
        service.add_queue(*name, *depth);
    }
    service
}

/// Asserts that a [`PlatformResult`](crate::PlatformResult) is an `Err`
/// matching the given [`PlatformError`](crate::PlatformError) variant.
#[macro_export]
macro_rules! assert_platform_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::PlatformError::$variant { .. })),
            "expected PlatformError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueueService, QueueTarget};

    #[tokio::test]
    async fn test_queues_with_depths() {
        let service = queues_with_depths(&[("qa", 10), ("qb", 2)]);
        assert_eq!(service.approximate_depth(&QueueTarget::new("qb")).await.ok(), Some(2));
        let missing = service.approximate_depth(&QueueTarget::new("qc")).await;
        assert_platform_error!(missing, Rejected);
    }
}
