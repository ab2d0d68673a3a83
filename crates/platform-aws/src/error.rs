//! Mapping from AWS SDK errors to [`PlatformError`].

use std::{error::Error, fmt::Debug};

use aws_sdk_ssm::error::{DisplayErrorContext, SdkError};
use tenantq_platform::PlatformError;

/// Converts an SDK error into the canonical platform error.
///
/// | SDK error | Platform error |
/// |-----------|----------------|
/// | `TimeoutError` | `Timeout` |
/// | `DispatchFailure` | `Connection` |
/// | `ServiceError` | `Rejected` (access denied, unknown queue, refused login) |
/// | `ResponseError` | `Serialization` |
/// | anything else | `Internal` |
pub(crate) fn sdk_error_to_platform_error<E, R>(
    operation: &'static str,
    err: &SdkError<E, R>,
) -> PlatformError
where
    E: Error + 'static,
    R: Debug,
{
    let message = format!("{operation}: {}", DisplayErrorContext(err));
    match err {
        SdkError::TimeoutError(_) => {
            tracing::warn!(operation, "AWS call timed out");
            PlatformError::timeout()
        },
        SdkError::DispatchFailure(_) => PlatformError::connection(message),
        SdkError::ServiceError(_) => PlatformError::rejected(message),
        SdkError::ResponseError(_) => PlatformError::serialization(message),
        _ => PlatformError::internal(message),
    }
}
