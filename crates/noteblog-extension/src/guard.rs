//! Panic isolation for extension code.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs a synchronous call, turning a panic into an error built by `wrap`.
pub(crate) fn call_sync<T>(
    f: impl FnOnce() -> AppResult<T>,
    wrap: impl FnOnce(String) -> AppError,
) -> AppResult<T> {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(wrap(format!("panicked: {}", panic_message(&*payload)))),
    }
}

/// Awaits `fut`, turning a panic into an error built by `wrap`.
pub(crate) async fn call_async<T, F>(fut: F, wrap: impl FnOnce(String) -> AppError) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(wrap(format!("panicked: {}", panic_message(&*payload)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_panic_becomes_error() {
        let fut = async {
            let fail = true;
            if fail {
                panic!("boom");
            }
            Ok(())
        };
        let err = call_async::<(), _>(fut, AppError::lifecycle).await.unwrap_err();
        assert!(err.is(noteblog_core::ErrorKind::Lifecycle));
        assert!(err.message.contains("boom"));
    }

    #[test]
    fn test_sync_passthrough() {
        let value = call_sync(|| Ok(7), AppError::load).unwrap();
        assert_eq!(value, 7);
    }
}
