//! Convenience macros for extension development.

/// Builds [`HookArgs`](crate::hooks::HookArgs) from values convertible to
/// JSON.
///
/// # Example
/// ```rust,ignore
/// let args = hook_args!("post-42", json!({"title": "Hello"}));
/// dispatcher.run_all("post_footer", &args, &mut out).await;
/// ```
#[macro_export]
macro_rules! hook_args {
    () => {
        $crate::hooks::HookArgs::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let args = $crate::hooks::HookArgs::new();
        $(
            let args = args.with($value);
        )+
        args
    }};
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn test_hook_args_macro() {
        let empty = hook_args!();
        assert!(empty.is_empty());

        let args = hook_args!("post-42", json!({"title": "Hello"}), 3);
        assert_eq!(args.len(), 3);
        assert_eq!(args.as_slice()[0], json!("post-42"));
        assert_eq!(args.as_slice()[2], json!(3));
    }
}
