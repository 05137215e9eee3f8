//! Hook callback definitions.
//!
//! A callback is a tagged function reference whose tag is its arity
//! (0 to 3 JSON arguments). Actions produce an optional output fragment,
//! filters produce the next pipeline value.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use noteblog_core::result::AppResult;
use noteblog_entity::extension::ExtensionKey;

/// Largest number of arguments a callback may accept.
pub const MAX_ARITY: usize = 3;

/// Default priority used when an extension does not care about ordering.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Future returned by a hook callback.
pub type HookFuture<T> = BoxFuture<'static, AppResult<T>>;

/// Flavor of an extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Side effects and output fragments, no value threading.
    Action,
    /// Value-transforming pipeline.
    Filter,
}

impl HookKind {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Filter => "filter",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A callback with a fixed arity.
pub enum HookFn<T> {
    /// Takes no arguments.
    Arity0(Arc<dyn Fn() -> HookFuture<T> + Send + Sync>),
    /// Takes one argument.
    Arity1(Arc<dyn Fn(Value) -> HookFuture<T> + Send + Sync>),
    /// Takes two arguments.
    Arity2(Arc<dyn Fn(Value, Value) -> HookFuture<T> + Send + Sync>),
    /// Takes three arguments.
    Arity3(Arc<dyn Fn(Value, Value, Value) -> HookFuture<T> + Send + Sync>),
}

/// Callback registered on an action point.
pub type ActionFn = HookFn<Option<String>>;

/// Callback registered on a filter point.
pub type FilterFn = HookFn<Value>;

impl<T> Clone for HookFn<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Arity0(f) => Self::Arity0(Arc::clone(f)),
            Self::Arity1(f) => Self::Arity1(Arc::clone(f)),
            Self::Arity2(f) => Self::Arity2(Arc::clone(f)),
            Self::Arity3(f) => Self::Arity3(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for HookFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookFn")
            .field("arity", &self.arity())
            .field("callback", &"<closure>")
            .finish()
    }
}

impl<T: Send + 'static> HookFn<T> {
    /// Wraps a callback taking no arguments.
    pub fn arity0<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        Self::Arity0(Arc::new(move || Box::pin(f())))
    }

    /// Wraps a callback taking one argument.
    pub fn arity1<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        Self::Arity1(Arc::new(move |a| Box::pin(f(a))))
    }

    /// Wraps a callback taking two arguments.
    pub fn arity2<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        Self::Arity2(Arc::new(move |a, b| Box::pin(f(a, b))))
    }

    /// Wraps a callback taking three arguments.
    pub fn arity3<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        Self::Arity3(Arc::new(move |a, b, c| Box::pin(f(a, b, c))))
    }
}

impl<T> HookFn<T> {
    /// Number of arguments this callback accepts.
    pub fn arity(&self) -> usize {
        match self {
            Self::Arity0(_) => 0,
            Self::Arity1(_) => 1,
            Self::Arity2(_) => 2,
            Self::Arity3(_) => 3,
        }
    }

    /// Invokes the callback with the first `arity` positional arguments.
    ///
    /// Missing positions are passed as `Value::Null`; extra ones are ignored.
    pub fn call(&self, args: &[Value]) -> HookFuture<T> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);
        match self {
            Self::Arity0(f) => f(),
            Self::Arity1(f) => f(arg(0)),
            Self::Arity2(f) => f(arg(0), arg(1)),
            Self::Arity3(f) => f(arg(0), arg(1), arg(2)),
        }
    }
}

/// Positional arguments handed to callbacks at dispatch time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookArgs(Vec<Value>);

impl HookArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument.
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Returns the argument slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for HookArgs {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for HookArgs {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Read-only view of one registration, for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookRegistration {
    /// Action or filter.
    pub kind: HookKind,
    /// Extension point name.
    pub point: String,
    /// Lower runs first.
    pub priority: i32,
    /// Registration sequence number, the tie breaker.
    pub sequence: u64,
    /// Callback arity.
    pub arity: usize,
    /// Registering extension.
    pub owner: ExtensionKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_call_passes_positional_args() {
        let f: FilterFn = HookFn::arity3(|a, b, c| async move { Ok(json!([a, b, c])) });
        let out = f.call(&[json!(1), json!("two")]).await.unwrap();
        assert_eq!(out, json!([1, "two", null]));
        assert_eq!(f.arity(), 3);
    }

    #[tokio::test]
    async fn test_call_ignores_extra_args() {
        let f: ActionFn = HookFn::arity0(|| async { Ok(Some("<p>hi</p>".to_string())) });
        let out = f.call(&[json!(1), json!(2)]).await.unwrap();
        assert_eq!(out.as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_args_builder() {
        let args = HookArgs::new().with("post").with(json!({"id": 3}));
        assert_eq!(args.len(), 2);
        assert_eq!(args.as_slice()[1]["id"], 3);
    }
}
