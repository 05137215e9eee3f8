//! Hook dispatcher: runs the callbacks on an extension point.
//!
//! Dispatch is fail-open. A callback that errors, panics or runs past the
//! configured timeout is logged, counted and skipped:
//!
//! - for actions, the remaining callbacks still run;
//! - for filters, the value is passed on unchanged to the next callback.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_entity::extension::ExtensionKey;

use super::definitions::HookArgs;
use super::registry::{HookEntry, HookRegistry};
use crate::guard;

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Callbacks invoked.
    pub invoked: usize,
    /// Callbacks that failed and were skipped.
    pub failed: usize,
}

/// Failure tally for one `(owner, point)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookFailureCount {
    /// Extension that owns the failing callback.
    pub owner: ExtensionKey,
    /// Extension point.
    pub point: String,
    /// Number of failed invocations since startup.
    pub failures: u64,
}

/// Dispatches actions and filters to registered callbacks.
#[derive(Debug)]
pub struct HookDispatcher {
    registry: Arc<HookRegistry>,
    timeout: Duration,
    failures: DashMap<(ExtensionKey, String), u64>,
}

impl HookDispatcher {
    /// Creates a dispatcher with a per-callback timeout.
    pub fn new(registry: Arc<HookRegistry>, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            failures: DashMap::new(),
        }
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Runs every action on `point` in order, appending non-empty output
    /// fragments to `output`.
    pub async fn run_all(&self, point: &str, args: &HookArgs, output: &mut Vec<String>) -> DispatchReport {
        let snapshot = self.registry.actions(point).await;
        let mut report = DispatchReport::default();
        if snapshot.is_empty() {
            return report;
        }

        debug!(point = %point, handler_count = snapshot.len(), "Dispatching action");

        for entry in snapshot.iter() {
            report.invoked += 1;
            match self.invoke(point, entry, args.as_slice()).await {
                Ok(Some(fragment)) if !fragment.is_empty() => output.push(fragment),
                Ok(_) => {}
                Err(e) => {
                    report.failed += 1;
                    self.record_failure(point, &entry.owner, &e);
                }
            }
        }
        report
    }

    /// Runs the actions on `point` and returns their output fragments.
    pub async fn collect(&self, point: &str, args: &HookArgs) -> Vec<String> {
        let mut output = Vec::new();
        self.run_all(point, args, &mut output).await;
        output
    }

    /// Threads `value` through the filters on `point`.
    ///
    /// Each filter receives the current value followed by `extra`. With no
    /// filters registered the value is returned unchanged.
    pub async fn apply(&self, point: &str, value: Value, extra: &HookArgs) -> Value {
        self.apply_with_report(point, value, extra).await.0
    }

    /// Like [`apply`](Self::apply), also reporting failures.
    pub async fn apply_with_report(&self, point: &str, value: Value, extra: &HookArgs) -> (Value, DispatchReport) {
        let snapshot = self.registry.filters(point).await;
        let mut report = DispatchReport::default();
        if snapshot.is_empty() {
            return (value, report);
        }

        debug!(point = %point, handler_count = snapshot.len(), "Applying filter");

        let mut current = value;
        for entry in snapshot.iter() {
            report.invoked += 1;
            let mut args = Vec::with_capacity(1 + extra.len());
            args.push(current.clone());
            args.extend_from_slice(extra.as_slice());

            match self.invoke(point, entry, &args).await {
                Ok(next) => current = next,
                Err(e) => {
                    report.failed += 1;
                    self.record_failure(point, &entry.owner, &e);
                }
            }
        }
        (current, report)
    }

    /// Collects the output of several action points at once, for handing
    /// to a page template.
    ///
    /// Returns `{point: [fragment, ...]}` with an entry for every requested
    /// point, empty when nothing is registered.
    pub async fn collect_slots(&self, points: &[&str], args: &HookArgs) -> Value {
        let mut slots = Map::new();
        for point in points {
            let fragments = self.collect(point, args).await;
            slots.insert(
                (*point).to_string(),
                Value::Array(fragments.into_iter().map(Value::String).collect()),
            );
        }
        Value::Object(slots)
    }

    /// Failure tallies, sorted by owner then point.
    pub fn failure_counts(&self) -> Vec<HookFailureCount> {
        let mut counts: Vec<HookFailureCount> = self
            .failures
            .iter()
            .map(|item| {
                let (owner, point) = item.key();
                HookFailureCount {
                    owner: owner.clone(),
                    point: point.clone(),
                    failures: *item.value(),
                }
            })
            .collect();
        counts.sort_by(|a, b| (&a.owner, &a.point).cmp(&(&b.owner, &b.point)));
        counts
    }

    /// Total failures recorded for `owner` across all points.
    pub fn failures_for(&self, owner: &ExtensionKey) -> u64 {
        self.failures
            .iter()
            .filter(|item| &item.key().0 == owner)
            .map(|item| *item.value())
            .sum()
    }

    async fn invoke<T: Send + 'static>(&self, point: &str, entry: &HookEntry<T>, args: &[Value]) -> AppResult<T> {
        let owner = &entry.owner;
        let wrap = |detail: String| AppError::dispatch(format!("Hook '{point}' from {owner} {detail}"));

        let future = guard::call_sync(|| Ok(entry.hook.call(args)), wrap)?;
        match tokio::time::timeout(self.timeout, guard::call_async(future, wrap)).await {
            Ok(result) => result.map_err(|e| {
                if e.is(noteblog_core::ErrorKind::Dispatch) {
                    e
                } else {
                    AppError::dispatch(format!("Hook '{point}' from {owner} failed: {}", e.message))
                }
            }),
            Err(_) => Err(wrap(format!("timed out after {:?}", self.timeout))),
        }
    }

    fn record_failure(&self, point: &str, owner: &ExtensionKey, error: &AppError) {
        let mut count = self
            .failures
            .entry((owner.clone(), point.to_string()))
            .or_insert(0);
        *count += 1;

        warn!(
            point = %point,
            owner = %owner,
            failures = *count,
            error = %error.message,
            "Hook callback failed, skipping"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::definitions::HookFn;
    use serde_json::json;

    fn dispatcher() -> HookDispatcher {
        HookDispatcher::new(Arc::new(HookRegistry::new()), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_apply_without_filters_is_identity() {
        let d = dispatcher();
        let value = json!({"title": "Hello", "tags": ["a"]});
        assert_eq!(d.apply("post_context", value.clone(), &HookArgs::new()).await, value);
    }

    #[tokio::test]
    async fn test_failing_filter_passes_value_through() {
        let d = dispatcher();
        let a = ExtensionKey::plugin("good");
        let b = ExtensionKey::plugin("bad");
        let reg = d.registry();
        reg.register_filter("title", HookFn::arity1(|v| async move {
            Ok(json!(format!("{}!", v.as_str().unwrap_or_default())))
        }), 10, &a).await.unwrap();
        reg.register_filter("title", HookFn::arity1(|_| async move {
            Err(AppError::internal("broken"))
        }), 20, &b).await.unwrap();
        reg.register_filter("title", HookFn::arity1(|v| async move {
            Ok(json!(format!("[{}]", v.as_str().unwrap_or_default())))
        }), 30, &a).await.unwrap();

        let (out, report) = d.apply_with_report("title", json!("hi"), &HookArgs::new()).await;
        assert_eq!(out, json!("[hi!]"));
        assert_eq!(report, DispatchReport { invoked: 3, failed: 1 });
        assert_eq!(d.failures_for(&b), 1);
        assert_eq!(d.failures_for(&a), 0);
    }

    #[tokio::test]
    async fn test_panicking_action_does_not_stop_others() {
        let d = dispatcher();
        let a = ExtensionKey::plugin("a");
        let reg = d.registry();
        reg.register_action("sidebar_bottom", HookFn::arity0(|| async {
            let fragment: Option<String> = None;
            if fragment.is_none() {
                panic!("callback exploded");
            }
            Ok(fragment)
        }), 5, &a).await.unwrap();
        reg.register_action("sidebar_bottom", HookFn::arity1(|title| async move {
            Ok(Some(format!("<h3>{}</h3>", title.as_str().unwrap_or_default())))
        }), 10, &a).await.unwrap();

        let mut out = Vec::new();
        let report = d.run_all("sidebar_bottom", &HookArgs::new().with("Links"), &mut out).await;
        assert_eq!(out, vec!["<h3>Links</h3>".to_string()]);
        assert_eq!(report.failed, 1);

        let counts = d.failure_counts();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].point, "sidebar_bottom");
    }

    #[tokio::test]
    async fn test_slow_action_times_out() {
        let d = dispatcher();
        let a = ExtensionKey::plugin("slow");
        d.registry().register_action("head_assets", HookFn::arity0(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some("late".to_string()))
        }), 10, &a).await.unwrap();

        let out = d.collect("head_assets", &HookArgs::new()).await;
        assert!(out.is_empty());
        assert_eq!(d.failures_for(&a), 1);
    }

    #[tokio::test]
    async fn test_collect_slots_includes_empty_points() {
        let d = dispatcher();
        let a = ExtensionKey::plugin("friend_links");
        d.registry().register_action("sidebar_bottom", HookFn::arity0(|| async {
            Ok(Some("<ul></ul>".to_string()))
        }), 10, &a).await.unwrap();

        let slots = d.collect_slots(&["sidebar_bottom", "footer"], &HookArgs::new()).await;
        assert_eq!(slots, json!({"sidebar_bottom": ["<ul></ul>"], "footer": []}));
    }
}
