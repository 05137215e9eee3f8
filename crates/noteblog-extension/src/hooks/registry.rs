//! Hook registry: extensions register callbacks by extension point with
//! priority ordering.
//!
//! Each point keeps an immutable, already sorted snapshot behind an `Arc`.
//! Registration swaps in a new snapshot, so a dispatch that is already
//! iterating keeps the list it started with.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_entity::extension::ExtensionKey;

use super::definitions::{ActionFn, FilterFn, HookFn, HookKind, HookRegistration};

/// One registered callback.
#[derive(Debug)]
pub struct HookEntry<T> {
    /// The callback.
    pub hook: HookFn<T>,
    /// Lower runs first.
    pub priority: i32,
    /// Tie breaker among equal priorities.
    pub sequence: u64,
    /// Extension that registered the callback.
    pub owner: ExtensionKey,
}

impl<T> Clone for HookEntry<T> {
    fn clone(&self) -> Self {
        Self {
            hook: self.hook.clone(),
            priority: self.priority,
            sequence: self.sequence,
            owner: self.owner.clone(),
        }
    }
}

/// Sorted snapshot of the callbacks on one point.
pub type HookSnapshot<T> = Arc<Vec<HookEntry<T>>>;

type PointMap<T> = HashMap<String, HookSnapshot<T>>;

/// Remembers the sequence number handed to each registration so that an
/// extension re-activated later lands in its original slot among peers of
/// equal priority.
#[derive(Debug, Default)]
struct OrderBook {
    next: u64,
    assigned: HashMap<(HookKind, String, ExtensionKey, usize), u64>,
    cursors: HashMap<(HookKind, String, ExtensionKey), usize>,
}

impl OrderBook {
    fn sequence_for(&mut self, kind: HookKind, point: &str, owner: &ExtensionKey) -> u64 {
        let cursor = self
            .cursors
            .entry((kind, point.to_string(), owner.clone()))
            .or_insert(0);
        let ordinal = *cursor;
        *cursor += 1;

        let next = &mut self.next;
        *self
            .assigned
            .entry((kind, point.to_string(), owner.clone(), ordinal))
            .or_insert_with(|| {
                let seq = *next;
                *next += 1;
                seq
            })
    }

    fn reset(&mut self, owner: &ExtensionKey) {
        self.cursors.retain(|(_, _, o), _| o != owner);
    }

    fn forget(&mut self, owner: &ExtensionKey) -> usize {
        let before = self.assigned.len();
        self.assigned.retain(|(_, _, o, _), _| o != owner);
        self.reset(owner);
        before - self.assigned.len()
    }
}

/// A callback collected while its extension is activating, not yet visible
/// to dispatch.
#[derive(Debug, Clone)]
pub enum StagedHook {
    /// Pending action.
    Action {
        point: String,
        hook: ActionFn,
        priority: i32,
    },
    /// Pending filter.
    Filter {
        point: String,
        hook: FilterFn,
        priority: i32,
    },
}

#[derive(Debug, Default)]
struct RegistryInner {
    actions: PointMap<Option<String>>,
    filters: PointMap<Value>,
    order: OrderBook,
}

/// Registry of action and filter callbacks organized by extension point.
#[derive(Debug, Default)]
pub struct HookRegistry {
    inner: RwLock<RegistryInner>,
}

fn insert_sorted<T>(map: &mut PointMap<T>, point: &str, entry: HookEntry<T>) {
    let mut entries: Vec<HookEntry<T>> = map
        .get(point)
        .map(|snapshot| snapshot.iter().cloned().collect())
        .unwrap_or_default();
    entries.push(entry);
    entries.sort_by_key(|e| (e.priority, e.sequence));
    map.insert(point.to_string(), Arc::new(entries));
}

fn remove_owner<T>(map: &mut PointMap<T>, owner: &ExtensionKey) -> usize {
    let mut removed = 0;
    let touched: Vec<String> = map
        .iter()
        .filter(|(_, entries)| entries.iter().any(|e| &e.owner == owner))
        .map(|(point, _)| point.clone())
        .collect();

    for point in touched {
        if let Some(snapshot) = map.remove(&point) {
            let before = snapshot.len();
            let kept: Vec<HookEntry<T>> = snapshot
                .iter()
                .filter(|e| &e.owner != owner)
                .cloned()
                .collect();
            removed += before - kept.len();
            if !kept.is_empty() {
                map.insert(point, Arc::new(kept));
            }
        }
    }
    removed
}

fn describe<T>(kind: HookKind, map: &PointMap<T>, owner: Option<&ExtensionKey>) -> Vec<HookRegistration> {
    let mut out: Vec<HookRegistration> = map
        .iter()
        .flat_map(|(point, entries)| {
            entries
                .iter()
                .filter(move |e| owner.is_none_or(|o| &e.owner == o))
                .map(move |e| HookRegistration {
                    kind,
                    point: point.clone(),
                    priority: e.priority,
                    sequence: e.sequence,
                    arity: e.hook.arity(),
                    owner: e.owner.clone(),
                })
        })
        .collect();
    out.sort_by(|a, b| {
        (a.point.as_str(), a.priority, a.sequence).cmp(&(b.point.as_str(), b.priority, b.sequence))
    });
    out
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action callback to `point`.
    pub async fn register_action(
        &self,
        point: &str,
        hook: ActionFn,
        priority: i32,
        owner: &ExtensionKey,
    ) -> AppResult<()> {
        Self::validate(HookKind::Action, point, hook.arity(), owner)?;
        let arity = hook.arity();
        let mut inner = self.inner.write().await;
        let sequence = inner.order.sequence_for(HookKind::Action, point, owner);
        insert_sorted(
            &mut inner.actions,
            point,
            HookEntry {
                hook,
                priority,
                sequence,
                owner: owner.clone(),
            },
        );

        info!(
            point = %point,
            owner = %owner,
            priority,
            arity,
            "Action hook registered"
        );
        Ok(())
    }

    /// Appends a filter callback to `point`.
    ///
    /// Filters must accept at least the value being filtered.
    pub async fn register_filter(
        &self,
        point: &str,
        hook: FilterFn,
        priority: i32,
        owner: &ExtensionKey,
    ) -> AppResult<()> {
        Self::validate(HookKind::Filter, point, hook.arity(), owner)?;
        let arity = hook.arity();
        let mut inner = self.inner.write().await;
        let sequence = inner.order.sequence_for(HookKind::Filter, point, owner);
        insert_sorted(
            &mut inner.filters,
            point,
            HookEntry {
                hook,
                priority,
                sequence,
                owner: owner.clone(),
            },
        );

        info!(
            point = %point,
            owner = %owner,
            priority,
            arity,
            "Filter hook registered"
        );
        Ok(())
    }

    /// Checks a registration without applying it.
    ///
    /// Filters must accept at least the value being filtered.
    pub fn validate(kind: HookKind, point: &str, arity: usize, owner: &ExtensionKey) -> AppResult<()> {
        if point.trim().is_empty() {
            return Err(AppError::validation("Extension point name must not be empty"));
        }
        if kind == HookKind::Filter && arity == 0 {
            return Err(AppError::validation(format!(
                "Filter on '{point}' from {owner} must accept the filtered value"
            )));
        }
        Ok(())
    }

    /// Makes every staged callback of `owner` visible in one step.
    ///
    /// Callbacks of `replacing` are removed under the same write lock, so a
    /// dispatch sees either the old owner's callbacks or the new one's,
    /// never both and never neither.
    pub async fn commit(
        &self,
        owner: &ExtensionKey,
        staged: Vec<StagedHook>,
        replacing: Option<&ExtensionKey>,
    ) -> usize {
        let mut inner = self.inner.write().await;
        if let Some(previous) = replacing {
            let removed = remove_owner(&mut inner.actions, previous) + remove_owner(&mut inner.filters, previous);
            inner.order.reset(previous);
            debug!(owner = %previous, removed, "Hooks replaced");
        }
        inner.order.reset(owner);

        let count = staged.len();
        for entry in staged {
            match entry {
                StagedHook::Action { point, hook, priority } => {
                    let sequence = inner.order.sequence_for(HookKind::Action, &point, owner);
                    let entry = HookEntry { hook, priority, sequence, owner: owner.clone() };
                    insert_sorted(&mut inner.actions, &point, entry);
                }
                StagedHook::Filter { point, hook, priority } => {
                    let sequence = inner.order.sequence_for(HookKind::Filter, &point, owner);
                    let entry = HookEntry { hook, priority, sequence, owner: owner.clone() };
                    insert_sorted(&mut inner.filters, &point, entry);
                }
            }
        }

        info!(owner = %owner, count, "Staged hooks committed");
        count
    }

    /// Drops the remembered ordering slots of an extension that is gone.
    pub async fn forget(&self, owner: &ExtensionKey) -> usize {
        self.inner.write().await.order.forget(owner)
    }

    /// Number of remembered ordering slots.
    pub async fn remembered_slots(&self) -> usize {
        self.inner.read().await.order.assigned.len()
    }

    /// Removes every action and filter registered by `owner`.
    ///
    /// Returns the number of callbacks removed. Calling this for an owner
    /// with no registrations is a no-op.
    pub async fn remove_all(&self, owner: &ExtensionKey) -> usize {
        let mut inner = self.inner.write().await;
        let removed = remove_owner(&mut inner.actions, owner) + remove_owner(&mut inner.filters, owner);
        inner.order.reset(owner);

        if removed > 0 {
            info!(owner = %owner, removed, "All hooks unregistered for extension");
        } else {
            debug!(owner = %owner, "No hooks to unregister");
        }
        removed
    }

    /// Sorted snapshot of the actions on `point`.
    pub async fn actions(&self, point: &str) -> HookSnapshot<Option<String>> {
        let inner = self.inner.read().await;
        inner.actions.get(point).cloned().unwrap_or_default()
    }

    /// Sorted snapshot of the filters on `point`.
    pub async fn filters(&self, point: &str) -> HookSnapshot<Value> {
        let inner = self.inner.read().await;
        inner.filters.get(point).cloned().unwrap_or_default()
    }

    /// Number of callbacks of `kind` on `point`.
    pub async fn handler_count(&self, kind: HookKind, point: &str) -> usize {
        let inner = self.inner.read().await;
        match kind {
            HookKind::Action => inner.actions.get(point).map_or(0, |e| e.len()),
            HookKind::Filter => inner.filters.get(point).map_or(0, |e| e.len()),
        }
    }

    /// Whether `owner` currently has any callback registered.
    pub async fn has_owner(&self, owner: &ExtensionKey) -> bool {
        let inner = self.inner.read().await;
        inner
            .actions
            .values()
            .any(|entries| entries.iter().any(|e| &e.owner == owner))
            || inner
                .filters
                .values()
                .any(|entries| entries.iter().any(|e| &e.owner == owner))
    }

    /// Points that currently have at least one callback, sorted by name.
    pub async fn points(&self, kind: HookKind) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut points: Vec<String> = match kind {
            HookKind::Action => inner.actions.keys().cloned().collect(),
            HookKind::Filter => inner.filters.keys().cloned().collect(),
        };
        points.sort();
        points
    }

    /// Every registration, optionally restricted to one owner.
    pub async fn registrations(&self, owner: Option<&ExtensionKey>) -> Vec<HookRegistration> {
        let inner = self.inner.read().await;
        let mut all = describe(HookKind::Action, &inner.actions, owner);
        all.extend(describe(HookKind::Filter, &inner.filters, owner));
        all
    }
}
