//! Inventory engine tying the mirror, the applier and subscriptions together.

use crate::aggregate::{CategoryTotal, ChartSeries, ItemQuantity};
use crate::error::EngineResult;
use crate::mirror::{LocalMirror, Snapshot};
use crate::mutations::{
    KeyStrategy, MutationApplier, MutationEffect, MutationPolicy, UpdateStrategy,
};
use crate::remote::RemoteStore;
use crate::subscriptions::{
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::{ItemDraft, ItemId, DEFAULT_CATEGORY};
use std::sync::Arc;

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Category for items saved or stored without one.
    pub default_category: String,

    /// How keys for new items are chosen.
    pub key_strategy: KeyStrategy,

    /// How increment and decrement write back.
    pub update_strategy: UpdateStrategy,

    /// Extra attempts for a conditional write after the first one loses.
    /// Only used with [`UpdateStrategy::Conditional`].
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_category: DEFAULT_CATEGORY.to_string(),
            key_strategy: KeyStrategy::Generated,
            update_strategy: UpdateStrategy::ReadModifyWrite,
            max_conflict_retries: 3,
        }
    }
}

/// The inventory engine.
///
/// Provides a unified interface for:
/// - Loading and refreshing the local mirror
/// - Adding, editing, deleting, incrementing and decrementing items
/// - Category and item aggregates of the current snapshot
/// - Subscribing to snapshot and error notifications
///
/// Holds no durable state of its own; everything persists in the store.
pub struct Inventory {
    config: EngineConfig,
    mirror: Arc<LocalMirror>,
    applier: MutationApplier,
    events: Arc<SubscriptionManager>,
}

impl Inventory {
    /// Create an engine over `store`. The mirror starts empty until [`load`](Self::load).
    pub fn new(store: Arc<dyn RemoteStore>, config: EngineConfig) -> Self {
        let events = Arc::new(SubscriptionManager::new());
        let mirror = Arc::new(LocalMirror::new(
            Arc::clone(&store),
            config.default_category.clone(),
            Arc::clone(&events),
        ));
        let applier = MutationApplier::new(
            store,
            Arc::clone(&mirror),
            Arc::clone(&events),
            MutationPolicy {
                default_category: config.default_category.clone(),
                key_strategy: config.key_strategy,
                update_strategy: config.update_strategy,
                max_conflict_retries: config.max_conflict_retries,
            },
        );

        Self {
            config,
            mirror,
            applier,
            events,
        }
    }

    /// Initial read of the collection.
    pub async fn load(&self) -> EngineResult<Arc<Snapshot>> {
        self.mirror.refresh().await
    }

    // --- Mirror ---

    /// Re-read the collection. See [`LocalMirror::refresh`].
    pub async fn refresh(&self) -> EngineResult<Arc<Snapshot>> {
        self.mirror.refresh().await
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.mirror.current()
    }

    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    // --- Mutations ---

    /// Save a draft. See [`MutationApplier::create_or_replace`].
    pub async fn create_or_replace(&self, draft: &ItemDraft) -> EngineResult<MutationEffect> {
        self.applier.create_or_replace(draft).await
    }

    pub async fn delete_item(&self, id: &ItemId) -> EngineResult<MutationEffect> {
        self.applier.delete_item(id).await
    }

    pub async fn increment(&self, key: &ItemId) -> EngineResult<MutationEffect> {
        self.applier.increment(key).await
    }

    pub async fn decrement(&self, key: &ItemId) -> EngineResult<MutationEffect> {
        self.applier.decrement(key).await
    }

    /// Key for `name` in the keyed-by-name layout.
    pub fn key_for_name(&self, name: &str) -> ItemId {
        self.applier.key_for_name(name)
    }

    // --- Aggregates ---

    pub fn by_category(&self) -> Vec<CategoryTotal> {
        self.snapshot().by_category()
    }

    pub fn by_item(&self) -> Vec<ItemQuantity> {
        self.snapshot().by_item()
    }

    /// Category totals as a chart series.
    pub fn category_chart(&self) -> ChartSeries {
        ChartSeries::from_categories(&self.by_category())
    }

    /// Item quantities as a chart series.
    pub fn item_chart(&self) -> ChartSeries {
        ChartSeries::from_items(&self.by_item())
    }

    // --- Subscriptions ---

    /// Subscribe to snapshot and error events. See [`LocalMirror::subscribe`].
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.mirror.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }

    pub fn subscription_count(&self) -> usize {
        self.events.subscription_count()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
