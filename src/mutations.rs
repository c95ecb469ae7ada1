//! Mutation applier: user intents to store calls, then a mirror refresh.
//!
//! Every operation that reaches the store ends with a full refresh, whether
//! its own store calls succeeded or not. The refresh outcome is reported on
//! its own through the mirror's error events; the returned result describes
//! only the mutation.
//!
//! Increment and decrement read the document and then write the new
//! quantity. Under [`UpdateStrategy::ReadModifyWrite`] nothing guards the gap
//! between the two calls, so concurrent adjustments of one key can lose
//! updates. [`UpdateStrategy::Conditional`] closes the gap with revision-checked
//! writes.

use crate::error::{EngineError, EngineResult};
use crate::mirror::LocalMirror;
use crate::remote::{document, Precondition, RemoteStore, StoredDocument, Write};
use crate::subscriptions::SubscriptionManager;
use crate::types::{normalize_name, ItemDraft, ItemId, ValidDraft};
use std::sync::Arc;
use tracing::{debug, warn};

/// How keys for new items are chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The store allocates an opaque key.
    #[default]
    Generated,
    /// The key is the item's normalized name.
    NormalizedName,
}

/// How increment and decrement write back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Plain read then write; concurrent adjustments may lose updates.
    #[default]
    ReadModifyWrite,
    /// Revision-checked write, re-read and retried when another writer won.
    Conditional,
}

/// Settings the applier needs.
#[derive(Clone, Debug)]
pub struct MutationPolicy {
    pub default_category: String,
    pub key_strategy: KeyStrategy,
    pub update_strategy: UpdateStrategy,
    /// Extra attempts for a conditional write after the first one loses.
    pub max_conflict_retries: u32,
}

/// What a mutation did at the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationEffect {
    /// A new document was written.
    Created { id: ItemId },
    /// An existing document was fully replaced.
    Replaced { id: ItemId },
    /// An edited item was merged into its document.
    Updated { id: ItemId },
    /// The item was deleted on request.
    Deleted { id: ItemId },
    /// The quantity was changed.
    Adjusted { id: ItemId, quantity: u64 },
    /// A decrement reached zero and removed the item.
    Removed { id: ItemId },
    /// Nothing to do (decrement of an absent key).
    Unchanged { id: ItemId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Adjustment {
    Increment,
    Decrement,
}

impl Adjustment {
    fn op(self) -> &'static str {
        match self {
            Adjustment::Increment => "increment",
            Adjustment::Decrement => "decrement",
        }
    }
}

/// A write to issue and the effect it has once applied.
struct Plan {
    write: Option<Write>,
    effect: MutationEffect,
}

/// Translates intents into store calls.
pub struct MutationApplier {
    store: Arc<dyn RemoteStore>,
    mirror: Arc<LocalMirror>,
    events: Arc<SubscriptionManager>,
    policy: MutationPolicy,
}

impl MutationApplier {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        mirror: Arc<LocalMirror>,
        events: Arc<SubscriptionManager>,
        policy: MutationPolicy,
    ) -> Self {
        Self {
            store,
            mirror,
            events,
            policy,
        }
    }

    pub fn policy(&self) -> &MutationPolicy {
        &self.policy
    }

    /// Key an item with this name is stored under in the keyed-by-name layout.
    pub fn key_for_name(&self, name: &str) -> ItemId {
        ItemId(normalize_name(name))
    }

    /// Save a draft: merge into the edited item, or write a new one.
    ///
    /// A blank name is rejected before any store call and without a refresh.
    pub async fn create_or_replace(&self, draft: &ItemDraft) -> EngineResult<MutationEffect> {
        let draft = draft.validate(&self.policy.default_category)?;
        let outcome = self.save(&draft).await;
        self.settle("create_or_replace", outcome).await
    }

    /// Delete an item present in the current snapshot.
    pub async fn delete_item(&self, id: &ItemId) -> EngineResult<MutationEffect> {
        if !self.mirror.current().contains(id) {
            return Err(EngineError::UnknownItem(id.clone()));
        }

        debug!(key = %id, "delete_by_key");
        let outcome = self
            .store
            .delete_by_key(id)
            .await
            .map(|_| MutationEffect::Deleted { id: id.clone() })
            .map_err(|e| EngineError::store("delete_by_key", e));
        self.settle("delete_item", outcome).await
    }

    /// Add one unit, creating the item with quantity 1 if it is absent.
    pub async fn increment(&self, key: &ItemId) -> EngineResult<MutationEffect> {
        let outcome = self.adjust(Adjustment::Increment, key).await;
        self.settle("increment", outcome).await
    }

    /// Remove one unit, deleting the item when it would drop below 1.
    pub async fn decrement(&self, key: &ItemId) -> EngineResult<MutationEffect> {
        let outcome = self.adjust(Adjustment::Decrement, key).await;
        self.settle("decrement", outcome).await
    }

    /// Report a failed mutation, then refresh regardless of the outcome.
    async fn settle(
        &self,
        op: &'static str,
        outcome: EngineResult<MutationEffect>,
    ) -> EngineResult<MutationEffect> {
        if let Err(err) = &outcome {
            warn!(op, error = %err, "mutation failed");
            self.events.broadcast_error(err);
        }

        // The mirror broadcasts its own failure.
        if let Err(err) = self.mirror.refresh().await {
            debug!(op, error = %err, "refresh after mutation failed");
        }

        outcome
    }

    async fn save(&self, draft: &ValidDraft) -> EngineResult<MutationEffect> {
        let fields = document::encode_draft(draft);

        if let Some(id) = &draft.editing {
            debug!(key = %id, "merge_update");
            self.store
                .merge_update(id, fields)
                .await
                .map_err(|e| EngineError::store("merge_update", e))?;
            return Ok(MutationEffect::Updated { id: id.clone() });
        }

        let (id, existed) = match self.policy.key_strategy {
            KeyStrategy::Generated => (self.store.allocate_key(), false),
            KeyStrategy::NormalizedName => {
                let id = self.key_for_name(&draft.name);
                let existed = self.mirror.current().contains(&id);
                (id, existed)
            }
        };

        debug!(key = %id, "put");
        self.store
            .put(&id, fields)
            .await
            .map_err(|e| EngineError::store("put", e))?;

        Ok(if existed {
            MutationEffect::Replaced { id }
        } else {
            MutationEffect::Created { id }
        })
    }

    async fn adjust(&self, adjustment: Adjustment, key: &ItemId) -> EngineResult<MutationEffect> {
        match self.policy.update_strategy {
            UpdateStrategy::ReadModifyWrite => {
                let existing = self.read(key).await?;
                let plan = self.plan(adjustment, key, existing.as_ref())?;
                if let Some(write) = plan.write {
                    self.write(key, write).await?;
                }
                Ok(plan.effect)
            }
            UpdateStrategy::Conditional => self.adjust_conditional(adjustment, key).await,
        }
    }

    async fn adjust_conditional(
        &self,
        adjustment: Adjustment,
        key: &ItemId,
    ) -> EngineResult<MutationEffect> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let existing = self.read(key).await?;
            let precondition = match &existing {
                Some(doc) => Precondition::Revision(doc.revision),
                None => Precondition::Absent,
            };
            let plan = self.plan(adjustment, key, existing.as_ref())?;
            let Some(write) = plan.write else {
                return Ok(plan.effect);
            };

            debug!(key = %key, ?precondition, "write_if");
            let applied = self
                .store
                .write_if(key, precondition, write)
                .await
                .map_err(|e| EngineError::store("write_if", e))?;
            if applied {
                return Ok(plan.effect);
            }

            debug!(key = %key, attempts, op = adjustment.op(), "conditional write lost, retrying");
            if attempts > self.policy.max_conflict_retries {
                return Err(EngineError::Conflict {
                    id: key.clone(),
                    attempts,
                });
            }
        }
    }

    async fn read(&self, key: &ItemId) -> EngineResult<Option<StoredDocument>> {
        debug!(key = %key, "get_by_key");
        self.store
            .get_by_key(key)
            .await
            .map_err(|e| EngineError::store("get_by_key", e))
    }

    async fn write(&self, key: &ItemId, write: Write) -> EngineResult<()> {
        match write {
            Write::Put(fields) => {
                debug!(key = %key, "put");
                self.store
                    .put(key, fields)
                    .await
                    .map_err(|e| EngineError::store("put", e))
            }
            Write::Merge(patch) => {
                debug!(key = %key, "merge_update");
                self.store
                    .merge_update(key, patch)
                    .await
                    .map_err(|e| EngineError::store("merge_update", e))
            }
            Write::Delete => {
                debug!(key = %key, "delete_by_key");
                self.store
                    .delete_by_key(key)
                    .await
                    .map_err(|e| EngineError::store("delete_by_key", e))
            }
        }
    }

    fn plan(
        &self,
        adjustment: Adjustment,
        key: &ItemId,
        existing: Option<&StoredDocument>,
    ) -> EngineResult<Plan> {
        let id = key.clone();
        let Some(doc) = existing else {
            return Ok(match adjustment {
                Adjustment::Increment => Plan {
                    write: Some(Write::Put(document::first_unit(
                        key,
                        &self.policy.default_category,
                    ))),
                    effect: MutationEffect::Created { id },
                },
                Adjustment::Decrement => Plan {
                    write: None,
                    effect: MutationEffect::Unchanged { id },
                },
            });
        };

        let quantity =
            document::quantity_of(doc).map_err(|source| EngineError::MalformedDocument {
                id: key.clone(),
                source,
            })?;

        Ok(match adjustment {
            Adjustment::Increment => {
                let quantity = quantity.saturating_add(1);
                Plan {
                    write: Some(Write::Merge(document::quantity_patch(quantity))),
                    effect: MutationEffect::Adjusted { id, quantity },
                }
            }
            Adjustment::Decrement if quantity <= 1 => Plan {
                write: Some(Write::Delete),
                effect: MutationEffect::Removed { id },
            },
            Adjustment::Decrement => {
                let quantity = quantity - 1;
                Plan {
                    write: Some(Write::Merge(document::quantity_patch(quantity))),
                    effect: MutationEffect::Adjusted { id, quantity },
                }
            }
        })
    }
}
