//! Integration tests for the inventory engine.

use pantry::{
    EngineConfig, EngineEvent, FileStore, FileStoreConfig, InMemoryStore, Inventory, ItemDraft,
    ItemId, KeyStrategy, MutationEffect, StoreOp, SubscriptionConfig, SubscriptionFilter,
    DEFAULT_CATEGORY,
};
use std::sync::Arc;
use tempfile::TempDir;

fn engine() -> (Inventory, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let inventory = Inventory::new(store.clone(), EngineConfig::default());
    (inventory, store)
}

fn created_id(effect: MutationEffect) -> ItemId {
    match effect {
        MutationEffect::Created { id } => id,
        other => panic!("Expected Created, got {:?}", other),
    }
}

// --- Mirror ---

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (inventory, _store) = engine();
    inventory
        .create_or_replace(&ItemDraft::new("Apples", "Produce", 5))
        .await
        .unwrap();
    inventory
        .create_or_replace(&ItemDraft::new("Beans", "Canned", 2))
        .await
        .unwrap();

    let first = inventory.refresh().await.unwrap();
    let second = inventory.refresh().await.unwrap();
    assert_eq!(first.items(), second.items());
    assert!(second.version() > first.version());
}

#[tokio::test]
async fn test_load_reads_existing_collection() {
    let (inventory, store) = engine();
    store.insert(
        "seed",
        serde_json::json!({"name": "Flour", "category": "Baking", "quantity": 3})
            .as_object()
            .cloned()
            .unwrap(),
    );

    assert!(inventory.snapshot().is_empty());
    let snapshot = inventory.load().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.items()[0].name, "Flour");
}

// --- Create / edit ---

#[tokio::test]
async fn test_create_round_trip() {
    let (inventory, _store) = engine();
    inventory
        .create_or_replace(&ItemDraft::new("Apples", "Produce", 5))
        .await
        .unwrap();

    let snapshot = inventory.refresh().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    let item = &snapshot.items()[0];
    assert_eq!(item.name, "Apples");
    assert_eq!(item.category, "Produce");
    assert_eq!(item.quantity, 5);
}

#[tokio::test]
async fn test_blank_category_defaults() {
    let (inventory, _store) = engine();
    let id = created_id(
        inventory
            .create_or_replace(&ItemDraft::new("Widget", "", 1))
            .await
            .unwrap(),
    );

    let snapshot = inventory.snapshot();
    assert_eq!(snapshot.get(&id).unwrap().category, DEFAULT_CATEGORY);
}

#[tokio::test]
async fn test_mutation_refreshes_mirror() {
    let (inventory, store) = engine();
    inventory
        .create_or_replace(&ItemDraft::new("Apples", "Produce", 5))
        .await
        .unwrap();

    // One put, one full listing; no explicit refresh needed to see the item.
    assert_eq!(store.calls(StoreOp::Put), 1);
    assert_eq!(store.calls(StoreOp::ListAll), 1);
    assert_eq!(inventory.snapshot().len(), 1);
}

#[tokio::test]
async fn test_edit_merges_into_same_item() {
    let (inventory, _store) = engine();
    let id = created_id(
        inventory
            .create_or_replace(
                &ItemDraft::new("Apples", "Produce", 5).with_image("data:image/png;base64,AAAA"),
            )
            .await
            .unwrap(),
    );

    let mut draft = ItemDraft::from_record(inventory.snapshot().get(&id).unwrap());
    draft.quantity = 8;
    draft.category = "Fruit".into();
    draft.image = None;
    let effect = inventory.create_or_replace(&draft).await.unwrap();
    assert_eq!(effect, MutationEffect::Updated { id: id.clone() });

    let snapshot = inventory.snapshot();
    assert_eq!(snapshot.len(), 1);
    let item = snapshot.get(&id).unwrap();
    assert_eq!(item.quantity, 8);
    assert_eq!(item.category, "Fruit");
    // Edits without an image leave the stored one alone.
    assert_eq!(item.image.as_deref(), Some("data:image/png;base64,AAAA"));
}

#[tokio::test]
async fn test_keyed_by_name_replaces_existing() {
    let store = Arc::new(InMemoryStore::new());
    let inventory = Inventory::new(
        store.clone(),
        EngineConfig {
            key_strategy: KeyStrategy::NormalizedName,
            ..Default::default()
        },
    );

    let effect = inventory
        .create_or_replace(&ItemDraft::new("Green Apples", "Produce", 5))
        .await
        .unwrap();
    assert_eq!(
        effect,
        MutationEffect::Created {
            id: ItemId::from("green apples")
        }
    );

    let effect = inventory
        .create_or_replace(&ItemDraft::new("  green   APPLES ", "Produce", 9))
        .await
        .unwrap();
    assert_eq!(
        effect,
        MutationEffect::Replaced {
            id: ItemId::from("green apples")
        }
    );

    let snapshot = inventory.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.items()[0].quantity, 9);
    assert_eq!(inventory.key_for_name("Green Apples"), ItemId::from("green apples"));
}

// --- Delete ---

#[tokio::test]
async fn test_delete_item() {
    let (inventory, _store) = engine();
    let id = created_id(
        inventory
            .create_or_replace(&ItemDraft::new("Apples", "Produce", 5))
            .await
            .unwrap(),
    );

    let effect = inventory.delete_item(&id).await.unwrap();
    assert_eq!(effect, MutationEffect::Deleted { id: id.clone() });
    assert!(!inventory.snapshot().contains(&id));
}

// --- Increment / decrement ---

#[tokio::test]
async fn test_increment_absent_key_creates_one() {
    let (inventory, _store) = engine();
    let key = ItemId::from("newkey");

    let effect = inventory.increment(&key).await.unwrap();
    assert_eq!(effect, MutationEffect::Created { id: key.clone() });

    let snapshot = inventory.snapshot();
    let item = snapshot.get(&key).unwrap();
    assert_eq!(item.quantity, 1);
    assert_eq!(item.name, "newkey");
    assert_eq!(item.category, DEFAULT_CATEGORY);
}

#[tokio::test]
async fn test_increment_then_decrement() {
    let (inventory, _store) = engine();
    let key = ItemId::from("tea");

    inventory.increment(&key).await.unwrap();
    inventory.increment(&key).await.unwrap();
    inventory.increment(&key).await.unwrap();
    assert_eq!(inventory.snapshot().get(&key).unwrap().quantity, 3);

    let effect = inventory.decrement(&key).await.unwrap();
    assert_eq!(
        effect,
        MutationEffect::Adjusted {
            id: key.clone(),
            quantity: 2
        }
    );
    assert_eq!(inventory.snapshot().get(&key).unwrap().quantity, 2);
}

#[tokio::test]
async fn test_decrement_to_zero_removes() {
    let (inventory, _store) = engine();
    let key = ItemId::from("last-one");
    inventory.increment(&key).await.unwrap();
    assert_eq!(inventory.snapshot().get(&key).unwrap().quantity, 1);

    let effect = inventory.decrement(&key).await.unwrap();
    assert_eq!(effect, MutationEffect::Removed { id: key.clone() });
    assert!(!inventory.snapshot().contains(&key));
}

#[tokio::test]
async fn test_decrement_zero_quantity_item_removes() {
    let (inventory, _store) = engine();
    let id = created_id(
        inventory
            .create_or_replace(&ItemDraft::new("Empty jar", "Misc", 0))
            .await
            .unwrap(),
    );

    let effect = inventory.decrement(&id).await.unwrap();
    assert_eq!(effect, MutationEffect::Removed { id: id.clone() });
    assert!(inventory.snapshot().is_empty());
}

// --- Aggregates ---

#[tokio::test]
async fn test_category_aggregation_first_seen_order() {
    let (inventory, _store) = engine();
    for (name, category, quantity) in [("a", "A", 2), ("b", "B", 3), ("c", "A", 1)] {
        inventory
            .create_or_replace(&ItemDraft::new(name, category, quantity))
            .await
            .unwrap();
    }

    let totals: Vec<(String, u64)> = inventory
        .by_category()
        .into_iter()
        .map(|t| (t.category, t.total))
        .collect();
    assert_eq!(totals, vec![("A".to_string(), 3), ("B".to_string(), 3)]);

    let items: Vec<(String, u64)> = inventory
        .by_item()
        .into_iter()
        .map(|i| (i.name, i.quantity))
        .collect();
    assert_eq!(
        items,
        vec![
            ("a".to_string(), 2),
            ("b".to_string(), 3),
            ("c".to_string(), 1)
        ]
    );
    assert_eq!(inventory.snapshot().total_quantity(), 6);
}

// --- Notifications ---

#[tokio::test]
async fn test_snapshot_event_after_each_mutation() {
    let (inventory, _store) = engine();
    let handle = inventory.subscribe(SubscriptionConfig {
        filter: SubscriptionFilter::snapshots(),
        ..Default::default()
    });

    inventory
        .create_or_replace(&ItemDraft::new("Apples", "Produce", 5))
        .await
        .unwrap();
    inventory.increment(&ItemId::from("pears")).await.unwrap();

    let sizes: Vec<usize> = handle
        .drain()
        .into_iter()
        .map(|event| match event {
            EngineEvent::SnapshotChanged { snapshot } => snapshot.len(),
            other => panic!("Expected SnapshotChanged, got {:?}", other),
        })
        .collect();
    assert_eq!(sizes, vec![1, 2]);
}

// --- File-backed store ---

#[tokio::test]
async fn test_engine_over_file_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = FileStoreConfig {
        path: dir.path().join("pantry"),
        ..Default::default()
    };

    {
        let store = Arc::new(FileStore::open_or_create(config.clone()).unwrap());
        let inventory = Inventory::new(store, EngineConfig::default());
        inventory
            .create_or_replace(&ItemDraft::new("Oats", "Grains", 4))
            .await
            .unwrap();
        inventory.increment(&ItemId::from("honey")).await.unwrap();
    }

    let store = Arc::new(FileStore::open_or_create(config).unwrap());
    let inventory = Inventory::new(store, EngineConfig::default());
    let snapshot = inventory.load().await.unwrap();

    let names: Vec<&str> = snapshot.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Oats", "honey"]);
}
