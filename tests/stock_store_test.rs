mod common;

use std::collections::BTreeMap;

use common::harness;
use stockledger::services::stock::StockWrite;

#[tokio::test]
async fn negative_quantities_are_clamped_to_zero() {
    let h = harness().await;
    h.add_item(1);
    h.add_store(10, "Downtown");

    let mut writes = BTreeMap::new();
    writes.insert(
        10,
        StockWrite {
            quantity: -5,
            low_stock_threshold: None,
        },
    );
    let result = h
        .system
        .stock
        .save_item_stock(1, writes, "admin")
        .await
        .unwrap();

    assert_eq!(result.locations[0].quantity, 0);
    assert_eq!(h.system.stock_store.sum(1).await.unwrap(), 0);
}

#[tokio::test]
async fn upsert_is_one_row_per_pair() {
    let h = harness().await;
    h.add_item(2);
    h.add_store(10, "Downtown");

    h.system.stock_store.upsert(2, 10, 4, None).await.unwrap();
    let second = h.system.stock_store.upsert(2, 10, 9, Some(3)).await.unwrap();

    assert!(!second.created);
    assert_eq!(second.previous_quantity, 4);

    let levels = h.system.stock_store.get_all(2).await.unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[&10].quantity, 9);
    assert_eq!(levels[&10].low_stock_threshold, Some(3));
}

#[tokio::test]
async fn get_all_orders_by_location_id_ascending() {
    let h = harness().await;
    h.add_item(3);

    h.system.stock_store.upsert(3, 30, 1, None).await.unwrap();
    h.system.stock_store.upsert(3, 10, 2, None).await.unwrap();
    h.system.stock_store.upsert(3, 20, 3, None).await.unwrap();

    let keys: Vec<i32> = h.system.stock_store.get_all(3).await.unwrap().keys().copied().collect();
    assert_eq!(keys, vec![10, 20, 30]);
}

#[tokio::test]
async fn sum_treats_absent_rows_as_zero() {
    let h = harness().await;
    assert_eq!(h.system.stock_store.sum(404).await.unwrap(), 0);
    assert_eq!(h.system.stock_store.sum_many(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn write_against_unknown_location_creates_orphan_row() {
    // Referential gaps are no-ops, not errors: the row lands and the next
    // lifecycle pass cleans it up.
    let h = harness().await;
    h.add_item(4);

    let outcome = h.system.stock_store.upsert(4, 999, 7, None).await.unwrap();
    assert!(outcome.created);
    assert_eq!(h.system.stock_store.sum(4).await.unwrap(), 7);
}

#[tokio::test]
async fn low_stock_levels_use_row_threshold_then_global_default() {
    let h = harness().await;
    h.add_item(5);
    h.add_store(10, "Downtown");
    h.add_store(20, "Uptown");
    h.add_store(30, "Airport");

    let mut writes = BTreeMap::new();
    // Own threshold 5, quantity 4: low
    writes.insert(
        10,
        StockWrite {
            quantity: 4,
            low_stock_threshold: Some(5),
        },
    );
    // Global default threshold (2), quantity 1: low
    writes.insert(
        20,
        StockWrite {
            quantity: 1,
            low_stock_threshold: None,
        },
    );
    // Global default threshold (2), quantity 8: fine
    writes.insert(
        30,
        StockWrite {
            quantity: 8,
            low_stock_threshold: None,
        },
    );
    h.system
        .stock
        .save_item_stock(5, writes, "admin")
        .await
        .unwrap();

    let low = h.system.stock.low_stock_levels(5).await.unwrap();
    let ids: Vec<i32> = low.iter().map(|l| l.location_id).collect();
    assert_eq!(ids, vec![10, 20]);
    assert_eq!(low[0].effective_threshold, 5);
    assert_eq!(low[1].effective_threshold, 2);
}
