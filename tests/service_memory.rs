//! Data Service Behaviour Tests
//!
//! Exercises every service operation against the in-memory table backend
//! and local file storage:
//! - create echoes its input plus an id
//! - reads page, count, order and filter conjunctively
//! - targeted writes on missing ids fail
//! - batch updates report the rows that failed and stay within the
//!   concurrency limit
//! - uploads never overwrite
//! - the current user carries the role from its profile row

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use dfs_portal::backend::{Selection, TableBackend};
use dfs_portal::query::{Predicate, SelectQuery};

use dfs_portal::query::{Filter, ReadOptions};
use dfs_portal::schema::{
    DeliveryRecordPatch, DeliveryRecords, ProductInsert, ProductPatch, Products, StationPatch,
    Stations, Table, UserProfileInsert, UserProfiles,
};
use dfs_portal::service::{DataService, OperationResult, ServiceOptions};
use dfs_portal::auth::{Credentials, DEFAULT_ROLE};
use dfs_portal::{DataError, DataResult, LocalStorage, MemoryAuth, MemoryBackend};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_service() -> (TempDir, DataService<MemoryBackend, LocalStorage>) {
    let tmp = TempDir::new().unwrap();
    let files = LocalStorage::new(tmp.path().to_path_buf(), "http://localhost:54321/files");
    let options = ServiceOptions {
        batch_concurrency: 3,
        ..ServiceOptions::default()
    };
    (tmp, DataService::new(MemoryBackend::new(), files, options))
}

fn product(name: &str, category: &str, price: f64) -> ProductInsert {
    ProductInsert {
        product_name: name.to_string(),
        category: category.to_string(),
        price,
        ..Default::default()
    }
}

/// Twelve products whose prices are deliberately out of id order
/// Memory backend that tracks how many updates overlap
#[derive(Default)]
struct CountingBackend {
    inner: MemoryBackend,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl TableBackend for CountingBackend {
    async fn select(&self, query: &SelectQuery) -> DataResult<Selection> {
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> DataResult<Vec<Value>> {
        self.inner.insert(table, rows).await
    }

    async fn update(&self, table: &str, predicates: &[Predicate], patch: Value) -> DataResult<Vec<Value>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let result = self.inner.update(table, predicates, patch).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn delete(&self, table: &str, predicates: &[Predicate]) -> DataResult<Vec<Value>> {
        self.inner.delete(table, predicates).await
    }

    async fn rpc(&self, function: &str, args: Value) -> DataResult<Value> {
        self.inner.rpc(function, args).await
    }
}

async fn seed_products(service: &DataService<MemoryBackend, LocalStorage>) {
    let prices = [4.0, 11.0, 1.0, 9.0, 6.0, 12.0, 2.0, 8.0, 5.0, 10.0, 3.0, 7.0];
    let rows: Vec<ProductInsert> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let category = if i % 2 == 0 { "Snacks" } else { "Drinks" };
            product(&format!("Item {}", price), category, *price)
        })
        .collect();
    let created = service.batch_create::<Products>(&rows).await.unwrap();
    assert_eq!(created.len(), 12);
}

// =============================================================================
// Create / Read
// =============================================================================

/// The created row carries the input's fields plus a fresh id.
#[tokio::test]
async fn test_create_returns_input_fields() {
    let (_tmp, service) = setup_service();

    let patch = DeliveryRecordPatch {
        delivery_date: Some("2024-06-01".into()),
        station: Some("MOBIL".into()),
        regular_delivered: Some(4500.0),
        bol_number: Some("BOL-1182".into()),
        ..Default::default()
    };
    let row = service.create::<DeliveryRecords>(&patch).await.unwrap();

    assert!(row.id > 0);
    assert_eq!(row.delivery_date, "2024-06-01");
    assert_eq!(row.station, "MOBIL");
    assert_eq!(row.regular_delivered, 4500.0);
    assert_eq!(row.bol_number, "BOL-1182");
}

/// Unfiltered read returns min(P, N) rows and count N.
#[tokio::test]
async fn test_read_returns_page_and_total() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    for page_size in [1, 5, 12, 20] {
        let options = ReadOptions::new().page(1, page_size);
        let page = service.read::<Products>(&options).await.unwrap();
        assert_eq!(page.len(), page_size.min(12));
        assert_eq!(page.count, 12);
    }
}

/// Page 2 of 5 by ascending price is ranks 6 to 10.
#[tokio::test]
async fn test_read_second_page_by_price() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let options = ReadOptions::new().page(2, 5).order_by("price", true);
    let page = service.read::<Products>(&options).await.unwrap();

    let prices: Vec<f64> = page.data.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
    assert_eq!(page.count, 12);
}

/// Default order is newest id first.
#[tokio::test]
async fn test_read_default_order_is_id_descending() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let page = service.read::<Products>(&ReadOptions::default()).await.unwrap();
    let ids: Vec<i64> = page.data.iter().map(|p| p.id).collect();
    assert_eq!(ids, (3..=12).rev().collect::<Vec<i64>>());
}

/// Filters are combined with AND.
#[tokio::test]
async fn test_filters_are_conjunctive() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let snacks = ReadOptions::new()
        .page(1, 50)
        .filter(Filter::eq("category", "Snacks"));
    let page = service.read::<Products>(&snacks).await.unwrap();
    assert_eq!(page.count, 6);
    assert!(page.data.iter().all(|p| p.category == "Snacks"));

    let cheap_snacks = snacks.filter(Filter::lt("price", 5));
    let page = service.read::<Products>(&cheap_snacks).await.unwrap();
    assert!(page.count > 0 && page.count < 6);
    assert!(page
        .data
        .iter()
        .all(|p| p.category == "Snacks" && p.price < 5.0));
}

/// Unrecognized operators behave as equality.
#[tokio::test]
async fn test_unknown_operator_falls_back_to_eq() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let options = ReadOptions::new().filter(Filter::from_parts("category", "equals", "Drinks"));
    let page = service.read::<Products>(&options).await.unwrap();
    assert_eq!(page.count, 6);
    assert!(page.data.iter().all(|p| p.category == "Drinks"));
}

/// like is case-sensitive, ilike is not.
#[tokio::test]
async fn test_like_and_ilike() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let like = ReadOptions::new().filter(Filter::like("product_name", "item"));
    assert_eq!(service.read::<Products>(&like).await.unwrap().count, 0);

    let ilike = ReadOptions::new().filter(Filter::ilike("product_name", "item 1"));
    // Item 1, Item 10, Item 11, Item 12
    assert_eq!(service.read::<Products>(&ilike).await.unwrap().count, 4);
}

/// Narrowed selects still decode into rows.
#[tokio::test]
async fn test_select_subset_of_columns() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let options = ReadOptions::new().page(1, 3).select("id, price");
    let page = service.read::<Products>(&options).await.unwrap();
    assert_eq!(page.len(), 3);
    assert!(page.data.iter().all(|p| p.product_name.is_empty() && p.price > 0.0));
}

#[tokio::test]
async fn test_invalid_reads_are_rejected() {
    let (_tmp, service) = setup_service();

    let zero_page = ReadOptions::new().page(0, 10);
    assert!(matches!(
        service.read::<Products>(&zero_page).await,
        Err(DataError::InvalidPage(_))
    ));

    let huge_page = ReadOptions::new().page(usize::MAX, 2);
    assert!(matches!(
        service.read::<Products>(&huge_page).await,
        Err(DataError::InvalidPage(_))
    ));

    let bad_order = ReadOptions::new().order_by("nope", true);
    assert!(matches!(
        service.read::<Products>(&bad_order).await,
        Err(DataError::UnknownColumn { .. })
    ));
}

// =============================================================================
// Update / Delete
// =============================================================================

#[tokio::test]
async fn test_update_changes_only_given_fields() {
    let (_tmp, service) = setup_service();
    let created = service
        .create::<Stations>(&StationPatch {
            station_name: Some("MOBIL".into()),
            address: Some("1 Main St".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let patch = StationPatch {
        status: Some("Inactive".into()),
        ..Default::default()
    };
    let updated = service.update::<Stations>(created.id, &patch).await.unwrap();
    assert_eq!(updated.status, "Inactive");
    assert_eq!(updated.address, "1 Main St");
    assert_eq!(updated.id, created.id);
}

/// No fabricated success for a missing id.
#[tokio::test]
async fn test_update_nonexistent_id_fails() {
    let (_tmp, service) = setup_service();
    let result = service
        .update::<Products>(404, &ProductPatch::default())
        .await;
    assert!(matches!(result, Err(DataError::NotFound { id: 404, .. })));
}

#[tokio::test]
async fn test_delete_then_delete_again() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    service.delete::<Products>(3).await.unwrap();
    assert_eq!(service.tables().row_count(Products::NAME), 11);
    assert!(matches!(
        service.delete::<Products>(3).await,
        Err(DataError::NotFound { .. })
    ));
}

// =============================================================================
// Batch Operations
// =============================================================================

#[tokio::test]
async fn test_batch_update_all_succeed() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let updates: Vec<(i64, ProductPatch)> = (1..=12)
        .map(|id| {
            (
                id,
                ProductPatch {
                    overdue: Some(true),
                    ..Default::default()
                },
            )
        })
        .collect();
    let rows = service.batch_update::<Products>(&updates).await.unwrap();

    assert_eq!(rows.len(), 12);
    // Results come back in input order
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), (1..=12).collect::<Vec<i64>>());
    assert!(rows.iter().all(|r| r.overdue));
}

/// One failing update fails the call and names that failure; the rest still apply.
#[tokio::test]
async fn test_batch_update_with_one_failure() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let patch = ProductPatch {
        supplier: Some("McLane".into()),
        ..Default::default()
    };
    let updates = vec![(1, patch.clone()), (99, patch.clone()), (2, patch)];
    let err = service.batch_update::<Products>(&updates).await.unwrap_err();

    match &err {
        DataError::Batch { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].id, 99);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(err.to_string().contains("No row with id 99 in products"));

    let envelope: OperationResult<Vec<()>> = Err(err).into();
    assert_eq!(envelope.data, None);
    assert!(envelope.error.unwrap().contains("id 99"));

    let row = service.tables().row(Products::NAME, 2).unwrap();
    assert_eq!(row["supplier"], json!("McLane"));
}

/// Never more than `batch_concurrency` updates reach the backend at once.
#[tokio::test]
async fn test_batch_update_respects_concurrency_limit() {
    let tmp = TempDir::new().unwrap();
    let files = LocalStorage::new(tmp.path().to_path_buf(), "http://localhost:54321/files");
    let options = ServiceOptions {
        batch_concurrency: 3,
        ..ServiceOptions::default()
    };
    let service = DataService::new(CountingBackend::default(), files, options);

    let rows: Vec<ProductInsert> = (0..12).map(|i| product(&format!("Item {}", i), "Snacks", 1.0)).collect();
    service.batch_create::<Products>(&rows).await.unwrap();

    let updates: Vec<(i64, ProductPatch)> = (1..=12)
        .map(|id| {
            (
                id,
                ProductPatch {
                    price: Some(2.0),
                    ..Default::default()
                },
            )
        })
        .collect();
    let updated = service.batch_update::<Products>(&updates).await.unwrap();
    assert_eq!(updated.len(), 12);

    let backend = service.tables();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 12);
    let peak = backend.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "{} updates were in flight", peak);
    assert!(peak > 1, "updates never overlapped");
}

#[tokio::test]
async fn test_batch_delete_counts_removed_rows() {
    let (_tmp, service) = setup_service();
    seed_products(&service).await;

    let removed = service
        .batch_delete::<Products>(&[1, 2, 3, 500])
        .await
        .unwrap();
    assert_eq!(removed, 3);
    assert_eq!(service.tables().row_count(Products::NAME), 9);
}

#[tokio::test]
async fn test_rpc_dispatches_to_registered_function() {
    let (_tmp, service) = setup_service();
    service
        .tables()
        .register_function("double", |args| {
            let n = args["n"].as_i64().unwrap_or(0);
            Ok(json!({ "result": n * 2 }))
        })
        .unwrap();

    let value = service.rpc("double", json!({"n": 21})).await.unwrap();
    assert_eq!(value, json!({"result": 42}));

    let missing = service.rpc("nope", json!({})).await;
    assert!(matches!(missing, Err(DataError::Remote { status: 404, .. })));
}

// =============================================================================
// Files
// =============================================================================

/// Uploading the same bucket and path twice fails the second time.
#[tokio::test]
async fn test_second_upload_fails() {
    let (_tmp, service) = setup_service();

    let first = service
        .upload_file("dfs-manager-files", "reports/2024-06-01.pdf", b"%PDF".to_vec())
        .await
        .unwrap();
    assert_eq!(first.full_path, "dfs-manager-files/reports/2024-06-01.pdf");

    let second = service
        .upload_file("dfs-manager-files", "reports/2024-06-01.pdf", b"%PDF-2".to_vec())
        .await;
    assert!(matches!(second, Err(DataError::AlreadyExists(_))));

    let meta = service
        .files()
        .metadata("dfs-manager-files", "reports/2024-06-01.pdf")
        .unwrap();
    assert_eq!(meta.size, 4);
    assert_eq!(meta.cache_control, "max-age=3600");
}

#[tokio::test]
async fn test_file_url_and_delete() {
    let (_tmp, service) = setup_service();

    assert_eq!(
        service.file_url("dfs-manager-files", "never/uploaded.png"),
        "http://localhost:54321/files/dfs-manager-files/never/uploaded.png"
    );

    service
        .upload_file("dfs-manager-files", "ids/7.png", vec![0x89, b'P', b'N', b'G'])
        .await
        .unwrap();
    let removed = service
        .delete_files("dfs-manager-files", &["ids/7.png".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, 1);

    // Path is free again
    service
        .upload_file("dfs-manager-files", "ids/7.png", vec![1])
        .await
        .unwrap();
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_register_then_current_user_with_profile() {
    let (_tmp, service) = setup_service();
    let auth = MemoryAuth::new();

    let registration = service
        .register(&auth, &Credentials::new("manager@dfs.example", "s3cret!"))
        .await
        .unwrap();
    let token = registration.session.unwrap().access_token;

    let profile = UserProfileInsert {
        user_id: registration.user.id.clone(),
        role: "Administrator".into(),
        station: "MOBIL".into(),
        is_active: true,
        ..Default::default()
    };
    service.batch_create::<UserProfiles>(&[profile]).await.unwrap();

    let user = service.current_user(&auth, &token).await.unwrap();
    assert_eq!(user.id, registration.user.id);
    assert_eq!(user.email.as_deref(), Some("manager@dfs.example"));
    assert_eq!(user.role, "Administrator");
    assert_eq!(user.profile.unwrap().station, "MOBIL");
}

/// No profile row is not an error: the account falls back to the default role.
#[tokio::test]
async fn test_current_user_without_profile() {
    let (_tmp, service) = setup_service();
    let auth = MemoryAuth::new();
    let registration = service
        .register(&auth, &Credentials::new("clerk@dfs.example", "s3cret!"))
        .await
        .unwrap();

    let user = service
        .current_user(&auth, &registration.session.unwrap().access_token)
        .await
        .unwrap();
    assert_eq!(user.role, DEFAULT_ROLE);
    assert!(user.profile.is_none());
}

#[tokio::test]
async fn test_current_user_requires_token() {
    let (_tmp, service) = setup_service();
    let auth = MemoryAuth::new();

    let err = service.current_user(&auth, "  ").await.unwrap_err();
    assert!(matches!(err, DataError::NotAuthenticated));
    assert_eq!(err.to_string(), "User not authenticated");

    let envelope: OperationResult<()> = Err(err).into();
    assert_eq!(envelope.error.as_deref(), Some("User not authenticated"));

    let forged = service.current_user(&auth, "forged").await;
    assert!(matches!(forged, Err(DataError::Remote { status: 403, .. })));
}

#[tokio::test]
async fn test_register_duplicate_email_fails() {
    let (_tmp, service) = setup_service();
    let auth = MemoryAuth::new();
    let credentials = Credentials::new("ana@dfs.example", "s3cret!");

    service.register(&auth, &credentials).await.unwrap();
    let err = service.register(&auth, &credentials).await.unwrap_err();
    assert_eq!(err.status_code(), 422);
}
