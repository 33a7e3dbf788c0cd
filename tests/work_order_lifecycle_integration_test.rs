//! Integration tests for the work order lifecycle against in-memory SQLite.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::TestApp;
use serde_json::json;
use std::collections::HashSet;
use tokio::task::JoinSet;
use workorder_ledger::{
    commands::workorders::{CreateWorkOrderCommand, ListWorkOrdersCommand, WorkOrderPatch},
    config::WorkOrderConfig,
    errors::ServiceError,
    events::Event,
    models::WorkOrderKind,
    repositories::WorkOrderRepository,
    services::quantities::{QuantityBucket, QuantityPatch, TotalPolicy},
};

fn create_with(quantities: QuantityPatch) -> CreateWorkOrderCommand {
    CreateWorkOrderCommand {
        quantities,
        ..Default::default()
    }
}

fn three_and_seven() -> QuantityPatch {
    QuantityPatch::new()
        .with(QuantityBucket::P01, 3)
        .with(QuantityBucket::P02, 7)
}

fn with_display_id(kind: WorkOrderKind, display_id: &str) -> CreateWorkOrderCommand {
    CreateWorkOrderCommand {
        kind,
        display_id: Some(display_id.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn sequential_creates_get_consecutive_padded_ids() {
    let app = TestApp::new().await;

    let mut assigned = Vec::new();
    for _ in 0..5 {
        let created = app
            .service
            .create(CreateWorkOrderCommand::default())
            .await
            .unwrap();
        assigned.push(created.work_order.display_id);
    }

    assert_eq!(
        assigned,
        vec!["000001", "000002", "000003", "000004", "000005"]
    );
}

#[tokio::test]
async fn each_kind_has_its_own_sequence() {
    let app = TestApp::new().await;

    app.service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();
    app.service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();
    let launch = app
        .service
        .create(CreateWorkOrderCommand {
            kind: WorkOrderKind::ProductionLaunch,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(launch.work_order.kind, WorkOrderKind::ProductionLaunch);
    assert_eq!(launch.work_order.display_id, "000001");
}

#[tokio::test]
async fn next_id_follows_most_recent_record_not_numeric_max() {
    let app = TestApp::new().await;

    app.service
        .create(with_display_id(WorkOrderKind::Repair, "000100"))
        .await
        .unwrap();
    app.service
        .create(with_display_id(WorkOrderKind::Repair, "000005"))
        .await
        .unwrap();
    let generated = app
        .service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();

    assert_eq!(generated.work_order.display_id, "000006");
}

#[tokio::test]
async fn padding_grows_past_six_digits() {
    let app = TestApp::new().await;

    app.service
        .create(with_display_id(WorkOrderKind::Repair, "999999"))
        .await
        .unwrap();
    let generated = app
        .service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();

    assert_eq!(generated.work_order.display_id, "1000000");
}

#[tokio::test]
async fn create_derives_total_and_resolves_classifications() {
    let mut app = TestApp::new().await;
    let ids = app.seed_classifications().await;

    let created = app
        .service
        .create(CreateWorkOrderCommand {
            laboratory_id: Some(ids.laboratory_id),
            department_id: Some(ids.department_id),
            line_id: Some(ids.line_id),
            size_template_id: Some(ids.size_template_id),
            article: Some("ART-77".to_string()),
            ..create_with(three_and_seven())
        })
        .await
        .unwrap();

    let work_order = &created.work_order;
    assert_eq!(work_order.total_quantity, 10);
    assert_eq!((work_order.p01, work_order.p02, work_order.p03), (3, 7, 0));
    assert!(!work_order.completed);
    assert_eq!(work_order.closed_at, None);
    assert_eq!(created.laboratory.as_ref().unwrap().name, "Leather lab");
    assert_eq!(created.department.as_ref().unwrap().name, "Finishing");
    assert_eq!(created.line.as_ref().unwrap().name, "Line 3");
    assert_eq!(
        created
            .size_template
            .as_ref()
            .unwrap()
            .label_for(QuantityBucket::P02),
        Some("37")
    );

    assert_eq!(
        app.drain_events(),
        vec![Event::WorkOrderCreated {
            id: work_order.id,
            kind: WorkOrderKind::Repair,
            display_id: "000001".to_string(),
        }]
    );
}

#[tokio::test]
async fn create_from_json_payload_coerces_buckets() {
    let app = TestApp::new().await;

    let command: CreateWorkOrderCommand = serde_json::from_value(json!({
        "p01": 5,
        "p02": "x",
        "p05": 0,
        "total_quantity": 1000
    }))
    .unwrap();
    let created = app.service.create(command).await.unwrap();

    assert_eq!(created.work_order.total_quantity, 5);
    assert_eq!(created.work_order.p02, 0);
}

#[tokio::test]
async fn unrelated_update_keeps_total() {
    let app = TestApp::new().await;
    let created = app
        .service
        .create(create_with(three_and_seven()))
        .await
        .unwrap();

    let patch: WorkOrderPatch = serde_json::from_value(json!({ "reason": "text" })).unwrap();
    let updated = app
        .service
        .update(created.work_order.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.work_order.reason.as_deref(), Some("text"));
    assert_eq!(updated.work_order.total_quantity, 10);
}

#[tokio::test]
async fn partial_quantity_update_sums_only_patch_by_default() {
    let app = TestApp::new().await;
    let created = app
        .service
        .create(create_with(three_and_seven()))
        .await
        .unwrap();

    let patch: WorkOrderPatch = serde_json::from_value(json!({ "p01": 5 })).unwrap();
    let updated = app
        .service
        .update(created.work_order.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.work_order.p01, 5);
    assert_eq!(updated.work_order.p02, 7);
    assert_eq!(updated.work_order.total_quantity, 5);
}

#[tokio::test]
async fn merge_stored_policy_sums_all_buckets() {
    let app = TestApp::with_settings(WorkOrderConfig {
        total_policy: TotalPolicy::MergeStored,
        ..Default::default()
    })
    .await;
    let created = app
        .service
        .create(create_with(three_and_seven()))
        .await
        .unwrap();

    let patch = WorkOrderPatch {
        quantities: QuantityPatch::new().with(QuantityBucket::P01, 5),
        ..Default::default()
    };
    let updated = app
        .service
        .update(created.work_order.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.work_order.total_quantity, 12);
}

#[tokio::test]
async fn total_in_update_payload_is_ignored() {
    let app = TestApp::new().await;
    let created = app
        .service
        .create(create_with(three_and_seven()))
        .await
        .unwrap();

    let patch: WorkOrderPatch =
        serde_json::from_value(json!({ "total_quantity": 999, "notes": "hand count" })).unwrap();
    let updated = app
        .service
        .update(created.work_order.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.work_order.total_quantity, 10);
    assert_eq!(updated.work_order.notes.as_deref(), Some("hand count"));
}

#[tokio::test]
async fn null_clears_optional_fields() {
    let mut app = TestApp::new().await;
    let ids = app.seed_classifications().await;
    let created = app
        .service
        .create(CreateWorkOrderCommand {
            laboratory_id: Some(ids.laboratory_id),
            notes: Some("fragile".to_string()),
            article: Some("ART-1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let patch: WorkOrderPatch =
        serde_json::from_value(json!({ "notes": null, "laboratory_id": null })).unwrap();
    let updated = app
        .service
        .update(created.work_order.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.work_order.notes, None);
    assert_eq!(updated.work_order.laboratory_id, None);
    assert!(updated.laboratory.is_none());
    assert_eq!(updated.work_order.article.as_deref(), Some("ART-1"));

    let events = app.drain_events();
    assert_eq!(
        events.last(),
        Some(&Event::WorkOrderUpdated(created.work_order.id))
    );
}

#[tokio::test]
async fn complete_stamps_closing_time_and_restamps_on_repeat() {
    let app = TestApp::new().await;
    let created = app
        .service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();

    let before = Utc::now();
    let completed = app.service.complete(created.work_order.id).await.unwrap();
    assert!(completed.work_order.completed);
    let first_close = completed.work_order.closed_at.unwrap();
    assert!(first_close >= before);

    let again = app.service.complete(created.work_order.id).await.unwrap();
    assert!(again.work_order.completed);
    assert!(again.work_order.closed_at.unwrap() >= first_close);
}

#[tokio::test]
async fn completed_work_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let created = app
        .service
        .create(create_with(three_and_seven()))
        .await
        .unwrap();
    app.service.complete(created.work_order.id).await.unwrap();

    assert_matches!(
        app.service.delete(created.work_order.id).await,
        Err(ServiceError::PreconditionFailed(_))
    );

    let still_there = app.service.get(created.work_order.id).await.unwrap();
    assert!(still_there.work_order.completed);
    assert_eq!(still_there.work_order.total_quantity, 10);
}

#[tokio::test]
async fn open_work_orders_can_be_deleted() {
    let app = TestApp::new().await;
    let created = app
        .service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();

    app.service.delete(created.work_order.id).await.unwrap();

    assert_matches!(
        app.service.get(created.work_order.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = TestApp::new().await;

    assert_matches!(
        app.service.update(404, WorkOrderPatch::default()).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(app.service.complete(404).await, Err(ServiceError::NotFound(_)));
    assert_matches!(app.service.delete(404).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn explicit_duplicate_display_id_conflicts() {
    let app = TestApp::new().await;

    app.service
        .create(with_display_id(WorkOrderKind::Repair, "000042"))
        .await
        .unwrap();
    let duplicate = app
        .service
        .create(with_display_id(WorkOrderKind::Repair, "000042"))
        .await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));

    // same id under another kind is fine
    app.service
        .create(with_display_id(WorkOrderKind::InternalRepair, "000042"))
        .await
        .unwrap();
}

#[tokio::test]
async fn malformed_latest_display_id_fails_generation() {
    let app = TestApp::new().await;

    app.service
        .create(with_display_id(WorkOrderKind::Repair, "R-17"))
        .await
        .unwrap();

    assert_matches!(
        app.service.create(CreateWorkOrderCommand::default()).await,
        Err(ServiceError::MalformedIdentifier(_))
    );
}

#[tokio::test]
async fn concurrent_creates_get_distinct_ids() {
    let app = TestApp::with_settings(WorkOrderConfig {
        create_max_attempts: 10,
        ..Default::default()
    })
    .await;

    let mut tasks = JoinSet::new();
    for _ in 0..5 {
        let service = app.service.clone();
        tasks.spawn(async move { service.create(CreateWorkOrderCommand::default()).await });
    }

    let mut assigned = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let created = joined.unwrap().unwrap();
        assigned.insert(created.work_order.display_id);
    }

    let expected: HashSet<String> = (1..=5).map(|n| format!("{:06}", n)).collect();
    assert_eq!(assigned, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_on_a_pooled_file_database_all_succeed() {
    const WRITERS: u32 = 20;
    let app = TestApp::on_file_database(
        WorkOrderConfig {
            create_max_attempts: WRITERS,
            retry_initial_delay_ms: 5,
            retry_max_delay_ms: 100,
            ..Default::default()
        },
        5,
    )
    .await;

    let mut tasks = JoinSet::new();
    for _ in 0..WRITERS {
        let service = app.service.clone();
        tasks.spawn(async move { service.create(CreateWorkOrderCommand::default()).await });
    }

    let mut assigned = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let created = joined.unwrap().expect("every writer gets an id");
        assert!(assigned.insert(created.work_order.display_id));
    }

    let expected: HashSet<String> = (1..=WRITERS).map(|n| format!("{:06}", n)).collect();
    assert_eq!(assigned, expected);
}

#[tokio::test]
async fn repository_delete_keeps_completed_work_orders() {
    let app = TestApp::new().await;
    let created = app
        .service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();
    let id = created.work_order.id;
    app.service.complete(id).await.unwrap();

    let repository = app.repository();
    assert_matches!(
        repository.delete(id).await,
        Err(ServiceError::PreconditionFailed(_))
    );
    assert!(repository.find_by_id(id).await.unwrap().is_some());
    assert_matches!(repository.delete(id + 100).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn list_filters_and_paginates_newest_first() {
    let app = TestApp::new().await;

    for _ in 0..4 {
        app.service
            .create(CreateWorkOrderCommand::default())
            .await
            .unwrap();
    }
    app.service
        .create(CreateWorkOrderCommand {
            kind: WorkOrderKind::ProductionLaunch,
            ..Default::default()
        })
        .await
        .unwrap();
    app.service.complete(1).await.unwrap();

    let (page, total) = app
        .service
        .list(ListWorkOrdersCommand {
            kind: Some(WorkOrderKind::Repair),
            page: Some(1),
            per_page: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 4);
    let display_ids: Vec<_> = page.iter().map(|w| w.display_id.as_str()).collect();
    assert_eq!(display_ids, vec!["000004", "000003"]);

    let (open, open_total) = app
        .service
        .list(ListWorkOrdersCommand {
            kind: Some(WorkOrderKind::Repair),
            completed: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(open_total, 3);
    assert!(open.iter().all(|w| !w.completed));

    let (_, everything) = app
        .service
        .list(ListWorkOrdersCommand::default())
        .await
        .unwrap();
    assert_eq!(everything, 5);
}

#[tokio::test]
async fn status_counts_split_open_and_completed() {
    let app = TestApp::new().await;

    let first = app
        .service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();
    app.service
        .create(CreateWorkOrderCommand::default())
        .await
        .unwrap();
    app.service.complete(first.work_order.id).await.unwrap();

    let counts = app
        .service
        .status_counts(WorkOrderKind::Repair)
        .await
        .unwrap();
    assert_eq!((counts.open, counts.completed), (1, 1));

    let none = app
        .service
        .status_counts(WorkOrderKind::InternalRepair)
        .await
        .unwrap();
    assert_eq!(none.total(), 0);
}
