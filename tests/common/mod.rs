use std::sync::Arc;

use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;
use workorder_ledger::{
    config::WorkOrderConfig,
    db::{self, DbConfig, DbPool},
    events::{Event, EventSender},
    models::{department, laboratory, production_line, size_template},
    repositories::SeaOrmWorkOrderRepository,
    services::WorkOrderService,
};

/// Service wired to a fresh SQLite database with the schema applied.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub service: WorkOrderService,
    pub events: mpsc::Receiver<Event>,
    _dir: Option<TempDir>,
}

/// Ids of one row per classification table.
#[allow(dead_code)]
pub struct Classifications {
    pub laboratory_id: i32,
    pub department_id: i32,
    pub line_id: i32,
    pub size_template_id: i32,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(WorkOrderConfig::default()).await
    }

    pub async fn with_settings(settings: WorkOrderConfig) -> Self {
        Self::connect(DbConfig::single_connection("sqlite::memory:"), settings, None).await
    }

    /// Database file in a temporary directory behind a pool of
    /// `max_connections`, so concurrent calls really run side by side.
    #[allow(dead_code)]
    pub async fn on_file_database(settings: WorkOrderConfig, max_connections: u32) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("workorders.db").display()
        );
        let db_config = DbConfig {
            max_connections,
            ..DbConfig::single_connection(url)
        };
        Self::connect(db_config, settings, Some(dir)).await
    }

    async fn connect(db_config: DbConfig, settings: WorkOrderConfig, dir: Option<TempDir>) -> Self {
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("sqlite should connect");
        db::run_migrations(&pool)
            .await
            .expect("migrations should apply");

        let db = Arc::new(pool);
        let (tx, events) = mpsc::channel(64);
        let service =
            WorkOrderService::with_database(db.clone(), Arc::new(EventSender::new(tx)), settings);

        Self {
            db,
            service,
            events,
            _dir: dir,
        }
    }

    #[allow(dead_code)]
    pub fn repository(&self) -> SeaOrmWorkOrderRepository {
        SeaOrmWorkOrderRepository::new(self.db.clone())
    }

    /// Events published so far, in order.
    #[allow(dead_code)]
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    #[allow(dead_code)]
    pub async fn seed_classifications(&self) -> Classifications {
        let db = self.db.as_ref();

        let laboratory = laboratory::ActiveModel {
            name: Set("Leather lab".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("laboratory insert");
        let department = department::ActiveModel {
            name: Set("Finishing".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("department insert");
        let line = production_line::ActiveModel {
            name: Set("Line 3".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("line insert");
        let size_template = size_template::ActiveModel {
            name: Set("EU shoes".to_string()),
            labels: Set(json!(["36", "37", "38", "39", "40"])),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("size template insert");

        Classifications {
            laboratory_id: laboratory.id,
            department_id: department.id,
            line_id: line.id,
            size_template_id: size_template.id,
        }
    }
}
