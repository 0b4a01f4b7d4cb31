use catalog_admin::api::signals::SignalHub;
use catalog_admin::logic::notifier::Signal;
use catalog_admin::model::field_ids::{COLOR_SPEC, MANUFACTURER, NAME, SIZE};
use catalog_admin::repository::{HandlerRegistry, SaveAction, UploadRepository, DEFAULT_BUCKET};
use catalog_admin::store::{
    BackendError, Call, DataService, ListQuery, MemoryDataService, Row, SessionActor,
};
use catalog_admin::{
    ActorIdentity, Attachment, CoordinatorError, EntityKind, ModalCoordinator, ModalState, SaveEvent,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;

const ACTOR_ID: &str = "00000000-0000-0000-0000-000000000007";

/// Data service whose inserts park until released, so a save can be held
/// in flight
struct GatedService {
    inner: Arc<MemoryDataService>,
    entered: Notify,
    release: Notify,
}

impl GatedService {
    fn new(inner: Arc<MemoryDataService>) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait::async_trait]
impl DataService for GatedService {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Row>, BackendError> {
        self.inner.list(table, query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, row: Row, id: &str) -> Result<Row, BackendError> {
        self.inner.update(table, row, id).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        self.inner.delete(table, id).await
    }
}

struct Workbench {
    service: Arc<MemoryDataService>,
    actors: Arc<SessionActor>,
    signals: Arc<SignalHub>,
    coordinator: ModalCoordinator,
}

impl Workbench {
    fn with_service(service: MemoryDataService) -> Self {
        let service = Arc::new(service);
        Self::assemble(service.clone(), service)
    }

    /// Provisioned bench whose row inserts wait on the returned gate
    fn gated() -> (Self, Arc<GatedService>) {
        let service = Arc::new(MemoryDataService::with_catalog_schema());
        service.seed("usuarios", json!({"id": ACTOR_ID, "email": "ana@example.com", "nome": "Ana"}));
        let gate = Arc::new(GatedService::new(service.clone()));
        (Self::assemble(service, gate.clone()), gate)
    }

    fn assemble(service: Arc<MemoryDataService>, data: Arc<dyn DataService>) -> Self {
        let uploads = Arc::new(UploadRepository::new(service.clone(), DEFAULT_BUCKET));
        let registry = Arc::new(HandlerRegistry::with_all_kinds(data, uploads));
        let actors = Arc::new(SessionActor::new(Some(ActorIdentity::with_details(
            ACTOR_ID,
            Some("ana@example.com".to_string()),
            Some("Ana".to_string()),
        ))));
        let signals = Arc::new(SignalHub::new());
        let coordinator = ModalCoordinator::new(registry, actors.clone(), signals.clone());
        Self {
            service,
            actors,
            signals,
            coordinator,
        }
    }

    fn provisioned() -> Self {
        let service = MemoryDataService::with_catalog_schema();
        service.seed("usuarios", json!({"id": ACTOR_ID, "email": "ana@example.com", "nome": "Ana"}));
        Self::with_service(service)
    }

    fn changed_kinds(&self) -> Vec<EntityKind> {
        self.signals
            .since(0)
            .into_iter()
            .filter_map(|event| match event.signal {
                Signal::KindChanged { kind } => Some(kind),
                _ => None,
            })
            .collect()
    }
}

#[tokio::test]
async fn test_new_glass_with_default_color_is_created_once() {
    let bench = Workbench::provisioned();

    bench.coordinator.open(EntityKind::Glass, None).unwrap();
    bench.coordinator.update_field(NAME, "Incolor").unwrap();
    let saved = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap();

    assert_eq!(saved.action, SaveAction::Created);
    assert_eq!(bench.coordinator.state(), ModalState::Closed);

    let inserts: Vec<_> = bench
        .service
        .writes()
        .into_iter()
        .filter_map(|call| match call {
            Call::Insert { table, row } => Some((table, row)),
            _ => None,
        })
        .collect();
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].0, "vidros");
    assert_eq!(inserts[0].1["tipo"], "Incolor");
    assert_eq!(inserts[0].1["rgb"], "255,255,255,0.3");
    assert_eq!(bench.changed_kinds(), vec![EntityKind::Glass]);
}

#[tokio::test]
async fn test_foreign_key_failure_keeps_modal_open() {
    let bench = Workbench::provisioned();

    bench.coordinator.open(EntityKind::Handle, None).unwrap();
    bench.coordinator.update_field(NAME, "Slim").unwrap();
    bench.coordinator.update_field(SIZE, "300mm").unwrap();
    let session = bench.coordinator.session();

    bench.service.fail_next(
        "puxadores",
        BackendError::ForeignKeyViolation {
            message: "insert or update on table \"puxadores\" violates foreign key constraint".to_string(),
        },
    );
    let err = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap_err();

    assert!(err.user_messages().iter().any(|m| m.contains("re-authenticate")));
    assert_eq!(bench.coordinator.state(), ModalState::OpenFor(EntityKind::Handle));
    assert_eq!(bench.coordinator.session(), session);
    assert!(bench.changed_kinds().is_empty());

    let snapshot = bench.coordinator.snapshot();
    assert!(snapshot.errors[0].contains("re-authenticate"));
    let size = snapshot.fields.iter().find(|f| f.descriptor.id == SIZE).unwrap();
    assert_eq!(size.value, "300mm");
}

#[tokio::test]
async fn test_open_close_cycle_for_every_kind() {
    let bench = Workbench::provisioned();

    for kind in EntityKind::ALL {
        bench.coordinator.open(kind, None).unwrap();
        bench.coordinator.update_field(NAME, "draft").unwrap();
        bench.coordinator.close().unwrap();

        let snapshot = bench.coordinator.snapshot();
        assert_eq!(snapshot.state, ModalState::Closed);
        assert!(snapshot.session.is_none());
        assert!(snapshot.fields.iter().all(|field| field.value.is_empty()));
        assert!(snapshot.attachment.is_none());
    }
    assert!(bench.service.calls().is_empty());
}

#[tokio::test]
async fn test_save_without_session_does_nothing() {
    let bench = Workbench::provisioned();

    let err = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap_err();
    assert_eq!(err, CoordinatorError::NoActiveSession);
    assert!(bench.service.calls().is_empty());
}

#[tokio::test]
async fn test_handle_without_model_never_reaches_backend() {
    let bench = Workbench::provisioned();

    bench.coordinator.open(EntityKind::Handle, None).unwrap();
    bench.coordinator.update_field(SIZE, "300mm").unwrap();
    bench.coordinator.update_field(MANUFACTURER, "Alumax").unwrap();

    let err = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap_err();
    assert!(matches!(&err, CoordinatorError::Validation(errors) if errors[0].field == "modelo"));
    assert!(bench.service.calls().is_empty());
}

#[tokio::test]
async fn test_unprovisioned_backend_serves_fallback_data() {
    let bench = Workbench::with_service(MemoryDataService::new());

    for kind in EntityKind::ALL {
        let rows = bench.coordinator.list(kind).await.unwrap();
        assert!(!rows.is_empty());
        assert!(rows
            .iter()
            .all(|row| row["id"].as_str().unwrap().starts_with("demo-")));
    }

    // writes succeed in demo mode too
    bench.coordinator.open(EntityKind::Rail, None).unwrap();
    bench.coordinator.update_field(NAME, "Trilho Novo").unwrap();
    let saved = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap();
    assert!(saved.row["id"].as_str().is_some());
}

#[tokio::test]
async fn test_signed_out_actor_cannot_save() {
    let bench = Workbench::provisioned();
    bench.actors.set(Some(ActorIdentity::new("temp-1699999999")));

    bench.coordinator.open(EntityKind::Rail, None).unwrap();
    bench.coordinator.update_field(NAME, "T1").unwrap();
    let err = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap_err();

    assert!(err.user_messages()[0].contains("re-authenticate"));
    assert!(bench.service.calls().is_empty());
    assert_eq!(bench.coordinator.state(), ModalState::OpenFor(EntityKind::Rail));
}

#[tokio::test]
async fn test_duplicate_name_is_reported() {
    let bench = Workbench::provisioned();

    for _ in 0..2 {
        bench.coordinator.open(EntityKind::Glass, None).unwrap();
        bench.coordinator.update_field(NAME, "Bronze").unwrap();
        bench.coordinator.update_field(COLOR_SPEC, "205,127,50,0.4").unwrap();
        let _ = bench.coordinator.save(&mut SaveEvent::new()).await;
    }

    assert_eq!(bench.coordinator.state(), ModalState::OpenFor(EntityKind::Glass));
    assert!(bench.coordinator.snapshot().errors[0].contains("choose another name"));
    assert_eq!(bench.service.rows("vidros").len(), 1);
}

#[tokio::test]
async fn test_photo_is_uploaded_with_the_record() {
    let bench = Workbench::provisioned();

    bench.coordinator.open(EntityKind::Rail, None).unwrap();
    bench.coordinator.update_field(NAME, "Trilho Box").unwrap();
    bench
        .coordinator
        .attach(Attachment {
            file_name: "box.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8, 0xff],
        })
        .unwrap();
    let saved = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap();

    let photo = saved.row["foto"].as_str().unwrap();
    assert!(photo.starts_with("memory://catalogo/trilhos/"));
    assert!(photo.ends_with("-box.jpg"));
}

#[tokio::test]
async fn test_force_close_during_save_does_not_resurrect_session() {
    let (bench, gate) = Workbench::gated();
    let bench = Arc::new(bench);

    bench.coordinator.open(EntityKind::Glass, None).unwrap();
    bench.coordinator.update_field(NAME, "Verde").unwrap();

    let saving = {
        let bench = bench.clone();
        tokio::spawn(async move {
            let mut event = SaveEvent::new();
            bench.coordinator.save(&mut event).await
        })
    };
    gate.entered.notified().await;
    assert_eq!(bench.coordinator.state(), ModalState::Saving(EntityKind::Glass));

    bench.coordinator.force_close();
    assert_eq!(bench.coordinator.state(), ModalState::Closed);
    assert!(bench.coordinator.session().is_none());

    // a new session opened meanwhile must survive the late result
    bench.coordinator.open(EntityKind::Rail, None).unwrap();
    bench.coordinator.update_field(NAME, "Trilho Box").unwrap();

    gate.release.notify_one();
    let saved = saving.await.unwrap().unwrap();

    assert_eq!(saved.action, SaveAction::Created);
    assert_eq!(saved.row["tipo"], "Verde");
    assert_eq!(bench.coordinator.state(), ModalState::OpenFor(EntityKind::Rail));
    let snapshot = bench.coordinator.snapshot();
    let name = snapshot.fields.iter().find(|f| f.descriptor.id == NAME).unwrap();
    assert_eq!(name.value, "Trilho Box");
    assert!(snapshot.errors.is_empty());
    assert_eq!(bench.changed_kinds(), vec![EntityKind::Glass]);
    assert_eq!(bench.service.rows("vidros").len(), 1);
}

#[tokio::test]
async fn test_modal_is_locked_while_a_save_is_in_flight() {
    let (bench, gate) = Workbench::gated();
    let bench = Arc::new(bench);

    bench.coordinator.open(EntityKind::Rail, None).unwrap();
    bench.coordinator.update_field(NAME, "Trilho Box").unwrap();
    let session = bench.coordinator.session();

    let saving = {
        let bench = bench.clone();
        tokio::spawn(async move {
            let mut event = SaveEvent::new();
            bench.coordinator.save(&mut event).await
        })
    };
    gate.entered.notified().await;
    assert_eq!(bench.coordinator.state(), ModalState::Saving(EntityKind::Rail));

    let mut second = SaveEvent::new();
    assert_eq!(
        bench.coordinator.save(&mut second).await.unwrap_err(),
        CoordinatorError::SaveInFlight
    );
    assert!(!second.default_prevented());
    assert_eq!(
        bench.coordinator.open(EntityKind::Glass, None).unwrap_err(),
        CoordinatorError::SaveInFlight
    );
    assert_eq!(bench.coordinator.close().unwrap_err(), CoordinatorError::SaveInFlight);
    assert_eq!(
        bench.coordinator.update_field(NAME, "other").unwrap_err(),
        CoordinatorError::SaveInFlight
    );

    assert_eq!(bench.coordinator.state(), ModalState::Saving(EntityKind::Rail));
    assert_eq!(bench.coordinator.session(), session);

    gate.release.notify_one();
    let saved = saving.await.unwrap().unwrap();

    assert_eq!(saved.row["nome"], "Trilho Box");
    assert_eq!(bench.coordinator.state(), ModalState::Closed);
    assert!(bench.coordinator.session().is_none());
    assert_eq!(bench.changed_kinds(), vec![EntityKind::Rail]);
    assert_eq!(bench.service.rows("trilhos").len(), 1);
}

#[tokio::test]
async fn test_glass_modal_refuses_a_photo() {
    let bench = Workbench::provisioned();

    bench.coordinator.open(EntityKind::Glass, None).unwrap();
    bench.coordinator.update_field(NAME, "Incolor").unwrap();
    let err = bench
        .coordinator
        .attach(Attachment {
            file_name: "incolor.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        })
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation(_)));

    let saved = bench.coordinator.save(&mut SaveEvent::new()).await.unwrap();
    assert!(saved.row.get("foto").is_none());
    assert!(bench
        .service
        .calls()
        .iter()
        .all(|call| !matches!(call, Call::Upload { .. })));
    assert!(bench.service.rows("vidros")[0].get("foto").is_none());
}
