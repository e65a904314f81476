/// Workflow pipeline tests
///
/// Save/update flows through the mapper: validation, lifecycle events,
/// conversion around a storage action.
/// Run with: cargo test --test workflow_tests

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use recordmap::workflow::NoopValidator;
use recordmap::{
    Entity, EntityMetadata, EntityObserver, Mapper, MapperConfig, MappingError, Record,
    RuleValidator, Value,
};

#[derive(Entity, Debug, Clone, PartialEq)]
struct Person {
    #[mapping(id)]
    id: Option<i64>,
    name: String,
}

#[derive(Default)]
struct CountingObserver {
    pre: AtomicUsize,
    post: AtomicUsize,
}

impl EntityObserver for CountingObserver {
    fn pre_entity(&self, _entity: &mut dyn Any, _metadata: &EntityMetadata) {
        self.pre.fetch_add(1, Ordering::SeqCst);
    }

    fn post_entity(&self, entity: &dyn Any, _metadata: &EntityMetadata) {
        assert!(entity.downcast_ref::<Person>().is_some());
        self.post.fetch_add(1, Ordering::SeqCst);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn mapper_with(observer: Arc<CountingObserver>) -> Mapper {
    init_tracing();
    Mapper::builder(MapperConfig::default())
        .observer(observer)
        .validator(Arc::new(NoopValidator))
        .build()
        .unwrap()
}

fn assign_id(mut record: Record) -> recordmap::Result<Record> {
    record.add("id", 10i64);
    Ok(record)
}

#[test]
fn test_storage_action_assigns_id() {
    let observer = Arc::new(CountingObserver::default());
    let mapper = mapper_with(Arc::clone(&observer));
    let workflow = mapper.document_workflow();

    let ada = Person {
        id: None,
        name: "Ada".to_string(),
    };
    let saved = workflow
        .flow(ada, |record: Record| {
            assert_eq!(record.get("name"), Some(&Value::Text("Ada".to_string())));
            assert!(!record.contains("id"));
            assign_id(record)
        })
        .unwrap();

    assert_eq!(
        saved,
        Person {
            id: Some(10),
            name: "Ada".to_string()
        }
    );
    assert_eq!(observer.pre.load(Ordering::SeqCst), 1);
    assert_eq!(observer.post.load(Ordering::SeqCst), 1);
}

#[test]
fn test_validation_failure_skips_action() {
    let observer = Arc::new(CountingObserver::default());
    let validator = RuleValidator::new().rule::<Person>("name", "must not be blank", |p| {
        !p.name.trim().is_empty()
    });
    let mapper = Mapper::builder(MapperConfig::default())
        .observer(Arc::clone(&observer) as Arc<dyn EntityObserver>)
        .validator(Arc::new(validator))
        .build()
        .unwrap();

    let called = AtomicBool::new(false);
    let result = mapper.document_workflow().flow(
        Person {
            id: None,
            name: "  ".to_string(),
        },
        |record: Record| {
            called.store(true, Ordering::SeqCst);
            Ok::<_, MappingError>(record)
        },
    );

    let err = result.unwrap_err();
    assert!(err.is_validation_failed());
    assert!(err.to_string().contains("must not be blank"));
    match err {
        MappingError::ValidationFailed { violations, .. } => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].property_path, "name");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!called.load(Ordering::SeqCst));
    assert_eq!(observer.pre.load(Ordering::SeqCst), 0);
    assert_eq!(observer.post.load(Ordering::SeqCst), 0);
}

#[test]
fn test_null_entity_is_rejected() {
    let mapper = mapper_with(Arc::new(CountingObserver::default()));
    let result: recordmap::Result<Person> = mapper
        .document_workflow()
        .flow(None, Ok::<Record, MappingError>);
    let err = result.unwrap_err();

    assert!(err.is_null_argument());
    assert_eq!(err.to_string(), "entity is required");
}

#[derive(Debug)]
enum StoreError {
    Offline,
    Mapping(MappingError),
}

impl From<MappingError> for StoreError {
    fn from(err: MappingError) -> Self {
        StoreError::Mapping(err)
    }
}

#[test]
fn test_storage_error_passes_through() {
    let observer = Arc::new(CountingObserver::default());
    let mapper = mapper_with(Arc::clone(&observer));

    let result: Result<Person, StoreError> = mapper.column_workflow().flow(
        Person {
            id: None,
            name: "Grace".to_string(),
        },
        |_record: Record| Err(StoreError::Offline),
    );

    assert!(matches!(result, Err(StoreError::Offline)));
    assert_eq!(observer.pre.load(Ordering::SeqCst), 1);
    assert_eq!(observer.post.load(Ordering::SeqCst), 0);
}

#[test]
fn test_key_value_workflow_uses_id_as_key() {
    let mapper = mapper_with(Arc::new(CountingObserver::default()));

    let saved = mapper
        .key_value_workflow()
        .flow(
            Person {
                id: Some(3),
                name: "Linus".to_string(),
            },
            |entity: recordmap::KeyValueEntity| {
                assert_eq!(entity.key, Value::Integer(3));
                Ok::<_, MappingError>(entity)
            },
        )
        .unwrap();

    assert_eq!(saved.id, Some(3));
    assert_eq!(saved.name, "Linus");
}

#[tokio::test]
async fn test_async_flows_run_concurrently() {
    let observer = Arc::new(CountingObserver::default());
    let mapper = mapper_with(Arc::clone(&observer));
    let workflow = mapper.document_workflow();
    let next_id = AtomicUsize::new(100);

    let flows = (0..8).map(|i| {
        let workflow = &workflow;
        let next_id = &next_id;
        async move {
            workflow
                .flow_async(
                    Person {
                        id: None,
                        name: format!("person-{i}"),
                    },
                    |mut record: Record| async move {
                        tokio::task::yield_now().await;
                        record.add("id", next_id.fetch_add(1, Ordering::SeqCst) as i64);
                        Ok::<_, MappingError>(record)
                    },
                )
                .await
        }
    });

    let saved = futures::future::join_all(flows).await;
    let mut ids: Vec<i64> = saved
        .into_iter()
        .map(|person| person.unwrap().id.unwrap())
        .collect();
    ids.sort_unstable();

    assert_eq!(ids, (100..108).collect::<Vec<i64>>());
    assert_eq!(observer.pre.load(Ordering::SeqCst), 8);
    assert_eq!(observer.post.load(Ordering::SeqCst), 8);
}
