/// Document template tests
///
/// Entity-level CRUD and repository-style queries over the in-memory
/// document manager.
/// Run with: cargo test --test template_tests

use std::sync::Arc;

use recordmap::template::{DocumentManager, DocumentQuery, SpawnBlocking};
use recordmap::workflow::NoopValidator;
use recordmap::{
    Embeddable, Entity, InMemoryDocumentManager, Mapper, MapperConfig, MethodDescriptor, Pageable,
    RepositoryReturn, ReturnShape, Sort, Value,
};

#[derive(Embeddable, Debug, Clone, PartialEq)]
struct Stats {
    commits: i64,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[mapping(name = "developers")]
struct Developer {
    #[mapping(id)]
    id: Option<i64>,
    name: String,
    language: String,
    #[mapping(embedded)]
    stats: Option<Stats>,
}

fn developer(name: &str, language: &str, commits: i64) -> Developer {
    Developer {
        id: None,
        name: name.to_string(),
        language: language.to_string(),
        stats: Some(Stats { commits }),
    }
}

fn mapper() -> Mapper {
    Mapper::builder(MapperConfig::default().setting("id.start", "100"))
        .validator(Arc::new(NoopValidator))
        .build()
        .unwrap()
}

#[test]
fn test_insert_find_update_delete() {
    let template = mapper().memory_template().unwrap();

    let ada = template.insert(developer("Ada", "rust", 10)).unwrap();
    assert_eq!(ada.id, Some(100));

    let found: Option<Developer> = template.find_by_id(Value::Integer(100)).unwrap();
    assert_eq!(found.as_ref(), Some(&ada));

    let mut changed = ada.clone();
    changed.language = "ocaml".to_string();
    changed.stats = None;
    let updated = template.update(changed.clone()).unwrap();
    assert_eq!(updated, changed);

    let stored = template
        .manager()
        .select(&DocumentQuery::select("developers"))
        .unwrap()
        .next()
        .unwrap();
    assert!(!stored.contains("commits"));

    assert!(template.delete_by_id::<Developer>(Value::Integer(100)).unwrap());
    assert!(!template.delete_by_id::<Developer>(Value::Integer(100)).unwrap());
    assert_eq!(template.count::<Developer>().unwrap(), 0);
}

#[test]
fn test_select_by_field() -> anyhow::Result<()> {
    let template = mapper().memory_template()?;
    template.insert(developer("Ada", "rust", 10))?;
    template.insert(developer("Grace", "cobol", 30))?;

    let found: Vec<Developer> =
        template.select(DocumentQuery::select("developers").where_eq("commits", 30i64))?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Grace");
    assert_eq!(found[0].stats, Some(Stats { commits: 30 }));
    Ok(())
}

#[test]
fn test_find_by_id_requires_id() {
    let template = mapper().memory_template().unwrap();
    let err = template.find_by_id::<Developer>(None::<Value>).unwrap_err();
    assert!(err.is_null_argument());
}

#[test]
fn test_insert_requires_entity() {
    let template = mapper().memory_template().unwrap();
    let err = template.insert::<Developer>(None).unwrap_err();
    assert!(err.is_null_argument());
    assert_eq!(template.count::<Developer>().unwrap(), 0);
}

#[test]
fn test_repository_queries() {
    let template = mapper().memory_template().unwrap();
    for (name, language, commits) in [
        ("Ada", "rust", 10),
        ("Grace", "cobol", 30),
        ("Linus", "c", 50),
        ("Barbara", "rust", 20),
        ("Ken", "c", 40),
    ] {
        template.insert(developer(name, language, commits)).unwrap();
    }

    const BY_LANGUAGE: MethodDescriptor =
        MethodDescriptor::new("DeveloperRepository", "find_by_language", ReturnShape::List);
    let rustaceans: Vec<Developer> = template
        .query::<Developer>(
            BY_LANGUAGE,
            DocumentQuery::select("developers").where_eq("language", "rust"),
            &[&Sort::desc("commits")],
        )
        .unwrap()
        .into_list()
        .unwrap();
    let names: Vec<&str> = rustaceans.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Barbara", "Ada"]);

    const PAGE: MethodDescriptor =
        MethodDescriptor::new("DeveloperRepository", "find_all", ReturnShape::Page);
    let pageable = Pageable::of(2, 2).unwrap().sort_by(Sort::asc("name"));
    let page = template
        .query::<Developer>(PAGE, DocumentQuery::select("developers"), &[&pageable])
        .unwrap()
        .into_page()
        .unwrap();
    let names: Vec<&str> = page.content().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Grace", "Ken"]);
    assert_eq!(page.next_pageable().page(), 3);

    const ONE: MethodDescriptor =
        MethodDescriptor::new("DeveloperRepository", "find_by_language", ReturnShape::Optional);
    let err = template
        .query::<Developer>(
            ONE,
            DocumentQuery::select("developers").where_eq("language", "c"),
            &[],
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No unique result to the method: DeveloperRepository::find_by_language"
    );

    match template
        .query::<Developer>(
            ONE,
            DocumentQuery::select("developers").where_eq("language", "cobol"),
            &[],
        )
        .unwrap()
    {
        RepositoryReturn::Single(Some(grace)) => assert_eq!(grace.name, "Grace"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_page_far_past_the_end() {
    let template = mapper().memory_template().unwrap();
    template.insert(developer("Ada", "rust", 10)).unwrap();

    const PAGE: MethodDescriptor =
        MethodDescriptor::new("DeveloperRepository", "find_all", ReturnShape::Page);
    let err = Pageable::of(u64::MAX, 2).unwrap_err();
    assert!(err.to_string().contains("out of range"));

    let far = Pageable::of(u64::MAX / 2, 2).unwrap();
    let page = template
        .query::<Developer>(PAGE, DocumentQuery::select("developers").skip(5), &[&far])
        .unwrap()
        .into_page()
        .unwrap();
    assert!(page.content().is_empty());
}

#[test]
fn test_templates_share_a_manager() {
    let mapper = mapper();
    let manager = Arc::new(InMemoryDocumentManager::new());
    let writer = mapper.document_template(Arc::clone(&manager));
    let reader = mapper.document_template(manager);

    writer.insert(developer("Ada", "rust", 1)).unwrap();
    let all: Vec<Developer> = reader.find_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, Some(1));
}

#[tokio::test]
async fn test_async_insert_and_find_all() {
    let template = mapper().memory_template().unwrap();

    let inserts = ["Ada", "Grace", "Linus"]
        .into_iter()
        .map(|name| template.insert_async(developer(name, "rust", 1)));
    let saved = futures::future::try_join_all(inserts).await.unwrap();
    assert!(saved.iter().all(|d| d.id.is_some()));

    let all: Vec<Developer> = template.find_all_async().await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_blocking_manager_behind_async_template() {
    let blocking = Arc::new(InMemoryDocumentManager::new());
    let template = mapper().document_template(Arc::new(SpawnBlocking::new(Arc::clone(&blocking))));

    let saved = template
        .insert_async(developer("Ada", "rust", 3))
        .await
        .unwrap();
    assert_eq!(saved.id, Some(1));

    let mut renamed = saved.clone();
    renamed.name = "Augusta Ada".to_string();
    template.update_async(renamed).await.unwrap();

    let all: Vec<Developer> = template.find_all_async().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Augusta Ada");
    assert_eq!(blocking.count("developers").unwrap(), 1);
}
