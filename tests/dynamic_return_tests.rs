/// Dynamic return tests
///
/// Shaping lazily produced results into single values, lists, streams and
/// pages.
/// Run with: cargo test --test dynamic_return_tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use recordmap::repository::{ResultStream, find_pageable, find_special_parameters, to_single_result};
use recordmap::{
    DynamicReturn, MethodDescriptor, MappingError, Page, Pageable, RepositoryReturn, ReturnShape,
    Sort,
};

const FIND_ONE: MethodDescriptor =
    MethodDescriptor::new("PersonRepository", "find_by_name", ReturnShape::Optional);
const FIND_ALL: MethodDescriptor =
    MethodDescriptor::new("PersonRepository", "find_all", ReturnShape::List);
const FIND_PAGE: MethodDescriptor =
    MethodDescriptor::new("PersonRepository", "find_page", ReturnShape::Page);

fn names() -> Vec<String> {
    ["Ada", "Grace", "Linus", "Barbara", "Ken"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn stream(values: Vec<String>) -> recordmap::Result<ResultStream<String>> {
    Ok(Box::new(values.into_iter()))
}

fn page_of(pageable: &Pageable) -> Vec<String> {
    names()
        .into_iter()
        .skip(pageable.offset() as usize)
        .take(pageable.size() as usize)
        .collect()
}

fn builder(method: MethodDescriptor) -> recordmap::repository::DynamicReturnBuilder<String> {
    DynamicReturn::builder()
        .with_class_source("Person")
        .with_method_source(method)
        .with_single_result(to_single_result(method, || Ok(vec!["Ada".to_string()])))
        .with_result(|| stream(names()))
}

fn paginated(method: MethodDescriptor, pageable: Pageable) -> DynamicReturn<String> {
    builder(method)
        .with_pagination(Some(pageable))
        .with_single_result_pagination(move |p: &Pageable| {
            to_single_result(method, {
                let page = page_of(p);
                move || Ok(page)
            })()
        })
        .with_stream_pagination(|p: &Pageable| stream(page_of(p)))
        .with_page(|p: &Pageable| Ok(Page::new(page_of(p), p.clone())))
        .build()
        .unwrap()
}

#[test]
fn test_single_result_pulls_at_most_two() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pulled);
    let single = to_single_result(FIND_ONE, move || {
        Ok((0..1_000).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    });

    let err = single().unwrap_err();
    assert!(err.is_non_unique_result());
    assert_eq!(
        err.to_string(),
        "No unique result to the method: PersonRepository::find_by_name"
    );
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
}

#[test]
fn test_single_result_errors_pass_through() {
    let single = to_single_result(FIND_ONE, || {
        Err::<Vec<String>, _>(MappingError::Storage("offline".to_string()))
    });
    assert!(matches!(single(), Err(MappingError::Storage(_))));
}

#[test]
fn test_shapes_without_pagination() {
    let single = builder(FIND_ONE).build().unwrap().execute().unwrap();
    assert_eq!(single.into_optional().unwrap(), Some("Ada".to_string()));

    let list = builder(FIND_ALL).build().unwrap().execute().unwrap();
    assert_eq!(list.into_list().unwrap(), names());

    let stream_method = MethodDescriptor::new("PersonRepository", "stream", ReturnShape::Stream);
    match builder(stream_method).build().unwrap().execute().unwrap() {
        RepositoryReturn::Stream(mut stream) => {
            assert_eq!(stream.next().as_deref(), Some("Ada"));
        }
        other => panic!("expected a stream, got {other:?}"),
    }
}

#[test]
fn test_page_without_pageable_fails() {
    let err = builder(FIND_PAGE).build().unwrap().execute().unwrap_err();
    assert!(matches!(err, MappingError::DynamicQuery(_)));
}

#[test]
fn test_shapes_with_pagination() {
    let second = Pageable::of(2, 2).unwrap();

    let page = paginated(FIND_PAGE, second.clone())
        .execute()
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(page.content().to_vec(), vec!["Linus".to_string(), "Barbara".to_string()]);
    assert_eq!(page.pageable(), &second);
    assert_eq!(page.next_pageable().page(), 3);

    let list = paginated(FIND_ALL, second.clone())
        .execute()
        .unwrap()
        .into_list()
        .unwrap();
    assert_eq!(list, vec!["Linus".to_string(), "Barbara".to_string()]);

    let last = Pageable::of(5, 1).unwrap();
    let single = paginated(FIND_ONE, last).execute().unwrap();
    assert_eq!(single.into_optional().unwrap(), Some("Ken".to_string()));

    let err = paginated(FIND_ONE, second).execute().unwrap_err();
    assert!(err.is_non_unique_result());
}

#[test]
fn test_builder_requires_every_supplier() {
    let missing_method = DynamicReturn::<String>::builder()
        .with_class_source("Person")
        .build()
        .err()
        .unwrap();
    assert_eq!(missing_method.to_string(), "the method Source is required");

    let missing_class = DynamicReturn::<String>::builder()
        .with_method_source(FIND_ONE)
        .build()
        .err()
        .unwrap();
    assert_eq!(missing_class.to_string(), "the class Source is required");

    let missing_page = builder(FIND_PAGE)
        .with_pagination(Some(Pageable::of(1, 10).unwrap()))
        .with_single_result_pagination(|_: &Pageable| Ok(None))
        .with_stream_pagination(|p: &Pageable| stream(page_of(p)))
        .build()
        .err()
        .unwrap();
    assert!(missing_page.is_null_argument());
    assert_eq!(missing_page.to_string(), "the page function is required");

    // Pagination functions are only required when a page request is set.
    let unpaged = builder(FIND_ALL).with_pagination(None).build().unwrap();
    assert!(!unpaged.has_pagination());
}

#[test]
fn test_special_parameters_from_call_arguments() {
    let pageable = Pageable::of(3, 20).unwrap().sort_by(Sort::asc("name"));
    let sort = Sort::desc("age");
    let name = "Ada".to_string();

    let params: [&dyn std::any::Any; 3] = [&name, &pageable, &sort];
    assert_eq!(find_pageable(&params), Some(pageable.clone()));

    let special = find_special_parameters(&params);
    assert_eq!(special.pageable, Some(pageable));
    assert_eq!(special.sorts, vec![Sort::desc("age")]);
    assert_eq!(special.all_sorts(), vec![Sort::asc("name"), Sort::desc("age")]);

    assert!(find_special_parameters(&[]).is_empty());
    assert_eq!(find_pageable(&[&name]), None);
}
