use super::factory::{define_factory, FactoryBuilder, FactoryOptions, Trait};
use super::pagination::offset_to_cursor;
use super::sequence_registry::SequenceRegistry;
use crate::domain::connection::ConnectionArgs;
use crate::domain::error::FactoryError;
use crate::domain::field::{dynamic, dynamic_sync, FieldMap, FieldSpec};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const BOOK_FIELDS: [&str; 3] = ["id", "title", "author"];
const AUTHOR_FIELDS: [&str; 3] = ["id", "name", "books"];

fn book_defaults() -> FieldMap {
    FieldMap::new()
        .with("id", dynamic_sync(|ctx| json!(format!("Book-{}", ctx.seq()))))
        .with("title", "T")
}

fn book_builder(registry: &SequenceRegistry) -> FactoryBuilder {
    FactoryBuilder::new("Book", BOOK_FIELDS).with_registry(registry.clone())
}

#[tokio::test]
async fn test_build_uses_sequence() {
    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));

    let first = factory.build().await.unwrap();
    let second = factory.build().await.unwrap();

    assert_eq!(first.to_json(), json!({ "id": "Book-0", "title": "T" }));
    assert_eq!(second.to_json(), json!({ "id": "Book-1", "title": "T" }));
    assert!(!first.contains_key("author"));
}

#[tokio::test]
async fn test_build_with_override_on_fresh_factory() {
    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));

    let book = factory
        .build_with(FieldMap::new().with("title", "U"))
        .await
        .unwrap();

    assert_eq!(book.to_json(), json!({ "id": "Book-0", "title": "U" }));
}

#[tokio::test]
async fn test_override_does_not_call_default_resolver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let factory = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(FieldMap::new().with(
            "title",
            dynamic_sync(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                json!("default")
            }),
        )),
    );

    let book = factory
        .build_with(FieldMap::new().with("title", "X"))
        .await
        .unwrap();

    assert_eq!(book.get("title"), Some(&json!("X")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    factory.build().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_undefined_override_differs_from_absent() {
    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));

    let forced = factory
        .build_with(FieldMap::new().with("title", FieldSpec::undefined()))
        .await
        .unwrap();
    let defaulted = factory.build_with(FieldMap::new()).await.unwrap();

    assert!(forced.contains_key("title"));
    assert!(forced.is_undefined("title"));
    assert_eq!(defaulted.get("title"), Some(&json!("T")));
}

#[tokio::test]
async fn test_undefined_default_field() {
    let factory = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(book_defaults().with("author", FieldSpec::undefined())),
    );

    let book = factory.build().await.unwrap();
    assert!(book.is_undefined("author"));
    assert_eq!(book.to_json(), json!({ "id": "Book-0", "title": "T" }));
}

#[tokio::test]
async fn test_dynamic_input_field() {
    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));

    let book = factory
        .build_with(FieldMap::new().with(
            "title",
            dynamic(|ctx| async move {
                let id = ctx.get_as::<String>("id").await?.unwrap_or_default();
                Ok(json!(format!("Title of {}", id)))
            }),
        ))
        .await
        .unwrap();

    assert_eq!(book.get("title"), Some(&json!("Title of Book-0")));
}

#[tokio::test]
async fn test_reset_sequence_only_affects_one_factory() {
    let registry = SequenceRegistry::new();
    let books = book_builder(&registry).define(FactoryOptions::new(book_defaults()));
    let authors = FactoryBuilder::new("Author", AUTHOR_FIELDS)
        .with_registry(registry.clone())
        .define(FactoryOptions::new(FieldMap::new().with(
            "id",
            dynamic_sync(|ctx| json!(format!("Author-{}", ctx.seq()))),
        )));

    books.build().await.unwrap();
    books.build().await.unwrap();
    authors.build().await.unwrap();

    books.reset_sequence();

    assert_eq!(books.build().await.unwrap().get("id"), Some(&json!("Book-0")));
    assert_eq!(authors.build().await.unwrap().get("id"), Some(&json!("Author-1")));

    registry.reset_all();

    assert_eq!(books.build().await.unwrap().get("id"), Some(&json!("Book-0")));
    assert_eq!(authors.build().await.unwrap().get("id"), Some(&json!("Author-0")));
}

#[tokio::test]
async fn test_traits_override_defaults() {
    let factory = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(book_defaults())
            .with_trait("withAuthor", FieldMap::new().with("author", json!({ "id": "Author-X" })))
            .with_trait("titled", FieldMap::new().with("title", "Overridden")),
    );

    let book = factory.use_trait("withAuthor").unwrap().build().await.unwrap();
    assert_eq!(
        book.to_json(),
        json!({ "id": "Book-0", "title": "T", "author": { "id": "Author-X" } })
    );

    let book = factory.use_trait("titled").unwrap().build().await.unwrap();
    assert_eq!(book.get("title"), Some(&json!("Overridden")));
    assert!(!book.contains_key("author"));
}

#[tokio::test]
async fn test_chained_traits_later_wins() {
    let factory = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(book_defaults())
            .with_trait(
                "a",
                FieldMap::new().with("title", "from-a").with("author", "author-a"),
            )
            .with_trait("b", FieldMap::new().with("title", "from-b")),
    );

    let book = factory
        .use_trait("a")
        .unwrap()
        .use_trait("b")
        .unwrap()
        .build()
        .await
        .unwrap();

    assert_eq!(book.get("title"), Some(&json!("from-b")));
    assert_eq!(book.get("author"), Some(&json!("author-a")));
}

#[tokio::test]
async fn test_traits_share_sequence() {
    let registry = SequenceRegistry::new();
    let factory = book_builder(&registry).define(
        FactoryOptions::new(book_defaults())
            .with_trait("titled", FieldMap::new().with("title", "X")),
    );

    assert_eq!(factory.build().await.unwrap().get("id"), Some(&json!("Book-0")));
    let titled = factory.use_trait("titled").unwrap();
    assert_eq!(titled.sequence_id(), factory.sequence_id());
    assert_eq!(titled.build().await.unwrap().get("id"), Some(&json!("Book-1")));
    assert_eq!(factory.build().await.unwrap().get("id"), Some(&json!("Book-2")));

    titled.reset_sequence();
    assert_eq!(factory.build().await.unwrap().get("id"), Some(&json!("Book-0")));
}

#[tokio::test]
async fn test_unknown_trait_is_an_error() {
    let factory = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(book_defaults()).with_trait("known", Trait::default()),
    );

    let err = factory.use_trait("missing").unwrap_err();
    match err {
        FactoryError::TraitNotFound { trait_name, type_name } => {
            assert_eq!(trait_name, "missing");
            assert_eq!(type_name, "Book");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(factory.trait_names().collect::<Vec<_>>(), vec!["known"]);
}

#[tokio::test]
async fn test_use_trait_does_not_mutate_original() {
    let factory = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(book_defaults())
            .with_trait("titled", FieldMap::new().with("title", "X")),
    );

    let _titled = factory.use_trait("titled").unwrap();
    assert_eq!(factory.build().await.unwrap().get("title"), Some(&json!("T")));
}

#[tokio::test]
async fn test_build_list_matches_sequential_builds() {
    let registry = SequenceRegistry::new();
    let factory = book_builder(&registry).define(FactoryOptions::new(book_defaults()));

    let list = factory
        .build_list_with(3, FieldMap::new().with("title", "Same"))
        .await
        .unwrap();

    let ids: Vec<&Value> = list.iter().filter_map(|book| book.get("id")).collect();
    assert_eq!(ids, vec![&json!("Book-0"), &json!("Book-1"), &json!("Book-2")]);
    assert!(list.iter().all(|book| book.get("title") == Some(&json!("Same"))));

    factory.reset_sequence();
    for (i, expected) in list.iter().enumerate() {
        let built = factory.build_with(FieldMap::new().with("title", "Same")).await.unwrap();
        assert_eq!(&built, expected, "element {}", i);
    }
}

#[tokio::test]
async fn test_build_list_zero() {
    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));
    assert!(factory.build_list(0).await.unwrap().is_empty());
    assert_eq!(factory.build().await.unwrap().get("id"), Some(&json!("Book-0")));
}

#[tokio::test]
async fn test_build_connection() {
    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));

    let connection = factory
        .build_connection(5, &ConnectionArgs::first(2).after(offset_to_cursor(0)))
        .await
        .unwrap();

    let ids: Vec<Value> = connection
        .nodes()
        .iter()
        .filter_map(|book| book.get("id").cloned())
        .collect();
    assert_eq!(ids, vec![json!("Book-1"), json!("Book-2")]);
    assert!(connection.page_info.has_next_page);
    assert_eq!(connection.edges[0].cursor, offset_to_cursor(1));
}

#[tokio::test]
async fn test_build_connection_with_inputs() {
    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));

    let connection = factory
        .build_connection_with(2, &ConnectionArgs::default(), FieldMap::new().with("title", "C"))
        .await
        .unwrap();

    assert_eq!(connection.edges.len(), 2);
    assert!(connection
        .into_nodes()
        .iter()
        .all(|book| book.get("title") == Some(&json!("C"))));
}

#[tokio::test]
async fn test_transient_fields() {
    let books = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(book_defaults().with("author", FieldSpec::undefined())),
    );
    let author_books = books.clone();
    let authors = FactoryBuilder::new("Author", AUTHOR_FIELDS)
        .with_transient_fields(FieldMap::new().with("bookCount", 0))
        .define(FactoryOptions::new(
            FieldMap::new()
                .with("id", dynamic_sync(|ctx| json!(format!("Author-{}", ctx.seq()))))
                .with("name", "Komata Mikami")
                .with(
                    "books",
                    dynamic(move |ctx| {
                        let books = author_books.clone();
                        async move {
                            let count = ctx.get_as::<usize>("bookCount").await?.unwrap_or(0);
                            Ok(json!(books.build_list(count).await?))
                        }
                    }),
                ),
        ));

    let author1 = authors.build().await.unwrap();
    assert_eq!(
        author1.to_json(),
        json!({ "id": "Author-0", "name": "Komata Mikami", "books": [] })
    );

    let author2 = authors
        .build_with(FieldMap::new().with("bookCount", 3))
        .await
        .unwrap();
    assert_eq!(
        author2.to_json(),
        json!({
            "id": "Author-1",
            "name": "Komata Mikami",
            "books": [
                { "id": "Book-0", "title": "T" },
                { "id": "Book-1", "title": "T" },
                { "id": "Book-2", "title": "T" },
            ],
        })
    );
    assert!(!author2.contains_key("bookCount"));
}

#[tokio::test]
async fn test_transient_fields_chain_and_traits() {
    let factory = FactoryBuilder::new("Book", BOOK_FIELDS)
        .with_transient_fields(FieldMap::new().with("prefix", "Foo-").with("suffix", "-x"))
        .with_transient_fields(FieldMap::new().with("suffix", FieldSpec::undefined()))
        .define(
            FactoryOptions::new(FieldMap::new().with(
                "id",
                dynamic(|ctx| async move {
                    let prefix = ctx.get_as::<String>("prefix").await?.unwrap_or_default();
                    let suffix = ctx.get_as::<String>("suffix").await?.unwrap_or_default();
                    Ok(json!(format!("{}Book{}", prefix, suffix)))
                }),
            ))
            .with_trait("bar", FieldMap::new().with("prefix", "Bar-")),
        );

    assert_eq!(factory.build().await.unwrap().get("id"), Some(&json!("Foo-Book")));
    assert_eq!(
        factory.use_trait("bar").unwrap().build().await.unwrap().get("id"),
        Some(&json!("Bar-Book"))
    );
    assert_eq!(
        factory
            .build_with(FieldMap::new().with("suffix", "-y"))
            .await
            .unwrap()
            .to_json(),
        json!({ "id": "Foo-Book-y" })
    );
}

#[tokio::test]
async fn test_additional_fields() {
    let books = define_factory("Book", ["id", "title"], FactoryOptions::new(book_defaults()));
    let popular = books.clone();
    let authors = FactoryBuilder::new("Author", AUTHOR_FIELDS)
        .with_additional_fields(["popularBooks"])
        .define(FactoryOptions::new(
            FieldMap::new()
                .with("id", dynamic_sync(|ctx| json!(format!("Author-{}", ctx.seq()))))
                .with("popularBooks", dynamic(move |_| {
                    let books = popular.clone();
                    async move { Ok(json!(books.build_list(1).await?)) }
                })),
        ));

    let author = authors.build().await.unwrap();
    assert_eq!(
        author.to_json(),
        json!({ "id": "Author-0", "popularBooks": [{ "id": "Book-0", "title": "T" }] })
    );
    assert_eq!(authors.field_names(), &["id", "name", "books", "popularBooks"]);
}

#[tokio::test]
async fn test_nested_objects_as_overrides() {
    let registry = SequenceRegistry::new();
    let books = book_builder(&registry).define(FactoryOptions::new(
        book_defaults().with("author", FieldSpec::undefined()),
    ));
    let authors = FactoryBuilder::new("Author", AUTHOR_FIELDS)
        .with_registry(registry.clone())
        .define(FactoryOptions::new(
            FieldMap::new()
                .with("id", dynamic_sync(|ctx| json!(format!("Author-{}", ctx.seq()))))
                .with("name", "Komata Mikami")
                .with("books", FieldSpec::undefined()),
        ));

    let book = books
        .build_with(FieldMap::new().with("author", authors.build().await.unwrap()))
        .await
        .unwrap();
    assert_eq!(
        book.to_json(),
        json!({
            "id": "Book-0",
            "title": "T",
            "author": { "id": "Author-0", "name": "Komata Mikami" },
        })
    );

    let author = authors
        .build_with(FieldMap::new().with("books", vec![book.clone()]))
        .await
        .unwrap();
    assert_eq!(author.get("id"), Some(&json!("Author-1")));
    assert_eq!(author.get("books"), Some(&json!([book.to_json()])));
}

#[tokio::test]
async fn test_build_as_typed() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Book {
        id: String,
        title: String,
        author: Option<String>,
    }

    let factory = define_factory("Book", BOOK_FIELDS, FactoryOptions::new(book_defaults()));
    let book: Book = factory.build_as(FieldMap::new()).await.unwrap();
    assert_eq!(
        book,
        Book {
            id: "Book-0".to_string(),
            title: "T".to_string(),
            author: None,
        }
    );
}

#[tokio::test]
async fn test_resolver_error_fails_build() {
    let factory = define_factory(
        "Book",
        BOOK_FIELDS,
        FactoryOptions::new(book_defaults().with(
            "author",
            dynamic(|_| async move { Err::<Value, _>(FactoryError::resolver("no authors left")) }),
        )),
    );

    let err = factory.build().await.unwrap_err();
    assert_eq!(err.field(), Some("author"));
    assert!(err.to_string().contains("no authors left"));

    let err = factory.build_list(2).await.unwrap_err();
    assert_eq!(err.field(), Some("author"));
}
