//! Shared fixtures for the HTTP route tests
#![allow(dead_code)]

use axum_test::TestServer;
use chrono::NaiveDate;
use eureka::prelude::*;
use std::sync::Arc;

pub const PREFIX: &str = "/api/1";

pub const JSON_API_MIME: &str = "application/vnd.api+json";

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .register(
            Schema::new("Generic")
                .property("text", PropertyType::String)
                .property("integer", PropertyType::Integer)
                .property("float", PropertyType::Float)
                .property("boolean", PropertyType::Boolean)
                .property("date", PropertyType::Date)
                .property("datetime", PropertyType::DateTime)
                .with_property(PropertyDef::new("array", PropertyType::String).multi())
                .relation("relation", "GenericRelation")
                .relations("relations", "GenericRelation"),
        )
        .register(
            Schema::new("GenericRelation")
                .property("text", PropertyType::String)
                .property("arf", PropertyType::String)
                .property("related", PropertyType::Boolean),
        )
        .register(Schema::new("PublicStuff").property("title", PropertyType::String))
        .register(
            Schema::new("User")
                .property("login", PropertyType::String)
                .with_property(PropertyDef::new("email", PropertyType::String).unique()),
        )
        .build()
        .expect("test registry should build")
}

/// relation0/1, generic1..10, publicstuff0..9, user0..4
pub fn fixtures() -> Vec<Record> {
    let mut records = vec![
        Record::new("GenericRelation", "relation0")
            .with("text", FieldValue::from("relation 0"))
            .with("arf", FieldValue::from("bla")),
        Record::new("GenericRelation", "relation1")
            .with("text", FieldValue::from("relation 1"))
            .with("arf", FieldValue::from("ble")),
    ];

    // odd generics also point at both relations through `relations`
    for i in 1..=10i64 {
        let relations = if i % 2 == 1 {
            vec![
                Reference::new("GenericRelation", "relation0"),
                Reference::new("GenericRelation", "relation1"),
            ]
        } else {
            Vec::new()
        };
        records.push(
            Record::new("Generic", format!("generic{}", i))
                .with("text", FieldValue::from(format!("hello world {}", i)))
                .with("boolean", FieldValue::Boolean(i % 2 == 1))
                .with("integer", FieldValue::Integer(i))
                .with("float", FieldValue::Float(i as f64 + 0.14))
                .with(
                    "date",
                    FieldValue::Date(NaiveDate::from_ymd_opt(1984, 8, i as u32).unwrap()),
                )
                .with(
                    "relation",
                    Reference::new("GenericRelation", format!("relation{}", i % 2)),
                )
                .with("relations", relations),
        );
    }

    for i in 0..10 {
        records.push(
            Record::new("PublicStuff", format!("publicstuff{}", i))
                .with("title", FieldValue::from(format!("public hello {}", i))),
        );
    }

    for i in 0..5 {
        records.push(
            Record::new("User", format!("user{}", i))
                .with("login", FieldValue::from(format!("user{}", i)))
                .with("email", FieldValue::from(format!("user{}@test.com", i))),
        );
    }

    records
}

/// Test server over a seeded in-memory store, routes under [`PREFIX`]
pub async fn create_test_server() -> (TestServer, Arc<dyn Store>) {
    let registry = registry();
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::for_registry(&registry));
    store
        .batch_sync(fixtures())
        .await
        .expect("fixtures should load");

    let app = ServerBuilder::new()
        .with_registry(registry)
        .with_shared_store(store.clone())
        .with_api_root_prefix(PREFIX)
        .build()
        .expect("Failed to build app");

    let server = TestServer::new(app);
    (server, store)
}

pub fn url(path: &str) -> String {
    format!("{}{}", PREFIX, path)
}
