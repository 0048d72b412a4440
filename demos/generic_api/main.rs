//! Generic API demo: the `Generic` / `GenericRelation` models served from
//! an in-memory store
//!
//! ```text
//! cargo run --example generic_api [path/to/eureka.yaml]
//! curl 'http://127.0.0.1:3000/api/1/generics?filter[integer][$gt]=7&sort=-integer'
//! ```

use chrono::NaiveDate;
use eureka::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/generic_api/eureka.yaml");

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = EurekaConfig::from_yaml_file(&path)?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log)),
        )
        .init();

    let registry = config.schema_registry()?;
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::for_registry(&registry));
    let seeded = store.batch_sync(fixtures()?).await?;
    tracing::info!(records = seeded.len(), "fixtures loaded");

    println!("🚀 Starting eureka on http://{}", config.address());
    println!("\n📚 Routes for every model:");
    println!("    GET    {}/{{plural}}                               - Query a collection", config.api_root_prefix);
    println!("    POST   {}/{{plural}}                               - Create a record", config.api_root_prefix);
    println!("    GET    {}/{{plural}}/i/group-by/{{property}}         - Count per value", config.api_root_prefix);
    println!("    GET    {}/{{plural}}/{{id}}                          - Fetch a record", config.api_root_prefix);
    println!("    PATCH  {}/{{plural}}/{{id}}                          - Update a record", config.api_root_prefix);
    println!("    GET    {}/{{plural}}/{{id}}/relationships/{{rel}}      - Relationship linkage", config.api_root_prefix);
    println!("    PATCH  {}/{{plural}}/{{id}}/relationships/{{rel}}      - Replace a relationship", config.api_root_prefix);
    println!("    GET    {}/{{plural}}/{{id}}/{{rel}}                    - Related resources", config.api_root_prefix);

    ServerBuilder::new()
        .with_registry(registry)
        .with_shared_store(store)
        .with_api_root_prefix(config.api_root_prefix.clone())
        .serve(&config.address())
        .await
}

/// Two relations, ten generics pointing at them, a few public records and users
fn fixtures() -> Result<Vec<Record>> {
    let mut records = vec![
        Record::new("GenericRelation", "relation0")
            .with("text", FieldValue::from("relation 0"))
            .with("arf", FieldValue::from("bla")),
        Record::new("GenericRelation", "relation1")
            .with("text", FieldValue::from("relation 1"))
            .with("arf", FieldValue::from("ble")),
    ];

    for i in 1..=10u32 {
        let date = NaiveDate::from_ymd_opt(1984, 8, i)
            .ok_or_else(|| anyhow::anyhow!("invalid fixture date 1984-08-{}", i))?;
        records.push(
            Record::new("Generic", format!("generic{}", i))
                .with("text", FieldValue::from(format!("hello world {}", i)))
                .with("boolean", FieldValue::Boolean(i % 2 == 1))
                .with("integer", FieldValue::Integer(i64::from(i)))
                .with("float", FieldValue::Float(f64::from(i) + 0.14))
                .with("date", FieldValue::Date(date))
                .with(
                    "relation",
                    Reference::new("GenericRelation", format!("relation{}", i % 2)),
                ),
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

    Ok(records)
}
