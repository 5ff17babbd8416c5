use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_config_defaults() {
    let config = Config::from_lookup(lookup(&[])).expect("defaults should be valid");

    assert_eq!(config.neo4j_uri, "bolt://localhost:7687");
    assert_eq!(config.neo4j_user, "neo4j");
    assert_eq!(config.data_dir, PathBuf::from("output_entities"));
    assert_eq!(config.batch_size, 1000);
    assert_eq!(config.max_retries, 4);
    assert!(!config.dry_run);
}

#[test]
fn test_config_overrides() {
    let config = Config::from_lookup(lookup(&[
        ("NEO4J_URI", "neo4j+s://example.databases.neo4j.io"),
        ("IMPORT_DATA_DIR", "/data/bnb"),
        ("IMPORT_BATCH_SIZE", " 250 "),
        ("IMPORT_MAX_RETRIES", "2"),
        ("IMPORT_DRY_RUN", "true"),
    ]))
    .expect("overrides should be valid");

    assert_eq!(config.neo4j_uri, "neo4j+s://example.databases.neo4j.io");
    assert_eq!(config.data_dir, PathBuf::from("/data/bnb"));
    assert_eq!(config.batch_size, 250);
    assert!(config.dry_run);

    let batch = config.batch_config();
    assert_eq!(batch.batch_size, 250);
    assert_eq!(batch.retry.max_attempts, 2);
}

#[test]
fn test_config_rejects_zero_batch_size() {
    let result = Config::from_lookup(lookup(&[("IMPORT_BATCH_SIZE", "0")]));
    assert!(result.is_err());
}

#[test]
fn test_config_rejects_garbage_numbers() {
    let result = Config::from_lookup(lookup(&[("IMPORT_BATCH_SIZE", "lots")]));
    let message = result.unwrap_err().to_string();
    assert!(message.contains("IMPORT_BATCH_SIZE"), "got: {}", message);

    assert!(Config::from_lookup(lookup(&[("IMPORT_DRY_RUN", "maybe")])).is_err());
}

#[tokio::test]
async fn test_import_from_disk_into_memory_graph() {
    let dir = TempDir::new().unwrap();
    let files = [
        ("customers.json", r#"[{"id": "u1", "name": "Ada", "email": "ada@example.com"}]"#),
        ("managers.json", r#"[{"id": "m1", "name": "Carla", "iban": "IT60X"}]"#),
        (
            "properties.json",
            r#"[{"id": "p1", "name": "Casa", "city": "Rome", "manager_id": "m1"}]"#,
        ),
        ("rooms.json", r#"[{"id": "r1", "property_id": "p1", "beds": 2}]"#),
        (
            "reservations.json",
            r#"[{"id": "b1", "room_id": "r1", "customer_id": "u1", "checkInDate": "2024-03-05"}]"#,
        ),
    ];
    for (name, body) in files {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    let dataset = Dataset::load(&EntityStore::new(dir.path())).unwrap();
    let graph = MemoryGraph::new();
    let config = BatchConfig {
        batch_size: 1,
        retry: test_support::instant_retry(1),
    };

    import(&graph, config, &dataset).await.unwrap();

    assert_eq!(graph.node_count(NodeLabel::User), 2);
    assert_eq!(graph.node_count(NodeLabel::Property), 1);
    assert_eq!(graph.edge_count(RelType::Booked), 1);
    assert_eq!(graph.edge_count(RelType::Manages), 1);
}

#[tokio::test]
async fn test_import_reports_fatal_error() {
    let graph = MemoryGraph::new();
    let result = import(&graph, BatchConfig::default(), &Dataset::default()).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ImportError>(),
        Some(ImportError::EmptyProperties)
    ));
}
