//! Integration tests for loading explores from disk.

mod common;

use std::fs;
use std::path::Path;

use lumen::registry::ExploreRegistry;
use lumen::LumenError;
use serde_json::{json, Value};

use common::{orders_explore, orders_explore_json};

fn write_explore(dir: &Path, file: &str, explore: &Value) {
    fs::write(dir.join(file), serde_yaml::to_string(explore).unwrap()).unwrap();
}

fn renamed(name: &str) -> Value {
    let mut explore = orders_explore_json();
    explore["name"] = json!(name);
    explore
}

#[test]
fn loads_yml_and_yaml_files() {
    let dir = tempfile::tempdir().unwrap();
    write_explore(dir.path(), "orders.yml", &orders_explore_json());
    write_explore(dir.path(), "returns.yaml", &renamed("returns"));
    fs::write(dir.path().join("notes.txt"), "not an explore").unwrap();

    let registry = ExploreRegistry::load_from_dir(dir.path()).unwrap();
    let names: Vec<&str> = registry.explores().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["orders", "returns"]);

    let orders = registry.get_explore("orders").unwrap();
    assert_eq!(orders, &orders_explore());
    assert!(registry.get_explore("missing").is_none());
}

#[test]
fn missing_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = ExploreRegistry::load_from_dir(dir.path().join("nope"));
    assert!(matches!(result, Err(LumenError::Validation(_))));
}

#[test]
fn duplicate_explore_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_explore(dir.path(), "a.yml", &orders_explore_json());
    write_explore(dir.path(), "b.yml", &orders_explore_json());

    let err = ExploreRegistry::load_from_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("duplicate explore orders"));
}

#[test]
fn invalid_explores_are_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut explore = orders_explore_json();
    explore["baseTable"] = json!("payments");
    write_explore(dir.path(), "orders.yml", &explore);

    assert!(matches!(
        ExploreRegistry::load_from_dir(dir.path()),
        Err(LumenError::Validation(_))
    ));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("orders.yml"), "name: [unclosed").unwrap();

    assert!(matches!(
        ExploreRegistry::load_from_dir(dir.path()),
        Err(LumenError::Yaml(_))
    ));
}

#[test]
fn from_explores_validates_each_explore() {
    let registry = ExploreRegistry::from_explores(vec![orders_explore()]).unwrap();
    assert_eq!(registry.explores().len(), 1);

    let mut broken = orders_explore_json();
    broken["joinedTables"][0]["sqlOn"] = json!("${payments.id} = ${customers.id}");
    let broken = serde_json::from_value(broken).unwrap();
    assert!(ExploreRegistry::from_explores(vec![broken]).is_err());
}
