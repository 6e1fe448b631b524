//! Structural checks on explores before they are registered.

use std::collections::{HashMap, HashSet};

use crate::error::{LumenError, Result};
use crate::explore::Explore;
use crate::query_builder::sql_on_references;

/// Check that an explore is internally consistent: the base and joined tables
/// exist, fields belong to the table holding them, join conditions only
/// reference known tables and join dependencies form a DAG.
pub fn validate_explore(explore: &Explore) -> Result<()> {
    let fail = |message: String| {
        Err(LumenError::Validation(format!(
            "explore {}: {message}",
            explore.name
        )))
    };

    if !explore.tables.contains_key(&explore.base_table) {
        return fail(format!("base table {} not found", explore.base_table));
    }

    for (key, table) in &explore.tables {
        if key != &table.name {
            return fail(format!("table {} is registered as {key}", table.name));
        }
        for dimension in table.dimensions.values() {
            if dimension.table != table.name {
                return fail(format!(
                    "dimension {} declares table {} but belongs to {}",
                    dimension.name, dimension.table, table.name
                ));
            }
        }
        for metric in table.metrics.values() {
            if metric.table != table.name {
                return fail(format!(
                    "metric {} declares table {} but belongs to {}",
                    metric.name, metric.table, table.name
                ));
            }
        }
    }

    let mut edges: HashMap<&str, Vec<String>> = HashMap::new();
    for join in &explore.joined_tables {
        if !explore.tables.contains_key(&join.table) {
            return fail(format!("joined table {} not found", join.table));
        }
        if join.table == explore.base_table {
            return fail(format!("base table {} cannot be joined to itself", join.table));
        }
        let references = sql_on_references(join);
        for reference in &references {
            if !explore.tables.contains_key(reference) {
                return fail(format!(
                    "join {} references unknown table {reference}",
                    join.table
                ));
            }
        }
        edges.insert(
            join.table.as_str(),
            references.into_iter().filter(|r| r != &join.table).collect(),
        );
    }

    let mut done: HashSet<&str> = HashSet::new();
    for start in edges.keys() {
        let mut path: Vec<&str> = Vec::new();
        if let Some(table) = find_cycle(start, &edges, &mut path, &mut done) {
            return fail(format!("join cycle through {table}"));
        }
    }
    Ok(())
}

fn find_cycle<'a>(
    table: &'a str,
    edges: &'a HashMap<&'a str, Vec<String>>,
    path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Option<&'a str> {
    if done.contains(table) {
        return None;
    }
    if path.contains(&table) {
        return Some(table);
    }
    path.push(table);
    if let Some(next) = edges.get(table) {
        for reference in next {
            if let Some(cycle) = find_cycle(reference, edges, path, done) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    done.insert(table);
    None
}
