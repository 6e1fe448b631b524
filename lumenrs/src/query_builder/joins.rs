use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::explore::{Explore, ExploreJoin};

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([a-zA-Z0-9_]+)(?:\.([a-zA-Z0-9_]+))?\}").expect("reference pattern is valid")
});

/// Tables referenced by `${table.field}` in a raw join condition. A bare
/// `${TABLE}` or `${field}` refers to the join's own table.
pub(crate) fn sql_on_references(join: &ExploreJoin) -> Vec<String> {
    REFERENCE_RE
        .captures_iter(&join.sql_on)
        .filter_map(|caps| {
            let first = caps.get(1)?.as_str();
            match caps.get(2) {
                Some(_) if first != "TABLE" => Some(first.to_string()),
                _ => Some(join.table.clone()),
            }
        })
        .collect()
}

/// Close `seeds` over the tables their joins depend on.
///
/// A joined table's `sql_on` may reference other tables that then need to be
/// joined too. The walk keeps a visited set so a malformed cyclic graph
/// still terminates.
pub fn resolve_joined_tables(explore: &Explore, seeds: &BTreeSet<String>) -> BTreeSet<String> {
    let mut needed: BTreeSet<String> = seeds.clone();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<String> = seeds.iter().cloned().collect();

    while let Some(table) = stack.pop() {
        for join in explore.joined_tables.iter().filter(|j| j.table == table) {
            if !visited.insert(join.table.as_str()) {
                continue;
            }
            for reference in sql_on_references(join) {
                if needed.insert(reference.clone()) {
                    stack.push(reference);
                }
            }
        }
    }
    needed
}

/// Joins to emit, in explore order: required ones plus every `always` join.
pub(crate) fn joins_to_emit<'a>(
    explore: &'a Explore,
    required: &BTreeSet<String>,
) -> Vec<&'a ExploreJoin> {
    explore
        .joined_tables
        .iter()
        .filter(|join| join.always || required.contains(&join.table))
        .collect()
}
