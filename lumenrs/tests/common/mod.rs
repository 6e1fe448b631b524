//! Shared fixtures: an `orders` explore joined to `customers` and, through
//! customers, to `regions`.

#![allow(dead_code)]

use lumen::explore::Explore;
use lumen::metric_query::CompiledMetricQuery;
use serde_json::{json, Value};

pub fn orders_explore_json() -> Value {
    json!({
        "name": "orders",
        "baseTable": "orders",
        "joinedTables": [
            {
                "table": "customers",
                "sqlOn": "${orders.customer_id} = ${customers.id}",
                "compiledSqlOn": "(\"orders\".customer_id) = (\"customers\".id)"
            },
            {
                "table": "regions",
                "sqlOn": "${customers.region_id} = ${regions.id}",
                "compiledSqlOn": "(\"customers\".region_id) = (\"regions\".id)"
            }
        ],
        "tables": {
            "orders": {
                "name": "orders",
                "sqlTable": "\"orders\"",
                "dimensions": {
                    "status": {
                        "name": "status",
                        "table": "orders",
                        "type": "string",
                        "compiledSql": "\"orders\".status"
                    },
                    "amount": {
                        "name": "amount",
                        "table": "orders",
                        "type": "number",
                        "compiledSql": "\"orders\".amount"
                    },
                    "created": {
                        "name": "created",
                        "table": "orders",
                        "type": "timestamp",
                        "compiledSql": "\"orders\".created"
                    },
                    "customer_id": {
                        "name": "customer_id",
                        "table": "orders",
                        "type": "number",
                        "compiledSql": "\"orders\".customer_id"
                    }
                },
                "metrics": {
                    "order_count": {
                        "name": "order_count",
                        "table": "orders",
                        "type": "count",
                        "compiledSql": "COUNT(*)"
                    },
                    "total_amount": {
                        "name": "total_amount",
                        "table": "orders",
                        "type": "sum",
                        "compiledSql": "SUM(\"orders\".amount)"
                    }
                }
            },
            "customers": {
                "name": "customers",
                "sqlTable": "\"customers\"",
                "dimensions": {
                    "name": {
                        "name": "name",
                        "table": "customers",
                        "type": "string",
                        "compiledSql": "\"customers\".name"
                    },
                    "region_id": {
                        "name": "region_id",
                        "table": "customers",
                        "type": "number",
                        "compiledSql": "\"customers\".region_id"
                    }
                },
                "metrics": {
                    "customer_count": {
                        "name": "customer_count",
                        "table": "customers",
                        "type": "count_distinct",
                        "compiledSql": "COUNT(DISTINCT \"customers\".id)"
                    }
                }
            },
            "regions": {
                "name": "regions",
                "sqlTable": "\"regions\"",
                "dimensions": {
                    "name": {
                        "name": "name",
                        "table": "regions",
                        "type": "string",
                        "compiledSql": "\"regions\".name"
                    }
                }
            }
        }
    })
}

pub fn orders_explore() -> Explore {
    serde_json::from_value(orders_explore_json()).unwrap()
}

pub fn query(value: Value) -> CompiledMetricQuery {
    let mut value = value;
    if let Value::Object(map) = &mut value {
        map.entry("exploreName").or_insert(json!("orders"));
    }
    serde_json::from_value(value).unwrap()
}
