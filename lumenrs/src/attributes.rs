//! User attribute substitution and field-level access checks.
//!
//! SQL fragments written by model authors may reference the requesting user's
//! attributes with `${ld.attribute.<name>}` (or the `lightdash` / `attributes` /
//! `attr` spellings) and intrinsic attributes with `${ld.user.<name>}`.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dialect::WarehouseDialect;
use crate::error::{LumenError, Result};
use crate::explore::{AttributeValue, RequiredAttributes};

/// Attribute name -> values held by the requesting user.
pub type UserAttributeValueMap = BTreeMap<String, Vec<String>>;

/// Attributes derived from the user record itself, such as `email`.
pub type IntrinsicUserAttributes = BTreeMap<String, AttributeValue>;

static USER_ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(?:lightdash|ld)\.(?:attribute|attributes|attr)\.(\w+)\}")
        .expect("user attribute pattern is valid")
});

static INTRINSIC_ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(?:lightdash|ld)\.(?:user)\.(\w+)\}").expect("intrinsic pattern is valid")
});

/// Replace attribute placeholders in `sql` with quoted literal values.
///
/// User attributes are substituted before intrinsic ones. When at least one
/// placeholder of a kind is replaced the whole fragment is wrapped in
/// parentheses so it composes safely with surrounding `AND`/`OR`.
pub fn replace_user_attributes(
    sql: &str,
    intrinsic: &IntrinsicUserAttributes,
    user: &UserAttributeValueMap,
    dialect: &dyn WarehouseDialect,
    context: &str,
) -> Result<String> {
    let replaced = replace_attributes(&USER_ATTRIBUTE_RE, sql, dialect, context, |name| {
        user.get(name).map(|values| values.iter().map(String::as_str).collect())
    })?;
    replace_attributes(&INTRINSIC_ATTRIBUTE_RE, &replaced, dialect, context, |name| {
        intrinsic
            .get(name)
            .map(|value| if value.is_empty() { Vec::new() } else { value.values() })
    })
}

fn replace_attributes<'a, F>(
    regex: &Regex,
    sql: &str,
    dialect: &dyn WarehouseDialect,
    context: &str,
    lookup: F,
) -> Result<String>
where
    F: Fn(&str) -> Option<Vec<&'a str>>,
{
    if !regex.is_match(sql) {
        return Ok(sql.to_string());
    }

    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for caps in regex.captures_iter(sql) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        let values = lookup(name).ok_or_else(|| {
            LumenError::Forbidden(format!("Missing user attribute \"{name}\" on {context}"))
        })?;
        if values.is_empty() {
            return Err(LumenError::Forbidden(format!(
                "Invalid or missing user attribute \"{name}\" on {context}"
            )));
        }
        let rendered: Vec<String> = values.iter().map(|v| dialect.quote_string(v)).collect();
        out.push_str(&sql[last..whole.start()]);
        out.push_str(&rendered.join(", "));
        last = whole.end();
    }
    out.push_str(&sql[last..]);

    Ok(format!("({out})"))
}

/// Fail with `Forbidden` unless the user satisfies every required attribute.
///
/// A list requirement is satisfied by holding any one of its values.
pub fn assert_valid_required_attributes(
    required: Option<&RequiredAttributes>,
    user: &UserAttributeValueMap,
    context: &str,
) -> Result<()> {
    let Some(required) = required else {
        return Ok(());
    };
    for (name, expected) in required {
        let held = user.get(name);
        let satisfied = expected
            .values()
            .iter()
            .any(|value| held.is_some_and(|held| held.iter().any(|h| h == value)));
        if !satisfied {
            return Err(LumenError::Forbidden(format!(
                "Invalid or missing user attribute \"{name}\" on {context}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PostgresDialect;

    fn user(pairs: &[(&str, &[&str])]) -> UserAttributeValueMap {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn fragment_without_placeholders_is_unchanged() {
        let sql = replace_user_attributes(
            "\"orders\".status = 'shipped'",
            &IntrinsicUserAttributes::new(),
            &UserAttributeValueMap::new(),
            &PostgresDialect::default(),
            "sql_filter",
        )
        .unwrap();
        assert_eq!(sql, "\"orders\".status = 'shipped'");
    }

    #[test]
    fn substitutes_all_spellings() {
        let attrs = user(&[("country", &["US"])]);
        for placeholder in [
            "${ld.attribute.country}",
            "${lightdash.attributes.country}",
            "${ld.attr.country}",
        ] {
            let sql = replace_user_attributes(
                &format!("country = {placeholder}"),
                &IntrinsicUserAttributes::new(),
                &attrs,
                &PostgresDialect::default(),
                "sql_filter",
            )
            .unwrap();
            assert_eq!(sql, "(country = 'US')");
        }
    }

    #[test]
    fn list_values_are_comma_joined() {
        let attrs = user(&[("country", &["US", "UK"])]);
        let sql = replace_user_attributes(
            "country IN (${ld.attr.country})",
            &IntrinsicUserAttributes::new(),
            &attrs,
            &PostgresDialect::default(),
            "sql_filter",
        )
        .unwrap();
        assert_eq!(sql, "(country IN ('US', 'UK'))");
    }

    #[test]
    fn intrinsic_attributes_use_user_namespace() {
        let mut intrinsic = IntrinsicUserAttributes::new();
        intrinsic.insert("email".into(), AttributeValue::One("a@b.com".into()));
        let sql = replace_user_attributes(
            "owner = ${ld.user.email}",
            &intrinsic,
            &UserAttributeValueMap::new(),
            &PostgresDialect::default(),
            "sql_on",
        )
        .unwrap();
        assert_eq!(sql, "(owner = 'a@b.com')");
    }

    #[test]
    fn missing_or_empty_attribute_is_forbidden() {
        let err = replace_user_attributes(
            "country = ${ld.attr.country}",
            &IntrinsicUserAttributes::new(),
            &UserAttributeValueMap::new(),
            &PostgresDialect::default(),
            "sql_filter",
        )
        .unwrap_err();
        let LumenError::Forbidden(message) = &err else {
            panic!("expected Forbidden, got {err:?}");
        };
        assert!(message.contains("country") && !message.contains("= "));

        let err = replace_user_attributes(
            "country = ${ld.attr.country}",
            &IntrinsicUserAttributes::new(),
            &user(&[("country", &[])]),
            &PostgresDialect::default(),
            "sql_filter",
        )
        .unwrap_err();
        assert!(matches!(err, LumenError::Forbidden(_)));
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        let attrs = user(&[("name", &["O'Brien"])]);
        let sql = replace_user_attributes(
            "name = ${ld.attr.name}",
            &IntrinsicUserAttributes::new(),
            &attrs,
            &PostgresDialect::default(),
            "sql_filter",
        )
        .unwrap();
        assert_eq!(sql, "(name = 'O''Brien')");
    }

    #[test]
    fn required_attributes_accept_any_listed_value() {
        let mut required = RequiredAttributes::new();
        required.insert(
            "region".into(),
            AttributeValue::Many(vec!["emea".into(), "apac".into()]),
        );
        let ok = assert_valid_required_attributes(
            Some(&required),
            &user(&[("region", &["apac"])]),
            "dimension: \"orders_status\"",
        );
        assert!(ok.is_ok());

        let err = assert_valid_required_attributes(
            Some(&required),
            &user(&[("region", &["amer"])]),
            "dimension: \"orders_status\"",
        )
        .unwrap_err();
        assert!(matches!(err, LumenError::Forbidden(_)));
        assert!(assert_valid_required_attributes(None, &UserAttributeValueMap::new(), "x").is_ok());
    }
}
