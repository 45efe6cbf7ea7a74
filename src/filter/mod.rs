// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builder for server-side filter expressions.
//!
//! The API filters list endpoints through a JSON document sent in the
//! `X-Filter` header. [`Filter`] renders that document; the client never
//! applies it locally.
//!
//! # Example
//!
//! ```
//! use linode_api_rs::filter::{Filter, Operator};
//!
//! let filter = Filter::or(vec![
//!     Filter::eq("region", "us-east"),
//!     Filter::compare("label", Operator::Contains, "web"),
//! ]);
//! assert_eq!(
//!     filter.to_json(),
//!     r#"{"+or":[{"region":"us-east"},{"label":{"+contains":"web"}}]}"#
//! );
//! ```

use std::fmt;

use serde_json::{Map, Value};

/// Comparison operators understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl Operator {
    /// Wire name of the operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "+eq",
            Operator::Neq => "+neq",
            Operator::Gt => "+gt",
            Operator::Gte => "+gte",
            Operator::Lt => "+lt",
            Operator::Lte => "+lte",
            Operator::Contains => "+contains",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `column <op> value` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Comparison {
    fn to_value(&self) -> Value {
        let mut map = Map::new();
        let inner = match self.operator {
            Operator::Eq => self.value.clone(),
            op => {
                let mut test = Map::new();
                test.insert(op.as_str().to_string(), self.value.clone());
                Value::Object(test)
            }
        };
        map.insert(self.column.clone(), inner);
        Value::Object(map)
    }
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Comparison(Comparison),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// `column <operator> value`.
    pub fn compare(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Filter::Comparison(Comparison {
            column: column.into(),
            operator,
            value: value.into(),
        })
    }

    /// `column == value`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    /// All children must match.
    #[must_use]
    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    /// Any child may match.
    #[must_use]
    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    /// Render as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let (key, children) = match self {
            Filter::Comparison(c) => return c.to_value(),
            Filter::And(children) => ("+and", children),
            Filter::Or(children) => ("+or", children),
        };
        let mut map = Map::new();
        map.insert(
            key.to_string(),
            Value::Array(children.iter().map(Filter::to_value).collect()),
        );
        Value::Object(map)
    }

    /// Render as the string sent in `X-Filter`.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl From<Comparison> for Filter {
    fn from(c: Comparison) -> Self {
        Filter::Comparison(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_names() {
        let names: Vec<_> = [
            Operator::Eq,
            Operator::Neq,
            Operator::Gt,
            Operator::Gte,
            Operator::Lt,
            Operator::Lte,
            Operator::Contains,
        ]
        .iter()
        .map(Operator::to_string)
        .collect();
        assert_eq!(
            names,
            ["+eq", "+neq", "+gt", "+gte", "+lt", "+lte", "+contains"]
        );
    }

    #[test]
    fn test_eq_is_rendered_bare() {
        assert_eq!(Filter::eq("id", 123).to_value(), json!({"id": 123}));
        assert_eq!(
            Filter::eq("label", "web-1").to_value(),
            json!({"label": "web-1"})
        );
    }

    #[test]
    fn test_other_operators_are_nested() {
        assert_eq!(
            Filter::compare("id", Operator::Gte, 10).to_value(),
            json!({"id": {"+gte": 10}})
        );
    }

    #[test]
    fn test_logical_groups() {
        let filter = Filter::and(vec![
            Filter::eq("entity.type", "linode"),
            Filter::or(vec![
                Filter::eq("action", "linode_boot"),
                Filter::eq("action", "linode_reboot"),
            ]),
        ]);
        assert_eq!(
            filter.to_value(),
            json!({"+and": [
                {"entity.type": "linode"},
                {"+or": [{"action": "linode_boot"}, {"action": "linode_reboot"}]}
            ]})
        );
    }
}
