use sea_orm::sea_query::{Alias, Expr, IntoColumnRef, SimpleExpr};
use sea_orm::{Order, Value};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// One predicate: column name, comparison mode, bind value.
///
/// Predicates combine by conjunction in the order they are supplied.
/// `is_full_text_search` switches the predicate to a boolean-mode
/// full-text match (MySQL `MATCH ... AGAINST`); `is_like` wraps the
/// value in `%` wildcards and compares with `LIKE`; otherwise the
/// predicate is plain equality. Full-text wins when both flags are set.
///
/// On the wire the two flags accept native booleans as well as the
/// string encodings `"1"` and `"true"`; anything else is falsy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Where {
    pub name: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_like: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_full_text_search: bool,
    #[serde(default)]
    pub value: JsonValue,
}

impl Where {
    /// Equality predicate on `name`.
    pub fn eq(name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            is_like: false,
            is_full_text_search: false,
            value: value.into(),
        }
    }

    /// Substring predicate: matches rows whose `name` contains `value`.
    pub fn like(name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            is_like: true,
            is_full_text_search: false,
            value: value.into(),
        }
    }

    /// Boolean-mode full-text predicate. Requires a FULLTEXT index on
    /// the column to be of any use.
    pub fn full_text(name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            is_like: false,
            is_full_text_search: true,
            value: value.into(),
        }
    }

    pub(crate) fn to_expr(&self) -> SimpleExpr {
        if self.is_full_text_search {
            let term = if self.is_like {
                Value::from(self.wildcard_pattern())
            } else {
                json_scalar(&self.value)
            };
            return Expr::cust_with_values(
                format!("MATCH({}) AGAINST (? IN BOOLEAN MODE)", self.name),
                [term],
            );
        }

        if self.is_like {
            return Expr::col(Alias::new(self.name.as_str())).like(self.wildcard_pattern());
        }

        Expr::col(Alias::new(self.name.as_str())).eq(json_scalar(&self.value))
    }

    fn wildcard_pattern(&self) -> String {
        let raw = match &self.value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!("%{raw}%")
    }
}

/// One sort key. Contributes nothing unless `field` is non-empty and
/// `direction` is exactly `"asc"` or `"desc"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: String,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: "asc".to_string(),
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: "desc".to_string(),
        }
    }

    pub(crate) fn to_order(&self) -> Option<(SimpleExpr, Order)> {
        if self.field.is_empty() {
            return None;
        }
        let direction = match self.direction.as_str() {
            "asc" => Order::Asc,
            "desc" => Order::Desc,
            _ => return None,
        };
        let column = SimpleExpr::Column(Alias::new(self.field.as_str()).into_column_ref());
        Some((column, direction))
    }
}

/// Maps a JSON scalar onto a bind value. Compound JSON falls back to a
/// JSON-typed bind.
pub(crate) fn json_scalar(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Int(None),
        JsonValue::Bool(b) => Value::Bool(Some(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::BigInt(Some(i))
            } else if let Some(u) = n.as_u64() {
                Value::BigUnsigned(Some(u))
            } else {
                Value::Double(n.as_f64())
            }
        }
        JsonValue::String(s) => Value::String(Some(Box::new(s.clone()))),
        other => Value::Json(Some(Box::new(other.clone()))),
    }
}

/// Accepts `true`/`false`, `"1"`/`"true"`, or nothing. Every other
/// value is falsy.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Text(s)) => s == "1" || s == "true",
        None => false,
    })
}
