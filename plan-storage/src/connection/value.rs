//! Dialect-neutral parameter and result values.

use plan_core::errors::StorageError;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&Uuid> for SqlValue {
    fn from(v: &Uuid) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Build a `Vec<SqlValue>` from heterogeneous expressions.
#[macro_export]
macro_rules! sql_params {
    () => { Vec::<$crate::connection::SqlValue>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::connection::SqlValue::from($value)),+]
    };
}

/// One result row, columns in select order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, idx: usize) -> Result<&SqlValue, StorageError> {
        self.values
            .get(idx)
            .ok_or_else(|| StorageError::invalid_value(format!("no column at index {idx}")))
    }

    pub fn get_opt_i64(&self, idx: usize) -> Result<Option<i64>, StorageError> {
        match self.value(idx)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(v) => Ok(Some(*v)),
            // MySQL returns SUM() over integers as a decimal
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
            SqlValue::Real(v) if v.fract() == 0.0 => {
                if *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    Ok(Some(*v as i64))
                } else {
                    Err(StorageError::invalid_value(format!("column {idx}: {v} out of range for i64")))
                }
            }
            SqlValue::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| StorageError::invalid_value(format!("column {idx}: '{s}' is not an integer"))),
            other => Err(StorageError::invalid_value(format!(
                "column {idx}: expected integer, got {other:?}"
            ))),
        }
    }

    pub fn get_i64(&self, idx: usize) -> Result<i64, StorageError> {
        self.get_opt_i64(idx)?
            .ok_or_else(|| StorageError::invalid_value(format!("column {idx} is NULL")))
    }

    pub fn get_i32(&self, idx: usize) -> Result<i32, StorageError> {
        let v = self.get_i64(idx)?;
        i32::try_from(v)
            .map_err(|_| StorageError::invalid_value(format!("column {idx}: {v} out of range for i32")))
    }

    pub fn get_f64(&self, idx: usize) -> Result<f64, StorageError> {
        match self.value(idx)? {
            SqlValue::Real(v) => Ok(*v),
            SqlValue::Integer(v) => Ok(*v as f64),
            other => Err(StorageError::invalid_value(format!(
                "column {idx}: expected real, got {other:?}"
            ))),
        }
    }

    pub fn get_bool(&self, idx: usize) -> Result<bool, StorageError> {
        Ok(self.get_i64(idx)? != 0)
    }

    pub fn get_opt_string(&self, idx: usize) -> Result<Option<String>, StorageError> {
        match self.value(idx)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s.clone())),
            SqlValue::Integer(v) => Ok(Some(v.to_string())),
            SqlValue::Real(v) => Ok(Some(v.to_string())),
        }
    }

    pub fn get_string(&self, idx: usize) -> Result<String, StorageError> {
        self.get_opt_string(idx)?
            .ok_or_else(|| StorageError::invalid_value(format!("column {idx} is NULL")))
    }

    pub fn get_uuid(&self, idx: usize) -> Result<Uuid, StorageError> {
        let raw = self.get_string(idx)?;
        Uuid::parse_str(&raw)
            .map_err(|e| StorageError::invalid_value(format!("column {idx}: bad uuid '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_to_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
        assert_eq!(SqlValue::from(true), SqlValue::Integer(1));
    }

    #[test]
    fn row_accessors_convert() {
        let id = Uuid::new_v4();
        let row = Row::new(sql_params![42_i64, 1.5_f64, "7", id, None::<String>]);
        assert_eq!(row.get_i64(0).unwrap(), 42);
        assert_eq!(row.get_f64(0).unwrap(), 42.0);
        assert_eq!(row.get_f64(1).unwrap(), 1.5);
        assert_eq!(row.get_i64(2).unwrap(), 7);
        assert_eq!(row.get_uuid(3).unwrap(), id);
        assert_eq!(row.get_opt_string(4).unwrap(), None);
        assert!(row.get_string(4).is_err());
        assert!(row.value(5).is_err());
    }

    #[test]
    fn fractional_real_is_not_an_integer() {
        let row = Row::new(vec![SqlValue::Real(2.5)]);
        assert!(row.get_i64(0).is_err());
    }

    #[test]
    fn whole_real_outside_i64_is_rejected() {
        let row = Row::new(vec![SqlValue::Real(1e19), SqlValue::Real(-1e19), SqlValue::Real(-9.0e18)]);
        assert!(row.get_i64(0).is_err());
        assert!(row.get_i64(1).is_err());
        assert_eq!(row.get_i64(2).unwrap(), -9_000_000_000_000_000_000);
    }
}
