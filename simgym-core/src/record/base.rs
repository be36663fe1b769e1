//! Record and its values.
use crate::error::RecordError;
use chrono::prelude::{DateTime, Local};
use std::collections::{hash_map::Iter, HashMap};

/// A value stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single real value, e.g., a reward.
    Scalar(f64),

    /// An integer, e.g., a request id or a step count.
    Integer(i64),

    /// A flag.
    Bool(bool),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A flat array of real values, e.g., an observation.
    Array1(Vec<f64>),

    /// A text value.
    String(String),
}

/// A set of named values.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f64) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair, replacing the previous value of the key.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records, consuming both.
    ///
    /// Values of `record` win over values of `self` for the same key.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges another record into this one in place.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    fn lookup(&self, k: &str) -> Result<&RecordValue, RecordError> {
        self.0
            .get(k)
            .ok_or_else(|| RecordError::RecordKeyError(k.to_string()))
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f64, RecordError> {
        match self.lookup(k)? {
            RecordValue::Scalar(v) => Ok(*v),
            _ => Err(RecordError::RecordValueTypeError("Scalar".to_string())),
        }
    }

    /// Gets an integer value from the record.
    pub fn get_integer(&self, k: &str) -> Result<i64, RecordError> {
        match self.lookup(k)? {
            RecordValue::Integer(v) => Ok(*v),
            _ => Err(RecordError::RecordValueTypeError("Integer".to_string())),
        }
    }

    /// Gets a flag from the record.
    pub fn get_bool(&self, k: &str) -> Result<bool, RecordError> {
        match self.lookup(k)? {
            RecordValue::Bool(v) => Ok(*v),
            _ => Err(RecordError::RecordValueTypeError("Bool".to_string())),
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f64>, RecordError> {
        match self.lookup(k)? {
            RecordValue::Array1(v) => Ok(v.clone()),
            _ => Err(RecordError::RecordValueTypeError("Array1".to_string())),
        }
    }

    /// Gets a timestamp from the record.
    pub fn get_datetime(&self, k: &str) -> Result<DateTime<Local>, RecordError> {
        match self.lookup(k)? {
            RecordValue::DateTime(t) => Ok(*t),
            _ => Err(RecordError::RecordValueTypeError("DateTime".to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, RecordError> {
        match self.lookup(k)? {
            RecordValue::String(s) => Ok(s.clone()),
            _ => Err(RecordError::RecordValueTypeError("String".to_string())),
        }
    }

    /// Returns the number of values in the record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
