//! Lenient read access to raw webhook JSON.
//!
//! Webhook payloads vary by event kind and are frequently partial. Every accessor
//! here returns `None` (or an empty iterator) on a missing key or a value of the
//! wrong shape, so callers can pick a default instead of failing.

use serde_json::Value;

/// A borrowed view over a raw webhook payload.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a>(&'a Value);

impl<'a> Payload<'a> {
    pub fn new(value: &'a Value) -> Self {
        Payload(value)
    }

    /// Walks `path` through nested objects.
    pub fn get(&self, path: &[&str]) -> Option<&'a Value> {
        path.iter().try_fold(self.0, |value, key| value.get(key))
    }

    /// Returns the string at `path`, if present and a string.
    pub fn str(&self, path: &[&str]) -> Option<&'a str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Returns the string at `path`, or `default`.
    pub fn str_or(&self, path: &[&str], default: &'a str) -> &'a str {
        self.str(path).unwrap_or(default)
    }

    /// Returns the boolean at `path`, or false.
    pub fn flag(&self, path: &[&str]) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns the number at `path` unchanged, or JSON null.
    ///
    /// Used for detail fields such as PR numbers, where a missing value is
    /// recorded as null rather than invented.
    pub fn number_or_null(&self, path: &[&str]) -> Value {
        match self.get(path) {
            Some(n @ Value::Number(_)) => n.clone(),
            _ => Value::Null,
        }
    }

    /// Renders the number at `path` for display, or `?`.
    pub fn number_label(&self, path: &[&str]) -> String {
        match self.get(path) {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => "?".to_string(),
        }
    }

    /// Returns the elements of the array at `path` (empty if absent).
    pub fn array(&self, path: &[&str]) -> &'a [Value] {
        self.get(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the string elements of the array at `path`, skipping non-strings.
    pub fn strings(&self, path: &[&str]) -> impl Iterator<Item = &'a str> + use<'a> {
        self.array(path).iter().filter_map(Value::as_str)
    }
}

/// Returns the final `/`-separated segment of a git ref, or the ref itself.
pub fn short_ref(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}
