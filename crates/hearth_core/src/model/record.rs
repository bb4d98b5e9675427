//! Shared record envelope, scopes and partial updates.
//!
//! # Responsibility
//! - Define the fields every family-scoped record carries.
//! - Define the scope a collection listener is opened against.
//! - Validate required fields before any collaborator call.
//!
//! # Invariants
//! - Every record belongs to exactly one family (`family_id` non-blank).
//! - `id`, `family_id`, `created_by` and `created_at` are immutable once
//!   written; partial updates may not touch them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Document field names that partial updates must never rewrite.
pub const IMMUTABLE_FIELDS: &[&str] = &["id", "familyId", "createdBy", "createdAt"];

/// Validation failure for one record or partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    MissingField(&'static str),
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    EmptyPatch,
    ImmutableField(String),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::InvalidField { field, reason } => write!(f, "{field} {reason}"),
            Self::EmptyPatch => write!(f, "update must change at least one field"),
            Self::ImmutableField(field) => write!(f, "{field} cannot be changed"),
        }
    }
}

impl Error for RecordValidationError {}

/// Common envelope carried by every domain record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Assigned by the datastore; empty on records that were never written.
    #[serde(default)]
    pub id: String,
    pub family_id: String,
    pub created_by: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl RecordMeta {
    /// Builds a fresh envelope for a record that has not been written yet.
    pub fn new(family_id: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            family_id: family_id.into(),
            created_by: created_by.into(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), RecordValidationError> {
        require_text("familyId", &self.family_id)?;
        require_text("createdBy", &self.created_by)?;
        if self.created_at <= 0 {
            return Err(RecordValidationError::InvalidField {
                field: "createdAt",
                reason: "must be a positive epoch timestamp",
            });
        }
        Ok(())
    }
}

/// Shape shared by the eight synchronized domains.
pub trait DomainRecord: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Remote collection name; also used as the store name in logs.
    const COLLECTION: &'static str;
    /// Whether listeners need a budget period in addition to the family.
    const PERIOD_SCOPED: bool = false;

    fn meta(&self) -> &RecordMeta;
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Validates the domain-specific required fields.
    fn validate_fields(&self) -> Result<(), RecordValidationError>;

    /// Validates the envelope, then the domain fields.
    fn validate(&self) -> Result<(), RecordValidationError> {
        self.meta().validate()?;
        self.validate_fields()
    }

    /// Budget period this record is scoped to, for period-scoped domains.
    fn period_id(&self) -> Option<&str> {
        None
    }
}

/// Scope a collection listener is opened against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionScope {
    pub family_id: String,
    pub period_id: Option<String>,
}

impl CollectionScope {
    pub fn family(family_id: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
            period_id: None,
        }
    }

    pub fn family_period(family_id: impl Into<String>, period_id: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
            period_id: Some(period_id.into()),
        }
    }

    /// Returns whether `record` falls inside this scope.
    pub fn contains<T: DomainRecord>(&self, record: &T) -> bool {
        if record.meta().family_id != self.family_id {
            return false;
        }
        match self.period_id.as_deref() {
            Some(period) => record.period_id() == Some(period),
            None => true,
        }
    }

    pub(crate) fn validate_for<T: DomainRecord>(&self) -> Result<(), RecordValidationError> {
        require_text("familyId", &self.family_id)?;
        match (T::PERIOD_SCOPED, self.period_id.as_deref()) {
            (true, None) => Err(RecordValidationError::MissingField("periodId")),
            (true, Some(period)) => require_text("periodId", period),
            (false, _) => Ok(()),
        }
    }
}

impl Display for CollectionScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.period_id {
            Some(period) => write!(f, "{}/{}", self.family_id, period),
            None => write!(f, "{}", self.family_id),
        }
    }
}

/// Partial update expressed in document field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordPatch(Map<String, Value>);

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field, replacing any earlier value for the same field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.0.is_empty() {
            return Err(RecordValidationError::EmptyPatch);
        }
        for field in self.0.keys() {
            if field.trim().is_empty() {
                return Err(RecordValidationError::MissingField("field name"));
            }
            if IMMUTABLE_FIELDS.contains(&field.as_str()) {
                return Err(RecordValidationError::ImmutableField(field.clone()));
            }
        }
        Ok(())
    }

    /// Applies this patch to `record` through its document form.
    pub fn apply_to<T: DomainRecord>(&self, record: &T) -> Result<T, serde_json::Error> {
        let mut document = serde_json::to_value(record)?;
        if let Value::Object(map) = &mut document {
            for (field, value) in &self.0 {
                map.insert(field.clone(), value.clone());
            }
        }
        serde_json::from_value(document)
    }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), RecordValidationError> {
    if value.trim().is_empty() {
        return Err(RecordValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{RecordMeta, RecordPatch, RecordValidationError};

    #[test]
    fn meta_requires_family_and_creator() {
        let missing_family = RecordMeta::new(" ", "u1");
        assert_eq!(
            missing_family.validate(),
            Err(RecordValidationError::MissingField("familyId"))
        );

        let missing_creator = RecordMeta::new("f1", "");
        assert_eq!(
            missing_creator.validate(),
            Err(RecordValidationError::MissingField("createdBy"))
        );

        assert!(RecordMeta::new("f1", "u1").validate().is_ok());
    }

    #[test]
    fn patch_rejects_empty_and_immutable_fields() {
        assert_eq!(
            RecordPatch::new().validate(),
            Err(RecordValidationError::EmptyPatch)
        );

        let moves_family = RecordPatch::new().set("familyId", "f2");
        assert_eq!(
            moves_family.validate(),
            Err(RecordValidationError::ImmutableField("familyId".to_string()))
        );

        assert!(RecordPatch::new().set("checked", true).validate().is_ok());
    }

    #[test]
    fn later_set_replaces_earlier_value() {
        let patch = RecordPatch::new().set("name", "Milk").set("name", "Oat milk");
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("name").and_then(|v| v.as_str()), Some("Oat milk"));
    }
}
