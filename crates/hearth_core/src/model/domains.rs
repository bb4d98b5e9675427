//! Household domain records.
//!
//! One struct per synchronized collection. Each embeds the shared
//! `RecordMeta` envelope and validates its own required fields.

use crate::model::record::{require_text, DomainRecord, RecordMeta, RecordValidationError};
use serde::{Deserialize, Serialize};

macro_rules! domain_record {
    ($ty:ty, $collection:literal) => {
        impl DomainRecord for $ty {
            const COLLECTION: &'static str = $collection;

            fn meta(&self) -> &RecordMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut RecordMeta {
                &mut self.meta
            }

            fn validate_fields(&self) -> Result<(), RecordValidationError> {
                self.check_fields()
            }
        }
    };
}

/// Budget cycle (usually a month). At most one is marked active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPeriod {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    pub starts_at: i64,
    pub ends_at: i64,
    #[serde(default)]
    pub is_active: bool,
}

impl BudgetPeriod {
    fn check_fields(&self) -> Result<(), RecordValidationError> {
        require_text("name", &self.name)?;
        if self.ends_at < self.starts_at {
            return Err(RecordValidationError::InvalidField {
                field: "endsAt",
                reason: "must not be earlier than startsAt",
            });
        }
        Ok(())
    }
}

domain_record!(BudgetPeriod, "budget_periods");

/// Planned spending bucket inside one budget period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub period_id: String,
    pub name: String,
    pub planned: f64,
}

impl DomainRecord for BudgetCategory {
    const COLLECTION: &'static str = "budget_categories";
    const PERIOD_SCOPED: bool = true;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn validate_fields(&self) -> Result<(), RecordValidationError> {
        require_text("periodId", &self.period_id)?;
        require_text("name", &self.name)?;
        if !self.planned.is_finite() || self.planned < 0.0 {
            return Err(RecordValidationError::InvalidField {
                field: "planned",
                reason: "must be a non-negative amount",
            });
        }
        Ok(())
    }

    fn period_id(&self) -> Option<&str> {
        Some(self.period_id.as_str())
    }
}

/// Money in or out, optionally attributed to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub category_id: Option<String>,
    pub description: String,
    /// Negative for spending, positive for income.
    pub amount: f64,
    pub occurred_at: i64,
}

impl Transaction {
    fn check_fields(&self) -> Result<(), RecordValidationError> {
        require_text("description", &self.description)?;
        if !self.amount.is_finite() {
            return Err(RecordValidationError::InvalidField {
                field: "amount",
                reason: "must be a finite number",
            });
        }
        Ok(())
    }
}

domain_record!(Transaction, "transactions");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub checked: bool,
}

impl ShoppingItem {
    fn check_fields(&self) -> Result<(), RecordValidationError> {
        require_text("name", &self.name)?;
        if self.quantity == 0 {
            return Err(RecordValidationError::InvalidField {
                field: "quantity",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

domain_record!(ShoppingItem, "shopping_items");

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub assignee_id: Option<String>,
    pub due_at: Option<i64>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    fn check_fields(&self) -> Result<(), RecordValidationError> {
        require_text("title", &self.title)
    }
}

domain_record!(Task, "tasks");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub starts_at: i64,
    pub ends_at: Option<i64>,
    #[serde(default)]
    pub all_day: bool,
}

impl CalendarEvent {
    fn check_fields(&self) -> Result<(), RecordValidationError> {
        require_text("title", &self.title)?;
        if let Some(end) = self.ends_at {
            if end < self.starts_at {
                return Err(RecordValidationError::InvalidField {
                    field: "endsAt",
                    reason: "must not be earlier than startsAt",
                });
            }
        }
        Ok(())
    }
}

domain_record!(CalendarEvent, "calendar_events");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub pinned: bool,
}

impl Note {
    fn check_fields(&self) -> Result<(), RecordValidationError> {
        require_text("title", &self.title)
    }
}

domain_record!(Note, "notes");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// One planned meal on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Calendar day as `YYYY-MM-DD`.
    pub date: String,
    pub slot: MealSlot,
    pub recipe: String,
}

impl MealPlan {
    fn check_fields(&self) -> Result<(), RecordValidationError> {
        require_text("date", &self.date)?;
        require_text("recipe", &self.recipe)
    }
}

domain_record!(MealPlan, "meal_plans");

/// Returns the id of the active budget period in a periods snapshot.
pub fn active_period_id(periods: &[BudgetPeriod]) -> Option<&str> {
    periods
        .iter()
        .find(|period| period.is_active && !period.meta.id.is_empty())
        .map(|period| period.meta.id.as_str())
}
