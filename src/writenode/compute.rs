//! The path computer.
//!
//! Builds a render path from the work-file fields, a handful of synthetic
//! fields, the output name and the context. Computation is pure: the same
//! inputs (and the same date) always give the same path or the same error.

use chrono::{Datelike, Local, NaiveDate};
use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use tracing::trace;

use crate::constants::{
    DAY_KEY, EYE_KEY, EYE_PLACEHOLDER, HEIGHT_KEY, MONTH_KEY, OUTPUT_KEYS, SEQ_KEY, SEQ_PLACEHOLDER,
    WIDTH_KEY, YEAR_KEY,
};
use crate::context::ContextFieldProvider;
use crate::core::PathComputationError;
use crate::templating::{FieldValue, Template};

/// Source of the current date for the `YYYY`/`MM`/`DD` fields.
pub trait Clock: Debug {
    /// Today's date.
    fn today(&self) -> NaiveDate;
}

/// The local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock stuck on a settable date.
#[derive(Debug, Clone)]
pub struct FixedClock {
    date: Cell<NaiveDate>,
}

impl FixedClock {
    /// Creates a clock reading `date`.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date: Cell::new(date),
        }
    }

    /// Moves the clock.
    pub fn set(&self, date: NaiveDate) {
        self.date.set(date);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date.get()
    }
}

/// Computes render paths for one configuration.
#[derive(Debug, Clone)]
pub struct PathComputer {
    fields: ContextFieldProvider,
    clock: Rc<dyn Clock>,
}

impl PathComputer {
    /// Creates a computer reading fields from `fields` and dates from `clock`.
    #[must_use]
    pub fn new(fields: ContextFieldProvider, clock: Rc<dyn Clock>) -> Self {
        Self {
            fields,
            clock,
        }
    }

    /// The field provider.
    #[must_use]
    pub const fn field_provider(&self) -> &ContextFieldProvider {
        &self.fields
    }

    /// Computes a path.
    ///
    /// # Errors
    ///
    /// - [`PathComputationError::MissingTemplate`] without a template
    /// - [`PathComputationError::NotAWorkFile`] when the script is unsaved
    ///   or outside the work area
    /// - [`PathComputationError::OutputNameRequired`] when a required output
    ///   key has no value
    /// - [`PathComputationError::IllegalOutputName`] when the key rejects the
    ///   output name
    /// - [`PathComputationError::Template`] when the template cannot be applied
    pub fn compute(
        &self,
        template: Option<&dyn Template>,
        script_path: Option<&str>,
        width: i64,
        height: i64,
        output_name: &str,
    ) -> Result<String, PathComputationError> {
        let template = template.ok_or(PathComputationError::MissingTemplate)?;

        let mut fields = self.fields.current_script_fields(script_path);
        if fields.is_empty() {
            return Err(PathComputationError::NotAWorkFile);
        }

        fields.insert(SEQ_KEY.to_string(), SEQ_PLACEHOLDER.into());
        fields.insert(EYE_KEY.to_string(), EYE_PLACEHOLDER.into());
        fields.insert(WIDTH_KEY.to_string(), FieldValue::Int(width));
        fields.insert(HEIGHT_KEY.to_string(), FieldValue::Int(height));

        let today = self.clock.today();
        fields.insert(YEAR_KEY.to_string(), FieldValue::Int(i64::from(today.year())));
        fields.insert(MONTH_KEY.to_string(), FieldValue::Int(i64::from(today.month())));
        fields.insert(DAY_KEY.to_string(), FieldValue::Int(i64::from(today.day())));

        for key in OUTPUT_KEYS {
            fields.remove(key);
            if !template.has_key(key) {
                continue;
            }
            if output_name.is_empty() {
                if !template.key_is_optional(key) {
                    return Err(PathComputationError::OutputNameRequired {
                        key: key.to_string(),
                    });
                }
                continue;
            }
            let value = FieldValue::from(output_name);
            if !template.validate_value(key, &value) {
                return Err(PathComputationError::IllegalOutputName {
                    name: output_name.to_string(),
                });
            }
            fields.insert(key.to_string(), value);
        }

        for (key, value) in self.fields.context_fields(template) {
            fields.entry(key).or_insert(value);
        }

        let path = template.apply_fields(&fields)?.replace('\\', "/");
        trace!("Computed path from template '{}': {}", template.name(), path);
        Ok(path)
    }
}
