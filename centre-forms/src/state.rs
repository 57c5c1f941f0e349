//! Form state controller
//!
//! Owns the field-value map and per-field validation errors. Every mutation
//! goes through a controller operation, is atomic with respect to a single
//! field, and is checked against the schema at the boundary: unknown keys,
//! read-only fields, and options outside a field's declared set are refused
//! rather than detected later.

use std::collections::BTreeMap;

use crate::schema::{FieldKind, FormSchema, NarrativeStep, SchemaError, StorySet};
use crate::types::{FieldValue, QuestionResponse, RecordingMode, RespondentCategory};
use crate::ImageUpload;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no field named '{0}' in this form")]
    UnknownField(String),

    #[error("field '{0}' is read-only")]
    ReadOnlyField(String),

    #[error("field '{key}' does not accept {rejected} input")]
    KindMismatch { key: String, rejected: &'static str },

    #[error("'{option}' is not an allowed option for field '{key}'")]
    UnknownOption { key: String, option: String },

    #[error("this form has no narrative step")]
    NoNarrativeStep,

    #[error("no question numbered {0} in the active story set")]
    UnknownQuestion(u32),

    #[error("'{bucket}' is not a valid count bucket for question {question}")]
    UnknownBucket { question: u32, bucket: String },
}

/// Field key mapped to a human-readable message.
///
/// Recomputed wholesale on each validation pass; individual entries are
/// cleared as the respondent corrects fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.entries.insert(key.into(), message.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn clear_field(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Error key for a narrative question, matching the per-question inputs.
pub fn question_key(question_number: u32) -> String {
    format!("q{question_number}")
}

/// The single owner of all mutable form state for one session.
#[derive(Debug, Clone)]
pub struct FormController {
    schema: FormSchema,
    narrative: Option<NarrativeStep>,
    story: Option<StorySet>,
    values: BTreeMap<String, FieldValue>,
    errors: ValidationErrors,
}

impl FormController {
    /// Build a controller for a schema, resolving the story set up front so
    /// a misconfigured set number fails here rather than mid-session.
    pub fn new(schema: FormSchema) -> Result<Self, SchemaError> {
        let narrative = schema.narrative().cloned();
        let story = match &narrative {
            Some(cfg) => Some(crate::schema::story_set(cfg.set_number)?),
            None => None,
        };
        Ok(Self {
            schema,
            narrative,
            story,
            values: BTreeMap::new(),
            errors: ValidationErrors::new(),
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn narrative(&self) -> Option<&NarrativeStep> {
        self.narrative.as_ref()
    }

    pub fn story(&self) -> Option<&StorySet> {
        self.story.as_ref()
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Current text of a scalar field, empty when unset.
    pub fn text(&self, key: &str) -> &str {
        self.value(key).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub(crate) fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    pub(crate) fn set_errors(&mut self, errors: ValidationErrors) {
        self.errors = errors;
    }

    /// Replace the text of a scalar or single-select field.
    pub fn set_text(&mut self, key: &str, value: impl Into<String>) -> Result<(), StateError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
        if field.read_only {
            return Err(StateError::ReadOnlyField(key.to_string()));
        }
        self.write_text(key, value.into())
    }

    /// Write a scalar value on behalf of a non-user source (geolocation
    /// callback, manual locate action). Skips only the read-only check.
    pub fn seed_text(&mut self, key: &str, value: impl Into<String>) -> Result<(), StateError> {
        if self.schema.field(key).is_none() {
            return Err(StateError::UnknownField(key.to_string()));
        }
        self.write_text(key, value.into())
    }

    fn write_text(&mut self, key: &str, value: String) -> Result<(), StateError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
        match &field.kind {
            FieldKind::Text | FieldKind::Number => {}
            FieldKind::Select(options) => {
                if !value.is_empty() && !options.contains(&value) {
                    return Err(StateError::UnknownOption {
                        key: key.to_string(),
                        option: value,
                    });
                }
            }
            FieldKind::Checkbox(_) => {
                return Err(StateError::KindMismatch {
                    key: key.to_string(),
                    rejected: "text",
                })
            }
            FieldKind::File => {
                return Err(StateError::KindMismatch {
                    key: key.to_string(),
                    rejected: "text",
                })
            }
        }
        self.values.insert(key.to_string(), FieldValue::Text(value));
        self.errors.clear_field(key);
        Ok(())
    }

    /// Toggle one option of a checkbox field. Toggling twice restores the
    /// previous selection.
    pub fn toggle_option(&mut self, key: &str, option: &str) -> Result<(), StateError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
        let allowed = match &field.kind {
            FieldKind::Checkbox(options) => options,
            _ => {
                return Err(StateError::KindMismatch {
                    key: key.to_string(),
                    rejected: "checkbox",
                })
            }
        };
        if !allowed.iter().any(|o| o == option) {
            return Err(StateError::UnknownOption {
                key: key.to_string(),
                option: option.to_string(),
            });
        }

        let entry = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| FieldValue::Selection(Default::default()));
        let selected = match entry {
            FieldValue::Selection(selected) => selected,
            _ => {
                return Err(StateError::KindMismatch {
                    key: key.to_string(),
                    rejected: "checkbox",
                })
            }
        };
        if !selected.remove(option) {
            selected.insert(option.to_string());
        }
        self.errors.clear_field(key);
        Ok(())
    }

    /// Attach a validated image to a file field.
    pub fn set_image(&mut self, key: &str, upload: ImageUpload) -> Result<(), StateError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
        if field.kind != FieldKind::File {
            return Err(StateError::KindMismatch {
                key: key.to_string(),
                rejected: "file",
            });
        }
        self.values.insert(key.to_string(), FieldValue::Image(upload));
        self.errors.clear_field(key);
        Ok(())
    }

    /// Remove an attached image.
    pub fn clear_image(&mut self, key: &str) -> Result<(), StateError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
        if field.kind != FieldKind::File {
            return Err(StateError::KindMismatch {
                key: key.to_string(),
                rejected: "file",
            });
        }
        self.values.remove(key);
        Ok(())
    }

    /// Record the selected option for a narrative question.
    pub fn select_answer(&mut self, question_number: u32, option: &str) -> Result<(), StateError> {
        let (narrative, question) = self.narrative_question(question_number)?;
        if question.option(option).is_none() {
            return Err(StateError::UnknownBucket {
                question: question_number,
                bucket: option.to_string(),
            });
        }
        let mode = narrative.mode;
        let responses_key = narrative.responses_key.clone();

        self.with_response(&responses_key, question_number, mode, |response| {
            response.selected_option = Some(option.to_string());
        });
        self.errors.clear_field(&question_key(question_number));
        Ok(())
    }

    /// Record a response count for a narrative question. The bucket is a
    /// respondent-category label or an option value, depending on the
    /// configured recording mode.
    pub fn set_response_count(
        &mut self,
        question_number: u32,
        bucket: &str,
        count: u32,
    ) -> Result<(), StateError> {
        let (narrative, question) = self.narrative_question(question_number)?;
        let valid = match narrative.mode {
            RecordingMode::CategoryTally => RespondentCategory::from_label(bucket).is_some(),
            RecordingMode::OptionTally => question.option(bucket).is_some(),
        };
        if !valid {
            return Err(StateError::UnknownBucket {
                question: question_number,
                bucket: bucket.to_string(),
            });
        }
        let mode = narrative.mode;
        let responses_key = narrative.responses_key.clone();

        self.with_response(&responses_key, question_number, mode, |response| {
            response.tally.counts_mut().insert(bucket.to_string(), count);
        });
        self.errors.clear_field(&question_key(question_number));
        Ok(())
    }

    /// Answers recorded so far for the narrative step.
    pub fn responses(&self) -> Option<&BTreeMap<u32, QuestionResponse>> {
        let narrative = self.narrative.as_ref()?;
        self.values
            .get(&narrative.responses_key)
            .and_then(FieldValue::as_responses)
    }

    /// Restore the initial empty state. Invoked after a successful submission.
    pub fn reset_form(&mut self) {
        self.values.clear();
        self.errors.clear();
    }

    fn narrative_question(
        &self,
        question_number: u32,
    ) -> Result<(&NarrativeStep, &crate::schema::StoryQuestion), StateError> {
        let narrative = self.narrative.as_ref().ok_or(StateError::NoNarrativeStep)?;
        let story = self.story.as_ref().ok_or(StateError::NoNarrativeStep)?;
        let question = question_number
            .checked_sub(1)
            .and_then(|i| story.questions.get(i as usize))
            .ok_or(StateError::UnknownQuestion(question_number))?;
        Ok((narrative, question))
    }

    fn with_response(
        &mut self,
        responses_key: &str,
        question_number: u32,
        mode: RecordingMode,
        apply: impl FnOnce(&mut QuestionResponse),
    ) {
        let mut answers = match self.values.remove(responses_key) {
            Some(FieldValue::Responses(answers)) => answers,
            _ => BTreeMap::new(),
        };
        apply(
            answers
                .entry(question_number)
                .or_insert_with(|| QuestionResponse::new(mode)),
        );
        self.values
            .insert(responses_key.to_string(), FieldValue::Responses(answers));
    }
}
