//! Submission pipeline
//!
//! Takes a wizard sitting on its last step, validates it one final time,
//! assembles the backend payloads, and drives the injected [`DataAccess`]
//! client. Success resets the session; failure leaves every entered value
//! in place so the respondent can retry without retyping.

use std::collections::BTreeMap;

use tracing::warn;
use uuid::Uuid;

use crate::db::{CentrePayload, DataAccess, DataAccessError};
use crate::notify::Notifier;
use crate::schema::{FieldKind, StorySet};
use crate::state::{FormController, ValidationErrors};
use crate::types::{
    FieldValue, QuestionResponse, RecordingMode, ResponseBatch, RespondentCategory,
    StoryResponseRow, SubmissionReceipt,
};
use crate::wizard::FormWizard;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,

    #[error("submission is only available from the last step")]
    NotOnFinalStep,

    #[error("the form has validation errors")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Transport(#[from] DataAccessError),
}

/// Drives submissions through an injected backend and notifier.
pub struct SubmissionPipeline<'a> {
    client: &'a dyn DataAccess,
    notifier: &'a dyn Notifier,
    participant_id: String,
}

impl<'a> SubmissionPipeline<'a> {
    pub fn new(client: &'a dyn DataAccess, notifier: &'a dyn Notifier) -> Self {
        Self {
            client,
            notifier,
            participant_id: Uuid::new_v4().to_string(),
        }
    }

    /// Identifier attached to this session's story responses.
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Submit the accumulated form state.
    ///
    /// Only reachable from the last step, and only once its validation
    /// passes. On success the wizard is reset to its initial state; on any
    /// backend failure the state is untouched and the failure reason is
    /// surfaced through the notifier.
    pub fn submit(&self, wizard: &mut FormWizard) -> Result<SubmissionReceipt, SubmitError> {
        if !wizard.on_last_step() {
            return Err(SubmitError::NotOnFinalStep);
        }
        if !wizard.run_step_validation() {
            self.notifier
                .error("Please fix the highlighted fields before submitting.");
            return Err(SubmitError::Invalid(wizard.controller().errors().clone()));
        }
        if !wizard.begin_submission() {
            return Err(SubmitError::AlreadySubmitting);
        }

        let result = self.run(wizard.controller());
        wizard.end_submission();

        match result {
            Ok(receipt) => {
                let message = if wizard.controller().narrative().is_some() {
                    "Responses saved successfully!"
                } else {
                    "Form submitted successfully!"
                };
                self.notifier.success(message);
                wizard.reset();
                Ok(receipt)
            }
            Err(e) => {
                self.notifier.error(&format!("Error saving responses: {e}"));
                Err(SubmitError::Transport(e))
            }
        }
    }

    fn run(&self, form: &FormController) -> Result<SubmissionReceipt, DataAccessError> {
        let payload = build_centre_payload(form);
        let centre_id = self.client.create_centre(&payload)?;

        let mut statistics = None;
        if let (Some(cfg), Some(story)) = (form.narrative(), form.story()) {
            let batch = ResponseBatch {
                organization_id: centre_id.clone(),
                set_number: cfg.set_number,
                participant_id: self.participant_id.clone(),
                responses: build_story_rows(story, cfg.mode, form.responses()),
            };
            self.client.create_story_responses(&batch)?;

            if cfg.show_statistics {
                // Statistics are display sugar; a failed fetch never undoes
                // a stored submission.
                match self.client.fetch_statistics(cfg.set_number, None) {
                    Ok(stats) => statistics = Some(stats),
                    Err(e) => warn!("could not fetch statistics: {e}"),
                }
            }
        }

        Ok(SubmissionReceipt {
            centre_id,
            statistics,
        })
    }
}

/// Assemble the centre payload from the non-narrative fields, in schema
/// order.
pub fn build_centre_payload(form: &FormController) -> CentrePayload {
    let mut payload = CentrePayload::default();
    for step in &form.schema().steps {
        for field in &step.fields {
            match (&field.kind, form.value(&field.key)) {
                (FieldKind::Text | FieldKind::Number | FieldKind::Select(_), value) => {
                    let text = value.and_then(FieldValue::as_text).unwrap_or("");
                    payload.scalars.push((field.key.clone(), text.to_string()));
                }
                (FieldKind::Checkbox(_), value) => {
                    let options = value
                        .and_then(FieldValue::as_selection)
                        .map(|selected| selected.iter().cloned().collect())
                        .unwrap_or_default();
                    payload.selections.push((field.key.clone(), options));
                }
                (FieldKind::File, Some(FieldValue::Image(image))) => {
                    payload.image = Some((field.key.clone(), image.clone()));
                }
                (FieldKind::File, _) => {}
            }
        }
    }
    payload
}

/// One row per answered story question, with unrecorded count buckets
/// filled in as zero.
pub fn build_story_rows(
    story: &StorySet,
    mode: RecordingMode,
    responses: Option<&BTreeMap<u32, QuestionResponse>>,
) -> Vec<StoryResponseRow> {
    let mut rows = Vec::new();
    for (index, question) in story.questions.iter().enumerate() {
        let number = index as u32 + 1;
        let response = responses.and_then(|map| map.get(&number));
        let selected = match response.and_then(|r| r.selected_option.clone()) {
            Some(selected) => selected,
            None => continue,
        };
        let answer_text = question
            .option(&selected)
            .map(|option| option.text.clone())
            .unwrap_or_default();

        let mut counts = BTreeMap::new();
        match mode {
            RecordingMode::CategoryTally => {
                for category in RespondentCategory::ALL {
                    let count = response
                        .map(|r| r.tally.count(category.label()))
                        .unwrap_or(0);
                    counts.insert(category.label().to_string(), count);
                }
            }
            RecordingMode::OptionTally => {
                for option in &question.options {
                    let count = response.map(|r| r.tally.count(&option.value)).unwrap_or(0);
                    counts.insert(option.value.clone(), count);
                }
            }
        }

        rows.push(StoryResponseRow {
            question_number: number,
            question_text: question.text.clone(),
            selected_option: selected,
            answer_text,
            counts,
        });
    }
    rows
}
