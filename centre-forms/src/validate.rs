//! Pure validation over form state
//!
//! Reads field values against descriptors and produces [`ValidationErrors`]
//! without touching state, so every rule is unit-testable away from any
//! rendering or navigation concern.

use std::collections::BTreeMap;

use crate::schema::{FieldDescriptor, FieldKind, StepDefinition, StorySet};
use crate::state::{question_key, ValidationErrors};
use crate::types::{FieldValue, QuestionResponse, RecordingMode, RespondentCategory};

/// Validate every field of one step, plus all narrative questions when the
/// step carries the questionnaire.
pub fn validate_step(
    step: &StepDefinition,
    story: Option<&StorySet>,
    values: &BTreeMap<String, FieldValue>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for field in &step.fields {
        check_field(field, values.get(&field.key), &mut errors);
    }

    if let (Some(cfg), Some(story)) = (&step.narrative, story) {
        let responses = values
            .get(&cfg.responses_key)
            .and_then(FieldValue::as_responses);
        for number in 1..=story.questions.len() as u32 {
            check_question(story, cfg.mode, responses, number, &mut errors);
        }
    }
    errors
}

/// Validate a single narrative question (used by the question sub-navigator).
pub fn validate_question(
    story: &StorySet,
    mode: RecordingMode,
    responses: Option<&BTreeMap<u32, QuestionResponse>>,
    question_number: u32,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_question(story, mode, responses, question_number, &mut errors);
    errors
}

fn check_field(
    field: &FieldDescriptor,
    value: Option<&FieldValue>,
    errors: &mut ValidationErrors,
) {
    let blank = value.map(FieldValue::is_blank).unwrap_or(true);

    match &field.kind {
        FieldKind::Text | FieldKind::Select(_) | FieldKind::File => {
            if field.required && blank {
                errors.insert(field.key.as_str(), format!("{} is required", field.label));
            }
        }
        FieldKind::Number => {
            if blank {
                if field.required {
                    errors.insert(field.key.as_str(), format!("{} is required", field.label));
                }
            } else if let Some(text) = value.and_then(FieldValue::as_text) {
                if text.trim().parse::<u64>().is_err() {
                    errors.insert(
                        field.key.as_str(),
                        format!("{} must be a non-negative whole number", field.label),
                    );
                }
            }
        }
        FieldKind::Checkbox(_) => {
            if field.required && blank {
                errors.insert(
                    field.key.as_str(),
                    format!("Select at least one option for {}", field.label),
                );
            }
        }
    }
}

fn check_question(
    story: &StorySet,
    mode: RecordingMode,
    responses: Option<&BTreeMap<u32, QuestionResponse>>,
    question_number: u32,
    errors: &mut ValidationErrors,
) {
    if story.questions.len() < question_number as usize || question_number == 0 {
        return;
    }
    let key = question_key(question_number);
    let response = responses.and_then(|map| map.get(&question_number));

    let selected = match response.and_then(|r| r.selected_option.as_deref()) {
        Some(selected) => selected,
        None => {
            errors.insert(key, "Please select an answer");
            return;
        }
    };

    // A tally recorded under the other mode never satisfies this one.
    let tally = response
        .map(|r| &r.tally)
        .filter(|tally| tally.mode() == mode);

    match mode {
        RecordingMode::CategoryTally => {
            let complete = tally
                .map(|tally| {
                    RespondentCategory::ALL
                        .iter()
                        .all(|category| tally.recorded(category.label()))
                })
                .unwrap_or(false);
            if !complete {
                errors.insert(
                    key,
                    format!("Enter a count for each respondent group on question {question_number}"),
                );
            }
        }
        RecordingMode::OptionTally => {
            let recorded = tally.map(|tally| tally.recorded(selected)).unwrap_or(false);
            if !recorded {
                errors.insert(
                    key,
                    format!("Enter a response count for the selected option on question {question_number}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, FormSchema};
    use crate::state::FormController;
    use crate::ImageUpload;

    fn schema_3_step() -> FormSchema {
        FormSchema::centre_information(1, RecordingMode::CategoryTally)
    }

    fn filled_basic_info(form: &mut FormController) {
        form.set_text(schema::CENTRE_NAME, "Riverside Learning Centre").unwrap();
        form.set_text(schema::ADDRESS, "14 Mill Road").unwrap();
        form.set_text(schema::CITY, "Karwar").unwrap();
        form.seed_text(schema::LATITUDE, "14.813331").unwrap();
        form.seed_text(schema::LONGITUDE, "74.129401").unwrap();
        form.set_text(schema::TOTAL_STUDENTS, "42").unwrap();
    }

    #[test]
    fn every_blank_required_field_gets_an_entry() {
        let form = FormController::new(schema_3_step()).unwrap();
        let step = form.schema().step(1).unwrap();
        let errors = validate_step(step, form.story(), form.values());

        for key in [
            schema::CENTRE_NAME,
            schema::ADDRESS,
            schema::CITY,
            schema::LATITUDE,
            schema::LONGITUDE,
            schema::TOTAL_STUDENTS,
        ] {
            assert!(errors.get(key).is_some(), "expected an error for {key}");
        }
    }

    #[test]
    fn filled_basic_info_step_passes() {
        let mut form = FormController::new(schema_3_step()).unwrap();
        filled_basic_info(&mut form);
        let step = form.schema().step(1).unwrap();
        assert!(validate_step(step, form.story(), form.values()).is_empty());
    }

    #[test]
    fn numeric_fields_must_parse_non_negative() {
        let mut form = FormController::new(schema_3_step()).unwrap();
        filled_basic_info(&mut form);
        form.set_text(schema::TOTAL_STUDENTS, "-3").unwrap();

        let step = form.schema().step(1).unwrap();
        let errors = validate_step(step, form.story(), form.values());
        assert!(errors
            .get(schema::TOTAL_STUDENTS)
            .unwrap()
            .contains("non-negative"));
    }

    #[test]
    fn facility_step_requires_devices_and_image() {
        let mut form = FormController::new(schema_3_step()).unwrap();
        let step = form.schema().step(2).unwrap().clone();

        let errors = validate_step(&step, form.story(), form.values());
        assert!(errors.get(schema::DEVICES).is_some());
        assert!(errors.get(schema::CENTRE_IMAGE).is_some());

        form.toggle_option(schema::DEVICES, "Laptop").unwrap();
        let photo = ImageUpload::from_bytes("centre.jpg", "image/jpeg", vec![1, 2, 3]).unwrap();
        form.set_image(schema::CENTRE_IMAGE, photo).unwrap();
        assert!(validate_step(&step, form.story(), form.values()).is_empty());
    }

    #[test]
    fn unanswered_question_blocks_with_the_selection_message() {
        let form = FormController::new(schema_3_step()).unwrap();
        let errors =
            validate_question(form.story().unwrap(), RecordingMode::CategoryTally, form.responses(), 1);
        assert_eq!(errors.get("q1"), Some("Please select an answer"));
    }

    #[test]
    fn category_mode_requires_every_group_recorded() {
        let mut form = FormController::new(schema_3_step()).unwrap();
        form.select_answer(1, "B").unwrap();

        let errors =
            validate_question(form.story().unwrap(), RecordingMode::CategoryTally, form.responses(), 1);
        assert!(errors.get("q1").unwrap().contains("each respondent group"));

        for category in RespondentCategory::ALL {
            form.set_response_count(1, category.label(), 0).unwrap();
        }
        let errors =
            validate_question(form.story().unwrap(), RecordingMode::CategoryTally, form.responses(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn option_mode_requires_a_count_for_the_selected_option() {
        let schema = FormSchema::centre_information_compact(1, RecordingMode::OptionTally);
        let mut form = FormController::new(schema).unwrap();
        form.select_answer(1, "B").unwrap();

        let errors =
            validate_question(form.story().unwrap(), RecordingMode::OptionTally, form.responses(), 1);
        assert!(errors.get("q1").unwrap().contains("selected option"));

        form.set_response_count(1, "B", 7).unwrap();
        let errors =
            validate_question(form.story().unwrap(), RecordingMode::OptionTally, form.responses(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn narrative_step_validates_all_questions_wholesale() {
        let form = FormController::new(schema_3_step()).unwrap();
        let step = form.schema().step(3).unwrap();
        let errors = validate_step(step, form.story(), form.values());
        let question_count = form.story().unwrap().questions.len();
        assert_eq!(errors.len(), question_count);
    }
}
