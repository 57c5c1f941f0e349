//! End-to-end wizard flows against an in-memory backend double.

use std::cell::RefCell;
use std::time::Duration;

use centre_forms::{
    locate_into, schema, CentrePayload, DataAccess, DataAccessError, FormSchema, FormWizard,
    GeoPosition, LocateError, LocationSource, OptionCount, QuestionAdvance, RecordingMode,
    RecordingNotifier, ResponseBatch, RespondentCategory, Severity, Statistics, SubmissionPipeline,
    SubmitError,
};

/// Backend double: records what it is asked to store, optionally failing
/// every write with a configured backend error.
#[derive(Default)]
struct MemoryBackend {
    fail_with: Option<(u16, String)>,
    centres: RefCell<Vec<CentrePayload>>,
    batches: RefCell<Vec<ResponseBatch>>,
}

impl MemoryBackend {
    fn failing(status: u16, message: &str) -> Self {
        Self {
            fail_with: Some((status, message.to_string())),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), DataAccessError> {
        match &self.fail_with {
            Some((status, message)) => Err(DataAccessError::Backend {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataAccess for MemoryBackend {
    fn create_centre(&self, payload: &CentrePayload) -> Result<String, DataAccessError> {
        self.check()?;
        self.centres.borrow_mut().push(payload.clone());
        Ok("abc123".to_string())
    }

    fn create_story_responses(&self, batch: &ResponseBatch) -> Result<(), DataAccessError> {
        self.check()?;
        self.batches.borrow_mut().push(batch.clone());
        Ok(())
    }

    fn fetch_statistics(
        &self,
        _set_number: u32,
        _question_number: Option<u32>,
    ) -> Result<Statistics, DataAccessError> {
        self.check()?;
        let mut statistics = Statistics::new();
        statistics.insert(
            1,
            vec![OptionCount {
                option_value: "B".to_string(),
                count: 12,
            }],
        );
        Ok(statistics)
    }
}

struct FixedLocation;

impl LocationSource for FixedLocation {
    fn current_position(&self, _timeout: Duration) -> Result<GeoPosition, LocateError> {
        Ok(GeoPosition {
            latitude: 14.8133312,
            longitude: 74.1294015,
        })
    }
}

fn wizard() -> FormWizard {
    FormWizard::new(FormSchema::centre_information(1, RecordingMode::CategoryTally)).unwrap()
}

fn fill_basic_info(wizard: &mut FormWizard, notifier: &RecordingNotifier) {
    locate_into(wizard.controller_mut(), &FixedLocation, notifier);
    let form = wizard.controller_mut();
    form.set_text(schema::CENTRE_NAME, "Riverside Learning Centre").unwrap();
    form.set_text(schema::ADDRESS, "14 Mill Road").unwrap();
    form.set_text(schema::CITY, "Karwar").unwrap();
    form.set_text(schema::TOTAL_STUDENTS, "42").unwrap();
}

fn fill_facility(wizard: &mut FormWizard) {
    let form = wizard.controller_mut();
    form.toggle_option(schema::DEVICES, "Laptop").unwrap();
    let photo = centre_forms::ImageUpload::from_bytes("centre.jpg", "image/jpeg", vec![1, 2, 3])
        .unwrap();
    form.set_image(schema::CENTRE_IMAGE, photo).unwrap();
}

fn answer_question(wizard: &mut FormWizard, number: u32) {
    let form = wizard.controller_mut();
    form.select_answer(number, "B").unwrap();
    for category in RespondentCategory::ALL {
        form.set_response_count(number, category.label(), number).unwrap();
    }
}

fn walk_to_last_step(wizard: &mut FormWizard, notifier: &RecordingNotifier) {
    fill_basic_info(wizard, notifier);
    assert!(wizard.advance());
    fill_facility(wizard);
    assert!(wizard.advance());
}

#[test]
fn valid_basic_info_with_located_coordinates_advances() {
    let notifier = RecordingNotifier::new();
    let mut wizard = wizard();
    fill_basic_info(&mut wizard, &notifier);

    assert_eq!(wizard.controller().text(schema::LATITUDE), "14.813331");
    assert!(wizard.advance());
    assert_eq!(wizard.current_step(), 2);
}

#[test]
fn missing_counts_block_the_question_and_the_submission() {
    let notifier = RecordingNotifier::new();
    let backend = MemoryBackend::default();
    let mut wizard = wizard();
    walk_to_last_step(&mut wizard, &notifier);

    // Option picked, counts never entered.
    wizard.controller_mut().select_answer(1, "B").unwrap();
    assert_eq!(wizard.next_question(), QuestionAdvance::Blocked);
    assert!(wizard
        .controller()
        .errors()
        .get("q1")
        .unwrap()
        .contains("each respondent group"));

    let pipeline = SubmissionPipeline::new(&backend, &notifier);
    match pipeline.submit(&mut wizard) {
        Err(SubmitError::Invalid(errors)) => assert!(errors.get("q1").is_some()),
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert!(backend.centres.borrow().is_empty());
    assert_eq!(wizard.current_step(), 3);
}

#[test]
fn successful_submission_resets_the_session_and_reports_statistics() {
    let notifier = RecordingNotifier::new();
    let backend = MemoryBackend::default();
    let mut wizard = wizard();
    walk_to_last_step(&mut wizard, &notifier);

    let total = wizard.question_count() as u32;
    for number in 1..=total {
        answer_question(&mut wizard, number);
        let advance = wizard.next_question();
        if number < total {
            assert_eq!(advance, QuestionAdvance::Moved);
        } else {
            assert_eq!(advance, QuestionAdvance::ReadyToSubmit);
        }
    }

    let pipeline = SubmissionPipeline::new(&backend, &notifier);
    let receipt = pipeline.submit(&mut wizard).unwrap();

    assert_eq!(receipt.centre_id, "abc123");
    assert_eq!(receipt.statistics.unwrap()[&1][0].count, 12);

    // Session is back at its initial state.
    assert_eq!(wizard.current_step(), 1);
    assert!(wizard.controller().values().is_empty());
    assert!(wizard.controller().errors().is_empty());
    assert_eq!(
        notifier.last(Severity::Success).as_deref(),
        Some("Responses saved successfully!")
    );

    // The backend saw the centre record and one row per question.
    assert_eq!(backend.centres.borrow().len(), 1);
    let batches = backend.batches.borrow();
    let batch = &batches[0];
    assert_eq!(batch.organization_id, "abc123");
    assert_eq!(batch.set_number, 1);
    assert_eq!(batch.participant_id, pipeline.participant_id());
    assert_eq!(batch.responses.len(), total as usize);
    assert_eq!(batch.responses[1].counts["students"], 2);
}

#[test]
fn backend_failure_surfaces_its_message_and_keeps_state() {
    let notifier = RecordingNotifier::new();
    let backend = MemoryBackend::failing(500, "Table does not exist");
    let mut wizard = wizard();
    walk_to_last_step(&mut wizard, &notifier);
    for number in 1..=wizard.question_count() as u32 {
        answer_question(&mut wizard, number);
    }

    let before = wizard.controller().values().clone();
    let pipeline = SubmissionPipeline::new(&backend, &notifier);
    let result = pipeline.submit(&mut wizard);

    assert!(matches!(result, Err(SubmitError::Transport(_))));
    assert!(notifier
        .last(Severity::Error)
        .unwrap()
        .contains("Table does not exist"));

    // Everything the respondent entered is still there for a retry.
    assert_eq!(wizard.controller().values(), &before);
    assert_eq!(wizard.current_step(), 3);
    assert!(!wizard.is_submitting());
}

#[test]
fn submission_is_rejected_away_from_the_final_step() {
    let notifier = RecordingNotifier::new();
    let backend = MemoryBackend::default();
    let mut wizard = wizard();

    let pipeline = SubmissionPipeline::new(&backend, &notifier);
    assert!(matches!(
        pipeline.submit(&mut wizard),
        Err(SubmitError::NotOnFinalStep)
    ));
}
