//! Step and question navigation
//!
//! The wizard walks an ordered sequence of steps, gating forward movement on
//! the current step validating cleanly. Inside the narrative step a second
//! cursor walks the story questions; advancing past the last question is the
//! signal to submit.

use crate::schema::{FormSchema, SchemaError};
use crate::state::FormController;
use crate::validate;

/// Outcome of asking the question sub-navigator to move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionAdvance {
    /// Moved to the next question.
    Moved,
    /// Already on the last question and it validated; time to submit.
    ReadyToSubmit,
    /// The active question failed validation; cursor unchanged.
    Blocked,
}

/// Wizard session: one controller plus the step and question cursors.
#[derive(Debug, Clone)]
pub struct FormWizard {
    controller: FormController,
    current_step: usize,
    question_cursor: usize,
    submitting: bool,
}

impl FormWizard {
    pub fn new(schema: FormSchema) -> Result<Self, SchemaError> {
        Ok(Self {
            controller: FormController::new(schema)?,
            current_step: 1,
            question_cursor: 0,
            submitting: false,
        })
    }

    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FormController {
        &mut self.controller
    }

    /// Current step, 1-based.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.controller.schema().total_steps()
    }

    pub fn on_last_step(&self) -> bool {
        self.current_step == self.total_steps()
    }

    /// Whether a submission is currently in flight. Cooperative guard only:
    /// callers are expected to disable their submit action while set.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Validate the current step; on success move forward one step, clamped
    /// to the last step. Returns whether the step changed. Failed validation
    /// leaves the step unchanged with the errors stored on the controller.
    pub fn advance(&mut self) -> bool {
        if !self.run_step_validation() {
            return false;
        }
        if self.current_step >= self.total_steps() {
            return false;
        }
        self.current_step += 1;
        if self.on_narrative_step() {
            self.question_cursor = 0;
        }
        true
    }

    /// Move back one step. Always permitted above step 1, never validated.
    pub fn retreat(&mut self) -> bool {
        if self.current_step <= 1 {
            return false;
        }
        self.current_step -= 1;
        true
    }

    /// Validate the current step and store the result wholesale.
    pub fn run_step_validation(&mut self) -> bool {
        let errors = match self.controller.schema().step(self.current_step) {
            Some(step) => {
                validate::validate_step(step, self.controller.story(), self.controller.values())
            }
            None => Default::default(),
        };
        let ok = errors.is_empty();
        self.controller.set_errors(errors);
        ok
    }

    // ==================== Question sub-navigation ====================

    fn on_narrative_step(&self) -> bool {
        self.controller.schema().narrative_step_index() == Some(self.current_step)
    }

    pub fn question_count(&self) -> usize {
        self.controller
            .story()
            .map(|story| story.questions.len())
            .unwrap_or(0)
    }

    /// Active question number (1-based), when the narrative step is showing.
    pub fn current_question(&self) -> Option<u32> {
        if self.on_narrative_step() && self.question_count() > 0 {
            Some(self.question_cursor as u32 + 1)
        } else {
            None
        }
    }

    /// Position through the questionnaire in `[0, 1]`, for a progress bar.
    pub fn question_progress(&self) -> f32 {
        let total = self.question_count();
        if total == 0 {
            return 0.0;
        }
        (self.question_cursor as f32 + 1.0) / total as f32
    }

    /// Validate the active question; move to the next one, or report that
    /// the last question is done and submission should fire.
    pub fn next_question(&mut self) -> QuestionAdvance {
        let number = match self.current_question() {
            Some(number) => number,
            None => return QuestionAdvance::Blocked,
        };
        let narrative = match self.controller.narrative() {
            Some(cfg) => cfg,
            None => return QuestionAdvance::Blocked,
        };
        let story = match self.controller.story() {
            Some(story) => story,
            None => return QuestionAdvance::Blocked,
        };

        let errors =
            validate::validate_question(story, narrative.mode, self.controller.responses(), number);
        if !errors.is_empty() {
            for (key, message) in errors.iter() {
                self.controller.errors_mut().insert(key, message);
            }
            return QuestionAdvance::Blocked;
        }

        if self.question_cursor + 1 < self.question_count() {
            self.question_cursor += 1;
            QuestionAdvance::Moved
        } else {
            QuestionAdvance::ReadyToSubmit
        }
    }

    /// Step back one question. Never validated.
    pub fn prev_question(&mut self) -> bool {
        if !self.on_narrative_step() || self.question_cursor == 0 {
            return false;
        }
        self.question_cursor -= 1;
        true
    }

    /// Return to the initial state: empty form, step 1, first question.
    pub fn reset(&mut self) {
        self.controller.reset_form();
        self.current_step = 1;
        self.question_cursor = 0;
        self.submitting = false;
    }

    /// Set the in-flight flag; `false` means a submission is already running.
    pub(crate) fn begin_submission(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        true
    }

    pub(crate) fn end_submission(&mut self) {
        self.submitting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, FormSchema};
    use crate::types::{RecordingMode, RespondentCategory};
    use crate::ImageUpload;

    fn wizard() -> FormWizard {
        FormWizard::new(FormSchema::centre_information(1, RecordingMode::CategoryTally)).unwrap()
    }

    fn fill_basic_info(wizard: &mut FormWizard) {
        let form = wizard.controller_mut();
        form.set_text(schema::CENTRE_NAME, "Riverside Learning Centre").unwrap();
        form.set_text(schema::ADDRESS, "14 Mill Road").unwrap();
        form.set_text(schema::CITY, "Karwar").unwrap();
        form.seed_text(schema::LATITUDE, "14.813331").unwrap();
        form.seed_text(schema::LONGITUDE, "74.129401").unwrap();
        form.set_text(schema::TOTAL_STUDENTS, "42").unwrap();
    }

    fn fill_facility(wizard: &mut FormWizard) {
        let form = wizard.controller_mut();
        form.toggle_option(schema::DEVICES, "Laptop").unwrap();
        let photo = ImageUpload::from_bytes("centre.jpg", "image/jpeg", vec![1, 2, 3]).unwrap();
        form.set_image(schema::CENTRE_IMAGE, photo).unwrap();
    }

    fn answer_question(wizard: &mut FormWizard, number: u32) {
        let form = wizard.controller_mut();
        form.select_answer(number, "B").unwrap();
        for category in RespondentCategory::ALL {
            form.set_response_count(number, category.label(), 1).unwrap();
        }
    }

    #[test]
    fn advance_never_moves_while_validation_fails() {
        let mut wizard = wizard();
        assert!(!wizard.advance());
        assert_eq!(wizard.current_step(), 1);
        assert!(!wizard.controller().errors().is_empty());
    }

    #[test]
    fn valid_basic_info_advances_to_step_two() {
        let mut wizard = wizard();
        fill_basic_info(&mut wizard);
        assert!(wizard.advance());
        assert_eq!(wizard.current_step(), 2);
        assert!(wizard.controller().errors().is_empty());
    }

    #[test]
    fn retreat_is_always_possible_above_step_one() {
        let mut wizard = wizard();
        fill_basic_info(&mut wizard);
        wizard.advance();

        // Step 2 is still blank and invalid, yet going back needs nothing.
        assert!(wizard.retreat());
        assert_eq!(wizard.current_step(), 1);
        assert!(!wizard.retreat());
        assert_eq!(wizard.current_step(), 1);
    }

    #[test]
    fn advance_is_clamped_to_the_last_step() {
        let mut wizard = wizard();
        fill_basic_info(&mut wizard);
        assert!(wizard.advance());
        fill_facility(&mut wizard);
        assert!(wizard.advance());
        assert_eq!(wizard.current_step(), 3);

        for number in 1..=wizard.question_count() as u32 {
            answer_question(&mut wizard, number);
        }
        assert!(!wizard.advance());
        assert_eq!(wizard.current_step(), 3);
    }

    #[test]
    fn question_navigation_walks_to_ready_to_submit() {
        let mut wizard = wizard();
        fill_basic_info(&mut wizard);
        wizard.advance();
        fill_facility(&mut wizard);
        wizard.advance();
        assert_eq!(wizard.current_question(), Some(1));

        assert_eq!(wizard.next_question(), QuestionAdvance::Blocked);
        assert_eq!(
            wizard.controller().errors().get("q1"),
            Some("Please select an answer")
        );

        let total = wizard.question_count() as u32;
        for number in 1..total {
            answer_question(&mut wizard, number);
            assert_eq!(wizard.next_question(), QuestionAdvance::Moved);
        }
        answer_question(&mut wizard, total);
        assert_eq!(wizard.next_question(), QuestionAdvance::ReadyToSubmit);
        assert_eq!(wizard.current_question(), Some(total));
    }

    #[test]
    fn prev_question_is_ungated() {
        let mut wizard = wizard();
        fill_basic_info(&mut wizard);
        wizard.advance();
        fill_facility(&mut wizard);
        wizard.advance();

        assert!(!wizard.prev_question());
        answer_question(&mut wizard, 1);
        wizard.next_question();
        assert!(wizard.prev_question());
        assert_eq!(wizard.current_question(), Some(1));
    }

    #[test]
    fn progress_tracks_the_question_cursor() {
        let mut wizard = wizard();
        fill_basic_info(&mut wizard);
        wizard.advance();
        fill_facility(&mut wizard);
        wizard.advance();

        let total = wizard.question_count() as f32;
        assert!((wizard.question_progress() - 1.0 / total).abs() < f32::EPSILON);
    }

    #[test]
    fn reset_returns_to_the_first_step_and_question() {
        let mut wizard = wizard();
        fill_basic_info(&mut wizard);
        wizard.advance();

        wizard.reset();
        assert_eq!(wizard.current_step(), 1);
        assert!(wizard.controller().values().is_empty());
    }
}
