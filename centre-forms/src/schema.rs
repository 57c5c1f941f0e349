//! Form schema: field descriptors, step definitions, and story sets
//!
//! A deployment is described entirely by a [`FormSchema`] value; rendering
//! and validation both iterate the same descriptors, so variants differ in
//! configuration rather than code. Story sets ship as an embedded JSON seed.

use serde::Deserialize;

use crate::types::RecordingMode;

// Compile-time embed of the bundled story sets
const STORY_SETS_JSON: &str = include_str!("../seed/story_sets.json");

// Field keys used by the built-in centre schema
pub const CENTRE_NAME: &str = "centre_name";
pub const ADDRESS: &str = "address";
pub const CITY: &str = "city";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const TOTAL_STUDENTS: &str = "total_students";
pub const DEVICES: &str = "devices";
pub const CENTRE_IMAGE: &str = "centre_image";
pub const STORY_RESPONSES: &str = "story_responses";

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid story_sets.json seed: {0}")]
    InvalidSeed(String),

    #[error("no story set numbered {0}")]
    UnknownStorySet(u32),
}

/// Input kind of a field. Carries the allowed options for choice kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Select(Vec<String>),
    Checkbox(Vec<String>),
    File,
}

impl FieldKind {
    /// Declared options for choice kinds, `None` otherwise.
    pub fn options(&self) -> Option<&[String]> {
        match self {
            FieldKind::Select(options) | FieldKind::Checkbox(options) => Some(options),
            _ => None,
        }
    }
}

/// Declarative definition of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub read_only: bool,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
            read_only: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Narrative-questionnaire configuration attached to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeStep {
    /// Which bundled story set this deployment walks through.
    pub set_number: u32,
    /// How per-question counts are attributed.
    pub mode: RecordingMode,
    /// Field key the per-question answers live under.
    pub responses_key: String,
    /// Fetch aggregate counts for display after a successful submission.
    pub show_statistics: bool,
}

/// One page of the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
    pub narrative: Option<NarrativeStep>,
}

impl StepDefinition {
    pub fn new(title: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            title: title.into(),
            fields,
            narrative: None,
        }
    }

    pub fn narrative(
        title: impl Into<String>,
        set_number: u32,
        mode: RecordingMode,
        show_statistics: bool,
    ) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            narrative: Some(NarrativeStep {
                set_number,
                mode,
                responses_key: STORY_RESPONSES.to_string(),
                show_statistics,
            }),
        }
    }
}

/// Ordered steps making up one survey deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSchema {
    pub title: String,
    pub steps: Vec<StepDefinition>,
}

impl FormSchema {
    pub fn new(title: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self {
            title: title.into(),
            steps,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Step by 1-based index.
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        if index == 0 {
            return None;
        }
        self.steps.get(index - 1)
    }

    /// Look a descriptor up by key across all steps.
    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.steps
            .iter()
            .flat_map(|step| step.fields.iter())
            .find(|field| field.key == key)
    }

    /// The narrative configuration, if any step carries one.
    pub fn narrative(&self) -> Option<&NarrativeStep> {
        self.steps.iter().find_map(|step| step.narrative.as_ref())
    }

    /// 1-based index of the narrative step, if present.
    pub fn narrative_step_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.narrative.is_some())
            .map(|i| i + 1)
    }

    fn basic_info_step() -> StepDefinition {
        StepDefinition::new(
            "Centre information",
            vec![
                FieldDescriptor::new(CENTRE_NAME, "Organization Name", FieldKind::Text).required(),
                FieldDescriptor::new(ADDRESS, "Address", FieldKind::Text).required(),
                FieldDescriptor::new(CITY, "City/Town", FieldKind::Text).required(),
                FieldDescriptor::new(LATITUDE, "Latitude", FieldKind::Text)
                    .required()
                    .read_only(),
                FieldDescriptor::new(LONGITUDE, "Longitude", FieldKind::Text)
                    .required()
                    .read_only(),
                FieldDescriptor::new(TOTAL_STUDENTS, "Total Students", FieldKind::Number).required(),
            ],
        )
    }

    fn facility_step() -> StepDefinition {
        StepDefinition::new(
            "Facility and media",
            vec![
                FieldDescriptor::new(
                    DEVICES,
                    "Devices available",
                    FieldKind::Checkbox(vec![
                        "Desktop computer".to_string(),
                        "Laptop".to_string(),
                        "Tablet".to_string(),
                        "Smartphone".to_string(),
                        "Projector".to_string(),
                    ]),
                )
                .required(),
                FieldDescriptor::new(CENTRE_IMAGE, "Centre photo", FieldKind::File).required(),
            ],
        )
    }

    /// Full three-step deployment: basic info, facility/media, narrative.
    pub fn centre_information(set_number: u32, mode: RecordingMode) -> Self {
        Self::new(
            "Centre Information",
            vec![
                Self::basic_info_step(),
                Self::facility_step(),
                StepDefinition::narrative("Story questions", set_number, mode, true),
            ],
        )
    }

    /// Compact two-step variant without the facility/media page.
    pub fn centre_information_compact(set_number: u32, mode: RecordingMode) -> Self {
        Self::new(
            "Centre Information",
            vec![
                Self::basic_info_step(),
                StepDefinition::narrative("Story questions", set_number, mode, true),
            ],
        )
    }
}

// ==================== Story sets ====================

/// A bundled narrative plus its follow-up comprehension questions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorySet {
    pub set_number: u32,
    pub title: String,
    pub story: String,
    pub life_lessons: Vec<LifeLesson>,
    pub questions: Vec<StoryQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifeLesson {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryQuestion {
    pub text: String,
    pub options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionOption {
    pub value: String,
    pub text: String,
}

impl StoryQuestion {
    /// Option matching a selected value.
    pub fn option(&self, value: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|opt| opt.value == value)
    }
}

/// Parse and sanity-check the embedded story sets.
pub fn story_sets() -> Result<Vec<StorySet>, SchemaError> {
    let sets: Vec<StorySet> = serde_json::from_str(STORY_SETS_JSON)
        .map_err(|e| SchemaError::InvalidSeed(e.to_string()))?;

    for set in &sets {
        if set.questions.is_empty() {
            return Err(SchemaError::InvalidSeed(format!(
                "set {} has no questions",
                set.set_number
            )));
        }
        for question in &set.questions {
            if question.options.is_empty() {
                return Err(SchemaError::InvalidSeed(format!(
                    "set {} question '{}' has no options",
                    set.set_number, question.text
                )));
            }
        }
    }
    if sets
        .iter()
        .enumerate()
        .any(|(i, set)| sets[..i].iter().any(|prev| prev.set_number == set.set_number))
    {
        return Err(SchemaError::InvalidSeed("duplicate set numbers".to_string()));
    }

    Ok(sets)
}

/// Fetch one story set by number.
pub fn story_set(set_number: u32) -> Result<StorySet, SchemaError> {
    story_sets()?
        .into_iter()
        .find(|set| set.set_number == set_number)
        .ok_or(SchemaError::UnknownStorySet(set_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_seed_parses_and_is_consistent() {
        let sets = story_sets().expect("seed must parse");
        assert!(!sets.is_empty());
        for set in &sets {
            assert!(!set.questions.is_empty());
            for question in &set.questions {
                assert!(!question.options.is_empty());
            }
        }
    }

    #[test]
    fn unknown_set_number_is_an_error() {
        assert!(matches!(story_set(99), Err(SchemaError::UnknownStorySet(99))));
    }

    #[test]
    fn built_in_schema_has_expected_shape() {
        let schema = FormSchema::centre_information(1, RecordingMode::CategoryTally);
        assert_eq!(schema.total_steps(), 3);
        assert_eq!(schema.narrative_step_index(), Some(3));
        assert!(schema.field(CENTRE_NAME).is_some());
        assert!(schema.field(LATITUDE).unwrap().read_only);
        assert!(schema.step(0).is_none());
        assert!(schema.step(4).is_none());

        let compact = FormSchema::centre_information_compact(2, RecordingMode::OptionTally);
        assert_eq!(compact.total_steps(), 2);
        assert!(compact.field(CENTRE_IMAGE).is_none());
    }

    #[test]
    fn field_lookup_spans_steps() {
        let schema = FormSchema::centre_information(1, RecordingMode::CategoryTally);
        let devices = schema.field(DEVICES).expect("devices field");
        assert!(matches!(devices.kind, FieldKind::Checkbox(_)));
        assert_eq!(devices.kind.options().map(|o| o.len()), Some(5));
    }
}
