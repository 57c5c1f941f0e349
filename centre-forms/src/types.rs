//! Core value types shared across the centre survey engine

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::media::ImageUpload;

/// Respondent category used for attributing response counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RespondentCategory {
    Students,
    Teachers,
    Parents,
    Others,
}

impl RespondentCategory {
    pub const ALL: [RespondentCategory; 4] = [
        RespondentCategory::Students,
        RespondentCategory::Teachers,
        RespondentCategory::Parents,
        RespondentCategory::Others,
    ];

    /// Stable lowercase label used in payloads and tally keys.
    pub fn label(&self) -> &'static str {
        match self {
            RespondentCategory::Students => "students",
            RespondentCategory::Teachers => "teachers",
            RespondentCategory::Parents => "parents",
            RespondentCategory::Others => "others",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.label() == label)
    }
}

/// How response counts are attributed for a narrative question.
///
/// Two deployed variants disagreed on this, so both modes exist explicitly
/// rather than one guessed unification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingMode {
    /// One count per respondent category (students/teachers/parents/others).
    CategoryTally,
    /// One count per answer option of the question.
    OptionTally,
}

/// Counts recorded against a single answered question.
///
/// Keys are category labels in `CategoryTally` mode and option values in
/// `OptionTally` mode. Absent keys read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tally {
    Categories(BTreeMap<String, u32>),
    Options(BTreeMap<String, u32>),
}

impl Tally {
    pub fn new(mode: RecordingMode) -> Self {
        match mode {
            RecordingMode::CategoryTally => Tally::Categories(BTreeMap::new()),
            RecordingMode::OptionTally => Tally::Options(BTreeMap::new()),
        }
    }

    pub fn mode(&self) -> RecordingMode {
        match self {
            Tally::Categories(_) => RecordingMode::CategoryTally,
            Tally::Options(_) => RecordingMode::OptionTally,
        }
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        match self {
            Tally::Categories(counts) | Tally::Options(counts) => counts,
        }
    }

    pub fn counts_mut(&mut self) -> &mut BTreeMap<String, u32> {
        match self {
            Tally::Categories(counts) | Tally::Options(counts) => counts,
        }
    }

    /// Count for a bucket, zero when never recorded.
    pub fn count(&self, bucket: &str) -> u32 {
        self.counts().get(bucket).copied().unwrap_or(0)
    }

    /// Whether a bucket has an explicitly recorded count (zero included).
    pub fn recorded(&self, bucket: &str) -> bool {
        self.counts().contains_key(bucket)
    }
}

/// Answer state for one narrative question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResponse {
    pub selected_option: Option<String>,
    pub tally: Tally,
}

impl QuestionResponse {
    pub fn new(mode: RecordingMode) -> Self {
        Self {
            selected_option: None,
            tally: Tally::new(mode),
        }
    }
}

/// Current value of a single form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalar text, including numeric fields kept as the raw entered string.
    Text(String),
    /// Multi-select option set; always a subset of the declared options.
    Selection(BTreeSet<String>),
    /// Validated image upload.
    Image(ImageUpload),
    /// Per-question-number answers for the narrative step.
    Responses(BTreeMap<u32, QuestionResponse>),
}

impl FieldValue {
    /// Whether the value counts as "not filled in" for required-field checks.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Selection(selected) => selected.is_empty(),
            FieldValue::Image(_) => false,
            FieldValue::Responses(answers) => answers.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&BTreeSet<String>> {
        match self {
            FieldValue::Selection(selected) => Some(selected),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageUpload> {
        match self {
            FieldValue::Image(upload) => Some(upload),
            _ => None,
        }
    }

    pub fn as_responses(&self) -> Option<&BTreeMap<u32, QuestionResponse>> {
        match self {
            FieldValue::Responses(answers) => Some(answers),
            _ => None,
        }
    }
}

/// One row of a story-response batch as sent to a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponseRow {
    pub question_number: u32,
    pub question_text: String,
    pub selected_option: String,
    pub answer_text: String,
    /// Category labels or option values mapped to their recorded counts,
    /// with unrecorded buckets filled in as zero.
    pub counts: BTreeMap<String, u32>,
}

/// Batch of story responses tied to a created centre record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBatch {
    pub organization_id: String,
    pub set_number: u32,
    pub participant_id: String,
    pub responses: Vec<StoryResponseRow>,
}

/// Aggregated count for one answer option of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub option_value: String,
    pub count: u64,
}

/// Question number mapped to its ordered per-option counts.
pub type Statistics = BTreeMap<u32, Vec<OptionCount>>;

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    /// Identifier of the created centre record.
    pub centre_id: String,
    /// Aggregate counts fetched for immediate display, when the schema has
    /// a statistics step and the fetch succeeded.
    pub statistics: Option<Statistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_reads_zero_for_unrecorded_buckets() {
        let mut tally = Tally::new(RecordingMode::CategoryTally);
        assert_eq!(tally.count("students"), 0);
        assert!(!tally.recorded("students"));

        tally.counts_mut().insert("students".to_string(), 0);
        assert_eq!(tally.count("students"), 0);
        assert!(tally.recorded("students"));
    }

    #[test]
    fn blank_detection_per_value_kind() {
        assert!(FieldValue::Text("   ".to_string()).is_blank());
        assert!(!FieldValue::Text("Nine Wells Centre".to_string()).is_blank());
        assert!(FieldValue::Selection(BTreeSet::new()).is_blank());
        assert!(FieldValue::Responses(BTreeMap::new()).is_blank());
    }

    #[test]
    fn category_labels_round_trip() {
        for category in RespondentCategory::ALL {
            assert_eq!(RespondentCategory::from_label(category.label()), Some(category));
        }
        assert_eq!(RespondentCategory::from_label("visitors"), None);
    }
}
