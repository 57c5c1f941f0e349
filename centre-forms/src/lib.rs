//! Multi-step centre survey engine
//!
//! Collects "Organization/Centre Information" plus a narrative story
//! questionnaire through a schema-driven wizard, then posts the result to
//! one of several interchangeable backends.
//!
//! The pieces compose leaves-first:
//! - [`schema`] declares fields, steps, and the embedded story sets
//! - [`state`] owns the field values and per-field errors
//! - [`validate`] checks state against descriptors, purely
//! - [`wizard`] walks steps and story questions, gating on validation
//! - [`geo`] seeds the read-only coordinate fields from a location source
//! - [`media`] gates image uploads before they can enter state
//! - [`db`] is the pluggable backend client
//! - [`submit`] assembles payloads and drives a backend through a session

pub mod config;
pub mod db;
pub mod geo;
pub mod media;
pub mod notify;
pub mod render;
pub mod schema;
pub mod state;
pub mod submit;
pub mod types;
pub mod validate;
pub mod wizard;

pub use config::{init_tracing, BackendConfig, ConfigError};
pub use db::{CentrePayload, DataAccess, DataAccessError, HostedDb, RestApi, TunnelApi};
pub use geo::{
    locate_into, EnvLocationSource, GeoPosition, LocateError, LocationSource,
    UnsupportedLocationSource, LOCATE_TIMEOUT,
};
pub use media::{ImageUpload, MediaError, MAX_IMAGE_BYTES};
pub use notify::{Notifier, RecordingNotifier, Severity, TracingNotifier};
pub use render::{render_step, Control, RenderedField};
pub use schema::{
    story_set, story_sets, FieldDescriptor, FieldKind, FormSchema, NarrativeStep, SchemaError,
    StepDefinition, StorySet,
};
pub use state::{question_key, FormController, StateError, ValidationErrors};
pub use submit::{build_centre_payload, build_story_rows, SubmissionPipeline, SubmitError};
pub use types::{
    FieldValue, OptionCount, QuestionResponse, RecordingMode, ResponseBatch, RespondentCategory,
    Statistics, StoryResponseRow, SubmissionReceipt, Tally,
};
pub use validate::{validate_question, validate_step};
pub use wizard::{FormWizard, QuestionAdvance};
