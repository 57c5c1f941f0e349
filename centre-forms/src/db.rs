//! Backend data access
//!
//! One trait, three interchangeable backends: the local REST API (multipart
//! or JSON), the public tunneled endpoint (JSON only, different route
//! shapes), and a hosted database service reached over its REST row
//! interface. Every backend folds its failures into one descriptive
//! [`DataAccessError`] so the submission pipeline never sees transport
//! details.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::{BackendConfig, ConfigError};
use crate::media::ImageUpload;
use crate::types::{OptionCount, ResponseBatch, Statistics};

/// HTTP request timeout
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum DataAccessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("unexpected response from backend: {0}")]
    UnexpectedResponse(String),
}

/// Centre/organization record assembled by the submission pipeline, kept
/// structured so each backend serializes selections and the image its own
/// way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentrePayload {
    /// Scalar fields in schema order.
    pub scalars: Vec<(String, String)>,
    /// Multi-select fields with their selected options in order.
    pub selections: Vec<(String, Vec<String>)>,
    /// Attached image, keyed by its field name.
    pub image: Option<(String, ImageUpload)>,
}

impl CentrePayload {
    /// JSON body: selections as arrays, image as its data-URL preview.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (key, value) in &self.scalars {
            object.insert(key.clone(), json!(value));
        }
        for (key, options) in &self.selections {
            object.insert(key.clone(), json!(options));
        }
        if let Some((key, image)) = &self.image {
            object.insert(key.clone(), json!(image.data_url()));
        }
        serde_json::Value::Object(object)
    }

    /// Flat row for direct table insertion: selections joined into one
    /// delimited string column.
    pub fn to_row(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (key, value) in &self.scalars {
            object.insert(key.clone(), json!(value));
        }
        for (key, options) in &self.selections {
            object.insert(key.clone(), json!(options.join(", ")));
        }
        if let Some((key, image)) = &self.image {
            object.insert(key.clone(), json!(image.data_url()));
        }
        serde_json::Value::Object(object)
    }
}

/// The three operations every backend supports.
pub trait DataAccess {
    /// Create the centre record and return its identifier.
    fn create_centre(&self, payload: &CentrePayload) -> Result<String, DataAccessError>;

    /// Store a batch of story-question responses tied to a centre record.
    fn create_story_responses(&self, batch: &ResponseBatch) -> Result<(), DataAccessError>;

    /// Aggregated response counts for a set, optionally narrowed to one
    /// question.
    fn fetch_statistics(
        &self,
        set_number: u32,
        question_number: Option<u32>,
    ) -> Result<Statistics, DataAccessError>;
}

// ==================== Shared helpers ====================

fn http_client() -> Result<Client, DataAccessError> {
    Ok(Client::builder().timeout(TIMEOUT).build()?)
}

fn trimmed(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Fold a non-success response into one failure, preferring the backend's
/// own message when the body carries one.
fn backend_error(response: Response) -> DataAccessError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .ok()
        .and_then(|body| extract_message(&body))
        .unwrap_or_else(|| format!("backend responded with status {status}"));
    DataAccessError::Backend { status, message }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
}

/// Record identifier from a `{ "id": ... }` response; backends disagree on
/// whether ids are strings or numbers.
fn id_from(value: &serde_json::Value) -> Result<String, DataAccessError> {
    match value.get("id") {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
        _ => Err(DataAccessError::UnexpectedResponse(
            "missing record id".to_string(),
        )),
    }
}

/// Parse the statistics shape: question number mapped to per-option counts.
fn parse_statistics(value: serde_json::Value) -> Result<Statistics, DataAccessError> {
    let object = value.as_object().ok_or_else(|| {
        DataAccessError::UnexpectedResponse("statistics is not an object".to_string())
    })?;
    let mut statistics = Statistics::new();
    for (key, counts) in object {
        let number: u32 = key.parse().map_err(|_| {
            DataAccessError::UnexpectedResponse(format!("bad question number '{key}'"))
        })?;
        let counts: Vec<OptionCount> = serde_json::from_value(counts.clone())
            .map_err(|e| DataAccessError::UnexpectedResponse(e.to_string()))?;
        statistics.insert(number, counts);
    }
    Ok(statistics)
}

// ==================== Local REST API ====================

/// Local REST backend. Sends multipart when an image is attached so the
/// file arrives as a proper part, plain JSON otherwise.
pub struct RestApi {
    http: Client,
    base_url: String,
}

impl RestApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DataAccessError> {
        Ok(Self {
            http: http_client()?,
            base_url: trimmed(&base_url.into()),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, DataAccessError> {
        Self::new(config.api_base_url.clone())
    }
}

impl DataAccess for RestApi {
    fn create_centre(&self, payload: &CentrePayload) -> Result<String, DataAccessError> {
        let url = format!("{}/organizations", self.base_url);

        let response = if let Some((image_key, image)) = &payload.image {
            let mut form = multipart::Form::new();
            for (key, value) in &payload.scalars {
                form = form.text(key.clone(), value.clone());
            }
            for (key, options) in &payload.selections {
                form = form.text(key.clone(), serde_json::to_string(options)?);
            }
            let part = multipart::Part::bytes(image.bytes().to_vec())
                .file_name(image.file_name().to_string())
                .mime_str(image.content_type())?;
            form = form.part(image_key.clone(), part);
            self.http.post(&url).multipart(form).send()?
        } else {
            self.http.post(&url).json(&payload.to_json()).send()?
        };

        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        let value: serde_json::Value = response.json()?;
        id_from(&value)
    }

    fn create_story_responses(&self, batch: &ResponseBatch) -> Result<(), DataAccessError> {
        let url = format!("{}/responses", self.base_url);
        let response = self.http.post(&url).json(batch).send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        Ok(())
    }

    fn fetch_statistics(
        &self,
        set_number: u32,
        question_number: Option<u32>,
    ) -> Result<Statistics, DataAccessError> {
        let url = format!("{}/statistics", self.base_url);
        let mut query = vec![("setNumber", set_number.to_string())];
        if let Some(question) = question_number {
            query.push(("questionNumber", question.to_string()));
        }
        let response = self.http.get(&url).query(&query).send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        parse_statistics(response.json()?)
    }
}

// ==================== Tunneled REST endpoint ====================

/// Public tunneled backend. JSON only; statistics are path-parameterized
/// and story responses go to their own route keyed by participant.
pub struct TunnelApi {
    http: Client,
    base_url: String,
}

impl TunnelApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DataAccessError> {
        Ok(Self {
            http: http_client()?,
            base_url: trimmed(&base_url.into()),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, DataAccessError> {
        Self::new(config.tunnel()?)
    }
}

/// Story answers keyed `q1..qN`, the shape the tunneled backend stores.
fn answers_object(batch: &ResponseBatch) -> serde_json::Value {
    let mut answers = serde_json::Map::new();
    for row in &batch.responses {
        answers.insert(
            format!("q{}", row.question_number),
            json!({
                "questionText": &row.question_text,
                "selectedAnswer": &row.selected_option,
                "answerText": &row.answer_text,
                "counts": &row.counts,
            }),
        );
    }
    serde_json::Value::Object(answers)
}

impl DataAccess for TunnelApi {
    fn create_centre(&self, payload: &CentrePayload) -> Result<String, DataAccessError> {
        let url = format!("{}/api/organizations", self.base_url);
        let response = self.http.post(&url).json(&payload.to_json()).send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        let value: serde_json::Value = response.json()?;
        id_from(&value)
    }

    fn create_story_responses(&self, batch: &ResponseBatch) -> Result<(), DataAccessError> {
        let url = format!("{}/api/story-responses", self.base_url);
        let body = json!({
            "organizationId": &batch.organization_id,
            "setNumber": batch.set_number,
            "participantId": &batch.participant_id,
            "answers": answers_object(batch),
        });
        let response = self.http.post(&url).json(&body).send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        Ok(())
    }

    fn fetch_statistics(
        &self,
        set_number: u32,
        question_number: Option<u32>,
    ) -> Result<Statistics, DataAccessError> {
        let url = match question_number {
            Some(question) => format!(
                "{}/api/statistics/{set_number}/{question}",
                self.base_url
            ),
            None => format!("{}/api/statistics/{set_number}", self.base_url),
        };
        let response = self.http.get(&url).send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        parse_statistics(response.json()?)
    }
}

// ==================== Hosted database service ====================

/// Row shape read back when aggregating statistics client-side.
#[derive(Debug, Deserialize)]
struct StoredResponseRow {
    question_number: u32,
    selected_option: String,
}

/// Hosted database backend: direct row insertion over the service's REST
/// interface, authenticated by an API key. Statistics are aggregated
/// client-side from the stored rows.
pub struct HostedDb {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HostedDb {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, DataAccessError> {
        Ok(Self {
            http: http_client()?,
            base_url: trimmed(&base_url.into()),
            api_key: api_key.into(),
        })
    }

    /// Construct from environment configuration; a missing URL or key is a
    /// configuration error naming the variable.
    pub fn from_config(config: &BackendConfig) -> Result<Self, DataAccessError> {
        let (url, key) = config.hosted_db()?;
        Self::new(url, key)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::blocking::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", self.api_key.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Reachability check against the centres table. Logs the outcome and
    /// reports it as a boolean.
    pub fn self_test(&self) -> bool {
        let result = self
            .request(reqwest::Method::GET, "/rest/v1/centres")
            .query(&[("select", "id"), ("limit", "1")])
            .send();
        match result {
            Ok(response) if response.status().is_success() => {
                info!("hosted database connection test succeeded");
                true
            }
            Ok(response) => {
                error!(
                    "hosted database connection test failed with status {}",
                    response.status()
                );
                false
            }
            Err(e) => {
                error!("hosted database connection test failed: {e}");
                false
            }
        }
    }
}

impl DataAccess for HostedDb {
    fn create_centre(&self, payload: &CentrePayload) -> Result<String, DataAccessError> {
        let response = self
            .request(reqwest::Method::POST, "/rest/v1/centres")
            .header("Prefer", "return=representation")
            .json(&json!([payload.to_row()]))
            .send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        let rows: Vec<serde_json::Value> = response.json()?;
        let row = rows.first().ok_or_else(|| {
            DataAccessError::UnexpectedResponse("insert returned no rows".to_string())
        })?;
        id_from(row)
    }

    fn create_story_responses(&self, batch: &ResponseBatch) -> Result<(), DataAccessError> {
        let rows: Vec<serde_json::Value> = batch
            .responses
            .iter()
            .map(|row| {
                json!({
                    "centre_id": &batch.organization_id,
                    "set_number": batch.set_number,
                    "participant_id": &batch.participant_id,
                    "question_number": row.question_number,
                    "selected_option": &row.selected_option,
                    "counts": &row.counts,
                })
            })
            .collect();
        let response = self
            .request(reqwest::Method::POST, "/rest/v1/story_responses")
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        Ok(())
    }

    fn fetch_statistics(
        &self,
        set_number: u32,
        question_number: Option<u32>,
    ) -> Result<Statistics, DataAccessError> {
        let mut query = vec![
            ("select".to_string(), "question_number,selected_option".to_string()),
            ("set_number".to_string(), format!("eq.{set_number}")),
        ];
        if let Some(question) = question_number {
            query.push(("question_number".to_string(), format!("eq.{question}")));
        }
        let response = self
            .request(reqwest::Method::GET, "/rest/v1/story_responses")
            .query(&query)
            .send()?;
        if !response.status().is_success() {
            return Err(backend_error(response));
        }
        let rows: Vec<StoredResponseRow> = response.json()?;
        Ok(aggregate_rows(&rows))
    }
}

/// Count selected options per question, ordered by option value.
fn aggregate_rows(rows: &[StoredResponseRow]) -> Statistics {
    let mut grouped: BTreeMap<u32, BTreeMap<String, u64>> = BTreeMap::new();
    for row in rows {
        *grouped
            .entry(row.question_number)
            .or_default()
            .entry(row.selected_option.clone())
            .or_insert(0) += 1;
    }
    grouped
        .into_iter()
        .map(|(question, counts)| {
            let counts = counts
                .into_iter()
                .map(|(option_value, count)| OptionCount { option_value, count })
                .collect();
            (question, counts)
        })
        .collect()
}
