//! Email drafting through a generative text provider.
//!
//! One prompt, one call, no retries. The draft is always reviewed by an
//! operator before anything is sent; this module never sends mail.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};

pub const PROVIDER_FAILURE_MESSAGE: &str =
    "Error: Ensure the generative provider API key is set and valid.";
pub const EMPTY_DRAFT_MESSAGE: &str = "Failed to generate draft.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(thiserror::Error, Debug)]
pub enum DraftError {
    #[error("no API key is configured for the generative provider")]
    MissingApiKey,

    #[error("failed to reach the generative provider")]
    Transport(#[source] reqwest::Error),

    #[error("the generative provider answered {status}: {message}")]
    Provider { status: StatusCode, message: String },

    #[error("the generative provider sent an unreadable response")]
    Malformed(#[source] reqwest::Error),

    #[error("the generative provider returned no text")]
    Empty,
}

impl DraftError {
    /// Fixed text shown to the operator in place of a draft.
    pub fn user_message(&self) -> &'static str {
        match self {
            DraftError::Empty => EMPTY_DRAFT_MESSAGE,
            _ => PROVIDER_FAILURE_MESSAGE,
        }
    }
}

#[derive(serde::Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(serde::Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(serde::Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(serde::Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(serde::Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(serde::Deserialize)]
struct ProviderErrorBody {
    message: String,
}

impl GenerateContentResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct DraftGenerator {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<Secret<String>>,
    institution: String,
}

impl DraftGenerator {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<Secret<String>>,
        institution: String,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            institution,
        })
    }

    /// Asks the provider for a notification draft about a drive.
    #[tracing::instrument(name = "generate email draft", skip(self, raw_context))]
    pub async fn draft(
        &self,
        company_name: &str,
        role: &str,
        raw_context: &str,
    ) -> Result<String, DraftError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or(DraftError::MissingApiKey)?;

        let prompt = build_prompt(&self.institution, company_name, role, raw_context);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(DraftError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(DraftError::Provider { status, message });
        }

        let text = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(DraftError::Malformed)?
            .text();

        if text.trim().is_empty() {
            return Err(DraftError::Empty);
        }
        Ok(text)
    }
}

/// Inputs are embedded verbatim, without escaping.
pub fn build_prompt(
    institution: &str,
    company_name: &str,
    role: &str,
    raw_context: &str,
) -> String {
    format!(
        r#"You are the Placement Officer at {institution}.
Draft a formal, concise, and professional email notification to students regarding a new placement drive.

Details:
Company: {company_name}
Role: {role}
Raw Context/Message from Company: "{raw_context}"

The email should:
1. Have a clear Subject Line.
2. Be addressed to "Dear Students,".
3. Include key details like Role, Eligibility (if mentioned in raw text), and Action Required.
4. Sign off as "Placement Cell, {institution}".
5. Do NOT use placeholders like [Date] unless essential."#
    )
}

/// Takes the subject from a leading `Subject:` line of the draft, falling
/// back to a generic one built from the company and role.
pub fn extract_subject(draft: &str, company_name: &str, role: &str) -> String {
    const MARKER: &str = "subject:";

    let first_line = draft.lines().next().unwrap_or_default();
    let marker_at = first_line.char_indices().map(|(i, _)| i).find(|&i| {
        first_line[i..]
            .get(..MARKER.len())
            .map_or(false, |s| s.eq_ignore_ascii_case(MARKER))
    });

    let subject = match marker_at {
        Some(i) => format!("{}{}", &first_line[..i], &first_line[i + MARKER.len()..]),
        None => return fallback_subject(company_name, role),
    };

    match subject.trim() {
        "" => fallback_subject(company_name, role),
        subject => subject.to_string(),
    }
}

fn fallback_subject(company_name: &str, role: &str) -> String {
    format!("Placement Update: {} - {}", company_name, role)
}
