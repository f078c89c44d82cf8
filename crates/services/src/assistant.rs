use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Claude API key not configured")]
    NotConfigured,
    #[error("Claude request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Claude returned an empty response")]
    EmptyResponse,
}

/// Language-model collaborator. Annotates emails and events and writes
/// the morning briefing. Every caller either tolerates an error or
/// substitutes the matching fallback text; nothing in the notification
/// core depends on the model being reachable.
#[derive(Debug, Clone)]
pub struct AssistantService {
    client: Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Email digest line fed into the briefing prompt.
#[derive(Debug, Clone, Serialize)]
pub struct EmailDigest {
    pub sender_name: String,
    pub subject: String,
    pub summary: String,
    pub is_emergency: bool,
    pub is_from_vip: bool,
}

/// Event digest line fed into the briefing prompt.
#[derive(Debug, Clone, Serialize)]
pub struct EventDigest {
    pub title: String,
    pub start_time: String,
    pub location: String,
}

impl AssistantService {
    pub fn new(api_key: Option<String>, model: String, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            max_tokens,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// One-to-two sentence summary of an email.
    pub async fn summarize_email(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<String, AssistantError> {
        let prompt = format!(
            "Provide a concise summary of this email in 1-2 sentences. \
             Focus on the key points and any required actions.\n\n\
             Subject: {}\nBody: {}",
            subject,
            truncate(body, 1000)
        );
        self.complete("You summarize emails concisely and professionally.", prompt)
            .await
    }

    /// Suggested reply draft in the user's preferred tone and language.
    pub async fn draft_reply(
        &self,
        subject: &str,
        body: &str,
        tone: &str,
        language: &str,
    ) -> Result<String, AssistantError> {
        let prompt = format!(
            "Draft a {} reply to this email. Acknowledge the sender, address \
             the key points, keep it to 2-3 short paragraphs.\n\n\
             Subject: {}\nOriginal message: {}",
            tone,
            subject,
            truncate(body, 800)
        );
        let system = format!("You draft email replies in {}. Be helpful and {}.", language, tone);
        self.complete(&system, prompt).await
    }

    /// One-word sentiment: positive, negative or neutral.
    pub async fn analyze_sentiment(&self, body: &str) -> Result<String, AssistantError> {
        let answer = self
            .complete(
                "Analyze the sentiment of the following text. Respond with only \
                 one word: positive, negative, or neutral.",
                truncate(body, 500).to_string(),
            )
            .await?;
        let sentiment = answer.trim().to_lowercase();
        Ok(match sentiment.as_str() {
            "positive" | "negative" | "neutral" => sentiment,
            _ => "neutral".to_string(),
        })
    }

    /// Morning briefing over recent notable emails and upcoming events.
    pub async fn generate_briefing(
        &self,
        emails: &[EmailDigest],
        events: &[EventDigest],
    ) -> Result<String, AssistantError> {
        let prompt = format!(
            "Write a short morning briefing for the user. Summarize what needs \
             attention in their inbox, then walk through today's schedule. \
             Plain text, friendly, at most 200 words.\n\n\
             Recent emails:\n{}\n\nUpcoming events:\n{}",
            serde_json::to_string(emails).unwrap_or_default(),
            serde_json::to_string(events).unwrap_or_default(),
        );
        self.complete("You are a personal assistant writing a daily briefing.", prompt)
            .await
    }

    /// Two-to-three bullet points of meeting preparation.
    pub async fn meeting_preparation_notes(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, AssistantError> {
        let prompt = format!(
            "Based on this meeting, provide 2-3 bullet points of preparation \
             notes.\n\nTitle: {}\nDescription: {}",
            title,
            truncate(description, 800)
        );
        self.complete("Generate concise meeting preparation notes.", prompt)
            .await
    }

    /// Advisory signal only: the mail collaborator's keyword flags decide
    /// emergency handling, never this.
    pub async fn detect_emergency(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<bool, AssistantError> {
        let prompt = format!(
            "Does this email indicate an emergency, urgent situation or \
             critical issue? Respond with only \"true\" or \"false\".\n\n\
             Subject: {}\nBody: {}",
            subject,
            truncate(body, 500)
        );
        let answer = self
            .complete(
                "You detect emergency situations in emails: urgent language, \
                 time-sensitive issues, critical problems.",
                prompt,
            )
            .await?;
        Ok(answer.trim().eq_ignore_ascii_case("true"))
    }

    async fn complete(&self, system: &str, prompt: String) -> Result<String, AssistantError> {
        let api_key = self.api_key.as_ref().ok_or(AssistantError::NotConfigured)?;

        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system.to_string(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response: ClaudeResponse = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .map(|text| text.trim().to_string())
            .ok_or(AssistantError::EmptyResponse)
    }
}

/// Static briefing used when the model is unreachable or unconfigured.
pub fn fallback_briefing() -> String {
    "Good morning! Your briefing is being prepared. Please check back shortly.".to_string()
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
