use crate::mapping;
use crate::types::ProfileRecord;
use reqwest::blocking::Client;
use std::time::Duration;

fn load_env() {
    let _ = dotenvy::dotenv();
}

/// True when a form server base URL is configured.
pub fn is_configured() -> bool {
    load_env();
    std::env::var("FORM_SERVER_URL")
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

/// Blocking client for the form server session and document endpoints.
pub struct SessionClient {
    base_url: String,
    client: Client,
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_connect() || e.is_timeout() {
        "Check your internet connection and try again."
    } else {
        "Network error."
    }
    .to_string()
}

/// Pull the server's own message out of a non-2xx body (`error` or
/// `message`), shown verbatim when present; otherwise a generic fallback.
fn server_rejection(body: &str, fallback: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = json.get(key).and_then(|m| m.as_str()) {
                if !msg.trim().is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    fallback.to_string()
}

/// `/process` failures carry `{errors: [..]}`; join them into one message.
fn processing_errors(body: &str, fallback: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
            let joined = errors
                .iter()
                .filter_map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join(",");
            if !joined.is_empty() {
                return joined;
            }
        }
    }
    fallback.to_string()
}

impl SessionClient {
    pub fn new() -> Result<Self, String> {
        load_env();
        let base_url =
            std::env::var("FORM_SERVER_URL").map_err(|_| "FORM_SERVER_URL not set in .env")?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(SessionClient { base_url, client })
    }

    /// Fetch the server session profile, normalized to canonical keys.
    /// Keys the alias table does not know stay untouched (opaque passthrough).
    pub fn fetch_profile(&self) -> Result<ProfileRecord, String> {
        let response = self
            .client
            .get(format!("{}/get_profile", self.base_url))
            .send()
            .map_err(|e| transport_message(&e))?;
        if !response.status().is_success() {
            return Err(format!("Session load failed ({})", response.status()));
        }
        let json: serde_json::Value = response
            .json()
            .map_err(|e| format!("Invalid JSON: {}", e))?;
        let mut record = ProfileRecord::new();
        if let Some(user_data) = json.get("user_data").and_then(|d| d.as_object()) {
            for (key, value) in user_data {
                let Some(value) = value.as_str() else { continue };
                let canonical = if mapping::is_canonical(key) {
                    key.clone()
                } else {
                    mapping::resolve(key).map(String::from).unwrap_or_else(|| key.clone())
                };
                record.insert(canonical, value.to_string());
            }
        }
        Ok(record)
    }

    /// Mirror the profile to the server session, keyed by wire names.
    pub fn push_profile(&self, record: &ProfileRecord) -> Result<(), String> {
        let mut body = serde_json::Map::new();
        for (key, value) in record {
            let wire = mapping::wire_name(key).unwrap_or(key.as_str());
            body.insert(wire.to_string(), serde_json::Value::String(value.clone()));
        }
        let response = self
            .client
            .post(format!("{}/submit", self.base_url))
            .json(&serde_json::Value::Object(body))
            .send()
            .map_err(|e| transport_message(&e))?;
        if !response.status().is_success() {
            let text = response.text().unwrap_or_default();
            return Err(server_rejection(&text, "Profile save failed"));
        }
        Ok(())
    }

    pub fn clear_profile(&self) -> Result<(), String> {
        let response = self
            .client
            .post(format!("{}/clear_profile", self.base_url))
            .send()
            .map_err(|e| transport_message(&e))?;
        if !response.status().is_success() {
            let text = response.text().unwrap_or_default();
            return Err(server_rejection(&text, "Session clear failed"));
        }
        Ok(())
    }

    /// Upload the staged document (multipart field `document`); returns the
    /// server-side filename.
    pub fn upload_document(&self, file_path: &str) -> Result<String, String> {
        let form = reqwest::blocking::multipart::Form::new()
            .file("document", file_path)
            .map_err(|e| format!("Could not read file: {}", e))?;
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .map_err(|e| transport_message(&e))?;
        if !response.status().is_success() {
            let text = response.text().unwrap_or_default();
            return Err(server_rejection(&text, "Upload failed"));
        }
        let json: serde_json::Value = response
            .json()
            .map_err(|e| format!("Invalid JSON: {}", e))?;
        json.get("filename")
            .and_then(|f| f.as_str())
            .map(String::from)
            .ok_or_else(|| "No filename in upload response".to_string())
    }

    /// Ask the server to render the filled form; returns the image bytes.
    pub fn process_document(&self) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .post(format!("{}/process", self.base_url))
            .send()
            .map_err(|e| transport_message(&e))?;
        if !response.status().is_success() {
            let text = response.text().unwrap_or_default();
            return Err(processing_errors(&text, "Processing failed"));
        }
        let bytes = response.bytes().map_err(|e| transport_message(&e))?;
        Ok(bytes.to_vec())
    }
}
