use serde::de::DeserializeOwned;
use serde_json::Value;

/// Recovers a JSON object from model output.
///
/// Tries the whole text first, then the span from the first `{` to the last `}`, which covers
/// prose or code fences wrapped around the payload.
pub fn extract_json_object(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(format!("no JSON object in model output: {}", preview(trimmed)));
    };
    if end < start {
        return Err(format!("no JSON object in model output: {}", preview(trimmed)));
    }

    serde_json::from_str::<Value>(&trimmed[start..=end])
        .map_err(|error| format!("could not parse JSON object ({error}): {}", preview(trimmed)))
}

/// Extracts and decodes a verdict; missing fields fall back to the verdict's serde defaults.
pub fn decode_verdict<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let value = extract_json_object(text)?;
    serde_json::from_value(value).map_err(|error| format!("unexpected verdict shape: {error}"))
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 120;
    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
