//! Contact form submission types.
//!
//! The submit endpoint accepts a JSON body. Every field is opaque text: only
//! presence is checked, never the shape of the email address or URL.

use serde::Deserialize;

use crate::error::SubmitError;

/// Wire shape of the request body. Everything is optional here so that a
/// missing field can be reported by name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubmission {
    name: Option<String>,
    email: Option<String>,
    message: Option<String>,
    service: Option<String>,
    company_name: Option<String>,
    company_url: Option<String>,
    #[serde(alias = "cf-turnstile-response", alias = "g-recaptcha-response")]
    bot_check_response: Option<String>,
}

/// A validated contact form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
    pub service: String,
    pub company_name: String,
    pub company_url: Option<String>,
    /// Provider-issued bot-check token, present whenever verification is on.
    pub bot_check_response: Option<String>,
}

impl FormSubmission {
    /// Parse and validate a JSON request body.
    ///
    /// A required field that is absent, `null` or blank is missing. When
    /// `require_bot_check` is set the bot-check response is required too.
    pub fn parse(body: &[u8], require_bot_check: bool) -> Result<Self, SubmitError> {
        let raw: RawSubmission = serde_json::from_slice(body)
            .map_err(|_| SubmitError::Validation("malformed request body".to_string()))?;

        let bot_check_response = present(raw.bot_check_response);
        if require_bot_check && bot_check_response.is_none() {
            return Err(missing("botCheckResponse"));
        }

        Ok(FormSubmission {
            name: present(raw.name).ok_or_else(|| missing("name"))?,
            email: present(raw.email).ok_or_else(|| missing("email"))?,
            message: present(raw.message).ok_or_else(|| missing("message"))?,
            service: present(raw.service).ok_or_else(|| missing("service"))?,
            company_name: present(raw.company_name).ok_or_else(|| missing("companyName"))?,
            company_url: present(raw.company_url),
            bot_check_response,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(field: &str) -> SubmitError {
    SubmitError::Validation(format!("missing required field: {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn assert_validation(err: SubmitError, expected: &str) {
        match err {
            SubmitError::Validation(message) => assert_eq!(message, expected),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn full() -> serde_json::Value {
        json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "message": "Hello",
            "service": "Web development",
            "companyName": "Analytical Engines",
            "companyUrl": "https://engines.example",
            "botCheckResponse": "cf-token"
        })
    }

    #[test]
    fn test_parse_full_submission() {
        let form = FormSubmission::parse(&body(full()), true).unwrap();

        assert_eq!(form.name, "Ada Lovelace");
        assert_eq!(form.company_name, "Analytical Engines");
        assert_eq!(form.company_url.as_deref(), Some("https://engines.example"));
        assert_eq!(form.bot_check_response.as_deref(), Some("cf-token"));
    }

    #[test]
    fn test_company_url_is_optional() {
        let mut value = full();
        value.as_object_mut().unwrap().remove("companyUrl");

        let form = FormSubmission::parse(&body(value), true).unwrap();
        assert_eq!(form.company_url, None);
    }

    #[test]
    fn test_missing_required_field() {
        let mut value = full();
        value.as_object_mut().unwrap().remove("name");

        let err = FormSubmission::parse(&body(value), true).unwrap_err();
        assert_validation(err, "missing required field: name");
    }

    #[test]
    fn test_blank_and_null_count_as_missing() {
        let mut value = full();
        value["email"] = json!("   ");
        let err = FormSubmission::parse(&body(value), true).unwrap_err();
        assert_validation(err, "missing required field: email");

        let mut value = full();
        value["companyName"] = serde_json::Value::Null;
        let err = FormSubmission::parse(&body(value), true).unwrap_err();
        assert_validation(err, "missing required field: companyName");
    }

    #[test]
    fn test_bot_check_response_required_only_when_enabled() {
        let mut value = full();
        value.as_object_mut().unwrap().remove("botCheckResponse");

        let err = FormSubmission::parse(&body(value.clone()), true).unwrap_err();
        assert_validation(err, "missing required field: botCheckResponse");

        let form = FormSubmission::parse(&body(value), false).unwrap();
        assert_eq!(form.bot_check_response, None);
    }

    #[test]
    fn test_provider_native_field_names() {
        let mut value = full();
        value.as_object_mut().unwrap().remove("botCheckResponse");
        value["cf-turnstile-response"] = json!("turnstile-token");

        let form = FormSubmission::parse(&body(value), true).unwrap();
        assert_eq!(form.bot_check_response.as_deref(), Some("turnstile-token"));
    }

    #[test]
    fn test_malformed_body() {
        let err = FormSubmission::parse(b"name=ada", true).unwrap_err();
        assert_validation(err, "malformed request body");

        let mut value = full();
        value["name"] = json!(42);
        let err = FormSubmission::parse(&body(value), true).unwrap_err();
        assert_validation(err, "malformed request body");
    }
}
