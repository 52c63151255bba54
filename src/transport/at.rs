//! Africa's Talking gateway adapter.
//!
//! The gateway posts form-encoded `phoneNumber` and `text`; `text`
//! accumulates the whole session's inputs joined by `*`, so only the
//! segment after the final `*` reaches the engine. The response is
//! prefixed `CON ` while the session continues and `END ` when it
//! terminates, which tells the gateway whether to keep the USSD session
//! open.

use serde::Deserialize;

use crate::app::App;
use crate::types::{MlangoError, Result};
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct AtRequest {
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    #[serde(default)]
    pub text: String,
}

/// Latest input leg of the accumulated `text` field.
pub fn latest_input(text: &str) -> &str {
    text.rsplit('*').next().unwrap_or("")
}

/// Handle one gateway leg; returns the framed response body.
pub async fn handle(app: &App, body: &[u8]) -> Result<String> {
    let request: AtRequest = serde_urlencoded::from_bytes(body)
        .map_err(|e| MlangoError::InvalidRequest(format!("bad form body: {e}")))?;
    if request.phone_number.is_empty() {
        return Err(MlangoError::SessionMissing);
    }
    let session_id = validate::format_phone_number(&request.phone_number)
        .unwrap_or(request.phone_number);

    let config = app.args.engine_config(&session_id);
    let input = latest_input(&request.text);
    let (output, continues) = app.pipeline.run(config, input).await?;

    let prefix = if continues { "CON" } else { "END" };
    Ok(format!("{prefix} {output}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_input() {
        assert_eq!(latest_input(""), "");
        assert_eq!(latest_input("1"), "1");
        assert_eq!(latest_input("1*1234*1234"), "1234");
        assert_eq!(latest_input("1*"), "");
    }

    #[test]
    fn test_form_decode() {
        let request: AtRequest =
            serde_urlencoded::from_bytes(b"phoneNumber=%2B254712345678&text=1*1234").unwrap();
        assert_eq!(request.phone_number, "+254712345678");
        assert_eq!(latest_input(&request.text), "1234");
    }

    fn mem_args() -> crate::config::Args {
        use clap::Parser;
        crate::config::Args::try_parse_from(["mlango", "--db", "mem"]).unwrap()
    }

    #[tokio::test]
    async fn test_framing() {
        let app = App::build(mem_args()).await.unwrap();

        let response = handle(&app, b"phoneNumber=0712345678&text=").await.unwrap();
        assert!(response.starts_with("CON "), "got: {response}");

        let response = handle(&app, b"phoneNumber=0712345678&text=2").await.unwrap();
        assert_eq!(response, "END Thank you for using Sarafu. Goodbye!");
    }

    #[tokio::test]
    async fn test_missing_phone_is_session_missing() {
        let app = App::build(mem_args()).await.unwrap();
        let result = handle(&app, b"phoneNumber=&text=").await;
        assert!(matches!(result, Err(MlangoError::SessionMissing)));
    }
}
