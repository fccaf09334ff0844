//! Outbound SMS via the Twilio Messages API.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::capabilities::SmsSink;
use crate::error::AppError;

pub struct TwilioSms {
    account_sid: String,
    auth_token: String,
    /// The business number texts are sent from.
    from_number: String,
    http_client: reqwest::Client,
}

impl TwilioSms {
    pub fn new(
        account_sid: String,
        auth_token: String,
        from_number: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            http_client,
        }
    }
}

#[async_trait]
impl SmsSink for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<(), AppError> {
        let account_sid = &self.account_sid;
        let url = format!("https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json");
        let mut form = HashMap::new();
        form.insert("From", self.from_number.as_str());
        form.insert("To", to);
        form.insert("Body", body);
        let resp = self
            .http_client
            .post(url)
            .basic_auth(account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, to, "failed to send sms request to twilio");
                AppError("twilio sms api")
            })?;
        debug!(status=%resp.status(), to, "twilio sms resp");
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(AppError("twilio sms api rejected message"))
        }
    }
}
