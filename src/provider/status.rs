use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::reply::ProviderReply;

/// One SMS as reported by the provider. The provider supplies no
/// timestamp, so messages are stamped at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsMessage {
    pub id: i64,
    pub code: String,
    pub text: String,
    pub timestamp: String,
}

/// Activation status as reported by `getStatus`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationStatus {
    /// `STATUS_OK[:code]`
    Ok { code: Option<String> },
    /// `STATUS_WAIT_CODE`
    WaitCode,
    /// `STATUS_CANCEL`
    Cancel,
    /// Any other text status, passed through verbatim
    Other(String),
    /// V2 statuses are already structured; passed through as-is
    Json(Value),
}

pub fn parse_status(reply: &ProviderReply) -> ActivationStatus {
    match reply {
        ProviderReply::Json(v) => ActivationStatus::Json(v.clone()),
        ProviderReply::Error { message, .. } => ActivationStatus::Other(message.clone()),
        ProviderReply::Text(s) => {
            if let Some(rest) = s.strip_prefix("STATUS_OK") {
                let code = rest
                    .strip_prefix(':')
                    .map(|c| c.split(':').next().unwrap_or(c).trim().to_string())
                    .filter(|c| !c.is_empty());
                ActivationStatus::Ok { code }
            } else if s == "STATUS_WAIT_CODE" {
                ActivationStatus::WaitCode
            } else if s == "STATUS_CANCEL" {
                ActivationStatus::Cancel
            } else {
                ActivationStatus::Other(s.clone())
            }
        }
    }
}

/// A parsed message batch for an allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsBatch {
    pub status: String,
    pub messages: Vec<SmsMessage>,
}

fn message(id: i64, code: &str) -> SmsMessage {
    let code = code.trim().to_string();
    SmsMessage {
        id,
        text: code.clone(),
        code,
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Messages for a rented number. `STATUS_OK` carries one code per
/// colon-separated remainder segment; `STATUS_WAIT_CODE` is an empty
/// batch; anything unrecognized is an empty batch with status
/// `"UNKNOWN"`.
pub fn parse_sms_batch(reply: &ProviderReply) -> SmsBatch {
    let ProviderReply::Text(s) = reply else {
        return SmsBatch {
            status: "UNKNOWN".to_string(),
            messages: Vec::new(),
        };
    };

    if s == "STATUS_WAIT_CODE" {
        return SmsBatch {
            status: "WAIT_CODE".to_string(),
            messages: Vec::new(),
        };
    }

    if s == "STATUS_CANCEL" {
        return SmsBatch {
            status: "CANCEL".to_string(),
            messages: Vec::new(),
        };
    }

    let mut messages = Vec::new();
    if s.starts_with("STATUS_OK") {
        for (i, code) in s.split(':').skip(1).enumerate() {
            messages.push(message(i as i64 + 1, code));
        }
    } else if let Some(code) = s.splitn(2, ':').nth(1) {
        // Unlabelled code-bearing reply, keep the first segment
        let code = code.split(':').next().unwrap_or(code);
        if !code.trim().is_empty() {
            messages.push(message(1, code));
        }
    }

    let status = if messages.is_empty() {
        "WAIT_CODE".to_string()
    } else {
        "OK".to_string()
    };

    SmsBatch { status, messages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_ok_with_code() {
        let status = parse_status(&ProviderReply::Text("STATUS_OK:1234".into()));
        assert_eq!(
            status,
            ActivationStatus::Ok {
                code: Some("1234".into())
            }
        );
    }

    #[test]
    fn status_wait_and_cancel() {
        assert_eq!(
            parse_status(&ProviderReply::Text("STATUS_WAIT_CODE".into())),
            ActivationStatus::WaitCode
        );
        assert_eq!(
            parse_status(&ProviderReply::Text("STATUS_CANCEL".into())),
            ActivationStatus::Cancel
        );
    }

    #[test]
    fn v2_json_statuses_pass_through() {
        let v = json!({"status": "RECEIVED", "sms": [{"code": "77"}]});
        assert_eq!(
            parse_status(&ProviderReply::Json(v.clone())),
            ActivationStatus::Json(v)
        );
    }

    #[test]
    fn unknown_text_passes_through_verbatim() {
        assert_eq!(
            parse_status(&ProviderReply::Text("STATUS_RESEND".into())),
            ActivationStatus::Other("STATUS_RESEND".into())
        );
    }

    #[test]
    fn batch_status_ok_single_code() {
        let batch = parse_sms_batch(&ProviderReply::Text("STATUS_OK:1234".into()));
        assert_eq!(batch.status, "OK");
        assert_eq!(batch.messages.len(), 1);
        assert_eq!(batch.messages[0].code, "1234");
        assert_eq!(batch.messages[0].text, "1234");
        assert_eq!(batch.messages[0].id, 1);
    }

    #[test]
    fn batch_status_ok_multiple_segments() {
        let batch = parse_sms_batch(&ProviderReply::Text("STATUS_OK:111:222:333".into()));
        assert_eq!(batch.status, "OK");
        let codes: Vec<&str> = batch.messages.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, ["111", "222", "333"]);
        assert_eq!(batch.messages[2].id, 3);
    }

    #[test]
    fn batch_wait_code_is_empty() {
        let batch = parse_sms_batch(&ProviderReply::Text("STATUS_WAIT_CODE".into()));
        assert_eq!(batch.status, "WAIT_CODE");
        assert!(batch.messages.is_empty());
    }

    #[test]
    fn batch_cancel_is_status_only() {
        let batch = parse_sms_batch(&ProviderReply::Text("STATUS_CANCEL".into()));
        assert_eq!(batch.status, "CANCEL");
        assert!(batch.messages.is_empty());
    }

    #[test]
    fn batch_unrecognized_is_unknown() {
        let batch = parse_sms_batch(&ProviderReply::Json(json!(42)));
        assert_eq!(batch.status, "UNKNOWN");
        assert!(batch.messages.is_empty());
    }

    #[test]
    fn messages_are_timestamped_at_parse_time() {
        let batch = parse_sms_batch(&ProviderReply::Text("STATUS_OK:9".into()));
        let ts = &batch.messages[0].timestamp;
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
