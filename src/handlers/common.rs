use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;
use crate::models::{CountDay, Location, SessionKind, SessionScope};

/// Location selector shared by read endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct LocationQuery {
    /// One of MtD, FtP, HSTD, 3PL
    pub location: Option<String>,
}

impl LocationQuery {
    pub fn location(&self) -> Result<Location, ServiceError> {
        Location::parse(self.location.as_deref())
    }
}

/// Identifies the current session of a scope: a location, the count kind and,
/// for weekly counts, the day.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ScopeParams {
    /// One of MtD, FtP, HSTD, 3PL. Weekly counts default to HSTD.
    pub location: Option<String>,
    /// monthly (default) or weekly
    pub kind: Option<SessionKind>,
    /// Monday through Friday, weekly counts only
    pub day: Option<String>,
}

impl ScopeParams {
    pub fn to_scope(&self) -> Result<SessionScope, ServiceError> {
        let kind = self.kind.unwrap_or(SessionKind::Monthly);
        let location = match (kind, self.location.as_deref()) {
            (SessionKind::Weekly, None) => Location::Hstd,
            (_, raw) => Location::parse(raw)?,
        };
        let day = parse_day(self.day.as_deref())?;
        SessionScope::new(location, kind, day)
    }
}

/// Blank means absent.
pub fn parse_day(raw: Option<&str>) -> Result<Option<CountDay>, ServiceError> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        Some(day) => CountDay::parse(day).map(Some),
        None => Ok(None),
    }
}

/// Scanner clients send quantities as either JSON numbers or strings; both
/// are handed to the engine as typed text.
pub fn quantity_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn weekly_scope_defaults_to_hstd() {
        let params = ScopeParams {
            location: None,
            kind: Some(SessionKind::Weekly),
            day: Some("monday".into()),
        };
        assert_eq!(params.to_scope().unwrap(), SessionScope::weekly(CountDay::Monday));
    }

    #[test]
    fn monthly_scope_needs_a_location() {
        let err = ScopeParams::default().to_scope().unwrap_err();
        assert!(err.to_string().starts_with("No location selected"));
    }

    #[test]
    fn quantities_arrive_as_text() {
        assert_eq!(quantity_text(Some(&json!(12))), Some("12".to_string()));
        assert_eq!(quantity_text(Some(&json!("07"))), Some("07".to_string()));
        assert_eq!(quantity_text(Some(&json!(-3))), Some("-3".to_string()));
        assert_eq!(quantity_text(Some(&Value::Null)), None);
        assert_eq!(quantity_text(None), None);
    }
}
