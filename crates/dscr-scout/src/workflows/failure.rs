use std::fmt;

/// Stable, greppable prefix carried by every collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    ListingHttp,
    ListingParse,
    HudNoData,
    HudNoBedroom,
    HudHttp,
    DbSave,
    DbQuery,
    DbLog,
    Notify,
    Cancelled,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::ListingHttp => "LISTING_HTTP_ERROR",
            ReasonCode::ListingParse => "LISTING_PARSE_ERROR",
            ReasonCode::HudNoData => "HUD_NO_DATA",
            ReasonCode::HudNoBedroom => "HUD_NO_BEDROOM",
            ReasonCode::HudHttp => "HUD_HTTP_ERROR",
            ReasonCode::DbSave => "DB_SAVE_ERROR",
            ReasonCode::DbQuery => "DB_QUERY_ERROR",
            ReasonCode::DbLog => "DB_LOG_ERROR",
            ReasonCode::Notify => "NOTIFY_ERROR",
            ReasonCode::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure returned across a collaborator boundary, rendered as `CODE: detail`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {detail}")]
pub struct CollaboratorError {
    pub code: ReasonCode,
    pub detail: String,
}

impl CollaboratorError {
    pub fn new(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    pub fn cancelled(operation: &str) -> Self {
        Self::new(ReasonCode::Cancelled, format!("{operation} interrupted"))
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_render_code_then_detail() {
        let error = CollaboratorError::new(ReasonCode::HudNoData, "no FMR for zip 85281");
        assert_eq!(error.to_string(), "HUD_NO_DATA: no FMR for zip 85281");
    }

    #[test]
    fn cancellation_names_the_operation() {
        let error = CollaboratorError::cancelled("rent lookup");
        assert_eq!(error.code, ReasonCode::Cancelled);
        assert_eq!(error.to_string(), "CANCELLED: rent lookup interrupted");
    }
}
