use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::date::AppliedDate;
use crate::error::TrackError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Submitted,
    Rejected,
    PhoneScreen,
    RemoteInterview,
    OnSiteInterview,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Submitted,
        Status::Rejected,
        Status::PhoneScreen,
        Status::RemoteInterview,
        Status::OnSiteInterview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Submitted => "SUBMITTED",
            Status::Rejected => "REJECTED",
            Status::PhoneScreen => "PHONE_SCREEN",
            Status::RemoteInterview => "REMOTE_INTERVIEW",
            Status::OnSiteInterview => "ON_SITE_INTERVIEW",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_uppercase().replace('-', "_");
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == tag)
            .ok_or_else(|| TrackError::Validation(format!("unknown status '{}'", s.trim())))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse::<Status>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One tracked job application.
///
/// Text fields that a parser could not find are empty strings, never missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    pub id: Option<i64>,
    pub company: String,
    pub position: String,
    pub location: String,
    pub salary_range: String,
    pub workplace_type: String,
    pub status: Status,
    pub notes: String,
    pub website: String,
    pub date_applied: AppliedDate,
}

impl Record {
    /// Appends a line to the notes, newline-separated from existing content.
    pub fn append_note(&mut self, text: &str) {
        if self.notes.is_empty() {
            self.notes = text.to_string();
        } else {
            self.notes.push('\n');
            self.notes.push_str(text);
        }
    }

    /// Checks the fields the store requires before persisting.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.company.trim().is_empty() {
            return Err(TrackError::Validation("company is required".to_string()));
        }
        if self.position.trim().is_empty() {
            return Err(TrackError::Validation("position is required".to_string()));
        }
        if self.date_applied.is_unset() {
            return Err(TrackError::Validation("date applied is required".to_string()));
        }
        Ok(())
    }
}
