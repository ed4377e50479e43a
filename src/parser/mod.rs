//! Platform-specific extraction of job applications from pasted page content.

mod greenhouse;
mod linkedin;

use greenhouse::GreenhouseParser;
use linkedin::LinkedInParser;

use std::fmt;
use thiserror::Error;

use crate::date::AppliedDate;
use crate::models::{Record, Status};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A parser for one job board's page layout. Fields it cannot find are left
/// empty; an error is reserved for input it cannot process at all.
pub trait JobParser {
    fn parse(&self, lines: &[&str], record: &mut Record) -> Result<(), ExtractionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    LinkedIn,
    Greenhouse,
}

impl Platform {
    /// Used for any tag that names no known platform.
    pub const DEFAULT: Platform = Platform::LinkedIn;

    pub fn from_tag(tag: &str) -> Platform {
        match tag.trim().to_lowercase().as_str() {
            "linkedin" => Platform::LinkedIn,
            "greenhouse" => Platform::Greenhouse,
            other => {
                tracing::debug!(tag = other, "unknown platform, using {}", Self::DEFAULT);
                Self::DEFAULT
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Greenhouse => "greenhouse",
        }
    }

    fn parser(&self) -> Result<Box<dyn JobParser>, ExtractionError> {
        Ok(match self {
            Platform::LinkedIn => Box::new(LinkedInParser),
            Platform::Greenhouse => Box::new(GreenhouseParser::new()?),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns raw pasted text into a fresh, unsaved record dated today.
pub fn extract(raw: &str, platform: Platform) -> Result<Record, ExtractionError> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut record = Record::default();
    platform.parser()?.parse(&lines, &mut record)?;
    record.status = Status::Submitted;
    record.date_applied = AppliedDate::today();
    Ok(record)
}
