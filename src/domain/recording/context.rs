//! Recording context value object

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::ContextError;

/// The TBM a recording belongs to: one team on one day.
///
/// Determines which report the finished asset attaches to, so it never
/// changes once a session has started.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordingContext {
    team_id: u64,
    team_name: String,
    date: NaiveDate,
}

impl RecordingContext {
    /// Build a context, validating every field
    pub fn new(
        team_id: u64,
        team_name: impl Into<String>,
        date: NaiveDate,
    ) -> Result<Self, ContextError> {
        if team_id == 0 {
            return Err(ContextError::InvalidTeamId);
        }
        let team_name = team_name.into().trim().to_string();
        if team_name.is_empty() {
            return Err(ContextError::EmptyTeamName);
        }
        Ok(Self {
            team_id,
            team_name,
            date,
        })
    }

    /// Build a context from a `YYYY-MM-DD` date string
    pub fn parse(
        team_id: u64,
        team_name: impl Into<String>,
        date: &str,
    ) -> Result<Self, ContextError> {
        let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| ContextError::InvalidDate(date.to_string()))?;
        Self::new(team_id, team_name, parsed)
    }

    pub fn team_id(&self) -> u64 {
        self.team_id
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Route of the TBM report page that owns this context
    pub fn report_route(&self) -> String {
        format!("/tbm/{}/{}", self.team_id, self.date.format("%Y-%m-%d"))
    }

    /// Filesystem- and URL-safe rendering of the team name
    pub fn team_slug(&self) -> String {
        let mut slug = String::with_capacity(self.team_name.len());
        let mut last_dash = false;
        for ch in self.team_name.chars() {
            if ch.is_alphanumeric() {
                slug.extend(ch.to_lowercase());
                last_dash = false;
            } else if !last_dash && !slug.is_empty() {
                slug.push('-');
                last_dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        if slug.is_empty() {
            format!("team-{}", self.team_id)
        } else {
            slug
        }
    }
}

impl fmt::Display for RecordingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.team_name, self.date.format("%Y-%m-%d"))
    }
}
