use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::auth::Token;
use crate::contributor::Contributor;
use crate::error::{DoraLensError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive analysis window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Window {
    /// Builds a window from the start of `from` to the last second of `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        let (Some(start_of_day), Some(end_of_day)) = (
            NaiveTime::from_hms_opt(0, 0, 0),
            NaiveTime::from_hms_opt(23, 59, 59),
        ) else {
            return Err(DoraLensError::Config("Invalid day boundaries".to_string()));
        };

        let window = Self {
            from: from.and_time(start_of_day).and_utc(),
            to: to.and_time(end_of_day).and_utc(),
        };

        if window.from > window.to {
            return Err(DoraLensError::Config(format!(
                "--from date ({from}) must not be after --to date ({to})"
            )));
        }

        Ok(window)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at <= self.to
    }

    pub fn days(&self) -> i64 {
        (self.to - self.from).num_hours() / 24 + 1
    }
}

/// Raw, unvalidated run settings as handed over by the command line.
#[derive(Debug, Default)]
pub struct ConfigInput {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repositories: Vec<String>,
    pub members: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub token: Token,
    pub owner: String,
    pub repositories: Vec<String>,
    /// Empty means every contributor is included.
    pub members: Vec<Contributor>,
    pub window: Window,
    pub concurrency: usize,
}

impl TryFrom<ConfigInput> for AnalysisConfig {
    type Error = DoraLensError;

    fn try_from(input: ConfigInput) -> Result<Self> {
        let token = input
            .token
            .map(|t| Token::from(t.trim()))
            .filter(|t| !t.is_blank())
            .ok_or_else(|| {
                DoraLensError::Config(
                    "GitHub token required. Use --token or set GITHUB_TOKEN".to_string(),
                )
            })?;

        let owner = non_empty(input.owner)
            .ok_or_else(|| DoraLensError::Config("--owner is required".to_string()))?;

        let repositories = clean_list(&input.repositories);
        if repositories.is_empty() {
            return Err(DoraLensError::Config("--repos is required".to_string()));
        }

        let members = clean_list(&input.members)
            .iter()
            .map(|m| Contributor::new(m))
            .collect();

        let from = parse_date("--from", input.from)?;
        let to = parse_date("--to", input.to)?;
        let window = Window::from_dates(from, to)?;

        if input.concurrency == 0 {
            return Err(DoraLensError::Config(
                "--concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            token,
            owner,
            repositories,
            members,
            window,
            concurrency: input.concurrency,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_date(flag: &str, value: Option<String>) -> Result<NaiveDate> {
    let value = non_empty(value).ok_or_else(|| {
        DoraLensError::Config(format!("{flag} is required (format: YYYY-MM-DD)"))
    })?;

    NaiveDate::parse_from_str(&value, DATE_FORMAT)
        .map_err(|e| DoraLensError::Config(format!("Invalid {flag} date '{value}': {e}")))
}
