//! Data types for the GitHub API resources the services expose.
//!
//! Only the fields the crate needs are modelled; unknown fields are ignored
//! on decode.

mod copilot;
mod timestamp;

pub use copilot::{
    Assignee, CopilotOrganizationDetails, CopilotSeatBreakdown, CopilotSeatDetails,
    ListCopilotSeatsResponse, SeatAssignments, SeatCancellations,
};
pub use timestamp::Timestamp;

use crate::rate_limit::{RateLimitCategory, RateLimitRecord};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// GitHub user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: u64,
    /// Username (login).
    pub login: String,
    /// User node ID.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Profile URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// User type (User, Organization, Bot).
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
    /// Site admin flag.
    #[serde(default)]
    pub site_admin: bool,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Public email.
    #[serde(default)]
    pub email: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    /// Search text matches, present with the text-match media type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_matches: Vec<TextMatch>,
}

/// Organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID.
    pub id: u64,
    /// Organization login.
    pub login: String,
    /// Node ID.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Organization name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// HTML URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Account type as reported by GitHub.
    #[serde(rename = "type", default)]
    pub org_type: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// Team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Team ID.
    pub id: u64,
    /// Team name.
    pub name: String,
    /// Team slug.
    #[serde(default)]
    pub slug: Option<String>,
    /// Node ID.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Team description.
    #[serde(default)]
    pub description: Option<String>,
    /// Privacy level (`secret` or `closed`).
    #[serde(default)]
    pub privacy: Option<String>,
    /// Permission level.
    #[serde(default)]
    pub permission: Option<String>,
    /// HTML URL.
    #[serde(default)]
    pub html_url: Option<String>,
}

/// GitHub repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository ID.
    pub id: u64,
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    pub full_name: String,
    /// Owner information.
    #[serde(default)]
    pub owner: Option<User>,
    /// Node ID.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
    /// Repository description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the repository is a fork.
    #[serde(default)]
    pub fork: bool,
    /// HTML URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Default branch.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Primary language.
    #[serde(default)]
    pub language: Option<String>,
    /// Fork count.
    #[serde(default)]
    pub forks_count: u32,
    /// Stargazer count.
    #[serde(default)]
    pub stargazers_count: u32,
    /// Open issue count.
    #[serde(default)]
    pub open_issues_count: u32,
    /// Topics.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Visibility (`public`, `private`, `internal`).
    #[serde(default)]
    pub visibility: Option<String>,
    /// Whether the repository is archived.
    #[serde(default)]
    pub archived: bool,
    /// License information.
    #[serde(default)]
    pub license: Option<License>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    /// Last push time.
    #[serde(default)]
    pub pushed_at: Option<Timestamp>,
    /// Search text matches, present with the text-match media type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_matches: Vec<TextMatch>,
}

/// Repository license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// License key.
    pub key: String,
    /// License name.
    pub name: String,
    /// SPDX ID.
    #[serde(default)]
    pub spdx_id: Option<String>,
}

/// GitHub issue or pull request as returned by issue search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue ID.
    pub id: u64,
    /// Issue number.
    pub number: u32,
    /// Issue title.
    pub title: String,
    /// Issue state.
    pub state: IssueState,
    /// Issue body.
    #[serde(default)]
    pub body: Option<String>,
    /// Issue author.
    #[serde(default)]
    pub user: Option<User>,
    /// Comment count.
    #[serde(default)]
    pub comments: u32,
    /// HTML URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    /// Close time.
    #[serde(default)]
    pub closed_at: Option<Timestamp>,
    /// Search text matches, present with the text-match media type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_matches: Vec<TextMatch>,
}

/// Issue state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Open issue.
    Open,
    /// Closed issue.
    Closed,
}

/// A search result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    /// Total number of matches.
    pub total_count: u64,
    /// True when the search timed out before finding every match.
    #[serde(default)]
    pub incomplete_results: bool,
    /// Matches on this page.
    pub items: Vec<T>,
}

/// Highlighted search fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMatch {
    /// API URL of the matched object.
    #[serde(default)]
    pub object_url: Option<String>,
    /// Type of the matched object.
    #[serde(default)]
    pub object_type: Option<String>,
    /// Property that matched.
    #[serde(default)]
    pub property: Option<String>,
    /// Text fragment containing the matches.
    #[serde(default)]
    pub fragment: Option<String>,
    /// Matched terms with their positions in `fragment`.
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// One matched term inside a [`TextMatch`] fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Matched text.
    pub text: String,
    /// Start and end offsets.
    #[serde(default)]
    pub indices: Vec<u32>,
}

/// Weekly contributions of one contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorStats {
    /// Contributor.
    #[serde(default)]
    pub author: Option<User>,
    /// Total commits.
    #[serde(default)]
    pub total: u64,
    /// Per-week breakdown.
    #[serde(default)]
    pub weeks: Vec<WeeklyStats>,
}

/// Additions, deletions and commits in one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    /// Start of the week.
    #[serde(rename = "w")]
    pub week: Timestamp,
    /// Lines added.
    #[serde(rename = "a", default)]
    pub additions: u64,
    /// Lines deleted.
    #[serde(rename = "d", default)]
    pub deletions: u64,
    /// Commits.
    #[serde(rename = "c", default)]
    pub commits: u64,
}

/// Commit counts per day for one week, starting on Sunday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCommitActivity {
    /// Commits per day.
    #[serde(default)]
    pub days: Vec<u32>,
    /// Commits in the week.
    #[serde(default)]
    pub total: u64,
    /// Start of the week.
    pub week: Timestamp,
}

/// Weekly commit counts over the last 52 weeks, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryParticipation {
    /// Commits by everyone, the owner included.
    #[serde(default)]
    pub all: Vec<u32>,
    /// Commits by the owner.
    #[serde(default)]
    pub owner: Vec<u32>,
}

/// A custom property value set on a repository.
///
/// `value: None` encodes as `null`, which unsets the property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPropertyValue {
    /// Property name.
    pub property_name: String,
    /// Property value.
    #[serde(default)]
    pub value: Option<PropertyValue>,
}

impl CustomPropertyValue {
    /// Creates a single-valued property.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property_name: name.into(),
            value: Some(PropertyValue::Single(value.into())),
        }
    }

    /// Creates a multi-valued property.
    pub fn multiple<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            property_name: name.into(),
            value: Some(PropertyValue::Multiple(
                values.into_iter().map(Into::into).collect(),
            )),
        }
    }

    /// Creates an entry that unsets the property.
    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            property_name: name.into(),
            value: None,
        }
    }
}

/// A custom property value: a string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Single value.
    Single(String),
    /// Multi-select value.
    Multiple(Vec<String>),
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self::Single(s)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(de::Error::custom(format!(
                        "custom property list entries must be strings, got {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Multiple),
            other => Err(de::Error::custom(format!(
                "custom property value must be a string or a list of strings, got {}",
                other
            ))),
        }
    }
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimits {
    /// Records keyed by resource name.
    pub resources: HashMap<String, RateLimitRecord>,
}

impl RateLimits {
    /// Record for `category`.
    pub fn get(&self, category: &RateLimitCategory) -> Option<&RateLimitRecord> {
        self.resources.get(category.as_str())
    }

    /// Record for the core REST bucket.
    pub fn core(&self) -> Option<&RateLimitRecord> {
        self.get(&RateLimitCategory::Core)
    }

    /// Record for the search bucket.
    pub fn search(&self) -> Option<&RateLimitRecord> {
        self.get(&RateLimitCategory::Search)
    }

    /// Iterates over every bucket with its category.
    pub fn iter(&self) -> impl Iterator<Item = (RateLimitCategory, &RateLimitRecord)> {
        self.resources
            .iter()
            .map(|(name, record)| (RateLimitCategory::from_resource(name), record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_custom_property_values() {
        let json = r#"[
            {"property_name": "team", "value": "platform"},
            {"property_name": "languages", "value": ["rust", "go"]},
            {"property_name": "owner", "value": null}
        ]"#;

        let values: Vec<CustomPropertyValue> = serde_json::from_str(json).unwrap();
        assert_eq!(
            values,
            vec![
                CustomPropertyValue::single("team", "platform"),
                CustomPropertyValue::multiple("languages", ["rust", "go"]),
                CustomPropertyValue::unset("owner"),
            ]
        );
    }

    #[test]
    fn test_custom_property_rejects_numbers() {
        let err = serde_json::from_str::<CustomPropertyValue>(
            r#"{"property_name": "tier", "value": 3}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("string or a list of strings"));
    }

    #[test]
    fn test_unset_property_encodes_null() {
        let json = serde_json::to_value(CustomPropertyValue::unset("owner")).unwrap();
        assert_eq!(json, serde_json::json!({"property_name": "owner", "value": null}));
    }

    #[test]
    fn test_rate_limits() {
        let json = r#"{
            "resources": {
                "core": {"limit": 5000, "used": 1, "remaining": 4999, "reset": 1691591363},
                "search": {"limit": 30, "used": 12, "remaining": 18, "reset": 1691591091},
                "code_scanning_autofix": {"limit": 10, "used": 0, "remaining": 10, "reset": 1691591091}
            },
            "rate": {"limit": 5000, "used": 1, "remaining": 4999, "reset": 1691591363}
        }"#;

        let limits: RateLimits = serde_json::from_str(json).unwrap();
        assert_eq!(limits.core().unwrap().remaining, 4999);
        assert_eq!(limits.search().unwrap().used, 12);
        assert!(limits
            .iter()
            .any(|(category, _)| category == RateLimitCategory::Other("code_scanning_autofix".into())));
    }

    #[test]
    fn test_contributor_stats_weeks() {
        let json = r#"[{
            "author": {"id": 1, "login": "octocat"},
            "total": 135,
            "weeks": [{"w": 1367712000, "a": 6898, "d": 77, "c": 10}]
        }]"#;

        let stats: Vec<ContributorStats> = serde_json::from_str(json).unwrap();
        assert_eq!(stats[0].author.as_ref().unwrap().login, "octocat");
        assert_eq!(stats[0].weeks[0].week.timestamp(), 1367712000);
        assert_eq!(stats[0].weeks[0].additions, 6898);
    }
}
