//! Copilot seat management types.

use super::{Organization, Team, Timestamp, User};
use serde::de::{Deserializer, Error as _};
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Copilot subscription details of an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotOrganizationDetails {
    /// Seat counts.
    pub seat_breakdown: CopilotSeatBreakdown,
    /// Public code suggestion policy.
    #[serde(default)]
    pub public_code_suggestions: Option<String>,
    /// Copilot Chat policy.
    #[serde(default)]
    pub copilot_chat: Option<String>,
    /// How seats are assigned.
    #[serde(default)]
    pub seat_management_setting: Option<String>,
}

/// Seat counts for the current billing cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopilotSeatBreakdown {
    /// Total seats.
    #[serde(default)]
    pub total: u64,
    /// Seats added this cycle.
    #[serde(default)]
    pub added_this_cycle: u64,
    /// Seats pending cancellation.
    #[serde(default)]
    pub pending_cancellation: u64,
    /// Seats pending invitation.
    #[serde(default)]
    pub pending_invitation: u64,
    /// Seats used this cycle.
    #[serde(default)]
    pub active_this_cycle: u64,
    /// Seats unused this cycle.
    #[serde(default)]
    pub inactive_this_cycle: u64,
}

/// One page of seat assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListCopilotSeatsResponse {
    /// Seats across all pages.
    pub total_seats: u64,
    /// Seats on this page.
    #[serde(default)]
    pub seats: Vec<CopilotSeatDetails>,
}

/// A Copilot seat and who holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotSeatDetails {
    /// Seat holder.
    pub assignee: Assignee,
    /// Team through which the seat was assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigning_team: Option<Team>,
    /// Date the seat will be cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_cancellation_date: Option<String>,
    /// Last Copilot activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<Timestamp>,
    /// Editor used for the last activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_editor: Option<String>,
    /// Seat creation time.
    pub created_at: Timestamp,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl CopilotSeatDetails {
    /// The assignee, if it is a user.
    pub fn user(&self) -> Option<&User> {
        match &self.assignee {
            Assignee::User(user) => Some(user),
            _ => None,
        }
    }

    /// The assignee, if it is a team.
    pub fn team(&self) -> Option<&Team> {
        match &self.assignee {
            Assignee::Team(team) => Some(team),
            _ => None,
        }
    }

    /// The assignee, if it is an organization.
    pub fn organization(&self) -> Option<&Organization> {
        match &self.assignee {
            Assignee::Organization(org) => Some(org),
            _ => None,
        }
    }
}

/// Holder of a Copilot seat, chosen by the `type` field of the JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignee {
    /// A user.
    User(User),
    /// A team.
    Team(Team),
    /// An organization.
    Organization(Organization),
}

impl Assignee {
    /// The `type` discriminator GitHub uses for this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::User(_) => "User",
            Self::Team(_) => "Team",
            Self::Organization(_) => "Organization",
        }
    }
}

impl<'de> Deserialize<'de> for Assignee {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields: Map<String, Value> = match Value::deserialize(deserializer)? {
            Value::Object(fields) => fields,
            other => {
                return Err(D::Error::custom(format!(
                    "unsupported assignee type: expected an object, got {}",
                    other
                )))
            }
        };

        let kind = match fields.get("type") {
            None | Some(Value::Null) => {
                return Err(D::Error::custom("assignee type field is not set"))
            }
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "assignee type field must be a string, got {}",
                    other
                )))
            }
        };

        let object = Value::Object(fields);
        match kind.as_str() {
            "User" => serde_json::from_value(object).map(Self::User),
            "Team" => serde_json::from_value(object).map(Self::Team),
            "Organization" => serde_json::from_value(object).map(Self::Organization),
            other => {
                return Err(D::Error::custom(format!(
                    "unsupported assignee type {}",
                    other
                )))
            }
        }
        .map_err(D::Error::custom)
    }
}

impl Serialize for Assignee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = match self {
            Self::User(user) => serde_json::to_value(user),
            Self::Team(team) => serde_json::to_value(team),
            Self::Organization(org) => serde_json::to_value(org),
        }
        .map_err(S::Error::custom)?;

        let mut fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(S::Error::custom("assignee did not serialize to an object")),
        };
        fields.insert(
            "type".to_string(),
            Value::String(self.type_name().to_string()),
        );
        fields.serialize(serializer)
    }
}

/// Result of adding users or teams to the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignments {
    /// Seats created.
    pub seats_created: u64,
}

/// Result of removing users or teams from the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCancellations {
    /// Seats cancelled.
    pub seats_cancelled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seat(assignee: &str) -> String {
        format!(
            r#"{{"assignee": {}, "created_at": "2021-08-03T18:00:00-06:00"}}"#,
            assignee
        )
    }

    #[test]
    fn test_user_assignee() {
        let json = seat(r#"{"login": "octocat", "id": 1, "type": "User", "site_admin": false}"#);
        let details: CopilotSeatDetails = serde_json::from_str(&json).unwrap();

        let user = details.user().unwrap();
        assert_eq!(user.login, "octocat");
        assert!(details.team().is_none());
    }

    #[test]
    fn test_team_assignee() {
        let json = seat(r#"{"id": 7, "name": "Justice League", "slug": "justice-league", "type": "Team"}"#);
        let details: CopilotSeatDetails = serde_json::from_str(&json).unwrap();

        assert_eq!(details.team().unwrap().name, "Justice League");
    }

    #[test]
    fn test_organization_assignee() {
        let json = seat(r#"{"login": "github", "id": 1, "type": "Organization"}"#);
        let details: CopilotSeatDetails = serde_json::from_str(&json).unwrap();

        assert_eq!(details.organization().unwrap().login, "github");
    }

    #[test]
    fn test_missing_type_is_an_error() {
        let json = seat(r#"{"login": "octocat", "id": 1}"#);
        let err = serde_json::from_str::<CopilotSeatDetails>(&json).unwrap_err();
        assert!(err.to_string().contains("assignee type field is not set"));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let json = seat(r#"{"login": "octocat", "id": 1, "type": "Bot"}"#);
        let err = serde_json::from_str::<CopilotSeatDetails>(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported assignee type Bot"));
    }

    #[test]
    fn test_non_object_assignee_is_an_error() {
        let json = seat(r#""octocat""#);
        assert!(serde_json::from_str::<CopilotSeatDetails>(&json).is_err());
    }

    #[test]
    fn test_team_round_trip_keeps_discriminator() {
        let json = seat(r#"{"id": 7, "name": "Justice League", "type": "Team"}"#);
        let details: CopilotSeatDetails = serde_json::from_str(&json).unwrap();

        let encoded = serde_json::to_string(&details).unwrap();
        let decoded: CopilotSeatDetails = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, details);
    }
}
