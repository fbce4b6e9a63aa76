//! Copilot seat management for organizations.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::pagination::PaginationParams;
use crate::types::{
    CopilotOrganizationDetails, CopilotSeatDetails, ListCopilotSeatsResponse, SeatAssignments,
    SeatCancellations,
};
use serde::Serialize;

/// Service for Copilot operations.
pub struct CopilotService<'a> {
    client: &'a GitHubClient,
}

impl<'a> CopilotService<'a> {
    /// Creates a new Copilot service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets Copilot billing details for an organization.
    pub async fn organization_details(&self, org: &str) -> GitHubResult<CopilotOrganizationDetails> {
        self.client
            .get(&format!("/orgs/{}/copilot/billing", org))
            .await?
            .require()
    }

    /// Lists the Copilot seats of an organization, one page at a time.
    pub async fn list_seats(
        &self,
        org: &str,
        options: &PaginationParams,
    ) -> GitHubResult<ListCopilotSeatsResponse> {
        self.client
            .get_with_params(&format!("/orgs/{}/copilot/billing/seats", org), options)
            .await?
            .require()
    }

    /// Gets the seat held by an organization member.
    pub async fn seat_details(&self, org: &str, username: &str) -> GitHubResult<CopilotSeatDetails> {
        self.client
            .get(&format!("/orgs/{}/members/{}/copilot", org, username))
            .await?
            .require()
    }

    /// Adds teams to the subscription.
    pub async fn add_teams(&self, org: &str, team_names: &[String]) -> GitHubResult<SeatAssignments> {
        self.client
            .post(
                &format!("/orgs/{}/copilot/billing/selected_teams", org),
                &SelectedTeams {
                    selected_teams: team_names,
                },
            )
            .await?
            .require()
    }

    /// Removes teams from the subscription.
    pub async fn remove_teams(
        &self,
        org: &str,
        team_names: &[String],
    ) -> GitHubResult<SeatCancellations> {
        self.client
            .delete_with_body(
                &format!("/orgs/{}/copilot/billing/selected_teams", org),
                &SelectedTeams {
                    selected_teams: team_names,
                },
            )
            .await?
            .require()
    }

    /// Adds users to the subscription.
    pub async fn add_users(&self, org: &str, usernames: &[String]) -> GitHubResult<SeatAssignments> {
        self.client
            .post(
                &format!("/orgs/{}/copilot/billing/selected_users", org),
                &SelectedUsers {
                    selected_usernames: usernames,
                },
            )
            .await?
            .require()
    }

    /// Removes users from the subscription.
    pub async fn remove_users(
        &self,
        org: &str,
        usernames: &[String],
    ) -> GitHubResult<SeatCancellations> {
        self.client
            .delete_with_body(
                &format!("/orgs/{}/copilot/billing/selected_users", org),
                &SelectedUsers {
                    selected_usernames: usernames,
                },
            )
            .await?
            .require()
    }
}

#[derive(Serialize)]
struct SelectedTeams<'a> {
    selected_teams: &'a [String],
}

#[derive(Serialize)]
struct SelectedUsers<'a> {
    selected_usernames: &'a [String],
}
