//! High-level registry operations: build, execute, resolve.
//!
//! Each method issues exactly one request and returns once. A transport
//! failure surfaces as `ApiError::Transport`; a non-2xx status is an ordinary
//! envelope with `ok == false`.

use crate::client::RegistryClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ApiResponse, TeamResponse, TeamsResponse, UserResponse};

/// Registry client bound to a transport.
///
/// Methods take `&self` and share no mutable state, so one instance can serve
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct TeamRegistry<T = UreqTransport> {
    client: RegistryClient,
    transport: T,
}

impl TeamRegistry<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::from_config(&config);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> TeamRegistry<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            client: RegistryClient::new(config),
            transport,
        }
    }

    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    pub fn check_api(&self) -> Result<ApiResponse, ApiError> {
        let response = self.send(self.client.build_check_api())?;
        Ok(self.client.parse_status(&response))
    }

    pub fn get_user(&self, user_id: &str) -> Result<UserResponse, ApiError> {
        let response = self.send(self.client.build_get_user(user_id))?;
        self.resolve(self.client.parse_user(&response))
    }

    pub fn get_team(&self, team_id: &str) -> Result<TeamResponse, ApiError> {
        let response = self.send(self.client.build_get_team(team_id))?;
        self.resolve(self.client.parse_team(&response))
    }

    pub fn find_teams(&self, filter_name: &str) -> Result<TeamsResponse, ApiError> {
        let response = self.send(self.client.build_find_teams(filter_name))?;
        self.resolve(self.client.parse_teams(&response))
    }

    pub fn create_user(
        &self,
        user_id: &str,
        user_name: &str,
        email: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.client.build_create_user(user_id, user_name, email)?;
        let response = self.send(request)?;
        Ok(self.client.parse_status(&response))
    }

    pub fn create_team(
        &self,
        team_name: &str,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.client.build_create_team(team_name, user_id, email)?;
        let response = self.send(request)?;
        Ok(self.client.parse_status(&response))
    }

    pub fn add_user_to_team(
        &self,
        team_id: &str,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.client.build_add_user_to_team(team_id, user_id, email)?;
        let response = self.send(request)?;
        Ok(self.client.parse_status(&response))
    }

    pub fn remove_team_member(
        &self,
        team_id: &str,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.client.build_remove_team_member(team_id, user_id, email)?;
        let response = self.send(request)?;
        Ok(self.client.parse_status(&response))
    }

    pub fn update_motto(
        &self,
        motto: &str,
        team_id: &str,
        email: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.client.build_update_motto(motto, team_id, email)?;
        let response = self.send(request)?;
        Ok(self.client.parse_status(&response))
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(
            method = request.method.as_str(),
            path = %request.path,
            authorized = request.header("authorization").is_some(),
            "registry request"
        );
        let response = self.transport.execute(request)?;
        tracing::debug!(status = response.status, "registry response");
        Ok(response)
    }

    fn resolve<R>(&self, result: Result<R, ApiError>) -> Result<R, ApiError> {
        if let Err(err) = &result {
            tracing::warn!(error = %err, "could not resolve registry response");
        }
        result
    }
}
