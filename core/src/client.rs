//! Stateless request builder and response resolver for the registry API.
//!
//! # Design
//! `RegistryClient` holds only a `ClientConfig` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The caller executes the HTTP round-trip in between, which
//! keeps this module deterministic and free of I/O.
//!
//! Status codes outside 2xx are never errors here. They resolve to an
//! envelope with `ok == false` and no payload, and the body is not read.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::jsonapi::{
    Document, NewResource, ResourceDocument, ResourceIdentifier, MEDIA_TYPE, TEAMS, USERS,
};
use crate::types::{is_success, ApiResponse, TeamResponse, TeamsResponse, UserResponse};

/// Synchronous, stateless client for the team/user registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    config: ClientConfig,
}

impl RegistryClient {
    pub fn new(mut config: ClientConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_check_api(&self) -> HttpRequest {
        self.read("/api".to_string())
    }

    pub fn build_get_user(&self, user_id: &str) -> HttpRequest {
        self.read(format!("/users/{}", urlencoding::encode(user_id)))
    }

    pub fn build_get_team(&self, team_id: &str) -> HttpRequest {
        self.read(format!("/teams/{}", urlencoding::encode(team_id)))
    }

    pub fn build_find_teams(&self, filter_name: &str) -> HttpRequest {
        self.read(format!("/teams?filter[name]={}", urlencoding::encode(filter_name)))
    }

    pub fn build_create_user(
        &self,
        user_id: &str,
        user_name: &str,
        email: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = ResourceDocument {
            data: NewResource::new(USERS).id(user_id).attribute("name", user_name),
        };
        self.write(HttpMethod::Post, "/users".to_string(), &body, email)
    }

    pub fn build_create_team(
        &self,
        team_name: &str,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = ResourceDocument {
            data: NewResource::new(TEAMS)
                .attribute("name", team_name)
                .to_many("members", vec![ResourceIdentifier::user(user_id)]),
        };
        self.write(HttpMethod::Post, "/teams".to_string(), &body, email)
    }

    /// The members endpoint takes a bare array of identifiers on POST.
    pub fn build_add_user_to_team(
        &self,
        team_id: &str,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = vec![ResourceIdentifier::user(user_id)];
        self.write(HttpMethod::Post, members_path(team_id), &body, email)
    }

    pub fn build_remove_team_member(
        &self,
        team_id: &str,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = ResourceDocument {
            data: vec![ResourceIdentifier::user(user_id)],
        };
        self.write(HttpMethod::Delete, members_path(team_id), &body, email)
    }

    pub fn build_update_motto(
        &self,
        motto: &str,
        team_id: &str,
        email: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = ResourceDocument {
            data: NewResource::new(TEAMS).id(team_id).attribute("motto", motto),
        };
        let path = format!("/teams/{}", urlencoding::encode(team_id));
        self.write(HttpMethod::Patch, path, &body, email)
    }

    /// `Basic base64(email:password)` for the configured password.
    pub fn authorization(&self, email: &str) -> String {
        let credentials = format!("{email}:{}", self.config.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    fn read(&self, path: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}{path}", self.config.base_url),
            headers: vec![("accept".to_string(), MEDIA_TYPE.to_string())],
            body: None,
        }
    }

    fn write<B: Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        body: &B,
        email: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut headers = vec![
            ("accept".to_string(), MEDIA_TYPE.to_string()),
            ("content-type".to_string(), MEDIA_TYPE.to_string()),
        ];
        if let Some(email) = email {
            headers.push(("authorization".to_string(), self.authorization(email)));
        }
        Ok(HttpRequest {
            method,
            path: format!("{}{path}", self.config.base_url),
            headers,
            body: Some(body),
        })
    }

    // -----------------------------------------------------------------------
    // Response resolvers
    // -----------------------------------------------------------------------

    /// Status-only result for `check_api` and every mutation.
    pub fn parse_status(&self, response: &HttpResponse) -> ApiResponse {
        ApiResponse::from_status(response.status)
    }

    pub fn parse_user(&self, response: &HttpResponse) -> Result<UserResponse, ApiError> {
        let ok = is_success(response.status);
        let user = if ok {
            Some(Document::parse(&response.body)?.user()?)
        } else {
            None
        };
        Ok(UserResponse {
            status_code: response.status,
            ok,
            user,
        })
    }

    pub fn parse_team(&self, response: &HttpResponse) -> Result<TeamResponse, ApiError> {
        let ok = is_success(response.status);
        let team = if ok {
            Some(Document::parse(&response.body)?.team()?)
        } else {
            None
        };
        Ok(TeamResponse {
            status_code: response.status,
            ok,
            team,
        })
    }

    pub fn parse_teams(&self, response: &HttpResponse) -> Result<TeamsResponse, ApiError> {
        let ok = is_success(response.status);
        let teams = if ok {
            Some(Document::parse(&response.body)?.teams()?)
        } else {
            None
        };
        Ok(TeamsResponse {
            status_code: response.status,
            ok,
            teams,
        })
    }
}

fn members_path(team_id: &str) -> String {
    format!("/teams/{}/members", urlencoding::encode(team_id))
}
