//! Domain objects and result envelopes for the registry API.
//!
//! # Design
//! These are the denormalized shapes callers work with. Relationships are
//! already resolved: a `User` carries its `Team`, and that team carries its
//! members. Members are only `{id, name}` and never carry a team of their own,
//! so resolution stops after one hop.
//!
//! Every envelope records `status_code` and `ok`. The domain payload is only
//! present when `ok` is true.

/// Returns true for `200 <= status < 300`.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Minimal reference to a user on a team's member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub motto: Option<String>,
    /// `None` when the document did not carry the members relationship or
    /// when one of its pointers had no matching resource.
    pub members: Option<Vec<Member>>,
}

/// A to-one relationship after resolution.
///
/// `Null` means the backend explicitly said there is nothing on the other
/// end. `Absent` means the document did not say, or pointed at a resource it
/// did not include.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Related<T> {
    #[default]
    Absent,
    Null,
    Resolved(T),
}

impl<T> Related<T> {
    pub fn as_resolved(&self) -> Option<&T> {
        match self {
            Related::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Related::Null)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Related::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub team: Related<Team>,
}

/// Status-only result, used by `check_api` and every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub ok: bool,
}

impl ApiResponse {
    pub fn from_status(status_code: u16) -> Self {
        Self {
            status_code,
            ok: is_success(status_code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub status_code: u16,
    pub ok: bool,
    pub user: Option<User>,
}

impl UserResponse {
    pub fn as_api_response(&self) -> ApiResponse {
        ApiResponse {
            status_code: self.status_code,
            ok: self.ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamResponse {
    pub status_code: u16,
    pub ok: bool,
    pub team: Option<Team>,
}

impl TeamResponse {
    pub fn as_api_response(&self) -> ApiResponse {
        ApiResponse {
            status_code: self.status_code,
            ok: self.ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamsResponse {
    pub status_code: u16,
    pub ok: bool,
    /// Server response order is preserved.
    pub teams: Option<Vec<Team>>,
}

impl TeamsResponse {
    pub fn as_api_response(&self) -> ApiResponse {
        ApiResponse {
            status_code: self.status_code,
            ok: self.ok,
        }
    }
}
