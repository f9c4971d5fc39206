use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub team_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamRecord {
    pub id: String,
    pub name: String,
    pub motto: Option<String>,
    pub members: Vec<String>,
}

/// Users by id, teams in creation order.
#[derive(Debug, Default)]
pub struct Registry {
    pub users: HashMap<String, UserRecord>,
    pub teams: Vec<TeamRecord>,
}

impl Registry {
    fn team(&self, id: &str) -> Option<&TeamRecord> {
        self.teams.iter().find(|team| team.id == id)
    }

    fn team_mut(&mut self, id: &str) -> Option<&mut TeamRecord> {
        self.teams.iter_mut().find(|team| team.id == id)
    }
}

pub type Db = Arc<RwLock<Registry>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    password: Option<Arc<str>>,
}

#[derive(Deserialize)]
struct Identifier {
    #[serde(rename = "type")]
    kind: String,
    id: String,
}

#[derive(Deserialize)]
struct Incoming<T> {
    data: T,
}

#[derive(Deserialize)]
struct NewUser {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    attributes: NewUserAttributes,
}

#[derive(Deserialize)]
struct NewUserAttributes {
    name: String,
}

#[derive(Deserialize)]
struct NewTeam {
    #[serde(rename = "type")]
    kind: String,
    attributes: NewTeamAttributes,
    #[serde(default)]
    relationships: NewTeamRelationships,
}

#[derive(Deserialize)]
struct NewTeamAttributes {
    name: String,
}

#[derive(Deserialize, Default)]
struct NewTeamRelationships {
    members: Option<Incoming<Vec<Identifier>>>,
}

#[derive(Deserialize)]
struct TeamPatch {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    #[serde(default)]
    attributes: TeamPatchAttributes,
}

#[derive(Deserialize, Default)]
struct TeamPatchAttributes {
    name: Option<String>,
    motto: Option<String>,
}

#[derive(Deserialize)]
struct TeamFilter {
    #[serde(rename = "filter[name]")]
    name: Option<String>,
}

type Reply = Result<Response, Response>;

/// Router without credential checks.
pub fn app() -> Router {
    router(None)
}

/// Router that rejects mutations lacking `Basic base64(email:password)`.
pub fn app_with_password(password: &str) -> Router {
    router(Some(password.into()))
}

fn router(password: Option<Arc<str>>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Registry::default())),
        password,
    };
    Router::new()
        .route("/api", get(api_root))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/teams", get(list_teams).post(create_team))
        .route("/teams/{id}", get(get_team).patch(update_team))
        .route("/teams/{id}/members", post(add_members).delete(remove_members))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_password(
    listener: TcpListener,
    password: &str,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_password(password)).await
}

fn document(status: StatusCode, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, MEDIA_TYPE)], Json(body)).into_response()
}

fn error(status: StatusCode, title: &str) -> Response {
    document(
        status,
        json!({"errors": [{"status": status.as_u16().to_string(), "title": title}]}),
    )
}

fn identifier(kind: &str, id: &str) -> Value {
    json!({"type": kind, "id": id})
}

pub fn user_resource(user: &UserRecord) -> Value {
    json!({
        "type": "users",
        "id": user.id,
        "attributes": {"name": user.name},
        "relationships": {
            "team": {"data": user.team_id.as_deref().map(|id| identifier("teams", id))}
        }
    })
}

pub fn team_resource(team: &TeamRecord) -> Value {
    let members: Vec<Value> = team.members.iter().map(|id| identifier("users", id)).collect();
    json!({
        "type": "teams",
        "id": team.id,
        "attributes": {"name": team.name, "motto": team.motto},
        "relationships": {"members": {"data": members}}
    })
}

/// Member resources for `teams`, each once, skipping `exclude`.
fn member_resources<'a>(
    registry: &Registry,
    teams: impl IntoIterator<Item = &'a TeamRecord>,
    exclude: Option<&str>,
) -> Vec<Value> {
    let mut seen = HashSet::new();
    teams
        .into_iter()
        .flat_map(|team| team.members.iter())
        .filter(|id| Some(id.as_str()) != exclude && seen.insert(id.as_str()))
        .filter_map(|id| registry.users.get(id))
        .map(user_resource)
        .collect()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.password.as_deref() else {
        return Ok(());
    };
    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok());
    match credentials.as_deref().and_then(|c| c.split_once(':')) {
        Some((email, password)) if !email.is_empty() && password == expected => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "Unauthorized")),
    }
}

fn expect_type(kind: &str, expected: &str) -> Result<(), Response> {
    if kind == expected {
        Ok(())
    } else {
        Err(error(StatusCode::CONFLICT, "Resource type mismatch"))
    }
}

/// Checks that every identifier names an existing user who is not on a team.
fn check_joinable(registry: &Registry, members: &[Identifier]) -> Result<(), Response> {
    for member in members {
        expect_type(&member.kind, "users")?;
        match registry.users.get(&member.id) {
            None => return Err(error(StatusCode::NOT_FOUND, "User not found")),
            Some(user) if user.team_id.is_some() => {
                return Err(error(StatusCode::CONFLICT, "User already belongs to a team"))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

async fn api_root() -> Response {
    document(
        StatusCode::OK,
        json!({"jsonapi": {"version": "1.0"}, "meta": {"service": "team-registry"}}),
    )
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Incoming<NewUser>>,
) -> Reply {
    authorize(&state, &headers)?;
    let input = input.data;
    expect_type(&input.kind, "users")?;

    let mut registry = state.db.write().await;
    if registry.users.contains_key(&input.id) {
        return Err(error(StatusCode::CONFLICT, "User already exists"));
    }
    let user = UserRecord {
        id: input.id,
        name: input.attributes.name,
        team_id: None,
    };
    tracing::info!(id = %user.id, name = %user.name, "created user");
    registry.users.insert(user.id.clone(), user.clone());
    Ok(document(StatusCode::CREATED, json!({"data": user_resource(&user)})))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let registry = state.db.read().await;
    let user = registry
        .users
        .get(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))?;

    let mut included = Vec::new();
    if let Some(team) = user.team_id.as_deref().and_then(|id| registry.team(id)) {
        included.push(team_resource(team));
        included.extend(member_resources(&registry, [team], Some(user.id.as_str())));
    }
    Ok(document(
        StatusCode::OK,
        json!({"data": user_resource(user), "included": included}),
    ))
}

async fn list_teams(State(state): State<AppState>, Query(filter): Query<TeamFilter>) -> Response {
    let registry = state.db.read().await;
    let matching: Vec<&TeamRecord> = registry
        .teams
        .iter()
        .filter(|team| match filter.name.as_deref() {
            Some(name) => team.name.contains(name),
            None => true,
        })
        .collect();
    let data: Vec<Value> = matching.iter().map(|team| team_resource(team)).collect();
    let included = member_resources(&registry, matching.iter().copied(), None);
    document(StatusCode::OK, json!({"data": data, "included": included}))
}

async fn get_team(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let registry = state.db.read().await;
    let team = registry
        .team(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Team not found"))?;
    let included = member_resources(&registry, [team], None);
    Ok(document(
        StatusCode::OK,
        json!({"data": team_resource(team), "included": included}),
    ))
}

async fn create_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Incoming<NewTeam>>,
) -> Reply {
    authorize(&state, &headers)?;
    let input = input.data;
    expect_type(&input.kind, "teams")?;
    let members = input
        .relationships
        .members
        .map(|rel| rel.data)
        .unwrap_or_default();

    let mut registry = state.db.write().await;
    if registry.teams.iter().any(|team| team.name == input.attributes.name) {
        return Err(error(StatusCode::CONFLICT, "Team name already taken"));
    }
    check_joinable(&registry, &members)?;

    let team = TeamRecord {
        id: Uuid::new_v4().to_string(),
        name: input.attributes.name,
        motto: None,
        members: members.into_iter().map(|member| member.id).collect(),
    };
    for member in &team.members {
        if let Some(user) = registry.users.get_mut(member) {
            user.team_id = Some(team.id.clone());
        }
    }
    tracing::info!(id = %team.id, name = %team.name, members = team.members.len(), "created team");
    registry.teams.push(team.clone());

    let included = member_resources(&registry, [&team], None);
    Ok(document(
        StatusCode::CREATED,
        json!({"data": team_resource(&team), "included": included}),
    ))
}

async fn update_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<Incoming<TeamPatch>>,
) -> Reply {
    authorize(&state, &headers)?;
    let input = input.data;
    expect_type(&input.kind, "teams")?;
    if input.id != id {
        return Err(error(StatusCode::CONFLICT, "Resource id mismatch"));
    }

    let mut registry = state.db.write().await;
    let team = registry
        .team_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Team not found"))?;
    if let Some(name) = input.attributes.name {
        team.name = name;
    }
    if let Some(motto) = input.attributes.motto {
        team.motto = Some(motto);
    }
    let team = team.clone();
    tracing::info!(id = %team.id, "updated team");

    let included = member_resources(&registry, [&team], None);
    Ok(document(
        StatusCode::OK,
        json!({"data": team_resource(&team), "included": included}),
    ))
}

async fn add_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(members): Json<Vec<Identifier>>,
) -> Reply {
    authorize(&state, &headers)?;

    let mut registry = state.db.write().await;
    if registry.team(&id).is_none() {
        return Err(error(StatusCode::NOT_FOUND, "Team not found"));
    }
    check_joinable(&registry, &members)?;

    for member in &members {
        if let Some(user) = registry.users.get_mut(&member.id) {
            user.team_id = Some(id.clone());
        }
    }
    if let Some(team) = registry.team_mut(&id) {
        team.members.extend(members.into_iter().map(|member| member.id));
        tracing::info!(id = %team.id, members = team.members.len(), "added team members");
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn remove_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<Incoming<Vec<Identifier>>>,
) -> Reply {
    authorize(&state, &headers)?;

    let mut registry = state.db.write().await;
    let team = registry
        .team_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Team not found"))?;
    let removed: Vec<String> = input
        .data
        .into_iter()
        .filter(|member| member.kind == "users")
        .map(|member| member.id)
        .filter(|member| team.members.contains(member))
        .collect();
    team.members.retain(|member| !removed.contains(member));
    tracing::info!(id = %team.id, removed = removed.len(), "removed team members");

    for member in &removed {
        if let Some(user) = registry.users.get_mut(member) {
            user.team_id = None;
        }
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}
