//! JSON:API document model and relationship resolution.
//!
//! # Design
//! The backend answers with primary data plus a flat `included` array, and
//! relationships are `(type, id)` pointers into that array. Resolution is
//! two steps:
//!
//! 1. Build a `Pool` keyed by `(type, id)` from the primary resource(s) and
//!    `included`. The order of `included` does not matter.
//! 2. Walk each primary resource and substitute pointers with what the pool
//!    holds.
//!
//! The pool borrows from the parsed `Document` and lives for one resolution
//! pass. Resolution goes one hop from the resource being built: a user's team
//! is resolved with its member list, and members are `{id, name}` only, so a
//! member that points back at its team is never expanded again.
//!
//! A pointer with no matching resource fails closed. A to-one relationship
//! becomes `Related::Absent`, and a to-many list becomes `None` instead of a
//! partial list.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::types::{Member, Related, Team, User};

/// Media type sent in `Accept` and `Content-Type`.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

pub const USERS: &str = "users";
pub const TEAMS: &str = "teams";

/// `{type, id}` pointer to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    pub fn user(id: &str) -> Self {
        Self::new(USERS, id)
    }
}

/// Relationship linkage: a single pointer or an ordered list of pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
}

/// A relationship object as received.
///
/// `data` is `None` when the key is missing, `Some(None)` when it is an
/// explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Option<Linkage>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A resource object as received.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
}

impl Resource {
    /// `None` if the relationship or its `data` member is missing,
    /// `Some(None)` if `data` is `null`.
    pub fn relationship(&self, name: &str) -> Option<Option<&Linkage>> {
        self.relationships
            .get(name)
            .and_then(|rel| rel.data.as_ref())
            .map(Option::as_ref)
    }

    fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Resource),
}

/// A top-level JSON:API document.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: Option<PrimaryData>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub included: Vec<Resource>,
}

impl Document {
    pub fn parse(body: &str) -> Result<Self, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// All primary resources, in document order.
    pub fn primaries(&self) -> &[Resource] {
        match &self.data {
            Some(PrimaryData::One(resource)) => std::slice::from_ref(resource),
            Some(PrimaryData::Many(resources)) => resources,
            None => &[],
        }
    }

    fn single(&self) -> Result<&Resource, ApiError> {
        match &self.data {
            Some(PrimaryData::One(resource)) => Ok(resource),
            Some(PrimaryData::Many(_)) => Err(ApiError::Deserialization(
                "expected a single primary resource, got an array".to_string(),
            )),
            None => Err(ApiError::Deserialization("document has no primary data".to_string())),
        }
    }

    fn many(&self) -> Result<&[Resource], ApiError> {
        match &self.data {
            Some(PrimaryData::Many(resources)) => Ok(resources),
            Some(PrimaryData::One(_)) => Err(ApiError::Deserialization(
                "expected an array of primary resources, got a single resource".to_string(),
            )),
            None => Err(ApiError::Deserialization("document has no primary data".to_string())),
        }
    }

    /// Resolve the primary resource as a user.
    pub fn user(&self) -> Result<User, ApiError> {
        let pool = Pool::build(self);
        resolve_user(self.single()?, &pool)
    }

    /// Resolve the primary resource as a team.
    pub fn team(&self) -> Result<Team, ApiError> {
        let pool = Pool::build(self);
        resolve_team(self.single()?, &pool)
    }

    /// Resolve every primary resource as a team, preserving order.
    pub fn teams(&self) -> Result<Vec<Team>, ApiError> {
        let pool = Pool::build(self);
        self.many()?
            .iter()
            .map(|resource| resolve_team(resource, &pool))
            .collect()
    }
}

/// Lookup of every resource in one document, keyed by `(type, id)`.
#[derive(Debug)]
pub struct Pool<'a> {
    resources: HashMap<(&'a str, &'a str), &'a Resource>,
}

impl<'a> Pool<'a> {
    /// Primary resources take precedence over an `included` entry with the
    /// same key.
    pub fn build(document: &'a Document) -> Self {
        Self::from_parts(document.primaries(), &document.included)
    }

    pub fn from_parts(primaries: &'a [Resource], included: &'a [Resource]) -> Self {
        let mut resources = HashMap::with_capacity(primaries.len() + included.len());
        for resource in primaries.iter().chain(included) {
            resources
                .entry((resource.kind.as_str(), resource.id.as_str()))
                .or_insert(resource);
        }
        Self { resources }
    }

    pub fn get(&self, identifier: &ResourceIdentifier) -> Option<&'a Resource> {
        self.resources
            .get(&(identifier.kind.as_str(), identifier.id.as_str()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Deserialize)]
struct UserAttributes {
    name: String,
}

#[derive(Deserialize)]
struct TeamAttributes {
    name: String,
    #[serde(default)]
    motto: Option<String>,
}

fn attributes<T: for<'de> Deserialize<'de>>(resource: &Resource) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(resource.attributes.clone())).map_err(|e| {
        ApiError::Deserialization(format!("{} {}: {e}", resource.kind, resource.id))
    })
}

fn expect_kind(resource: &Resource, kind: &str) -> Result<(), ApiError> {
    if resource.kind == kind {
        Ok(())
    } else {
        Err(ApiError::Deserialization(format!(
            "expected resource of type {kind:?}, got {:?}",
            resource.kind
        )))
    }
}

/// Build a `User` from a primary resource, resolving its team one level deep.
pub fn resolve_user(resource: &Resource, pool: &Pool<'_>) -> Result<User, ApiError> {
    expect_kind(resource, USERS)?;
    let attrs: UserAttributes = attributes(resource)?;

    let team = match resource.relationship("team") {
        None => Related::Absent,
        Some(None) => Related::Null,
        Some(Some(Linkage::One(pointer))) => pool
            .get(pointer)
            .and_then(|related| resolve_team(related, pool).ok())
            .map_or(Related::Absent, Related::Resolved),
        Some(Some(Linkage::Many(_))) => Related::Absent,
    };

    Ok(User {
        id: resource.id.clone(),
        name: attrs.name,
        team,
    })
}

/// Build a `Team` from a resource, resolving its members to `{id, name}`.
pub fn resolve_team(resource: &Resource, pool: &Pool<'_>) -> Result<Team, ApiError> {
    expect_kind(resource, TEAMS)?;
    let attrs: TeamAttributes = attributes(resource)?;

    Ok(Team {
        id: resource.id.clone(),
        name: attrs.name,
        motto: attrs.motto,
        members: resolve_members(resource, pool),
    })
}

fn resolve_members(resource: &Resource, pool: &Pool<'_>) -> Option<Vec<Member>> {
    let pointers = match resource.relationship("members")? {
        None => return Some(Vec::new()),
        Some(Linkage::One(pointer)) => std::slice::from_ref(pointer),
        Some(Linkage::Many(pointers)) => pointers.as_slice(),
    };
    pointers
        .iter()
        .map(|pointer| pool.get(pointer).and_then(member))
        .collect()
}

fn member(resource: &Resource) -> Option<Member> {
    Some(Member {
        id: resource.id.clone(),
        name: resource.attribute_str("name")?.to_string(),
    })
}

/// Relationship object sent in a request body.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingRelationship {
    pub data: Linkage,
}

/// A resource object sent in a request body.
#[derive(Debug, Clone, Serialize)]
pub struct NewResource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, OutgoingRelationship>,
}

impl NewResource {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: None,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn to_many(mut self, name: &str, identifiers: Vec<ResourceIdentifier>) -> Self {
        self.relationships.insert(
            name.to_string(),
            OutgoingRelationship {
                data: Linkage::Many(identifiers),
            },
        );
        self
    }
}

/// `{"data": ...}` wrapper for request bodies.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDocument<T> {
    pub data: T,
}
