//! A small user directory bound entirely from descriptors.
//!
//! The descriptors are public so clients can share them with the server.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use route_core::{
    MutationApi, MutationApiWithPath, MutationMethod, SafeApiWithPath, SafeApiWithQuery,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::binder::{ApiRouter, Outcome, Payload};
use crate::error::HandlerError;
use crate::responder::{respond_default, Responder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Query for `LIST_USERS`. Every field narrows the result; `tag` may repeat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    #[serde(default)]
    pub tag: Vec<String>,
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    pub limit: Option<usize>,
}

impl UserFilter {
    fn matches(&self, user: &User) -> bool {
        self.role.is_none_or(|role| role == user.role)
            && self.tag.iter().all(|tag| user.tags.contains(tag))
            && self
                .name
                .as_deref()
                .is_none_or(|name| user.name.to_lowercase().contains(&name.to_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPath {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub tags: Option<Vec<String>>,
}

pub const LIST_USERS: SafeApiWithQuery<Vec<User>, UserFilter> = SafeApiWithQuery::new("/users");

pub const GET_USER: SafeApiWithPath<User, UserPath> = SafeApiWithPath::new("/users/{id}");

pub const CREATE_USER: MutationApi<User, NewUser> = MutationApi::new("/users");

pub const UPDATE_USER: MutationApiWithPath<User, UserPatch, UserPath> =
    MutationApiWithPath::with_method("/users/{id}", MutationMethod::Patch);

pub const DELETE_USER: MutationApiWithPath<(), (), UserPath> =
    MutationApiWithPath::with_method("/users/{id}", MutationMethod::Delete);

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

pub fn app() -> Router {
    routes(Db::default())
}

pub fn routes(db: Db) -> Router {
    let (list, get, create, update, delete) = (db.clone(), db.clone(), db.clone(), db.clone(), db);
    ApiRouter::new()
        .safe_with_query(&LIST_USERS, respond_default, move |filter| {
            list_users(list.clone(), filter)
        })
        .safe_with_path(&GET_USER, respond_default, move |path| get_user(get.clone(), path))
        .mutation(&CREATE_USER, respond_created, move |payload| {
            create_user(create.clone(), payload)
        })
        .mutation_with_path(&UPDATE_USER, respond_default, move |path, payload| {
            update_user(update.clone(), path, payload)
        })
        .mutation_with_path(&DELETE_USER, respond_default, move |path, payload| {
            delete_user(delete.clone(), path, payload)
        })
        .into_router()
}

/// Like `respond_default`, but a created user is answered with 201.
fn respond_created(responder: &Responder, outcome: Outcome<User>) {
    match outcome {
        Ok(Some(user)) => {
            if let Err(err) = responder.value(StatusCode::CREATED, &user) {
                tracing::error!(error = %err, "failed to commit created user");
            }
        }
        other => respond_default(responder, other),
    }
}

async fn list_users(db: Db, filter: UserFilter) -> Outcome<Vec<User>> {
    let users = db.read().await;
    let mut found: Vec<User> = users
        .values()
        .filter(|user| filter.matches(user))
        .cloned()
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    if let Some(limit) = filter.limit {
        found.truncate(limit);
    }
    Ok(Some(found))
}

async fn get_user(db: Db, path: UserPath) -> Outcome<User> {
    Ok(db.read().await.get(&path.id).cloned())
}

async fn create_user(db: Db, payload: Payload<NewUser>) -> Outcome<User> {
    let input = payload.receive()?;
    let user = User {
        id: Uuid::new_v4(),
        name: validate_name(input.name)?,
        role: input.role,
        tags: input.tags,
    };
    db.write().await.insert(user.id, user.clone());
    tracing::info!(id = %user.id, name = %user.name, "created user");
    Ok(Some(user))
}

async fn update_user(db: Db, path: UserPath, payload: Payload<UserPatch>) -> Outcome<User> {
    let patch = payload.receive()?;
    let mut users = db.write().await;
    let Some(user) = users.get_mut(&path.id) else {
        return Ok(None);
    };
    if let Some(name) = patch.name {
        user.name = validate_name(name)?;
    }
    if let Some(role) = patch.role {
        user.role = role;
    }
    if let Some(tags) = patch.tags {
        user.tags = tags;
    }
    Ok(Some(user.clone()))
}

async fn delete_user(db: Db, path: UserPath, payload: Payload<()>) -> Outcome<()> {
    payload.receive()?;
    let removed = db.write().await.remove(&path.id);
    if removed.is_some() {
        tracing::info!(id = %path.id, "deleted user");
    }
    Ok(removed.map(|_| ()))
}

fn validate_name(name: String) -> Result<String, HandlerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HandlerError::invalid_argument("name must not be empty"));
    }
    Ok(trimmed.to_string())
}
