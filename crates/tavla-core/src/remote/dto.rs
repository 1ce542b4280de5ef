//! Wire representations of the fixed server API contract
//!
//! Listing payloads nest children the way the server ships them: a board
//! carries its labels and users, a stack carries its cards, a card carries
//! its assigned users and labels. `lastModified` is epoch seconds on the
//! wire and milliseconds everywhere inside the store; due dates travel as
//! RFC 3339 strings.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Board, Card, Label, Stack};

/// A board as returned by the server, with nested board-scope children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub color: String,
    /// Server-side modification time, epoch seconds
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub labels: Vec<LabelDto>,
    #[serde(default)]
    pub users: Vec<UserDto>,
}

/// A stack as returned by the server, with its cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub cards: Vec<CardDto>,
}

/// A card as returned by the server, with its relations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Due date as RFC 3339, if set
    #[serde(default)]
    pub duedate: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub assigned_users: Vec<UserDto>,
    #[serde(default)]
    pub labels: Vec<LabelDto>,
}

/// A label as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub last_modified: i64,
}

/// A user reference as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub uid: String,
    #[serde(default, rename = "displayname")]
    pub display_name: String,
}

impl BoardDto {
    /// Server modification time in epoch ms
    pub const fn last_modified_ms(&self) -> i64 {
        self.last_modified * 1000
    }
}

impl StackDto {
    /// Server modification time in epoch ms
    pub const fn last_modified_ms(&self) -> i64 {
        self.last_modified * 1000
    }
}

impl LabelDto {
    /// Server modification time in epoch ms
    pub const fn last_modified_ms(&self) -> i64 {
        self.last_modified * 1000
    }
}

impl CardDto {
    /// Server modification time in epoch ms
    pub const fn last_modified_ms(&self) -> i64 {
        self.last_modified * 1000
    }

    /// Due date in epoch ms, if set
    pub fn due_date_ms(&self) -> Result<Option<i64>> {
        match self.duedate.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
                .map(|date| Some(date.timestamp_millis()))
                .map_err(|e| Error::InvalidInput(format!("invalid duedate {raw:?}: {e}"))),
        }
    }
}

/// Outbound body for board create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardWrite {
    pub title: String,
    pub color: String,
}

impl BoardWrite {
    pub fn from_model(board: &Board) -> Self {
        Self {
            title: board.title.clone(),
            color: board.color.clone(),
        }
    }
}

/// Outbound body for stack create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackWrite {
    pub title: String,
    pub order: i64,
}

impl StackWrite {
    pub fn from_model(stack: &Stack) -> Self {
        Self {
            title: stack.title.clone(),
            order: stack.sort_order,
        }
    }
}

/// Outbound body for card create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardWrite {
    pub title: String,
    pub description: String,
    pub duedate: Option<String>,
    pub order: i64,
}

impl CardWrite {
    pub fn from_model(card: &Card) -> Self {
        Self {
            title: card.title.clone(),
            description: card.description.clone(),
            duedate: card
                .due_date
                .and_then(chrono::DateTime::from_timestamp_millis)
                .map(|date| date.to_rfc3339()),
            order: card.sort_order,
        }
    }
}

/// Outbound body for label create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelWrite {
    pub title: String,
    pub color: String,
}

impl LabelWrite {
    pub fn from_model(label: &Label) -> Self {
        Self {
            title: label.title.clone(),
            color: label.color.clone(),
        }
    }
}
