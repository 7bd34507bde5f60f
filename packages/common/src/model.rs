//! # Thread Data Model
//!
//! Content nodes (comments) and the forest they are assembled into.
//!
//! ## Identity
//!
//! ```text
//! ItemId::Canonical("9b2e…")   issued by the server, stable
//! ItemId::Provisional(7)       minted locally, rendered "local:7"
//! ```
//!
//! The two spaces are disjoint by construction. Only the string form is ever
//! shared with other systems, and the `local:` prefix is outside the server's
//! UUID format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved prefix of the string form of provisional ids
pub const PROVISIONAL_PREFIX: &str = "local:";

/// Identity of a content node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemId {
    /// Server-issued id
    Canonical(String),

    /// Locally minted placeholder, never persisted
    Provisional(u64),
}

impl ItemId {
    pub fn canonical(id: impl Into<String>) -> Self {
        ItemId::Canonical(id.into())
    }

    /// Parse the string form, recognising the reserved provisional prefix
    pub fn parse(raw: &str) -> Self {
        raw.strip_prefix(PROVISIONAL_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(ItemId::Provisional)
            .unwrap_or_else(|| ItemId::Canonical(raw.to_string()))
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, ItemId::Provisional(_))
    }

    pub fn is_canonical(&self) -> bool {
        !self.is_provisional()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Canonical(id) => f.write_str(id),
            ItemId::Provisional(n) => write!(f, "{}{}", PROVISIONAL_PREFIX, n),
        }
    }
}

impl From<String> for ItemId {
    fn from(raw: String) -> Self {
        ItemId::parse(&raw)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        ItemId::parse(raw)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.to_string()
    }
}

/// Author reference embedded in a comment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub pfp_url: Option<String>,
}

impl Author {
    /// Name to show for this author
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Unknown User")
    }
}

/// Opaque content carried by a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Payload {
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Payload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// A content node (a comment) with its replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,

    pub payload: Payload,

    /// Replies, oldest first. Only populated after assembly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Item>,
}

impl Item {
    /// Root-level item
    pub fn new(id: impl Into<ItemId>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            payload,
            children: Vec::new(),
        }
    }

    /// Item naming `parent` as its parent
    pub fn reply(id: impl Into<ItemId>, parent: impl Into<ItemId>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            parent_id: Some(parent.into()),
            payload,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Item>) -> Self {
        self.children = children;
        self
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Copy without children, as it appears in a flat list
    pub fn detached(&self) -> Item {
        Item {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            payload: self.payload.clone(),
            children: Vec::new(),
        }
    }
}

/// Comment as returned by the backend's comment listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,

    #[serde(default)]
    pub post_id: Option<String>,

    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    pub content: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Author>,
}

impl From<CommentRecord> for Item {
    fn from(record: CommentRecord) -> Self {
        let author = match (record.user, record.user_id) {
            (Some(user), _) => Some(user),
            (None, Some(id)) => Some(Author {
                id,
                ..Default::default()
            }),
            (None, None) => None,
        };

        Item {
            id: ItemId::parse(&record.id),
            parent_id: record
                .parent_id
                .filter(|p| !p.is_empty())
                .map(|p| ItemId::parse(&p)),
            payload: Payload {
                content: record.content,
                author,
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
            children: Vec::new(),
        }
    }
}

/// Ordered collection of root items
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    pub roots: Vec<Item>,
}

impl Forest {
    pub fn new(roots: Vec<Item>) -> Self {
        Self { roots }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len_roots(&self) -> usize {
        self.roots.len()
    }

    /// Total number of nodes at every depth
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order iterator: each node before its replies, siblings in order
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.roots.iter().rev().collect(),
        }
    }

    pub fn find(&self, id: &ItemId) -> Option<&Item> {
        self.iter().find(|item| &item.id == id)
    }

    pub fn find_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        find_in_mut(&mut self.roots, id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.find(id).is_some()
    }

    /// Depth of a node (roots are 0)
    pub fn depth_of(&self, id: &ItemId) -> Option<usize> {
        let mut stack: Vec<(&Item, usize)> = self.roots.iter().map(|r| (r, 0)).collect();
        while let Some((item, depth)) = stack.pop() {
            if &item.id == id {
                return Some(depth);
            }
            stack.extend(item.children.iter().map(|c| (c, depth + 1)));
        }
        None
    }

    /// Detach a node (and its subtree) from wherever it sits
    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        remove_from(&mut self.roots, id)
    }

    /// Flat pre-order listing with children stripped
    pub fn flatten(&self) -> Vec<Item> {
        self.iter().map(Item::detached).collect()
    }
}

/// Pre-order traversal over a forest
pub struct PreOrder<'a> {
    stack: Vec<&'a Item>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stack.pop()?;
        self.stack.extend(item.children.iter().rev());
        Some(item)
    }
}

fn find_in_mut<'a>(items: &'a mut [Item], id: &ItemId) -> Option<&'a mut Item> {
    for item in items {
        if &item.id == id {
            return Some(item);
        }
        if let Some(found) = find_in_mut(&mut item.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove_from(items: &mut Vec<Item>, id: &ItemId) -> Option<Item> {
    if let Some(pos) = items.iter().position(|c| &c.id == id) {
        return Some(items.remove(pos));
    }

    for item in items {
        if let Some(removed) = remove_from(&mut item.children, id) {
            return Some(removed);
        }
    }

    None
}
