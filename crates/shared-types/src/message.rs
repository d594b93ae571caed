//! # Message Property Bag
//!
//! The opaque message abstraction the simulation hands to the core: an id, a
//! source, an optional explicit destination and a string-keyed property bag.
//!
//! ## Merge-on-set
//!
//! Setting a key that already holds a value never silently overwrites it:
//!
//! - list + list: appended in place
//! - topic + topic of the same variant: merged in place
//! - anything else: wrapped into `Pair(old, new)`

use std::collections::BTreeMap;

use crate::entities::{NodeId, SimTime};
use crate::topic::TopicProperty;

/// Property key holding the [`TopicProperty`].
pub const PROP_TOPIC: &str = "topic";

/// Property key holding the sender's boolean interest vector.
pub const PROP_INTEREST: &str = "interest";

/// Property key holding the publisher / subscriber the control message is about.
pub const PROP_ORIGIN: &str = "origin";

/// What a message is for. Drives the protocol handlers; routing only looks at
/// the topic property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Publisher → broker → KDC topic declaration.
    TopicRegistration,
    /// Subscriber → broker → KDC interest declaration.
    SubscriptionRequest,
    /// KDC → publisher / subscriber key material.
    KeyDelivery,
    /// Published content.
    Data,
}

/// A value in the property bag.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<PropertyValue>),
    Topic(TopicProperty),
    /// Two values that arrived for the same key and could not be merged.
    Pair(Box<PropertyValue>, Box<PropertyValue>),
}

impl PropertyValue {
    /// Merge `incoming` into this value following the merge-on-set rules.
    fn absorb(&mut self, incoming: PropertyValue) {
        let unmerged = match (&mut *self, incoming) {
            (PropertyValue::List(mine), PropertyValue::List(theirs)) => {
                mine.extend(theirs);
                None
            }
            (PropertyValue::Topic(mine), PropertyValue::Topic(theirs)) => {
                mine.merge(theirs).err().map(PropertyValue::Topic)
            }
            (_, other) => Some(other),
        };
        if let Some(second) = unmerged {
            self.wrap(second);
        }
    }

    fn wrap(&mut self, second: PropertyValue) {
        let first = std::mem::replace(self, PropertyValue::Bool(false));
        *self = PropertyValue::Pair(Box::new(first), Box::new(second));
    }

    /// Interpret as a list of booleans.
    pub fn as_bool_list(&self) -> Option<Vec<bool>> {
        match self {
            PropertyValue::List(items) => items
                .iter()
                .map(|item| match item {
                    PropertyValue::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

impl From<Vec<bool>> for PropertyValue {
    fn from(values: Vec<bool>) -> Self {
        PropertyValue::List(values.into_iter().map(PropertyValue::Bool).collect())
    }
}

impl From<TopicProperty> for PropertyValue {
    fn from(topic: TopicProperty) -> Self {
        PropertyValue::Topic(topic)
    }
}

impl From<&NodeId> for PropertyValue {
    fn from(id: &NodeId) -> Self {
        PropertyValue::Text(id.0.clone())
    }
}

/// A message in flight through the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub kind: MessageKind,
    pub source: NodeId,
    /// Explicit destination. `None` means "whoever is interested".
    pub destination: Option<NodeId>,
    pub created_at: SimTime,
    properties: BTreeMap<String, PropertyValue>,
}

impl Message {
    /// Create an empty message.
    pub fn new(
        id: impl Into<String>,
        kind: MessageKind,
        source: NodeId,
        destination: Option<NodeId>,
        created_at: SimTime,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            source,
            destination,
            created_at,
            properties: BTreeMap::new(),
        }
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Set a property, merging with any existing value for the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        let value = value.into();
        match self.properties.entry(key.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => slot.get_mut().absorb(value),
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set(key, value);
        self
    }

    /// The topic property, if present and well-formed.
    pub fn topic(&self) -> Option<&TopicProperty> {
        match self.properties.get(PROP_TOPIC)? {
            PropertyValue::Topic(topic) => Some(topic),
            _ => None,
        }
    }

    /// True when a value is stored under [`PROP_TOPIC`], well-formed or not.
    pub fn has_topic_key(&self) -> bool {
        self.properties.contains_key(PROP_TOPIC)
    }

    /// Text property, e.g. [`PROP_ORIGIN`].
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.properties.get(key)? {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }
}
