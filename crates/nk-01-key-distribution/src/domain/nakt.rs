//! # NAKT - Node-Attribute Key Tree
//!
//! Binary key hierarchy over the numeric address space of one topic.
//!
//! ## Construction
//!
//! ```text
//! address space  [0, next_pow2_above(N) - 1]
//!
//!                    root = HMAC(HMAC(secret, N), N)
//!                   /                               \
//!        "0" = HMAC(root, "0")              "1" = HMAC(root, "1")
//!          /            \                     /            \
//!   "00" [0..1]     "01" [2..3]        "10" [4..5]     "11" [6..7]      depth L = 2
//! ```
//!
//! Each bisection splits `[min, max]` at `mid = floor((min + max) / 2)`; the
//! left child gets `[min, mid]`. A child becomes a leaf when it sits at depth
//! `L` or covers a single id, whichever comes first.
//!
//! ## Invariants
//!
//! - Only leaves are returned. Interior keys live on the recursion stack and
//!   are dropped once their children exist.
//! - Leaves partition the address space, in path order.
//! - Same `(secret, N, L)` always yields the same leaves.

use shared_crypto::{child_key, root_key, DerivedKey, KdcSecret};
use shared_types::{AttributeRange, LeafGrant};

use crate::error::KdcError;

/// A distributable leaf of a topic's key tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafKey {
    /// Binary path from the root ("" for the degenerate root leaf).
    pub path: String,
    /// Numeric ids this leaf covers.
    pub segment: AttributeRange,
    /// Leaf key.
    pub key: DerivedKey,
}

impl From<&LeafKey> for LeafGrant {
    fn from(leaf: &LeafKey) -> Self {
        LeafGrant {
            path: leaf.path.clone(),
            key: leaf.key.clone(),
        }
    }
}

/// Leaf keys of one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTree {
    topic_id: i64,
    address_max: i64,
    leaves: Vec<LeafKey>,
}

impl KeyTree {
    /// Topic the tree was derived for.
    pub fn topic_id(&self) -> i64 {
        self.topic_id
    }

    /// Upper bound of the address space.
    pub fn address_max(&self) -> i64 {
        self.address_max
    }

    /// Leaves in path order.
    pub fn leaves(&self) -> &[LeafKey] {
        &self.leaves
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// True when no leaf was produced.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// The leaf whose segment contains `value`.
    pub fn covering(&self, value: i64) -> Option<&LeafKey> {
        self.leaves.iter().find(|leaf| leaf.segment.contains(value))
    }

    /// All leaves whose segments overlap `range`.
    pub fn intersecting(&self, range: &AttributeRange) -> Vec<&LeafKey> {
        self.leaves
            .iter()
            .filter(|leaf| leaf.segment.overlaps(range))
            .collect()
    }
}

/// Upper bound of a topic's address space: the smallest power of two strictly
/// greater than `topic_id`, minus one.
pub fn address_space_max(topic_id: i64) -> Result<i64, KdcError> {
    if topic_id <= 0 {
        return Err(KdcError::InvalidTopic { topic_id });
    }
    (topic_id as u64 + 1)
        .checked_next_power_of_two()
        .and_then(|p| i64::try_from(p - 1).ok())
        .ok_or(KdcError::InvalidTopic { topic_id })
}

/// NAKT key-tree builder for a fixed depth.
#[derive(Debug, Clone, Copy)]
pub struct NaktTree {
    depth: i32,
}

impl NaktTree {
    /// Builder for trees of depth `lcnum`.
    pub fn new(lcnum: i32) -> Self {
        Self { depth: lcnum }
    }

    /// Configured depth.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Derive the leaf keys of topic `topic_id`.
    ///
    /// # Errors
    ///
    /// - `KdcError::InvalidTopic` for `topic_id <= 0`
    /// - `KdcError::Crypto` if the HMAC primitive fails
    pub fn derive(&self, secret: &KdcSecret, topic_id: i64) -> Result<KeyTree, KdcError> {
        let address_max = address_space_max(topic_id)?;
        let root = root_key(secret, topic_id)?;

        let mut leaves = Vec::new();
        if self.depth <= 0 {
            leaves.push(LeafKey {
                path: String::new(),
                segment: AttributeRange::new(0, address_max),
                key: root,
            });
        } else {
            self.bisect(
                AttributeRange::new(0, address_max),
                &root,
                "",
                1,
                &mut leaves,
            )?;
        }

        Ok(KeyTree {
            topic_id,
            address_max,
            leaves,
        })
    }

    /// Split `range` under `parent`. `depth` is the depth of the children.
    fn bisect(
        &self,
        range: AttributeRange,
        parent: &DerivedKey,
        path: &str,
        depth: i32,
        leaves: &mut Vec<LeafKey>,
    ) -> Result<(), KdcError> {
        if depth > self.depth || range.min >= range.max {
            return Ok(());
        }

        let mid = range.min + (range.max - range.min) / 2;
        let halves = [
            ('0', AttributeRange::new(range.min, mid)),
            ('1', AttributeRange::new(mid + 1, range.max)),
        ];

        for (bit, segment) in halves {
            let child_path = format!("{path}{bit}");
            let key = child_key(parent, &child_path)?;
            if depth == self.depth || segment.min == segment.max {
                leaves.push(LeafKey {
                    path: child_path,
                    segment,
                    key,
                });
            } else {
                self.bisect(segment, &key, &child_path, depth + 1, leaves)?;
            }
        }
        Ok(())
    }
}
