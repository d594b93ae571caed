//! # Core Domain Entities
//!
//! Identifiers, simulated time and the host abstraction handed to the core by
//! the surrounding simulation.
//!
//! ## Clusters
//!
//! - **Identity**: `NodeId`, `HostRole`
//! - **Time**: `SimTime`
//! - **Interests**: `AttributeRange`, `Host`, `HostProfile`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Add;

use crate::errors::HostError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Unique identifier for a simulated host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Protocol role a host can play. A host may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostRole {
    /// Declares topics.
    Publisher,
    /// Declares numeric-range interests.
    Subscriber,
    /// Relays control traffic between edges and the KDC.
    Broker,
    /// Key Distribution Center.
    Kdc,
}

// =============================================================================
// CLUSTER B: TIME
// =============================================================================

/// Simulated time in abstract ticks. Monotonic, never wall-clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    /// Time zero.
    pub const ZERO: SimTime = SimTime(0);

    /// Ticks since start.
    pub fn ticks(self) -> u64 {
        self.0
    }
}

impl Add<u64> for SimTime {
    type Output = SimTime;

    fn add(self, delay: u64) -> SimTime {
        SimTime(self.0.saturating_add(delay))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

// =============================================================================
// CLUSTER C: INTERESTS
// =============================================================================

/// Inclusive numeric range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeRange {
    /// Lower bound (inclusive).
    pub min: i64,
    /// Upper bound (inclusive).
    pub max: i64,
}

impl AttributeRange {
    /// Create a range. Bounds are taken as given; see [`AttributeRange::is_valid`].
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// True when `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// True when `value` lies inside the range.
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    /// True when the two ranges share at least one value.
    pub fn overlaps(&self, other: &AttributeRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl From<(i64, i64)> for AttributeRange {
    fn from((min, max): (i64, i64)) -> Self {
        Self { min, max }
    }
}

/// Read-only view of a simulated host, as consumed by the core.
pub trait Host {
    /// Host identifier.
    fn id(&self) -> &NodeId;

    /// Roles this host plays.
    fn has_role(&self, role: HostRole) -> bool;

    /// Per-dimension interest weights.
    fn interest_weights(&self) -> &[f64];

    /// Per-dimension boolean interest.
    fn own_interest(&self) -> &[bool];

    /// Declared numeric attribute ranges.
    fn numeric_attributes(&self) -> &[AttributeRange];

    fn is_publisher(&self) -> bool {
        self.has_role(HostRole::Publisher)
    }

    fn is_subscriber(&self) -> bool {
        self.has_role(HostRole::Subscriber)
    }

    fn is_broker(&self) -> bool {
        self.has_role(HostRole::Broker)
    }

    fn is_kdc(&self) -> bool {
        self.has_role(HostRole::Kdc)
    }
}

/// Concrete host description, loaded from simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HostProfile {
    /// Host identifier.
    pub id: NodeId,
    /// Roles this host plays.
    #[serde(default)]
    pub roles: BTreeSet<HostRole>,
    /// Per-dimension interest weights.
    #[serde(default)]
    pub interest_weights: Vec<f64>,
    /// Per-dimension boolean interest.
    #[serde(default)]
    pub own_interest: Vec<bool>,
    /// Declared numeric attribute ranges.
    #[serde(default)]
    pub numeric_attributes: Vec<AttributeRange>,
}

impl HostProfile {
    /// Create a host with the given id and roles and no interests.
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = HostRole>) -> Self {
        Self {
            id: NodeId::new(id),
            roles: roles.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Builder-style method to set interest weights
    pub fn with_interest_weights(mut self, weights: Vec<f64>) -> Self {
        self.interest_weights = weights;
        self
    }

    /// Builder-style method to set the boolean interest vector
    pub fn with_own_interest(mut self, interest: Vec<bool>) -> Self {
        self.own_interest = interest;
        self
    }

    /// Builder-style method to set numeric attribute ranges
    pub fn with_numeric_attributes(mut self, ranges: Vec<AttributeRange>) -> Self {
        self.numeric_attributes = ranges;
        self
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// - `HostError::EmptyId` for a blank id
    /// - `HostError::NoRoles` for a host with no role
    /// - `HostError::InvertedRange` for any `min > max`
    /// - `HostError::AttributeCountMismatch` when a subscriber declares more
    ///   ranges than interested dimensions (each range fills one of them)
    pub fn validate(&self) -> Result<(), HostError> {
        if self.id.0.trim().is_empty() {
            return Err(HostError::EmptyId);
        }
        if self.roles.is_empty() {
            return Err(HostError::NoRoles {
                host: self.id.clone(),
            });
        }
        if let Some(range) = self.numeric_attributes.iter().find(|r| !r.is_valid()) {
            return Err(HostError::InvertedRange {
                host: self.id.clone(),
                min: range.min,
                max: range.max,
            });
        }
        let interested = self.own_interest.iter().filter(|i| **i).count();
        if self.is_subscriber() && self.numeric_attributes.len() > interested {
            return Err(HostError::AttributeCountMismatch {
                host: self.id.clone(),
                ranges: self.numeric_attributes.len(),
                dimensions: interested,
            });
        }
        Ok(())
    }
}

impl Host for HostProfile {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn has_role(&self, role: HostRole) -> bool {
        self.roles.contains(&role)
    }

    fn interest_weights(&self) -> &[f64] {
        &self.interest_weights
    }

    fn own_interest(&self) -> &[bool] {
        &self.own_interest
    }

    fn numeric_attributes(&self) -> &[AttributeRange] {
        &self.numeric_attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains_bounds() {
        let r = AttributeRange::new(1, 5);
        assert!(r.contains(1));
        assert!(r.contains(5));
        assert!(!r.contains(0));
        assert!(!r.contains(6));
    }

    #[test]
    fn test_range_overlap() {
        let r = AttributeRange::new(1, 5);
        assert!(r.overlaps(&AttributeRange::new(5, 9)));
        assert!(!r.overlaps(&AttributeRange::new(6, 9)));
    }

    #[test]
    fn test_role_predicates() {
        let host = HostProfile::new("b1", [HostRole::Broker, HostRole::Kdc]);
        assert!(host.is_broker());
        assert!(host.is_kdc());
        assert!(!host.is_publisher());
        assert!(!host.is_subscriber());
    }

    #[test]
    fn test_sim_time_add_saturates() {
        assert_eq!(SimTime(5) + 3, SimTime(8));
        assert_eq!(SimTime(u64::MAX) + 1, SimTime(u64::MAX));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let host = HostProfile::new("s1", [HostRole::Subscriber])
            .with_own_interest(vec![true])
            .with_numeric_attributes(vec![AttributeRange::new(9, 2)]);
        assert!(matches!(
            host.validate(),
            Err(HostError::InvertedRange { min: 9, max: 2, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_extra_ranges() {
        let host = HostProfile::new("s1", [HostRole::Subscriber])
            .with_own_interest(vec![true])
            .with_numeric_attributes(vec![AttributeRange::new(1, 2), AttributeRange::new(3, 4)]);
        assert!(matches!(
            host.validate(),
            Err(HostError::AttributeCountMismatch { ranges: 2, dimensions: 1, .. })
        ));
    }

    #[test]
    fn test_validate_counts_only_interested_dimensions() {
        let host = HostProfile::new("s1", [HostRole::Subscriber])
            .with_own_interest(vec![true, false])
            .with_numeric_attributes(vec![AttributeRange::new(1, 5), AttributeRange::new(8, 12)]);
        assert!(matches!(
            host.validate(),
            Err(HostError::AttributeCountMismatch { ranges: 2, dimensions: 1, .. })
        ));

        let host = host.with_own_interest(vec![true, true]);
        assert!(host.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_roleless_host() {
        let host = HostProfile::new("x", []);
        assert!(matches!(host.validate(), Err(HostError::NoRoles { .. })));
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let host: HostProfile =
            serde_json::from_str(r#"{"id":"p1","roles":["publisher"]}"#).unwrap();
        assert_eq!(host.id, NodeId::new("p1"));
        assert!(host.is_publisher());
        assert!(host.interest_weights.is_empty());
    }
}
