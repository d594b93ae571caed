//! # KDC State
//!
//! Everything the Key Distribution Center owns, in one explicitly owned value.
//! Built once at simulation start and passed by reference; there is no global
//! registry, so independent simulations can share a process.

use shared_crypto::KdcSecret;

use crate::domain::keystore::{PublisherKeyStore, SubscriberKeyStore};
use crate::domain::registry::TopicRegistry;
use crate::domain::subscription::SubscriptionBook;

/// KDC-owned registry, subscriptions and key stores.
#[derive(Debug)]
pub struct KdcState {
    secret: KdcSecret,
    pub(crate) registry: TopicRegistry,
    pub(crate) subscriptions: SubscriptionBook,
    pub(crate) publisher_keys: PublisherKeyStore,
    pub(crate) subscriber_keys: SubscriberKeyStore,
}

impl KdcState {
    /// Fresh state holding `secret`.
    pub fn new(secret: KdcSecret) -> Self {
        Self {
            secret,
            registry: TopicRegistry::new(),
            subscriptions: SubscriptionBook::new(),
            publisher_keys: PublisherKeyStore::default(),
            subscriber_keys: SubscriberKeyStore::default(),
        }
    }

    pub(crate) fn secret(&self) -> &KdcSecret {
        &self.secret
    }

    /// Published topics.
    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// Known subscriptions and their running matches.
    pub fn subscriptions(&self) -> &SubscriptionBook {
        &self.subscriptions
    }

    /// Keys issued to publishers.
    pub fn publisher_keys(&self) -> &PublisherKeyStore {
        &self.publisher_keys
    }

    /// Keys issued to subscribers.
    pub fn subscriber_keys(&self) -> &SubscriberKeyStore {
        &self.subscriber_keys
    }
}
