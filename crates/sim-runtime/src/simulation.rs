//! # Simulation Loop
//!
//! Drives every host from one deterministic [`EventQueue`].
//!
//! ```text
//!  publisher ──registration──┐                        ┌──publisher key──► publisher
//!                            ├─► broker ─► KDC ─(delay)─► KDC ─► broker ─┤
//!  subscriber ──subscription─┘                        └──leaf keys─────► subscriber
//!
//!  publisher ──data──► [InterestRouter: Deliver | Relay | Keep] ──► peers
//! ```
//!
//! ## Handover rules
//!
//! | Message | Holder | Next hop |
//! |---------|--------|----------|
//! | registration / subscription | publisher, subscriber | any connected broker |
//! | registration / subscription | broker | any connected KDC |
//! | key delivery | KDC | any connected broker |
//! | key delivery | broker | its destination, when connected |
//! | data | any | router decision per connected peer |
//!
//! Control messages move (one custody at a time); data is copied. When no
//! next hop is in reach the message stays buffered for the next contact.
//! Processing at the KDC is a future event `kdc_processing_delay` ticks after
//! receipt, never a wall-clock wait.

use nk_01_key_distribution::{
    KdcError, KdcState, KeyDistributionApi, KeyDistributionService, Metrics,
};
use nk_02_interest_routing::{InterestRouter, RoutingDecision};
use overlay_telemetry::{log_contact_event, log_event, log_message_event};
use shared_bus::EventQueue;
use shared_types::{
    Host, Message, MessageKind, NodeId, PublisherKeyGrant, SimTime, TopicProperty,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::info;

use crate::config::{ConfigError, SimulationConfig};
use crate::contacts::contact_plan;
use crate::error::RuntimeError;
use crate::node::HostNode;
use crate::protocol::{parse_registration, parse_subscription, MessageFactory};
use crate::report::{RunStats, SimulationReport};

#[derive(Debug, Clone)]
enum SimEvent {
    ContactUp { a: usize, b: usize },
    ContactDown { a: usize, b: usize },
    Register { publication: usize },
    Subscribe { host: usize },
    Publish { publication: usize },
    KdcProcess { kdc: usize, message: Message },
}

/// One simulation run.
pub struct Simulation {
    config: SimulationConfig,
    hosts: Vec<HostNode>,
    index: BTreeMap<NodeId, usize>,
    queue: EventQueue<SimEvent>,
    factory: MessageFactory,
    service: KeyDistributionService<Metrics>,
    state: KdcState,
    stats: RunStats,
}

impl Simulation {
    /// Validate `config`, build the hosts and schedule the whole plan.
    ///
    /// # Errors
    ///
    /// `RuntimeError::Config` when the configuration is rejected.
    pub fn new(config: SimulationConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let state = KdcState::new(config.secret()?);
        let service =
            KeyDistributionService::with_metrics(config.kdc_config(), Arc::new(Metrics::new()));

        let prototype = InterestRouter::new();
        let hosts: Vec<HostNode> = config
            .hosts
            .iter()
            .cloned()
            .map(|profile| HostNode::new(profile, prototype.snapshot()))
            .collect();
        let index = hosts
            .iter()
            .enumerate()
            .map(|(i, host)| (host.id().clone(), i))
            .collect();

        let mut simulation = Self {
            config,
            hosts,
            index,
            queue: EventQueue::new(),
            factory: MessageFactory::new(),
            service,
            state,
            stats: RunStats::default(),
        };
        simulation.schedule_plan()?;
        Ok(simulation)
    }

    /// Dispatch every event due up to `end_time` and report.
    ///
    /// # Errors
    ///
    /// Aborts with `RuntimeError::Kdc` on a key-derivation failure.
    pub fn run(&mut self) -> Result<SimulationReport, RuntimeError> {
        let end = SimTime(self.config.end_time);
        info!(
            hosts = self.hosts.len(),
            pending = self.queue.len(),
            end_time = self.config.end_time,
            lcnum = self.config.lcnum,
            "Simulation started"
        );

        while let Some(scheduled) = self.queue.pop_until(end) {
            self.dispatch(scheduled.event)?;
        }

        let report = self.report();
        info!(
            events = report.events_dispatched,
            topics = report.topics_registered,
            key_deliveries = report.run.key_deliveries,
            data_delivered = report.run.data_delivered,
            "Simulation finished"
        );
        Ok(report)
    }

    /// Report of the current state.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            end_time: self.config.end_time,
            events_dispatched: self.queue.events_dispatched(),
            messages_created: self.factory.created(),
            topics_registered: self.state.registry().len(),
            subscribers: self.state.subscriptions().len(),
            publisher_keys_stored: self.state.publisher_keys().len(),
            subscriber_key_records: self.state.subscriber_keys().len(),
            run: self.stats.clone(),
            kdc: self.service.metrics().snapshot(),
            hosts: self.hosts.iter().map(HostNode::report).collect(),
        }
    }

    /// Host named `id`.
    pub fn host(&self, id: &str) -> Option<&HostNode> {
        self.index.get(&NodeId::new(id)).map(|&i| &self.hosts[i])
    }

    /// KDC registry and key stores.
    pub fn kdc_state(&self) -> &KdcState {
        &self.state
    }

    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    fn index_of(&self, id: &NodeId, context: &'static str) -> Result<usize, ConfigError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ConfigError::UnknownHost {
                context,
                host: id.clone(),
            })
    }

    fn schedule_plan(&mut self) -> Result<(), RuntimeError> {
        for (i, publication) in self.config.publications.iter().enumerate() {
            let at = SimTime(publication.at);
            self.queue
                .schedule_at(at, SimEvent::Register { publication: i })?;
            for seq in 1..=u64::from(publication.messages) {
                self.queue.schedule_at(
                    at + seq * publication.interval,
                    SimEvent::Publish { publication: i },
                )?;
            }
        }

        let subscribe_at = SimTime(self.config.subscribe_at);
        for (i, host) in self.hosts.iter().enumerate() {
            if host.is_subscriber() {
                self.queue
                    .schedule_at(subscribe_at, SimEvent::Subscribe { host: i })?;
            }
        }

        for window in contact_plan(&self.config) {
            let a = self.index_of(&window.a, "contact")?;
            let b = self.index_of(&window.b, "contact")?;
            self.queue
                .schedule_at(SimTime(window.at), SimEvent::ContactUp { a, b })?;
            self.queue.schedule_at(
                SimTime(window.at + window.duration),
                SimEvent::ContactDown { a, b },
            )?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: SimEvent) -> Result<(), RuntimeError> {
        let now = self.queue.now();
        match event {
            SimEvent::ContactUp { a, b } => self.contact_up(a, b, now),
            SimEvent::ContactDown { a, b } => self.contact_down(a, b, now),
            SimEvent::Register { publication } => self.register(publication, now)?,
            SimEvent::Subscribe { host } => self.subscribe(host, now),
            SimEvent::Publish { publication } => self.publish(publication, now)?,
            SimEvent::KdcProcess { kdc, message } => self.process_at_kdc(kdc, &message, now)?,
        }
        Ok(())
    }

    // =========================================================================
    // Contacts
    // =========================================================================

    fn contact_up(&mut self, a: usize, b: usize, now: SimTime) {
        self.stats.contacts += 1;
        let opened = self.hosts[a].connect(b);
        self.hosts[b].connect(a);
        if !opened {
            return;
        }

        let (id_a, id_b) = (self.hosts[a].id().clone(), self.hosts[b].id().clone());
        self.hosts[a].router().contact_up(&id_b, now);
        self.hosts[b].router().contact_up(&id_a, now);
        log_contact_event!(debug, now, "Contact up", id_a, id_b);
        self.flush(vec![a, b], now);
    }

    fn contact_down(&mut self, a: usize, b: usize, now: SimTime) {
        let closed = self.hosts[a].disconnect(b);
        self.hosts[b].disconnect(a);
        if !closed {
            return;
        }

        let (id_a, id_b) = (self.hosts[a].id().clone(), self.hosts[b].id().clone());
        self.hosts[a].router().contact_down(&id_b);
        self.hosts[b].router().contact_down(&id_a);
        log_contact_event!(debug, now, "Contact down", id_a, id_b);
    }

    // =========================================================================
    // Edge protocol
    // =========================================================================

    fn register(&mut self, index: usize, now: SimTime) -> Result<(), RuntimeError> {
        let publication = &self.config.publications[index];
        let host = self.index_of(&publication.publisher, "publication")?;
        let message = self.factory.registration(publication, now);
        log_message_event!(
            debug,
            "publisher",
            now,
            "Topic registration created",
            message,
            topic_id = publication.topic_id,
            flag = publication.flag
        );
        self.hosts[host].store(message);
        self.flush(vec![host], now);
        Ok(())
    }

    fn subscribe(&mut self, host: usize, now: SimTime) {
        let message = self.factory.subscription(self.hosts[host].profile(), now);
        log_message_event!(
            debug,
            "subscriber",
            now,
            "Subscription request created",
            message,
            ranges = self.hosts[host].numeric_attributes().len()
        );
        self.hosts[host].store(message);
        self.flush(vec![host], now);
    }

    fn publish(&mut self, index: usize, now: SimTime) -> Result<(), RuntimeError> {
        let publication = &self.config.publications[index];
        let host = self.index_of(&publication.publisher, "publication")?;
        let Some(grant) = self.hosts[host].publisher_key(publication.topic_id).cloned() else {
            self.stats.data_skipped_no_key += 1;
            log_event!(
                debug,
                "publisher",
                now,
                "No publisher key yet, publication skipped",
                publisher_id = %publication.publisher,
                topic_id = publication.topic_id
            );
            return Ok(());
        };

        let message = self.factory.data(publication, &grant, now);
        log_message_event!(
            debug,
            "publisher",
            now,
            "Data published",
            message,
            topic_id = publication.topic_id,
            path = %grant.path
        );
        self.stats.data_published += 1;
        self.hosts[host].store(message);
        self.flush(vec![host], now);
        Ok(())
    }

    // =========================================================================
    // KDC
    // =========================================================================

    fn accept_at_kdc(&mut self, kdc: usize, message: Message, now: SimTime) {
        let delay = self.config.kdc_processing_delay;
        log_message_event!(debug, "kdc", now, "Request queued", message, delay);
        self.queue
            .schedule_after(delay, SimEvent::KdcProcess { kdc, message });
    }

    fn process_at_kdc(
        &mut self,
        kdc: usize,
        message: &Message,
        now: SimTime,
    ) -> Result<(), RuntimeError> {
        match message.kind {
            MessageKind::TopicRegistration => self.process_registration(message, now),
            MessageKind::SubscriptionRequest => {
                self.process_subscription(kdc, message, now)?;
                self.flush(vec![kdc], now);
                Ok(())
            }
            MessageKind::KeyDelivery | MessageKind::Data => {
                log_message_event!(debug, "kdc", now, "Not a request, ignored", message);
                Ok(())
            }
        }
    }

    fn process_registration(&mut self, message: &Message, now: SimTime) -> Result<(), RuntimeError> {
        let request = match parse_registration(message) {
            Ok(request) => request,
            Err(e) => {
                self.stats.malformed_requests += 1;
                log_message_event!(warn, "kdc", now, "Malformed registration dropped", message, error = %e);
                return Ok(());
            }
        };

        self.stats.kdc_requests_processed += 1;
        for (topic_id, flag) in request.topics {
            match self
                .service
                .register_topic(&mut self.state, topic_id, flag, &request.publisher)
            {
                Ok(outcome) => log_event!(
                    debug,
                    "kdc",
                    now,
                    "Registration processed",
                    publisher_id = %request.publisher,
                    topic_id,
                    ?outcome
                ),
                Err(e) => self.on_kdc_error(e, now)?,
            }
        }
        Ok(())
    }

    fn process_subscription(
        &mut self,
        kdc: usize,
        message: &Message,
        now: SimTime,
    ) -> Result<(), RuntimeError> {
        let request = match parse_subscription(message) {
            Ok(request) => request,
            Err(e) => {
                self.stats.malformed_requests += 1;
                log_message_event!(warn, "kdc", now, "Malformed subscription dropped", message, error = %e);
                return Ok(());
            }
        };

        let outcome = match self.service.subscribe(
            &mut self.state,
            &request.subscriber,
            &request.interest,
            &request.ranges,
        ) {
            Ok(outcome) => outcome,
            Err(e) => return self.on_kdc_error(e, now),
        };
        self.stats.kdc_requests_processed += 1;

        log_message_event!(
            info,
            "kdc",
            now,
            "Subscription processed",
            message,
            subscriber_id = %request.subscriber,
            matched = outcome.matched.len(),
            publisher_keys = outcome.publisher_keys.len(),
            subscriber_grants = outcome.subscriber_keys.len()
        );

        let kdc_id = self.hosts[kdc].id().clone();
        for record in &outcome.publisher_keys {
            let delivery =
                self.factory
                    .publisher_key(&kdc_id, PublisherKeyGrant::from(record), now);
            self.hosts[kdc].store(delivery);
        }
        for grant in outcome.subscriber_keys {
            let delivery = self.factory.subscriber_keys(&kdc_id, grant, now);
            self.hosts[kdc].store(delivery);
        }
        Ok(())
    }

    fn on_kdc_error(&mut self, error: KdcError, now: SimTime) -> Result<(), RuntimeError> {
        if error.is_fatal() {
            log_event!(error, "kdc", now, "Fatal KDC failure, aborting run", error = %error);
            return Err(error.into());
        }
        self.stats.kdc_requests_rejected += 1;
        log_event!(warn, "kdc", now, "Request rejected", error = %error);
        Ok(())
    }

    // =========================================================================
    // Forwarding
    // =========================================================================

    /// Offer buffered messages until no buffer grows.
    fn flush(&mut self, start: Vec<usize>, now: SimTime) {
        let mut pending: VecDeque<usize> = start.into();
        while let Some(holder) = pending.pop_front() {
            for grown in self.forward_from(holder, now) {
                if !pending.contains(&grown) {
                    pending.push_back(grown);
                }
            }
        }
    }

    /// Offer every buffered message of `holder` to its connected peers.
    /// Returns the hosts whose buffers grew.
    fn forward_from(&mut self, holder: usize, now: SimTime) -> Vec<usize> {
        let peers = self.hosts[holder].connected();
        let messages = self.hosts[holder].buffer().to_vec();
        let mut grown = Vec::new();

        for message in &messages {
            match message.kind {
                MessageKind::TopicRegistration | MessageKind::SubscriptionRequest => {
                    self.forward_control(holder, &peers, message, now, &mut grown)
                }
                MessageKind::KeyDelivery => {
                    self.forward_keys(holder, &peers, message, now, &mut grown)
                }
                MessageKind::Data => self.forward_data(holder, &peers, message, now, &mut grown),
            }
        }
        grown
    }

    fn component(&self, host: usize) -> &'static str {
        let host = &self.hosts[host];
        if host.is_kdc() {
            "kdc"
        } else if host.is_broker() {
            "broker"
        } else if host.is_publisher() {
            "publisher"
        } else {
            "subscriber"
        }
    }

    /// Next hop of a request held by `holder`.
    fn control_next_hop(&self, holder: usize, peers: &[usize]) -> Result<usize, KdcError> {
        let node = &self.hosts[holder];
        if node.is_broker() {
            peers
                .iter()
                .copied()
                .find(|&p| self.hosts[p].is_kdc())
                .ok_or_else(|| KdcError::NoAvailableKdc {
                    node: node.id().clone(),
                })
        } else {
            self.broker_among(holder, peers)
        }
    }

    fn broker_among(&self, holder: usize, peers: &[usize]) -> Result<usize, KdcError> {
        peers
            .iter()
            .copied()
            .find(|&p| self.hosts[p].is_broker())
            .ok_or_else(|| KdcError::NoAvailableBroker {
                node: self.hosts[holder].id().clone(),
            })
    }

    fn defer(&mut self, holder: usize, message: &Message, error: &KdcError, now: SimTime) {
        self.stats.control_deferred += 1;
        log_message_event!(
            debug,
            self.component(holder),
            now,
            "Kept for a later contact",
            message,
            error = %error
        );
    }

    fn forward_control(
        &mut self,
        holder: usize,
        peers: &[usize],
        message: &Message,
        now: SimTime,
        grown: &mut Vec<usize>,
    ) {
        if self.hosts[holder].is_kdc() {
            // Request created by the KDC host itself.
            if let Some(message) = self.hosts[holder].release(&message.id) {
                self.accept_at_kdc(holder, message, now);
            }
            return;
        }

        let next = match self.control_next_hop(holder, peers) {
            Ok(next) => next,
            Err(e) => return self.defer(holder, message, &e, now),
        };
        let Some(message) = self.hosts[holder].release(&message.id) else {
            return;
        };
        self.hosts[holder]
            .router()
            .record_forward(self.hosts[next].id(), &message);
        self.stats.control_forwarded += 1;
        log_message_event!(
            debug,
            self.component(holder),
            now,
            "Request handed over",
            message,
            to = %self.hosts[next].id()
        );

        if self.hosts[next].is_kdc() {
            if self.hosts[next].mark_seen(&message.id) {
                self.accept_at_kdc(next, message, now);
            }
        } else if self.hosts[next].store(message) {
            grown.push(next);
        }
    }

    fn forward_keys(
        &mut self,
        holder: usize,
        peers: &[usize],
        message: &Message,
        now: SimTime,
        grown: &mut Vec<usize>,
    ) {
        let next = if self.hosts[holder].is_kdc() {
            match self.broker_among(holder, peers) {
                Ok(broker) => broker,
                Err(e) => return self.defer(holder, message, &e, now),
            }
        } else {
            let router = self.hosts[holder].router();
            match peers
                .iter()
                .copied()
                .find(|&p| router.decide(message, &self.hosts[p]) == RoutingDecision::Deliver)
            {
                Some(target) => target,
                None => return,
            }
        };

        let Some(message) = self.hosts[holder].release(&message.id) else {
            return;
        };
        self.hosts[holder]
            .router()
            .record_forward(self.hosts[next].id(), &message);

        if message.destination.as_ref() == Some(self.hosts[next].id()) {
            self.install_keys(next, &message, now);
        } else if self.hosts[next].store(message) {
            grown.push(next);
        }
    }

    fn install_keys(&mut self, target: usize, message: &Message, now: SimTime) {
        if !self.hosts[target].mark_seen(&message.id) {
            return;
        }
        match message.topic() {
            Some(TopicProperty::KeyEncryption(grant)) => {
                self.hosts[target].install_publisher_key(grant.clone())
            }
            Some(TopicProperty::KeyAuthentication(grant)) => {
                self.hosts[target].install_subscriber_keys(grant.clone())
            }
            _ => {
                log_message_event!(warn, "broker", now, "Key delivery without key material", message);
                return;
            }
        }
        self.stats.key_deliveries += 1;
        log_message_event!(
            info,
            self.component(target),
            now,
            "Keys delivered",
            message,
            target = %self.hosts[target].id()
        );
    }

    fn forward_data(
        &mut self,
        holder: usize,
        peers: &[usize],
        message: &Message,
        now: SimTime,
        grown: &mut Vec<usize>,
    ) {
        let mut relays = Vec::new();
        for &peer in peers {
            let decision = self.hosts[holder]
                .router()
                .decide(message, &self.hosts[peer]);
            match decision {
                RoutingDecision::Deliver => {
                    self.hosts[holder]
                        .router()
                        .record_forward(self.hosts[peer].id(), message);
                    if self.hosts[peer].mark_seen(&message.id) {
                        let outcome = self.hosts[peer].consume_data(message);
                        self.stats.data_delivered += 1;
                        log_message_event!(
                            info,
                            "subscriber",
                            now,
                            "Data delivered",
                            message,
                            to = %self.hosts[peer].id(),
                            ?outcome
                        );
                    }
                }
                RoutingDecision::Relay => relays.push(peer),
                RoutingDecision::Keep => {}
            }
        }
        if relays.is_empty() {
            return;
        }

        let ranked = self.hosts[holder]
            .router()
            .rank_relays(message, relays.iter().map(|&p| &self.hosts[p]));
        for relay in ranked.into_iter().take(self.config.relay_fanout) {
            let Some(&peer) = self.index.get(&relay.host) else {
                continue;
            };
            self.hosts[holder].router().record_forward(&relay.host, message);
            if self.hosts[peer].store(message.clone()) {
                self.stats.data_relayed += 1;
                grown.push(peer);
                log_message_event!(
                    debug,
                    "router",
                    now,
                    "Data relayed",
                    message,
                    to = %relay.host,
                    score = relay.total()
                );
            }
        }
    }
}
