//! Per-device request coordinator
//!
//! [`DeviceCoordinator`] is the public surface of one peripheral: awaitable
//! read/write/notify operations plus connection lifecycle, backed by a
//! single task that owns all mutable coordination state. Public operations
//! and host delegate events meet only inside that task, so the access-table
//! discipline holds for every interleaving.
//!
//! The task is spawned by the owning central when the peripheral is first
//! observed and runs until the central drops both the handle and the
//! delegate bridge.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use bluefin_core::errors::{BluefinError, Result};
use bluefin_core::{
    AdvertisementData, Characteristic, CharacteristicLocator, ConnectionState, CoordinatorConfig,
    HostError, HostPeripheral, PeripheralEvent, PeripheralId, SubscriptionId, WriteKind,
};

use crate::access::{AccessTable, ReadBegin, WriteBegin};
use crate::central::CentralLink;
use crate::command::{Command, GateTicket, ReadTicket, WriteTicket};
use crate::delegate::DelegateBridge;
use crate::discovery;
use crate::gate::{GateAdmission, WriteWithoutResponseGate};
use crate::registry::{NotificationHandler, NotificationRegistry};
use crate::rssi::RssiReadQueue;
use crate::snapshot::{DiscoveryPlan, PeripheralStateSnapshot};

// ----------------------------------------------------------------------------
// Public Handle
// ----------------------------------------------------------------------------

struct CoordinatorShared {
    id: PeripheralId,
    commands: mpsc::UnboundedSender<Command>,
    snapshot: Arc<PeripheralStateSnapshot>,
}

/// Handle to one peripheral's coordinator.
///
/// Cloning is cheap; all clones drive the same coordinator task. Operations
/// are cooperative: they suspend while queued behind other accesses or while
/// awaiting wire completions, and resolve on completion, error, or
/// disconnect.
#[derive(Clone)]
pub struct DeviceCoordinator {
    shared: Arc<CoordinatorShared>,
}

impl DeviceCoordinator {
    /// Spawn the coordinator task for a peripheral.
    ///
    /// Returns the public handle and the [`DelegateBridge`] the central
    /// wires into the host stack's callbacks. The coordinator holds the
    /// central only weakly: once the central is gone, connect and disconnect
    /// degrade to logged no-ops.
    pub fn spawn(
        host: Arc<dyn HostPeripheral>,
        central: Weak<dyn CentralLink>,
        advertisement: AdvertisementData,
        rssi: i16,
        config: CoordinatorConfig,
    ) -> (Self, DelegateBridge) {
        let id = host.id();
        let snapshot = Arc::new(PeripheralStateSnapshot::new(advertisement, rssi));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let bridge = DelegateBridge::new(event_tx, Arc::clone(&snapshot));

        let task = CoordinatorTask {
            host,
            central,
            config,
            snapshot: Arc::clone(&snapshot),
            access: AccessTable::default(),
            registry: NotificationRegistry::default(),
            gate: WriteWithoutResponseGate::default(),
            rssi_queue: RssiReadQueue::default(),
            plan: None,
            commands: command_rx,
            events: event_rx,
        };
        tokio::spawn(task.run());

        let handle = Self {
            shared: Arc::new(CoordinatorShared {
                id,
                commands: command_tx,
                snapshot,
            }),
        };
        (handle, bridge)
    }

    /// Stable identity of the peripheral
    pub fn id(&self) -> PeripheralId {
        self.shared.id
    }

    /// The observable state snapshot, readable from any thread
    pub fn snapshot(&self) -> Arc<PeripheralStateSnapshot> {
        Arc::clone(&self.shared.snapshot)
    }

    /// Current logical connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.snapshot.state()
    }

    /// Whether the peripheral has neither advertised nor been connected
    /// within `interval`; used by centrals to garbage-collect
    pub fn is_stale(&self, interval: Duration) -> bool {
        self.shared.snapshot.is_stale(interval)
    }

    /// Ask the central to connect.
    ///
    /// Completes when the request has been handed over; it does not await
    /// link-up. An orphaned peripheral logs a warning and does nothing.
    pub async fn connect(&self) {
        let (done, done_rx) = oneshot::channel();
        if self.shared.commands.send(Command::Connect { done }).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Unsubscribe every notifying characteristic, then ask the central to
    /// disconnect
    pub fn disconnect(&self) {
        let _ = self.shared.commands.send(Command::Disconnect);
    }

    /// Read the value of a characteristic.
    ///
    /// Concurrent reads of the same characteristic coalesce onto one wire
    /// read and all observe the same result.
    pub async fn read(&self, characteristic: &Characteristic) -> Result<Vec<u8>> {
        loop {
            let (reply, ticket) = oneshot::channel();
            self.shared
                .commands
                .send(Command::Read {
                    characteristic: characteristic.clone(),
                    reply,
                })
                .map_err(|_| BluefinError::not_present(characteristic))?;
            match ticket.await {
                Ok(ReadTicket::Value(value)) => {
                    return value
                        .await
                        .unwrap_or_else(|_| Err(BluefinError::not_present(characteristic)));
                }
                Ok(ReadTicket::Queued(wake)) => {
                    let _ = wake.await;
                }
                Err(_) => return Err(BluefinError::not_present(characteristic)),
            }
        }
    }

    /// Write the value of a characteristic with response
    pub async fn write(&self, characteristic: &Characteristic, data: Vec<u8>) -> Result<()> {
        loop {
            let (reply, ticket) = oneshot::channel();
            self.shared
                .commands
                .send(Command::Write {
                    characteristic: characteristic.clone(),
                    data: data.clone(),
                    reply,
                })
                .map_err(|_| BluefinError::not_present(characteristic))?;
            match ticket.await {
                Ok(WriteTicket::Done(done)) => {
                    return done
                        .await
                        .unwrap_or_else(|_| Err(BluefinError::not_present(characteristic)));
                }
                Ok(WriteTicket::Queued(wake)) => {
                    let _ = wake.await;
                }
                Err(_) => return Err(BluefinError::not_present(characteristic)),
            }
        }
    }

    /// Write the value of a characteristic without response.
    ///
    /// Unacknowledged writes surface no errors: the operation completes once
    /// the write has been handed to the stack, and a write submitted on a
    /// dead link is silently dropped.
    pub async fn write_without_response(&self, characteristic: &Characteristic, data: Vec<u8>) {
        loop {
            let (reply, ticket) = oneshot::channel();
            let command = Command::WriteUnacknowledged {
                characteristic: characteristic.clone(),
                data: data.clone(),
                reply,
            };
            if self.shared.commands.send(command).is_err() {
                return;
            }
            match ticket.await {
                Ok(GateTicket::Sent) | Err(_) => return,
                Ok(GateTicket::Queued(wake)) => {
                    let _ = wake.await;
                }
            }
        }
    }

    /// Read the connection RSSI in dBm.
    ///
    /// Concurrent calls piggy-back on one in-flight sample.
    pub async fn read_rssi(&self) -> Result<i16> {
        let (reply, ticket) = oneshot::channel();
        self.shared
            .commands
            .send(Command::ReadRssi { reply })
            .map_err(|_| BluefinError::device_not_present())?;
        let value = ticket.await.map_err(|_| BluefinError::device_not_present())?;
        value
            .await
            .unwrap_or_else(|_| Err(BluefinError::device_not_present()))
    }

    /// Register a notification handler for a characteristic identified by
    /// service and characteristic uuid.
    ///
    /// Never fails: if the characteristic is not yet discovered, the
    /// subscription is recorded and the wire subscription follows as soon as
    /// discovery reveals a notify-capable match.
    pub fn register_notifications<F, Fut>(
        &self,
        service: Uuid,
        characteristic: Uuid,
        handler: F,
    ) -> Subscription
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_handler(
            CharacteristicLocator::new(service, characteristic),
            box_handler(handler),
        )
    }

    /// Register a notification handler for a discovered characteristic
    /// handle. Fails with `NotPresent` when the handle carries no parent
    /// service.
    pub fn register_notifications_for<F, Fut>(
        &self,
        characteristic: &Characteristic,
        handler: F,
    ) -> Result<Subscription>
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let locator = characteristic
            .locator()
            .ok_or_else(|| BluefinError::not_present(characteristic))?;
        Ok(self.register_handler(locator, box_handler(handler)))
    }

    /// Remove a subscription; the second removal of the same subscription is
    /// a no-op
    pub fn deregister_notifications(&self, subscription: &Subscription) {
        subscription.cancel();
    }

    fn register_handler(
        &self,
        locator: CharacteristicLocator,
        handler: NotificationHandler,
    ) -> Subscription {
        let id = SubscriptionId::fresh();
        if self
            .shared
            .commands
            .send(Command::Register {
                locator,
                id,
                handler,
            })
            .is_err()
        {
            debug!(%locator, "registration against a stopped coordinator");
        }
        Subscription {
            locator,
            id,
            coordinator: Arc::downgrade(&self.shared),
        }
    }
}

fn box_handler<F, Fut>(handler: F) -> NotificationHandler
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |value| -> BoxFuture<'static, ()> { Box::pin(handler(value)) })
}

// ----------------------------------------------------------------------------
// Subscription Handle
// ----------------------------------------------------------------------------

/// Handle to one registered notification handler.
///
/// A plain value: dropping it does not deregister, and it does not keep the
/// coordinator alive. Reconnect re-subscription relies on the retained
/// registry, not on this handle.
#[derive(Debug, Clone)]
pub struct Subscription {
    locator: CharacteristicLocator,
    id: SubscriptionId,
    coordinator: Weak<CoordinatorShared>,
}

impl Subscription {
    /// The characteristic this subscription listens to
    pub fn locator(&self) -> CharacteristicLocator {
        self.locator
    }

    /// Unique identifier of this subscription
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Deregister the handler; idempotent
    pub fn cancel(&self) {
        match self.coordinator.upgrade() {
            Some(shared) => {
                let _ = shared.commands.send(Command::Deregister {
                    locator: self.locator,
                    id: self.id,
                });
            }
            None => debug!(locator = %self.locator, "cancel on a stopped coordinator ignored"),
        }
    }
}

// ----------------------------------------------------------------------------
// Coordinator Task
// ----------------------------------------------------------------------------

/// The task owning all mutable coordination state
struct CoordinatorTask {
    host: Arc<dyn HostPeripheral>,
    central: Weak<dyn CentralLink>,
    config: CoordinatorConfig,
    snapshot: Arc<PeripheralStateSnapshot>,
    access: AccessTable,
    registry: NotificationRegistry,
    gate: WriteWithoutResponseGate,
    rssi_queue: RssiReadQueue,
    plan: Option<DiscoveryPlan>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedReceiver<PeripheralEvent>,
}

impl CoordinatorTask {
    async fn run(mut self) {
        debug!(peripheral = %self.host.id(), "coordinator started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    // Every handle and subscription dropped. Observers may
                    // still hold the snapshot; leave it disconnected, not
                    // frozen in its last live state.
                    None => {
                        self.handle_disconnect(None);
                        break;
                    }
                },
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    // The central dropped the delegate bridge: no further
                    // host callbacks can arrive.
                    None => {
                        self.handle_disconnect(None);
                        break;
                    }
                },
            }
        }
        // Resolve stragglers so no caller hangs on a dead task.
        self.access.drain();
        self.gate.drain();
        self.rssi_queue.drain();
        debug!(peripheral = %self.host.id(), "coordinator stopped");
    }

    // ------------------------------------------------------------------
    // Commands (public operations)
    // ------------------------------------------------------------------

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { done } => {
                match self.central.upgrade() {
                    Some(central) => {
                        central.connect(self.host.id());
                        self.snapshot.set_state(self.host.state());
                    }
                    None => warn!(peripheral = %self.host.id(), "orphaned peripheral; connect ignored"),
                }
                let _ = done.send(());
            }
            Command::Disconnect => self.handle_disconnect_request().await,
            Command::Read {
                characteristic,
                reply,
            } => self.handle_read(characteristic, reply).await,
            Command::Write {
                characteristic,
                data,
                reply,
            } => self.handle_write(characteristic, data, reply).await,
            Command::WriteUnacknowledged {
                characteristic,
                data,
                reply,
            } => {
                self.handle_write_unacknowledged(characteristic, data, reply)
                    .await
            }
            Command::ReadRssi { reply } => self.handle_read_rssi(reply).await,
            Command::Register {
                locator,
                id,
                handler,
            } => self.handle_register(locator, id, handler).await,
            Command::Deregister { locator, id } => self.handle_deregister(locator, id).await,
        }
    }

    async fn handle_disconnect_request(&mut self) {
        // Tear down wire subscriptions while the link is still up.
        for locator in self.snapshot.notifying_characteristics() {
            if let Some(characteristic) = self.snapshot.find_characteristic(locator) {
                if let Err(error) = self.host.set_notify(&characteristic, false).await {
                    debug!(%locator, %error, "unsubscribe before disconnect failed");
                }
            }
        }
        match self.central.upgrade() {
            Some(central) => central.disconnect(self.host.id()),
            None => warn!(peripheral = %self.host.id(), "orphaned peripheral; disconnect ignored"),
        }
    }

    async fn handle_read(
        &mut self,
        characteristic: Characteristic,
        reply: oneshot::Sender<ReadTicket>,
    ) {
        let Some(locator) = characteristic.locator() else {
            let _ = reply.send(failed_read_ticket(BluefinError::not_present(&characteristic)));
            return;
        };
        if self.snapshot.state() == ConnectionState::Disconnected {
            let _ = reply.send(failed_read_ticket(BluefinError::not_present_at(locator)));
            return;
        }
        match self.access.begin_read(locator) {
            ReadBegin::Joined(value) => {
                let _ = reply.send(ReadTicket::Value(value));
            }
            ReadBegin::Issue(value) => {
                let _ = reply.send(ReadTicket::Value(value));
                if let Err(error) = self.host.read_value(&characteristic).await {
                    // Submission failed: no completion event will follow.
                    self.access.complete_read(locator, Err(error.into()));
                }
            }
            ReadBegin::Queued(wake) => {
                let _ = reply.send(ReadTicket::Queued(wake));
            }
        }
    }

    async fn handle_write(
        &mut self,
        characteristic: Characteristic,
        data: Vec<u8>,
        reply: oneshot::Sender<WriteTicket>,
    ) {
        let Some(locator) = characteristic.locator() else {
            let _ = reply.send(failed_write_ticket(BluefinError::not_present(&characteristic)));
            return;
        };
        if self.snapshot.state() == ConnectionState::Disconnected {
            let _ = reply.send(failed_write_ticket(BluefinError::not_present_at(locator)));
            return;
        }
        match self.access.begin_write(locator) {
            WriteBegin::Issue(done) => {
                let _ = reply.send(WriteTicket::Done(done));
                if let Err(error) = self
                    .host
                    .write_value(&characteristic, &data, WriteKind::WithResponse)
                    .await
                {
                    self.access.complete_write(locator, Err(error.into()));
                }
            }
            WriteBegin::Queued(wake) => {
                let _ = reply.send(WriteTicket::Queued(wake));
            }
        }
    }

    async fn handle_write_unacknowledged(
        &mut self,
        characteristic: Characteristic,
        data: Vec<u8>,
        reply: oneshot::Sender<GateTicket>,
    ) {
        if self.snapshot.state() == ConnectionState::Disconnected {
            debug!(characteristic = %characteristic.uuid, "unacknowledged write dropped on dead link");
            let _ = reply.send(GateTicket::Sent);
            return;
        }
        match self.gate.admit() {
            GateAdmission::Admitted => {
                let _ = reply.send(GateTicket::Sent);
                if let Err(error) = self
                    .host
                    .write_value(&characteristic, &data, WriteKind::WithoutResponse)
                    .await
                {
                    warn!(characteristic = %characteristic.uuid, %error, "unacknowledged write failed");
                    // No ready signal follows a failed submission; free the
                    // gate so waiters retry.
                    self.gate.ready();
                }
            }
            GateAdmission::Wait(wake) => {
                let _ = reply.send(GateTicket::Queued(wake));
            }
        }
    }

    async fn handle_read_rssi(&mut self, reply: oneshot::Sender<oneshot::Receiver<Result<i16>>>) {
        let (tx, rx) = oneshot::channel();
        if self.snapshot.state() == ConnectionState::Disconnected {
            let _ = tx.send(Err(BluefinError::device_not_present()));
            let _ = reply.send(rx);
            return;
        }
        let first = self.rssi_queue.enqueue(tx);
        let _ = reply.send(rx);
        if first {
            if let Err(error) = self.host.read_rssi().await {
                self.rssi_queue.complete(Err(error.into()));
            }
        }
    }

    async fn handle_register(
        &mut self,
        locator: CharacteristicLocator,
        id: SubscriptionId,
        handler: NotificationHandler,
    ) {
        self.registry.insert(locator, id, handler);
        // Subscribe on the wire now if discovery already revealed a
        // notify-capable characteristic; otherwise the post-connect pipeline
        // catches up.
        if !self.snapshot.is_notifying(locator) {
            if let Some(characteristic) = self.snapshot.find_characteristic(locator) {
                if characteristic.properties.supports_notifications() {
                    if let Err(error) = self.host.set_notify(&characteristic, true).await {
                        warn!(%locator, %error, "enabling notifications failed");
                    }
                }
            }
        }
    }

    async fn handle_deregister(&mut self, locator: CharacteristicLocator, id: SubscriptionId) {
        let was_last = self.registry.remove(locator, id);
        if was_last && self.snapshot.is_notifying(locator) {
            if let Some(characteristic) = self.snapshot.find_characteristic(locator) {
                if let Err(error) = self.host.set_notify(&characteristic, false).await {
                    debug!(%locator, %error, "disabling notifications failed");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    async fn handle_event(&mut self, event: PeripheralEvent) {
        match event {
            PeripheralEvent::Connected => self.handle_connect().await,
            PeripheralEvent::Disconnected { error } => self.handle_disconnect(error),
            PeripheralEvent::StateChanged(state) => self.snapshot.set_state(state),
            PeripheralEvent::NameUpdated(name) => self.snapshot.set_name(name),
            PeripheralEvent::RssiRead(result) => {
                if let Ok(rssi) = result {
                    self.snapshot.set_rssi(rssi);
                }
                self.rssi_queue.complete(result.map_err(Into::into));
            }
            PeripheralEvent::ServicesDiscovered(result) => {
                self.handle_services_discovered(result).await
            }
            PeripheralEvent::CharacteristicsDiscovered { service, result } => {
                self.handle_characteristics_discovered(service, result).await
            }
            PeripheralEvent::DescriptorsDiscovered {
                characteristic,
                result,
            } => {
                if let Err(error) = result {
                    debug!(characteristic = %characteristic.uuid, %error, "descriptor discovery failed");
                }
            }
            PeripheralEvent::ValueUpdated {
                characteristic,
                result,
            } => self.handle_value_updated(characteristic, result).await,
            PeripheralEvent::WriteCompleted {
                characteristic,
                result,
            } => {
                let matched = characteristic
                    .locator()
                    .map(|locator| self.access.complete_write(locator, result.map_err(Into::into)))
                    .unwrap_or(false);
                if !matched {
                    debug!(characteristic = %characteristic.uuid, "unmatched write completion discarded");
                }
            }
            PeripheralEvent::NotificationStateUpdated {
                characteristic,
                result,
            } => {
                if let Some(locator) = characteristic.locator() {
                    match result {
                        Ok(enabled) => self.snapshot.set_notifying(locator, enabled),
                        Err(error) => warn!(%locator, %error, "set-notify failed"),
                    }
                }
            }
            PeripheralEvent::ReadyToSendWriteWithoutResponse => self.gate.ready(),
            PeripheralEvent::ServicesModified { invalidated } => {
                self.handle_services_modified(invalidated).await
            }
        }
    }

    async fn handle_connect(&mut self) {
        // Fresh link: previous discovery results and wire subscriptions are
        // stale.
        self.snapshot.clear_services();
        self.snapshot.clear_notifying();

        let description = self
            .central
            .upgrade()
            .and_then(|central| central.device_description(&self.snapshot.advertisement()));
        self.plan = description.as_ref().and_then(discovery::build_plan);
        // The plan is fixed for this connect attempt, before any discovery
        // message goes out.
        self.snapshot.set_requested_characteristics(self.plan.clone());
        self.snapshot.set_state(self.host.state());

        let filter = discovery::service_filter(&self.plan);
        if let Err(error) = self.host.discover_services(filter.as_deref()).await {
            warn!(peripheral = %self.host.id(), %error, "service discovery failed to start");
        }
    }

    async fn handle_services_discovered(&mut self, result: std::result::Result<Vec<Uuid>, HostError>) {
        let services = match result {
            Ok(services) => services,
            Err(error) => {
                warn!(%error, "service discovery failed");
                return;
            }
        };
        self.snapshot.set_services(&services);
        for service in services {
            if !discovery::plan_includes_service(&self.plan, service) {
                continue;
            }
            let filter = discovery::characteristic_filter(&self.plan, service);
            if let Err(error) = self
                .host
                .discover_characteristics(service, filter.as_deref())
                .await
            {
                warn!(%service, %error, "characteristic discovery failed to start");
            }
        }
    }

    async fn handle_characteristics_discovered(
        &mut self,
        service: Uuid,
        result: std::result::Result<Vec<Characteristic>, HostError>,
    ) {
        let characteristics = match result {
            Ok(characteristics) => characteristics,
            Err(error) => {
                warn!(%service, %error, "characteristic discovery failed");
                return;
            }
        };
        self.snapshot
            .merge_characteristics(service, characteristics.clone());
        for characteristic in characteristics {
            let Some(locator) = characteristic.locator() else {
                continue;
            };
            if characteristic.properties.supports_notifications()
                && self.registry.has_handlers(locator)
                && !self.snapshot.is_notifying(locator)
            {
                if let Err(error) = self.host.set_notify(&characteristic, true).await {
                    warn!(%locator, %error, "enabling notifications failed");
                }
            }
            if discovery::wants_descriptors(&self.plan, locator) {
                if let Err(error) = self.host.discover_descriptors(&characteristic).await {
                    debug!(%locator, %error, "descriptor discovery failed to start");
                }
            }
        }
    }

    async fn handle_value_updated(
        &mut self,
        characteristic: Characteristic,
        result: std::result::Result<Vec<u8>, HostError>,
    ) {
        let Some(locator) = characteristic.locator() else {
            debug!(characteristic = %characteristic.uuid, "value update without parent service discarded");
            return;
        };
        // Drain an in-flight read first; a value update never matches a
        // write entry.
        let drained = self
            .access
            .complete_read(locator, result.clone().map_err(Into::into));
        match result {
            // Handlers run sequentially in registration order; one callback
            // finishes fan-out before the next event is processed.
            Ok(value) => self.registry.fan_out(locator, value).await,
            Err(error) if !drained => {
                debug!(%locator, %error, "unsolicited value error discarded")
            }
            Err(_) => {}
        }
    }

    async fn handle_services_modified(&mut self, invalidated: Vec<Uuid>) {
        if invalidated.is_empty() {
            return;
        }
        self.snapshot.remove_services(&invalidated);
        self.snapshot.clear_notifying_for_services(&invalidated);
        if let Err(error) = self.host.discover_services(Some(&invalidated)).await {
            warn!(%error, "rediscovery after service modification failed to start");
        }
    }

    fn handle_disconnect(&mut self, error: Option<HostError>) {
        match &error {
            Some(error) => debug!(peripheral = %self.host.id(), %error, "link lost"),
            None => debug!(peripheral = %self.host.id(), "disconnected"),
        }
        self.snapshot.set_state(ConnectionState::Disconnected);
        self.access.drain();
        self.gate.drain();
        self.rssi_queue.drain();
        // The registry is retained so a reconnect re-subscribes.
        self.snapshot.clear_services();
        self.snapshot.clear_notifying();
        self.snapshot.set_requested_characteristics(None);
        self.plan = None;
        self.snapshot
            .stamp_disconnect_activity(self.config.disconnect_activity_interval);
    }
}

fn failed_read_ticket(error: BluefinError) -> ReadTicket {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(Err(error));
    ReadTicket::Value(rx)
}

fn failed_write_ticket(error: BluefinError) -> WriteTicket {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(Err(error));
    WriteTicket::Done(rx)
}
