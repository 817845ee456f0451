//! Mock CARLA client
//!
//! In-process stand-in for the simulator, used by unit tests, the e2e suite
//! and CLI runs without a `real-carla` build. Failures can be injected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ActorId, SensorId, SensorSource, SensorType, Transform};
use tracing::{debug, instrument};

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::{MockSensor, MockSensorMode};

/// Mock client configuration (failure injection included)
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Refuse every connection attempt
    pub fail_connect: bool,
    /// Delay before a connection attempt answers
    pub connect_delay: Option<Duration>,
    /// Blueprints whose spawn fails
    pub fail_blueprints: Vec<String>,
    /// Actor IDs whose destroy fails
    pub fail_destroy: Vec<ActorId>,
    /// Reported server version
    pub server_version: Option<String>,
    /// Reported map name
    pub map_name: String,
    /// How sensor sources produce data
    pub sensor_mode: MockSensorMode,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fail_connect: false,
            connect_delay: None,
            fail_blueprints: Vec::new(),
            fail_destroy: Vec::new(),
            server_version: Some("0.9.15".to_string()),
            map_name: "Town01".to_string(),
            sensor_mode: MockSensorMode::default(),
        }
    }
}

impl MockConfig {
    /// Sensors only deliver what a test emits
    pub fn manual() -> Self {
        Self {
            sensor_mode: MockSensorMode::Manual,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct MockActor {
    blueprint: String,
    parent: Option<ActorId>,
    attributes: HashMap<String, String>,
}

/// Mock CARLA client
///
/// Clones share state, so a test can keep one handle while the recorder owns
/// another.
#[derive(Clone)]
pub struct MockCarlaClient {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    config: MockConfig,
    /// Actor ID counter
    next_actor_id: AtomicU32,
    /// Live actors
    actors: Mutex<HashMap<ActorId, MockActor>>,
    /// Every destroy call that succeeded, in call order
    destroyed: Mutex<Vec<ActorId>>,
    /// Sources handed out, by sensor id
    sensors: Mutex<HashMap<SensorId, MockSensor>>,
    connected: AtomicBool,
}

impl MockCarlaClient {
    /// Create default mock client
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create mock client with configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            inner: Arc::new(MockInner {
                config,
                next_actor_id: AtomicU32::new(1000), // start at 1000 for easy identification
                ..Default::default()
            }),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Get current actor count
    pub fn actor_count(&self) -> usize {
        self.inner.actors.lock().unwrap().len()
    }

    /// Get all live actor IDs
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.inner.actors.lock().unwrap().keys().copied().collect()
    }

    /// Successful destroys, in call order
    pub fn destroyed_actors(&self) -> Vec<ActorId> {
        self.inner.destroyed.lock().unwrap().clone()
    }

    /// Blueprint a live actor was spawned from
    pub fn actor_blueprint(&self, actor_id: ActorId) -> Option<String> {
        self.inner
            .actors
            .lock()
            .unwrap()
            .get(&actor_id)
            .map(|actor| actor.blueprint.clone())
    }

    /// Attributes a live sensor actor was spawned with
    pub fn actor_attributes(&self, actor_id: ActorId) -> Option<HashMap<String, String>> {
        self.inner
            .actors
            .lock()
            .unwrap()
            .get(&actor_id)
            .map(|actor| actor.attributes.clone())
    }

    /// Handle on the source handed out for `sensor_id`
    pub fn mock_sensor(&self, sensor_id: &str) -> Option<MockSensor> {
        self.inner.sensors.lock().unwrap().get(sensor_id).cloned()
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.inner.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn should_fail(&self, blueprint: &str) -> bool {
        self.inner
            .config
            .fail_blueprints
            .iter()
            .any(|b| b == blueprint)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ActorFactoryError::ConnectionFailed {
                message: "not connected".into(),
            })
        }
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self, timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let _ = timeout;
        if let Some(delay) = self.inner.config.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.config.fail_connect {
            return Err(ActorFactoryError::ConnectionFailed {
                message: format!("mock refused connection to {host}:{port}"),
            });
        }
        self.inner.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn server_version(&self) -> Option<String> {
        self.inner.config.server_version.clone()
    }

    fn map_name(&self) -> Result<String> {
        self.ensure_connected()?;
        Ok(self.inner.config.map_name.clone())
    }

    #[instrument(
        name = "mock_carla_spawn_vehicle",
        skip(self, transform),
        fields(blueprint = %blueprint, has_transform = transform.is_some())
    )]
    async fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
        autopilot: bool,
    ) -> Result<ActorId> {
        self.ensure_connected()?;

        if self.should_fail(blueprint) {
            return Err(ActorFactoryError::vehicle_spawn(blueprint, "mock failure"));
        }

        let actor_id = self.allocate_actor_id();
        self.inner.actors.lock().unwrap().insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                parent: None,
                attributes: HashMap::new(),
            },
        );
        debug!(actor_id, autopilot, "mock vehicle spawned");
        Ok(actor_id)
    }

    #[instrument(
        name = "mock_carla_spawn_sensor",
        skip(self, _transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        _transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        self.ensure_connected()?;

        let mut actors = self.inner.actors.lock().unwrap();
        if !actors.contains_key(&parent_id) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                format!("actor_{parent_id}"),
                "parent actor not found",
            ));
        }

        if self.should_fail(blueprint) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                format!("actor_{parent_id}"),
                "mock failure",
            ));
        }

        let actor_id = self.allocate_actor_id();
        actors.insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                parent: Some(parent_id),
                attributes: attributes.clone(),
            },
        );
        Ok(actor_id)
    }

    #[instrument(name = "mock_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.inner.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        // Idempotent: Ok even if the actor is gone
        if let Some(actor) = self.inner.actors.lock().unwrap().remove(&actor_id) {
            debug!(actor_id, parent = ?actor.parent, "mock actor destroyed");
            self.inner.destroyed.lock().unwrap().push(actor_id);
        }
        Ok(())
    }

    #[instrument(name = "mock_carla_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.inner.actors.lock().unwrap().contains_key(&actor_id))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: SensorId,
        sensor_type: SensorType,
    ) -> Option<Box<dyn SensorSource>> {
        let is_sensor = self
            .inner
            .actors
            .lock()
            .unwrap()
            .get(&actor_id)
            .is_some_and(|actor| actor.parent.is_some());
        if !is_sensor {
            return None;
        }

        let sensor = MockSensor::new(
            sensor_id.clone(),
            sensor_type,
            self.inner.config.sensor_mode.clone(),
        );
        self.inner
            .sensors
            .lock()
            .unwrap()
            .insert(sensor_id, sensor.clone());
        Some(Box::new(sensor))
    }
}
