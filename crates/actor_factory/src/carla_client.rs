//! `CarlaClient` on top of the `carla` crate (`real-carla` only)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carla::client::{ActorBase, Client, Sensor, Vehicle, World};
use carla::geom::{Location, Rotation, Transform as CarlaTransform};
use contracts::{ActorId, SensorId, SensorSource, SensorType, Transform};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};

/// Live simulator session, present once `connect` succeeded
struct Connection {
    // Keeps the RPC client alive for as long as the world handle
    _client: Client,
    world: World,
    server_version: Option<String>,
}

/// Actors spawned through this client, kept for sensor lookup and teardown
#[derive(Clone)]
enum Spawned {
    Vehicle(Vehicle),
    Sensor(Sensor),
}

/// Client for a running CARLA server.
///
/// Cloning shares the connection and the actor registry.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    connection: Arc<Mutex<Option<Connection>>>,
    spawned: Arc<Mutex<HashMap<ActorId, Spawned>>>,
}

impl RealCarlaClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_world<R>(&self, f: impl FnOnce(&mut World) -> Result<R>) -> Result<R> {
        let mut guard = self.connection.lock().unwrap();
        let connection = guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::ConnectionFailed {
                message: "not connected to CARLA server".into(),
            })?;
        f(&mut connection.world)
    }

    fn spawned_vehicle(&self, actor_id: ActorId) -> Option<Vehicle> {
        match self.spawned.lock().unwrap().get(&actor_id) {
            Some(Spawned::Vehicle(vehicle)) => Some(vehicle.clone()),
            _ => None,
        }
    }

    fn spawned_sensor(&self, actor_id: ActorId) -> Option<Sensor> {
        match self.spawned.lock().unwrap().get(&actor_id) {
            Some(Spawned::Sensor(sensor)) => Some(sensor.clone()),
            _ => None,
        }
    }

    fn register(&self, actor_id: ActorId, actor: Spawned) {
        self.spawned.lock().unwrap().insert(actor_id, actor);
    }
}

fn carla_transform(transform: Transform) -> CarlaTransform {
    CarlaTransform {
        location: Location {
            x: transform.location.x as f32,
            y: transform.location.y as f32,
            z: transform.location.z as f32,
        },
        rotation: Rotation {
            pitch: transform.rotation.pitch as f32,
            yaw: transform.rotation.yaw as f32,
            roll: transform.rotation.roll as f32,
        },
    }
}

/// Configured pose, else the map's first recommended spawn point, else the origin
fn vehicle_pose(world: &mut World, blueprint: &str, spawn_point: Option<Transform>) -> CarlaTransform {
    if let Some(pose) = spawn_point {
        return carla_transform(pose);
    }
    let recommended = world.map().recommended_spawn_points().get(0).cloned();
    match recommended {
        Some(pose) => {
            info!(vehicle_blueprint = blueprint, location = ?pose.location, "using recommended spawn point");
            pose
        }
        None => {
            warn!(vehicle_blueprint = blueprint, "map offers no spawn points, using origin");
            carla_transform(Transform::default())
        }
    }
}

fn spawn_vehicle_in(
    world: &mut World,
    blueprint: &str,
    spawn_point: Option<Transform>,
) -> Result<Vehicle> {
    let fail = |message: String| ActorFactoryError::vehicle_spawn(blueprint, message);

    let vehicle_bp = world
        .blueprint_library()
        .find(blueprint)
        .ok_or_else(|| fail(format!("blueprint '{blueprint}' not found")))?;
    let pose = vehicle_pose(world, blueprint, spawn_point);
    let actor = world
        .spawn_actor(&vehicle_bp, &pose)
        .map_err(|e| fail(e.to_string()))?;
    Vehicle::try_from(actor).map_err(|_| fail("spawned actor is not a vehicle".into()))
}

fn spawn_sensor_in(
    world: &mut World,
    blueprint: &str,
    mount: Transform,
    parent: &Vehicle,
    parent_id: ActorId,
    attributes: &HashMap<String, String>,
) -> Result<Sensor> {
    let parent_name = format!("actor_{parent_id}");
    let fail = |message: String| ActorFactoryError::sensor_spawn(blueprint, &parent_name, message);

    let mut sensor_bp = world
        .blueprint_library()
        .find(blueprint)
        .ok_or_else(|| fail(format!("blueprint '{blueprint}' not found")))?;
    for (key, value) in attributes {
        if !sensor_bp.set_attribute(key, value) {
            warn!(blueprint, key, value, "blueprint rejected attribute");
        }
    }

    let actor = world
        .spawn_actor_attached(&sensor_bp, &carla_transform(mount), parent, None)
        .map_err(|e| fail(e.to_string()))?;
    Sensor::try_from(actor).map_err(|_| fail("spawned actor is not a sensor".into()))
}

impl CarlaClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self, timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let endpoint = host.to_string();
        // Blocking RPC; off the runtime so the factory's timeout can fire
        let (client, world) = tokio::task::spawn_blocking(move || {
            let mut client = Client::connect(&endpoint, port, None);
            client.set_timeout(timeout);
            let world = client.world();
            (client, world)
        })
        .await
        .map_err(|e| ActorFactoryError::ConnectionFailed {
            message: format!("connection to {host}:{port} aborted: {e}"),
        })?;

        let version = client.server_version();
        info!(map = %world.map().name(), server_version = %version, "connected to CARLA server");

        *self.connection.lock().unwrap() = Some(Connection {
            _client: client,
            world,
            server_version: (!version.is_empty()).then_some(version),
        });
        Ok(())
    }

    fn server_version(&self) -> Option<String> {
        self.connection
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|c| c.server_version.clone())
    }

    fn map_name(&self) -> Result<String> {
        self.with_world(|world| Ok(world.map().name().to_string()))
    }

    #[instrument(
        name = "real_carla_spawn_vehicle",
        skip(self, transform),
        fields(blueprint = %blueprint)
    )]
    async fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
        autopilot: bool,
    ) -> Result<ActorId> {
        let vehicle = self.with_world(|world| spawn_vehicle_in(world, blueprint, transform))?;
        let actor_id = vehicle.id();
        if autopilot {
            vehicle.set_autopilot(true);
        }
        debug!(actor_id, autopilot, "vehicle spawned");
        self.register(actor_id, Spawned::Vehicle(vehicle));
        Ok(actor_id)
    }

    #[instrument(
        name = "real_carla_spawn_sensor",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        let parent = self.spawned_vehicle(parent_id).ok_or_else(|| {
            ActorFactoryError::sensor_spawn(
                blueprint,
                format!("actor_{parent_id}"),
                "parent vehicle not found",
            )
        })?;
        let sensor = self.with_world(|world| {
            spawn_sensor_in(world, blueprint, transform, &parent, parent_id, attributes)
        })?;

        let actor_id = sensor.id();
        debug!(actor_id, "sensor spawned and attached");
        self.register(actor_id, Spawned::Sensor(sensor));
        Ok(actor_id)
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let Some(actor) = self.spawned.lock().unwrap().remove(&actor_id) else {
            return Ok(());
        };
        let destroyed = match actor {
            Spawned::Vehicle(vehicle) => vehicle.destroy(),
            Spawned::Sensor(sensor) => {
                if sensor.is_listening() {
                    sensor.stop();
                }
                sensor.destroy()
            }
        };
        if !destroyed {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "server refused destroy".into(),
            });
        }
        debug!(actor_id, "actor destroyed");
        Ok(())
    }

    #[instrument(name = "real_carla_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.spawned.lock().unwrap().contains_key(&actor_id))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: SensorId,
        sensor_type: SensorType,
    ) -> Option<Box<dyn SensorSource>> {
        let sensor = self.spawned_sensor(actor_id)?;
        Some(Box::new(CarlaSensorSource::new(sensor_id, sensor_type, sensor)))
    }
}
