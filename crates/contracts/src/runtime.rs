//! RuntimeGraph - actors spawned for one recording session

/// CARLA actor handle type
pub type ActorId = u32;

/// One spawned actor and the configuration id it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedActor {
    pub config_id: String,
    pub actor_id: ActorId,
}

/// Actors owned by a session, in spawn order.
///
/// Teardown walks it top-down: sensors first, then the vehicle they are
/// attached to.
#[derive(Debug, Clone, Default)]
pub struct RuntimeGraph {
    /// Ego vehicle, once spawned
    pub vehicle: Option<SpawnedActor>,

    /// Sensors attached to the vehicle
    pub sensors: Vec<SpawnedActor>,
}

impl RuntimeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_vehicle(&mut self, config_id: impl Into<String>, actor_id: ActorId) {
        self.vehicle = Some(SpawnedActor {
            config_id: config_id.into(),
            actor_id,
        });
    }

    pub fn register_sensor(&mut self, config_id: impl Into<String>, actor_id: ActorId) {
        self.sensors.push(SpawnedActor {
            config_id: config_id.into(),
            actor_id,
        });
    }

    /// Teardown order: sensors, then vehicle
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.sensors
            .iter()
            .chain(self.vehicle.iter())
            .map(|actor| actor.actor_id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicle.is_none() && self.sensors.is_empty()
    }

    /// Forget every actor, used once teardown has run
    pub fn clear(&mut self) {
        self.vehicle = None;
        self.sensors.clear();
    }
}
