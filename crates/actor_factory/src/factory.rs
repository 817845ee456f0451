//! ActorFactory core implementation
//!
//! Connects to the simulator, spawns the ego vehicle and its sensors, and
//! tears them down again.

use std::time::Duration;

use contracts::{ActorId, RuntimeGraph, SensorConfig, SensorSource, VehicleConfig};
use tracing::{error, info, instrument, warn};

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};

/// Actor Factory
///
/// Thin policy layer over a [`CarlaClient`]: timeouts, blueprint lookup,
/// error context and teardown ordering.
pub struct ActorFactory<C: CarlaClient> {
    client: C,
}

impl<C: CarlaClient> ActorFactory<C> {
    /// Create new ActorFactory
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Connect, failing with `ConnectionTimeout` if the server stays silent
    #[instrument(name = "actor_factory_connect", skip(self), fields(host = %host, port))]
    pub async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        info!(timeout_sec = timeout.as_secs_f64(), "connecting to CARLA");

        match tokio::time::timeout(timeout, self.client.connect(host, port, timeout)).await {
            Ok(Ok(())) => {
                info!(
                    server_version = self.client.server_version().as_deref().unwrap_or("unknown"),
                    "connected to CARLA"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ActorFactoryError::ConnectionTimeout {
                host: host.to_string(),
                port,
                timeout_sec: timeout.as_secs_f64(),
            }),
        }
    }

    /// Warn when the loaded map differs from the configured one
    pub fn check_map(&self, expected: Option<&str>) {
        let Some(expected) = expected else {
            return;
        };
        match self.client.map_name() {
            // CARLA reports "Carla/Maps/Town01" where configs say "Town01"
            Ok(actual) if actual == expected || actual.ends_with(&format!("/{expected}")) => {}
            Ok(actual) => warn!(
                expected,
                actual = %actual,
                "loaded map differs from configured map, recording anyway"
            ),
            Err(e) => warn!(error = %e, "could not query current map"),
        }
    }

    /// Spawn the ego vehicle
    #[instrument(
        name = "actor_factory_spawn_vehicle",
        skip(self, config),
        fields(vehicle_id = %config.id)
    )]
    pub async fn spawn_ego_vehicle(&self, config: &VehicleConfig) -> Result<ActorId> {
        info!(
            blueprint = %config.blueprint,
            autopilot = config.autopilot,
            "spawning vehicle"
        );
        let actor_id = self
            .client
            .spawn_vehicle(&config.blueprint, config.spawn_point, config.autopilot)
            .await
            .map_err(|e| ActorFactoryError::vehicle_spawn(config.id.clone(), e.to_string()))?;

        info!(actor_id, "vehicle spawned successfully");
        Ok(actor_id)
    }

    /// Spawn one sensor attached to the vehicle
    #[instrument(
        name = "actor_factory_spawn_sensor",
        skip(self, vehicle_id, sensor_config),
        fields(sensor_id = %sensor_config.id, vehicle_id = %vehicle_id)
    )]
    pub async fn spawn_sensor(
        &self,
        vehicle_actor_id: ActorId,
        vehicle_id: &str,
        sensor_config: &SensorConfig,
    ) -> Result<ActorId> {
        let blueprint = sensor_config.sensor_type.blueprint();
        info!(
            sensor_type = %sensor_config.sensor_type,
            blueprint,
            "spawning sensor"
        );

        self.client
            .spawn_sensor(
                blueprint,
                sensor_config.transform,
                vehicle_actor_id,
                &sensor_config.blueprint_attributes(),
            )
            .await
            .map_err(|e| {
                ActorFactoryError::sensor_spawn(
                    sensor_config.id.clone(),
                    vehicle_id,
                    e.to_string(),
                )
            })
            .inspect(|&actor_id| {
                info!(actor_id, "sensor spawned and attached successfully");
            })
    }

    /// Data source for a spawned sensor
    pub fn sensor_source(
        &self,
        actor_id: ActorId,
        sensor_config: &SensorConfig,
    ) -> Result<Box<dyn SensorSource>> {
        self.client
            .get_sensor_source(
                actor_id,
                sensor_config.id.as_str().into(),
                sensor_config.sensor_type.clone(),
            )
            .ok_or_else(|| ActorFactoryError::SensorSourceUnavailable {
                sensor_id: sensor_config.id.clone(),
                actor_id,
            })
    }

    /// Destroy all actors in the graph: sensors first, then the vehicle.
    ///
    /// Failures are logged and do not stop the rest of the teardown.
    /// Returns the number of actors that could not be destroyed.
    #[instrument(
        name = "actor_factory_teardown",
        skip(self, graph),
        fields(sensor_count = graph.sensors.len(), has_vehicle = graph.vehicle.is_some())
    )]
    pub async fn teardown(&self, graph: &RuntimeGraph) -> usize {
        info!("starting teardown");
        let mut failures = 0;

        for sensor in &graph.sensors {
            if !self.destroy_actor_safe(sensor.actor_id, &sensor.config_id).await {
                failures += 1;
            }
        }

        if let Some(vehicle) = &graph.vehicle {
            if !self
                .destroy_actor_safe(vehicle.actor_id, &vehicle.config_id)
                .await
            {
                failures += 1;
            }
        }

        info!(failures, "teardown completed");
        failures
    }

    /// Destroy actor, logging instead of propagating errors
    #[instrument(
        name = "actor_factory_destroy_actor",
        skip(self, config_id),
        fields(actor_id, config_id = %config_id)
    )]
    async fn destroy_actor_safe(&self, actor_id: ActorId, config_id: &str) -> bool {
        info!(actor_id, config_id, "destroying actor");

        match self.client.destroy_actor(actor_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    actor_id,
                    config_id,
                    error = %e,
                    "failed to destroy actor"
                );
                false
            }
        }
    }
}
