//! Keel Runtime
//!
//! Minimal driver binary: registers a "spark" component type whose instances
//! spin for a fixed number of ticks and then delete themselves, spawns a
//! wave of them, and runs fixed-rate ticks until the collection drains.

use anyhow::{Context, Result};
use keel_object::gameobject::prototype;
use keel_object::gameobject::{
    Collection, ComponentError, ComponentRegistry, ComponentType, InstanceId,
};
use keel_object::glam::{Quat, Vec3};
use keel_object::math::DeterministicRng;
use keel_object::time::{SimulationTime, UpdateContext};
use keel_resource::{Factory, ResourceCreateError};
use serde::Deserialize;
use std::any::Any;
use std::rc::Rc;

/// Payload of a `.spark` resource.
#[derive(Debug, Clone, Deserialize)]
struct SparkResource {
    lifetime_ticks: u32,
    #[serde(default)]
    spin_degrees_per_sec: f32,
}

/// Per-instance component state.
struct SparkInstance {
    id: InstanceId,
}

/// Per-collection component world: every live spark and its remaining fuse.
#[derive(Default)]
struct SparkWorld {
    sparks: Vec<(InstanceId, u32, f32)>,
}

fn register_spark_resource(factory: &mut Factory) -> Result<()> {
    factory.register_type(
        "spark",
        Box::new(|bytes| {
            let resource: SparkResource = serde_json::from_slice(bytes)
                .map_err(|e| ResourceCreateError::new(format!("invalid spark resource: {e}")))?;
            Ok(Rc::new(resource) as Rc<dyn Any>)
        }),
        None,
    )?;
    Ok(())
}

fn spark_component(tag: keel_resource::ResourceTypeId) -> ComponentType {
    ComponentType::new("spark", tag)
        .with_world(|| Box::new(SparkWorld::default()) as Box<dyn Any>)
        .with_create(|id, resource, world| {
            let resource = resource
                .get::<SparkResource>()
                .ok_or_else(|| ComponentError::new("spark resource payload missing"))?;
            let mut world = world
                .and_then(|w| w.borrow_mut::<SparkWorld>())
                .ok_or_else(|| ComponentError::new("spark world missing"))?;
            world
                .sparks
                .push((id, resource.lifetime_ticks, resource.spin_degrees_per_sec));
            Ok(Box::new(SparkInstance { id }) as Box<dyn Any>)
        })
        .with_destroy(|data, world| {
            let Some(mut world) = world.and_then(|w| w.borrow_mut::<SparkWorld>()) else {
                return;
            };
            if let Ok(spark) = data.downcast::<SparkInstance>() {
                world.sparks.retain(|(id, _, _)| *id != spark.id);
            }
        })
        .with_update(|collection, context, world| {
            let mut expired = Vec::new();
            {
                let mut world = world
                    .and_then(|w| w.borrow_mut::<SparkWorld>())
                    .ok_or_else(|| ComponentError::new("spark world missing"))?;
                for (id, remaining, spin) in &mut world.sparks {
                    if let Some(rotation) = collection.rotation(*id) {
                        let step = Quat::from_rotation_y(spin.to_radians() * context.dt);
                        collection.set_rotation(*id, step * rotation);
                    }
                    if *remaining == 0 {
                        expired.push(*id);
                    } else {
                        *remaining -= 1;
                    }
                }
            }
            for id in expired {
                collection.delete(id);
            }
            Ok(())
        })
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Keel v{}", keel_object::VERSION);

    let mut factory = Factory::new(64);
    prototype::register_resource_types(&mut factory)?;
    register_spark_resource(&mut factory)?;
    let spark_tag = factory
        .get_type_from_extension("spark")
        .context("spark resource type not registered")?;
    factory.insert_source(
        "spark.object",
        br#"{"components": ["fuse.spark"]}"#.to_vec(),
    );
    factory.insert_source(
        "fuse.spark",
        br#"{"lifetime_ticks": 45, "spin_degrees_per_sec": 180.0}"#.to_vec(),
    );

    let mut registry = ComponentRegistry::new();
    registry.register(spark_component(spark_tag))?;

    let mut collection = Collection::new(Rc::new(factory), Rc::new(registry), 256);
    let mut rng = DeterministicRng::new(0x4B33_4C21);
    for i in 0..8 {
        let id = collection.spawn("spark.object")?;
        let height = rng.next_f32() * 4.0;
        collection.set_position(id, Vec3::new(i as f32 * 2.0, height, 0.0));
    }
    tracing::info!(live = collection.live_count(), "sparks ignited");

    let mut time = SimulationTime::new();
    let context = UpdateContext::fixed();
    while collection.live_count() > 0 {
        collection.update(&context)?;
        collection.post_update()?;
        time.advance_tick();
        if time.tick_count() % 15 == 0 {
            tracing::info!(
                tick = time.tick_count(),
                live = collection.live_count(),
                "tick"
            );
        }
    }
    tracing::info!(
        ticks = time.tick_count(),
        elapsed_ms = time.total_time().as_millis() as u64,
        "all sparks burned out"
    );
    Ok(())
}
