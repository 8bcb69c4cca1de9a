//! Headless locomotion demo.
//!
//! Builds a small humanoid rig with three layers (locomotion blend space,
//! masked upper-body wave, additive lean), drives its parameters for a few
//! seconds of simulated frames and prints state changes and events.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example locomotion
//! ```

use std::sync::Arc;

use anyhow::Context;
use bumpalo::Bump;
use marionette::glam::{Affine3A, Quat, Vec3};
use marionette::prelude::*;

const FRAME_DT: f32 = 1.0 / 60.0;

fn humanoid() -> anyhow::Result<Skeleton> {
    let mut skeleton = Skeleton::new("humanoid");
    let joints = [
        ("hips", None, Vec3::new(0.0, 1.0, 0.0)),
        ("spine", Some(0), Vec3::new(0.0, 0.3, 0.0)),
        ("arm_l", Some(1), Vec3::new(0.2, 0.2, 0.0)),
        ("hand_l", Some(2), Vec3::new(0.3, 0.0, 0.0)),
        ("leg_l", Some(0), Vec3::new(0.1, -0.5, 0.0)),
        ("leg_r", Some(0), Vec3::new(-0.1, -0.5, 0.0)),
    ];

    let mut bind = Vec::with_capacity(joints.len());
    for (name, parent, offset) in joints {
        let rest = JointTransform::from_translation(offset);
        let global: Affine3A = match parent {
            Some(p) => bind[p] * rest.to_affine(),
            None => rest.to_affine(),
        };
        bind.push(global);
        skeleton.add_joint(name, parent, rest, global.inverse())?;
    }
    Ok(skeleton)
}

fn swing(name: &str, joint: usize, angle: f32, duration: f32) -> Arc<AnimationClip> {
    let track = KeyframeTrack::new(
        vec![0.0, duration * 0.5, duration],
        vec![
            Quat::from_rotation_x(-angle),
            Quat::from_rotation_x(angle),
            Quat::from_rotation_x(-angle),
        ],
        InterpolationMode::Linear,
    );
    Arc::new(AnimationClip::new(name, vec![Channel::rotation(joint, track)]))
}

fn build_graph(skeleton: &Skeleton) -> anyhow::Result<GraphDefinition> {
    let arm = skeleton.find_joint("arm_l").context("rig has no left arm")?;
    let hips = skeleton.find_joint("hips").context("rig has no hips")?;
    let leg = skeleton.find_joint("leg_l").context("rig has no left leg")?;

    let mut def = GraphDefinition::new();
    let speed = def.add_float_parameter("speed", 0.0)?;
    let jump = def.add_trigger("jump")?;
    let waving = def.add_bool_parameter("waving", false)?;

    // Locomotion
    let base = def.add_layer("locomotion", BlendMode::Override, 1.0, None)?;
    let space = BlendSpace1D::new(speed)
        .with_entry(0.0, swing("idle", leg, 0.05, 2.0))?
        .with_entry(1.0, swing("walk", leg, 0.4, 1.0))?
        .with_entry(3.0, swing("run", leg, 0.9, 0.6))?;
    let moving = def.add_blend1d_state(base, "move", space, 1.0, true)?;
    let airborne = def.add_clip_state(base, "jump", swing("jump", leg, 0.2, 0.8), 1.0, false)?;
    def.set_events(
        base,
        airborne,
        vec![
            AnimationEvent::new(0.1, 1, "take_off"),
            AnimationEvent::new(0.7, 2, "land"),
        ],
    )?;

    let up = def.add_transition(base, moving, airborne, 0.1)?;
    def.add_condition(base, up, Condition::bool(jump, true))?;
    let down = def.add_transition(base, airborne, moving, 0.2)?;
    def.add_condition(base, down, Condition::predicate(|_| true))?;
    def.set_exit_time(base, down, 1.0)?;

    // Upper-body wave, masked to the arm
    let mask = Arc::new(BoneMask::from_joint(skeleton, arm, 1.0));
    let upper = def.add_layer("upper_body", BlendMode::Override, 1.0, Some(mask))?;
    let rest = def.add_clip_state(upper, "rest", swing("arm_rest", arm, 0.0, 1.0), 1.0, true)?;
    let wave = def.add_clip_state(upper, "wave", swing("wave", arm, 1.2, 0.5), 1.0, true)?;
    let start = def.add_transition(upper, rest, wave, 0.25)?;
    def.add_condition(upper, start, Condition::bool(waving, true))?;
    let stop = def.add_transition(upper, wave, rest, 0.25)?;
    def.add_condition(upper, stop, Condition::bool(waving, false))?;

    // Additive lean on the hips
    let lean = def.add_layer("lean", BlendMode::Additive, 0.5, None)?;
    def.add_clip_state(lean, "lean", swing("lean", hips, 0.1, 1.5), 1.0, true)?;

    Ok(def)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let skeleton = Arc::new(humanoid()?);
    let definition = Arc::new(build_graph(&skeleton)?);
    let mut instance = GraphInstance::try_new(Arc::clone(&definition), Arc::clone(&skeleton))?;
    instance.set_event_callback(|id, name| println!("  event #{id}: {name}"));

    let mut arena = Bump::with_capacity(instance.scratch_bytes_per_update());
    let base = definition.find_layer("locomotion").context("missing base layer")?;
    let mut last_state = instance.current_state(base);

    for frame in 0..300_u32 {
        let seconds = frame as f32 * FRAME_DT;
        instance.set_float_by_name("speed", (seconds * 0.75).min(3.0));
        instance.set_bool_by_name("waving", (1.0..2.5).contains(&seconds));
        if frame == 150 {
            instance.set_trigger_by_name("jump");
        }

        arena.reset();
        instance.update(FRAME_DT, &arena);

        let state = instance.current_state(base);
        if state != last_state {
            let name = state
                .and_then(|s| definition.layer(base)?.states.get(s))
                .map_or("?", |s| s.name.as_str());
            println!("[{seconds:5.2}s] locomotion -> {name}");
            last_state = state;
        }
    }

    let hand = skeleton.find_joint("hand_l").context("rig has no left hand")?;
    println!("final hand skinning matrix:\n{}", instance.joint_matrices()[hand]);
    println!(
        "{} bytes of joint matrices ready for upload",
        instance.joint_matrix_bytes().len()
    );
    Ok(())
}
