#[cfg(feature = "tracy")]
#[global_allocator]
static GLOBAL: tracy_client::ProfiledAllocator<std::alloc::System> =
    tracy_client::ProfiledAllocator::new(std::alloc::System, 100);

use bumper::{BodyKey, Entity, Group, GroupKey, PhysicsWorld, Rect, Vec2, WorldConfig};

const TICKS_PER_SECOND: u32 = 60;
const DT: f64 = 1.0 / TICKS_PER_SECOND as f64;
const NANOS_PER_TICK: u128 = 1_000_000_000 / TICKS_PER_SECOND as u128;
// limit the accumulator to prevent spiral of death
const MAX_ACC_VALUE: u128 = 1_000_000_000 / 8;
const SIM_TICKS: u32 = 720;

// Frame times a host might actually deliver: mostly vsync,
// the occasional long stall that forces the loop to catch up.
const FRAME_NANOS: [u128; 8] = [
    16_666_667,
    16_666_667,
    16_666_667,
    33_333_333,
    16_666_667,
    8_333_333,
    125_000_000,
    16_666_667,
];

//
// Scene
//

struct Scene {
    player: BodyKey,
    ground: BodyKey,
    platform: BodyKey,
    ball: BodyKey,
    crates: GroupKey,
}

#[derive(Default)]
struct Stats {
    riding_ticks: u32,
    ball_crate_hits: u32,
}

fn spawn(world: &mut PhysicsWorld, position: Vec2, size: Vec2) -> BodyKey {
    let entity = world.entity_set.insert_entity(Entity::new(position, size));
    world
        .entity_set
        .attach_body(entity)
        .expect("entity was just inserted")
}

fn build_scene(world: &mut PhysicsWorld) -> Scene {
    let ground = spawn(world, Vec2::new(0.0, 568.0), Vec2::new(800.0, 32.0));
    if let Some(body) = world.entity_set.get_body_mut(ground) {
        body.immovable = true;
        body.moves = false;
        body.allow_gravity = false;
    }

    // patrols horizontally; riders are carried by friction
    let platform = spawn(world, Vec2::new(480.0, 480.0), Vec2::new(128.0, 16.0));
    if let Some(body) = world.entity_set.get_body_mut(platform) {
        body.immovable = true;
        body.allow_gravity = false;
        body.velocity.x = 60.0;
    }

    let player = spawn(world, Vec2::new(500.0, 300.0), Vec2::new(32.0, 48.0));
    if let Some(body) = world.entity_set.get_body_mut(player) {
        body.bounce.y = 0.15;
        body.collide_world_bounds = true;
    }

    let ball = spawn(world, Vec2::new(40.0, 500.0), Vec2::new(24.0, 24.0));
    if let Some(body) = world.entity_set.get_body_mut(ball) {
        body.bounce = Vec2::new(0.85, 0.85);
        body.velocity.x = 220.0;
        body.collide_world_bounds = true;
    }

    let mut crates = Group::new();
    for row in 0..3 {
        let key = spawn(
            world,
            Vec2::new(150.0, 420.0 - 40.0 * row as f64),
            Vec2::new(32.0, 32.0),
        );
        if let Some(body) = world.entity_set.get_body_mut(key) {
            body.bounce = Vec2::new(0.2, 0.1);
            body.mass = 2.0;
        }
        crates.add(key);
    }
    let crates = world.entity_set.insert_group(crates);

    Scene {
        player,
        ground,
        platform,
        ball,
        crates,
    }
}

//
// Simulation
//

fn tick(world: &mut PhysicsWorld, scene: &Scene, stats: &mut Stats, ticks: u32) {
    // turn the platform around at the ends of its patrol
    if let Some(body) = world.entity_set.get_body_mut(scene.platform) {
        if body.position.x <= 420.0 {
            body.velocity.x = 60.0;
        } else if body.right() >= 640.0 {
            body.velocity.x = -60.0;
        }
    }

    // hop every four seconds while standing on something
    if ticks % 240 == 239 {
        if let Some(body) = world.entity_set.get_body_mut(scene.player) {
            if body.touching.down {
                body.velocity.y = -380.0;
            }
        }
    }

    // relaunch the ball halfway through the run
    if ticks == 360 {
        world.reset_body(scene.ball, Vec2::new(40.0, 120.0));
        if let Some(body) = world.entity_set.get_body_mut(scene.ball) {
            body.velocity = Vec2::new(240.0, 0.0);
        }
    }

    world.pre_update(DT);

    let mut riding = false;
    world.collide_with(
        scene.player,
        scene.platform,
        |_| riding = true,
        |_, _| true,
    );
    if riding {
        stats.riding_ticks += 1;
    }
    world.collide(scene.crates, scene.crates);
    world.collide(scene.crates, scene.ground);
    if world.collide(scene.ball, scene.crates) {
        stats.ball_crate_hits += 1;
    }
    world.collide(scene.ball, scene.ground);
    world.collide(scene.player, scene.ground);

    world.post_update();
}

fn print_state(world: &PhysicsWorld, scene: &Scene, ticks: u32) {
    let player = world.entity_set.get_body(scene.player);
    let platform = world.entity_set.get_body(scene.platform);
    let ball = world.entity_set.get_body(scene.ball);
    let (Some(player), Some(platform), Some(ball)) = (player, platform, ball) else {
        return;
    };
    println!(
        "t {:4.1}s  player ({:6.1}, {:6.1}) grounded {:5}  platform x {:6.1}  ball ({:6.1}, {:6.1})",
        f64::from(ticks) * DT,
        player.position.x,
        player.position.y,
        player.touching.down,
        platform.position.x,
        ball.position.x,
        ball.position.y,
    );
}

fn main() {
    let config = WorldConfig {
        bounds: Rect::new(0.0, 0.0, 800.0, 600.0),
        gravity: Vec2::new(0.0, 1000.0),
        ..WorldConfig::default()
    };
    let mut world = PhysicsWorld::new(config).expect("demo config is valid");
    let scene = build_scene(&mut world);
    let mut stats = Stats::default();

    // Fixed-timestep catch-up loop: frames feed an accumulator and the
    // physics always steps at the same dt no matter how frames arrive.
    let mut acc: u128 = 0;
    let mut ticks: u32 = 0;
    let mut frame: usize = 0;
    while ticks < SIM_TICKS {
        acc += FRAME_NANOS[frame % FRAME_NANOS.len()];
        frame += 1;
        if acc > MAX_ACC_VALUE {
            acc = MAX_ACC_VALUE;
        }
        while acc >= NANOS_PER_TICK && ticks < SIM_TICKS {
            tick(&mut world, &scene, &mut stats, ticks);
            ticks += 1;
            if ticks % 60 == 0 {
                print_state(&world, &scene, ticks);
            }
            acc -= NANOS_PER_TICK;
        }
    }

    println!(
        "rode the platform for {:.1}s, ball hit the crates {} times over {} frames",
        f64::from(stats.riding_ticks) * DT,
        stats.ball_crate_hits,
        frame,
    );
}
