use bevy::prelude::*;
use bevy::math::primitives::{Sphere, Cuboid};

use crate::output::archive::LoadedArchive;
use crate::simulation::states::{ParticleKind, Snapshot};

/// Component tagging each sphere with its particle index into the snapshots
#[derive(Component)]
struct ParticleIndex(pub usize);

/// Half-width of the visible cube in world units
const VIEW_EXTENT: f32 = 500.0;

/// Distance of the camera from the origin along +Z
const CAMERA_DISTANCE: f32 = 1500.0;

/// Seconds per snapshot frame (25 fps)
const FRAME_SECONDS: f32 = 0.04;

/// Bevy resource holding the archive being played back
#[derive(Resource)]
struct Playback {
    snapshots: Vec<Snapshot>,
    kinds: Vec<ParticleKind>,
    frame: usize,
    scale: f32, // world units per meter
}

/// Open a window and loop through the archive's snapshots
pub fn run_playback(archive: LoadedArchive) {
    println!(
        "run_playback: {} snapshots of {} particles",
        archive.snapshots.len(),
        archive.particle_count
    );

    // Fit the first frame into the view
    let max_abs = archive
        .snapshots
        .first()
        .map(|s| s.positions().iter().map(|p| p.amax()).fold(0.0_f64, f64::max))
        .unwrap_or(1.0);
    let scale = if max_abs > 0.0 { VIEW_EXTENT / max_abs as f32 } else { 1.0 };

    App::new()
        .insert_resource(Playback {
            snapshots: archive.snapshots,
            kinds: archive.kinds,
            frame: 0,
            scale,
        })
        .add_plugins(DefaultPlugins)
        .add_systems(Startup, setup_playback)
        .add_systems(Update, (advance_frame, sync_transforms).chain())
        .run();
}

/// Startup system: spawn camera, light, axes and one sphere per particle
fn setup_playback(mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    playback: Res<Playback>,
) {
    commands.spawn(Camera3dBundle {
        camera: Camera {
            clear_color: ClearColorConfig::Custom(Color::srgb(0.0, 0.0, 0.0)), // pure black
            ..Default::default()
        },
        transform: Transform::from_xyz(200.0, 150.0, CAMERA_DISTANCE)
            .looking_at(Vec3::ZERO, Vec3::Y),
        ..Default::default()
    });

    commands.spawn(PointLightBundle {
        point_light: PointLight {
            intensity: 1500.0,
            range: 1000.0,
            ..Default::default()
        },
        transform: Transform::from_xyz(100.0, 100.0, CAMERA_DISTANCE),
        ..Default::default()
    });

    spawn_axes(&mut commands, &mut meshes, &mut materials);

    let Some(first) = playback.snapshots.first() else {
        return;
    };

    // One mesh and one material per kind, shared by every sphere
    let mesh = meshes.add(Sphere::new(1.5).mesh());
    let star = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.84, 0.0), // gold
        unlit: true,
        ..Default::default()
    });
    let dark_matter = materials.add(StandardMaterial {
        base_color: Color::srgba(0.0, 1.0, 1.0, 0.2), // faint cyan
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..Default::default()
    });
    let body = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 1.0, 1.0), // white
        unlit: true,
        ..Default::default()
    });

    for (i, p) in first.positions().iter().enumerate() {
        let material = match playback.kinds.get(i).copied().unwrap_or_default() {
            ParticleKind::Star => star.clone(),
            ParticleKind::DarkMatter => dark_matter.clone(),
            ParticleKind::Body => body.clone(),
        };

        commands.spawn((
            PbrBundle {
                mesh: mesh.clone(),
                material,
                transform: Transform::from_xyz(
                    p.x as f32 * playback.scale,
                    p.y as f32 * playback.scale,
                    p.z as f32 * playback.scale,
                ),
                ..Default::default()
            },
            ParticleIndex(i),
        ));
    }
}

/// Step to the next snapshot every FRAME_SECONDS, looping at the end
fn advance_frame(time: Res<Time>, mut playback: ResMut<Playback>, mut elapsed: Local<f32>) {
    if playback.snapshots.is_empty() {
        return;
    }
    *elapsed += time.delta_seconds();
    while *elapsed >= FRAME_SECONDS {
        *elapsed -= FRAME_SECONDS;
        playback.frame = (playback.frame + 1) % playback.snapshots.len();
    }
}

fn sync_transforms(playback: Res<Playback>, mut query: Query<(&ParticleIndex, &mut Transform)>) {
    let Some(snapshot) = playback.snapshots.get(playback.frame) else {
        return;
    };
    let positions = snapshot.positions();

    for (ParticleIndex(i), mut transform) in &mut query {
        if let Some(p) = positions.get(*i) {
            transform.translation = Vec3::new(
                p.x as f32 * playback.scale,
                p.y as f32 * playback.scale,
                p.z as f32 * playback.scale,
            );
        }
    }
}

// =========================================================================================
// Draw 3D axes for visual reference
// =========================================================================================

fn spawn_axes(commands: &mut Commands, meshes: &mut Assets<Mesh>, materials: &mut Assets<StandardMaterial>) {
    let axis_len = 2.0 * VIEW_EXTENT;
    let axis_thickness = 0.5;

    let axes = [
        (Vec3::new(axis_len, axis_thickness, axis_thickness), Color::srgb(1.0, 0.0, 0.0)), // X: red
        (Vec3::new(axis_thickness, axis_len, axis_thickness), Color::srgb(0.0, 1.0, 0.0)), // Y: green
        (Vec3::new(axis_thickness, axis_thickness, axis_len), Color::srgb(0.0, 0.0, 1.0)), // Z: blue
    ];

    for (size, color) in axes {
        commands.spawn(PbrBundle {
            mesh: meshes.add(Cuboid::new(size.x, size.y, size.z).mesh()),
            material: materials.add(StandardMaterial {
                base_color: color,
                unlit: true,
                ..Default::default()
            }),
            // Cuboid is centered at its transform origin, so this puts it crossing the world origin
            transform: Transform::from_xyz(0.0, 0.0, 0.0),
            ..Default::default()
        });
    }
}
