use clap::Parser;
use glam::{Vec3A, Vec4};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

mod cli;
mod logger;

use cli::Args;
use logger::init_logger;

use octray::camera::Camera;
use octray::entity::{BoxEntity, Entity, SphereEntity};
use octray::exposure::ExposureBuffer;
use octray::index::{GrowthBudget, SceneIndex};
use octray::material::{StaticMaterial, Substance};
use octray::output::{save_exr, save_png, send_to_tev};
use octray::random;
use octray::sky::GradientSky;
use octray::space::Cube;
use octray::texture::{CheckerTexture, SolidTexture, Texture};
use octray::tracer::Tracer;

/// Growth budget used for every demo entity.
const BUDGET: GrowthBudget = GrowthBudget {
    max_in_depth: 12,
    max_out_depth: 8,
};

fn add(scene: &mut SceneIndex, entity: Box<dyn Entity>) {
    if let Err(e) = scene.add_entity(entity, BUDGET) {
        warn!("Skipping entity that escapes the scene: {e}");
    }
}

fn solid(color: Vec3A) -> Box<dyn Texture> {
    Box::new(SolidTexture::rgb(color.x, color.y, color.z))
}

/// Build the demonstration scene: a checkered mirror floor, a grid of
/// small random spheres, three feature entities, and a sun that forces
/// the octree to grow past its initial root.
fn create_scene() -> SceneIndex {
    let mut scene = SceneIndex::new(Cube::new(Vec3A::splat(-8.0), 16.0));

    // Checkered, slightly rough mirror floor.
    add(
        &mut scene,
        Box::new(BoxEntity::new(
            Vec3A::new(0.0, -3.0, 0.0),
            8.0,
            Box::new(StaticMaterial::brushed_mirror(0.3)),
            Box::new(CheckerTexture::new(
                Vec4::new(0.9, 0.9, 0.9, 1.0),
                Vec4::new(0.35, 0.45, 0.55, 1.0),
                16.0,
            )),
            Substance::AIR,
        )),
    );

    // Grid of small spheres with randomized looks.
    for a in -3..3 {
        for b in -3..3 {
            let center = Vec3A::new(
                a as f32 * 1.4 + 0.8 * random::random_f32(),
                1.3,
                b as f32 * 1.4 + 0.8 * random::random_f32(),
            );
            let choice = random::random_f32();
            let entity: Box<dyn Entity> = if choice < 0.5 {
                Box::new(SphereEntity::new(
                    center,
                    0.6,
                    Box::new(StaticMaterial::brushed_mirror(random::random_f32() * 0.5)),
                    solid(random::random_color_range(0.5, 1.0)),
                    Substance::AIR,
                ))
            } else if choice < 0.8 {
                Box::new(SphereEntity::new(
                    center,
                    0.6,
                    Box::new(StaticMaterial::glass()),
                    solid(Vec3A::ONE),
                    Substance::new(1.5),
                ))
            } else {
                Box::new(SphereEntity::new(
                    center,
                    0.6,
                    Box::new(StaticMaterial::light()),
                    solid(random::random_color() * 0.5 + Vec3A::splat(0.5)),
                    Substance::AIR,
                ))
            };
            add(&mut scene, entity);
        }
    }

    // Three large feature entities.
    add(
        &mut scene,
        Box::new(SphereEntity::new(
            Vec3A::new(0.0, 2.0, 0.0),
            2.0,
            Box::new(StaticMaterial::glass()),
            solid(Vec3A::ONE),
            Substance::new(1.5),
        )),
    );
    add(
        &mut scene,
        Box::new(SphereEntity::new(
            Vec3A::new(4.0, 2.0, 0.0),
            2.0,
            Box::new(StaticMaterial::mirror()),
            solid(Vec3A::new(0.9, 0.85, 0.7)),
            Substance::AIR,
        )),
    );
    add(
        &mut scene,
        Box::new(BoxEntity::new(
            Vec3A::new(-4.0, 1.75, 2.5),
            1.5,
            Box::new(StaticMaterial::light()),
            solid(Vec3A::new(1.0, 0.85, 0.6)),
            Substance::AIR,
        )),
    );

    // Sun, well outside the initial root: exercises outside growth.
    add(
        &mut scene,
        Box::new(SphereEntity::new(
            Vec3A::new(0.0, 30.0, 0.0),
            10.0,
            Box::new(StaticMaterial::light()),
            solid(Vec3A::new(1.0, 0.95, 0.85)),
            Substance::AIR,
        )),
    );

    scene
}

fn main() {
    let args = Args::parse();

    init_logger(args.debug_level.into());

    // Log application startup with version information
    info!("octray - Git Version {} ({})", env!("GIT_HASH"), env!("GIT_DATE"));
    info!(
        "Image resolution: {}x{}, frames: {}, bounces: {}",
        args.width, args.height, args.frames, args.bounces
    );

    let scene = create_scene();
    info!(
        "Scene indexed: {} entities across {} octree nodes",
        scene.entity_count(),
        scene.tree().node_count()
    );

    let mut tracer = Tracer::new(scene, Box::new(GradientSky::default()));
    tracer.refmax = args.bounces;
    tracer.attenuation = args.attenuation;

    let mut camera = Camera::new();
    camera.image_width = args.width;
    camera.image_height = args.height;
    camera.vfov = 30.0;
    camera.lookfrom = Vec3A::new(9.0, 4.0, 9.0);
    camera.lookat = Vec3A::new(0.0, 1.5, 0.0);
    camera.vup = Vec3A::new(0.0, 1.0, 0.0);
    camera.focus_dist = 10.0;
    if args.yaw != 0.0 {
        camera.turn(args.yaw.to_radians());
    }

    let mut exposure = ExposureBuffer::new(args.width, args.height);
    let should_send_to_tev = args.tev || args.tev_address.is_some();
    let tev_address = args.tev_address.as_deref().unwrap_or("localhost:14158");

    info!("Rendering on {} CPU cores...", rayon::current_num_threads());
    let generation_start = std::time::Instant::now();
    let pb = ProgressBar::new(args.frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} ETA: {eta}")
            .unwrap(),
    );

    for _frame in 0..args.frames {
        tracer.trace_frame(&camera, &mut exposure);
        if should_send_to_tev {
            send_to_tev(&exposure, tev_address);
        }
        pb.inc(1);
    }
    pb.finish();
    info!("Rendered in {:.2?}", generation_start.elapsed());

    if args.output.ends_with(".exr") {
        save_exr(&exposure, &args.output);
    } else if args.output.ends_with(".png") {
        save_png(&exposure, &args.output);
    } else {
        log::error!(
            "Unsupported file extension '{}'. Only .png and .exr formats are supported.",
            std::path::Path::new(&args.output)
                .extension()
                .unwrap_or_default()
                .to_string_lossy()
        );
        std::process::exit(1);
    }
}
