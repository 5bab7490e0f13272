// Run the annotation loop against the synthetic camera and save snapshots

use glimpse_lib::core::annotation_loop::AnnotationLoop;
use glimpse_lib::core::config::AnnotationConfig;
use glimpse_lib::core::detector::MotionRegionDetector;
use glimpse_lib::core::surface::ImageSurface;
use glimpse_lib::platform::capture::SyntheticCamera;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    glimpse_lib::init_logging();

    println!("=== Glimpse Camera Simulation ===\n");

    let config = AnnotationConfig::default();
    let camera = SyntheticCamera::new().with_warmup(2);
    let annotation = AnnotationLoop::new(Arc::new(camera.clone()), ImageSurface::new(), config);

    // Step 1: start streaming
    println!("Step 1: Starting camera...");
    if let Err(e) = annotation.start().await {
        println!("✗ {}", e.user_message());
        return;
    }
    println!(
        "✓ Camera streaming at {} FPS",
        annotation.config().await.target_fps
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    print_status(&annotation).await;
    save_snapshot(&annotation, "glimpse_obscured.png").await;

    // Step 2: obscuring off
    println!("\nStep 2: Turning blur off...");
    annotation.toggle_obscure(false).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    print_status(&annotation).await;
    save_snapshot(&annotation, "glimpse_raw.png").await;

    // Step 3: a second start must be refused while streaming
    println!("\nStep 3: Starting again while streaming...");
    match annotation.start().await {
        Ok(()) => println!("✗ Second start unexpectedly succeeded"),
        Err(e) => println!("✓ Rejected: {}", e),
    }

    // Step 4: stop and confirm the device was released
    println!("\nStep 4: Stopping camera...");
    annotation.stop().await;
    print_status(&annotation).await;
    println!(
        "  Device acquisitions: {}, releases: {}, in use: {}",
        camera.acquisitions(),
        camera.releases(),
        camera.is_in_use()
    );

    // Step 5: a denied device leaves the loop idle
    println!("\nStep 5: Starting with camera permission denied...");
    let denied = AnnotationLoop::new(
        Arc::new(SyntheticCamera::denied("user dismissed the prompt")),
        ImageSurface::new(),
        AnnotationConfig::default(),
    );
    if let Err(e) = denied.start().await {
        println!("✓ {}", e.user_message());
    }
    print_status(&denied).await;

    // Step 6: swap the random boxes for frame-difference regions
    println!("\nStep 6: Obscuring moving areas with the motion detector...");
    let motion_camera = SyntheticCamera::new().with_resolution(320, 240);
    let motion = AnnotationLoop::with_detector(
        Arc::new(motion_camera),
        ImageSurface::new(),
        Box::new(MotionRegionDetector::default()),
        AnnotationConfig::default(),
    );
    if let Err(e) = motion.start().await {
        println!("✗ {}", e.user_message());
        return;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    print_status(&motion).await;
    save_snapshot(&motion, "glimpse_motion.png").await;
    motion.stop().await;

    println!("\n=== Done ===");
}

async fn print_status(annotation: &AnnotationLoop<ImageSurface>) {
    let status = annotation.status().await;
    match serde_json::to_string_pretty(&status) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("✗ Failed to serialize status: {}", e),
    }
}

async fn save_snapshot(annotation: &AnnotationLoop<ImageSurface>, name: &str) {
    let path = PathBuf::from(name);
    let result = annotation.with_surface(|surface| surface.save_png(&path)).await;
    match result {
        Ok(()) => println!("✓ Saved {}", path.display()),
        Err(e) => println!("✗ Failed to save {}: {}", path.display(), e),
    }
}
