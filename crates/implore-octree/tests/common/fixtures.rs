//! Shared point clouds and octrees for integration tests

use implore_octree::{Color, InMemoryStore, Octree, OctreeConfig, Point};

/// Install a tracing subscriber honoring `RUST_LOG`, once per test binary
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic pseudo-random cloud in `[0, extent)^3`.
/// Each point's auxiliary channel holds its index so points stay distinguishable.
pub fn random_cloud(n: usize, extent: f32, seed: u64) -> Vec<Point> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 40) as f32 / (1u64 << 24) as f32) * extent
    };

    (0..n)
        .map(|i| {
            let position = [next(), next(), next()];
            let shade = (i % 256) as f32;
            Point::new(position, Color::new(shade, 255.0 - shade, shade * 0.5, i as f32))
        })
        .collect()
}

/// Small leaves so even modest clouds produce several levels
#[allow(dead_code)]
pub fn small_leaf_config() -> OctreeConfig {
    OctreeConfig::default()
        .with_max_points_per_node(8)
        .with_lod_points_per_node(4)
}

/// Octree over `points` backed by an in-memory store
#[allow(dead_code)]
pub fn build(points: Vec<Point>, config: OctreeConfig) -> Octree {
    InMemoryStore::build_octree(points, config).expect("build octree")
}

/// Point identity carried in the auxiliary channel
pub fn id(point: &Point) -> usize {
    point.color.a as usize
}

/// Ids of points strictly within `radius` of `query`, sorted
#[allow(dead_code)]
pub fn brute_force(points: &[Point], query: [f32; 3], radius: f32) -> Vec<usize> {
    let mut ids: Vec<usize> = points
        .iter()
        .filter(|p| p.sqr_distance_to(query) < radius * radius)
        .map(id)
        .collect();
    ids.sort_unstable();
    ids
}
