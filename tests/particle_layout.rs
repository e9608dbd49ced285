//! Integration tests for the host-side particle layouts.
//!
//! These cover the index list the sprite pass draws with and the two bulk
//! layouts the particle store can be reset to.

use std::f32::consts::TAU;

use particle_bloom::spawn::{heart_position, quad_indices, star_position, INDICES_PER_PARTICLE};
use particle_bloom::{ParticleSnapshot, ResetLayout, Vec4};
use rand::rngs::SmallRng;
use rand::SeedableRng;

// ============================================================================
// Index list
// ============================================================================

#[test]
fn test_index_list_length_and_pattern() {
    for count in [1u32, 2, 7, 1000] {
        let indices = quad_indices(count);
        assert_eq!(indices.len(), (count * INDICES_PER_PARTICLE) as usize);

        for (i, quad) in indices.chunks_exact(6).enumerate() {
            let b = 4 * i as u32;
            assert_eq!(quad, [b, b + 1, b + 2, b, b + 2, b + 3], "particle {i}");
        }
    }
}

#[test]
fn test_index_list_stays_in_vertex_range() {
    let count = 513;
    let max = quad_indices(count).into_iter().max().unwrap();
    assert_eq!(max, 4 * count - 1);
}

// ============================================================================
// Uniform reset
// ============================================================================

#[test]
fn test_uniform_reset_bounds_and_rest() {
    let mut rng = SmallRng::seed_from_u64(7);
    for half_extent in [0.5f32, 1.0, 3.0] {
        let snapshot = ParticleSnapshot::uniform(2048, half_extent, &mut rng);
        assert_eq!(snapshot.len(), 2048);

        for (p, v) in snapshot.positions.iter().zip(&snapshot.velocities) {
            assert_eq!(*v, Vec4::ZERO);
            assert!(p.x.abs() <= half_extent);
            assert!(p.y.abs() <= half_extent);
            assert!(p.z.abs() <= half_extent);
            assert_eq!(p.w, 1.0);
        }
    }
}

#[test]
fn test_four_particle_reset() {
    let mut rng = SmallRng::seed_from_u64(1);
    let snapshot = ParticleSnapshot::uniform(4, 1.0, &mut rng);

    assert_eq!(snapshot.velocities, vec![Vec4::ZERO; 4]);
    for p in &snapshot.positions {
        assert!(p.truncate().abs().max_element() <= 1.0);
    }
}

#[test]
fn test_uniform_reset_spreads_out() {
    let mut rng = SmallRng::seed_from_u64(99);
    let snapshot = ParticleSnapshot::uniform(4096, 1.0, &mut rng);
    let mean = snapshot
        .positions
        .iter()
        .fold(Vec4::ZERO, |acc, p| acc + *p)
        / snapshot.len() as f32;

    // Centred on the origin, not collapsed onto it.
    assert!(mean.truncate().length() < 0.1);
    assert!(snapshot.positions.iter().any(|p| p.x > 0.5));
    assert!(snapshot.positions.iter().any(|p| p.x < -0.5));
}

#[test]
fn test_reset_layout_dispatch() {
    let mut rng = SmallRng::seed_from_u64(3);
    let heart = ParticleSnapshot::from_layout(ResetLayout::Heart { scale: 0.3 }, 50, &mut rng);
    assert_eq!(heart, ParticleSnapshot::heart(50, 0.3));

    let uniform = ParticleSnapshot::from_layout(ResetLayout::default(), 50, &mut rng);
    assert!(uniform
        .positions
        .iter()
        .all(|p| p.truncate().abs().max_element() <= 0.5));
}

// ============================================================================
// Heart layout
// ============================================================================

fn heart_reference(i: u32, n: u32, scale: f32) -> Vec4 {
    let u = (i as f64 / n as f64) * std::f64::consts::TAU;
    let k = scale as f64 / 20.0;
    let x = 16.0 * u.sin().powi(3);
    let y = 13.0 * u.cos() - 5.0 * (2.0 * u).cos() - 2.0 * (3.0 * u).cos() - (4.0 * u).cos();
    let z = (2.0 * u).sin() * k * 0.5;
    Vec4::new((x * k) as f32, (y * k) as f32, z as f32, 1.0)
}

#[test]
fn test_heart_matches_closed_form() {
    let n = 1000;
    let snapshot = ParticleSnapshot::heart(n, 0.3);

    for (i, p) in snapshot.positions.iter().enumerate() {
        let expected = heart_reference(i as u32, n, 0.3);
        assert!(
            (*p - expected).abs().max_element() < 1e-5,
            "particle {i}: {p:?} vs {expected:?}"
        );
    }
    assert!(snapshot.velocities.iter().all(|v| *v == Vec4::ZERO));
}

#[test]
fn test_heart_first_particle() {
    let snapshot = ParticleSnapshot::heart(100, 0.3);
    let p = snapshot.positions[0];
    assert!((p - Vec4::new(0.0, 0.075, 0.0, 1.0)).abs().max_element() < 1e-6);
}

#[test]
fn test_heart_is_mirror_symmetric() {
    let n = 360;
    for i in 1..n / 2 {
        let a = heart_position(i, n, 1.0);
        let b = heart_position(n - i, n, 1.0);
        assert!((a.x + b.x).abs() < 1e-4);
        assert!((a.y - b.y).abs() < 1e-4);
    }
}

// ============================================================================
// Star layout
// ============================================================================

#[test]
fn test_star_tips_and_notches() {
    let n = 1000;
    let scale = 2.0;
    // Particle 0 sits on a tip: radius 1 at half scale.
    let tip = star_position(0, n, scale);
    assert!((tip.truncate().truncate().length() - 1.0).abs() < 1e-4);

    // Half a segment later is the notch between two tips.
    let notch_index = n / 10;
    let notch = star_position(notch_index, n, scale);
    let u = notch_index as f32 / n as f32 * TAU;
    assert!((u - TAU / 10.0).abs() < 1e-6);
    assert!((notch.truncate().truncate().length() - 0.382).abs() < 1e-3);
}
