//! End-to-end engine tests: the direct path against known automaton
//! windows and the CPU reference, and the cached path against the direct
//! path. Everything here needs a device; tests skip when no adapter is
//! available.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cae::engine::{run, run_with_cache, TileCache};
use cae::gpu::{GpuContext, OutputBuffer, StepPipeline};
use cae::simulation::{rule, Seed};

struct Ctx {
    gpu: GpuContext,
    step: StepPipeline,
}

fn ctx() -> Option<Ctx> {
    let gpu = match GpuContext::new() {
        Ok(gpu) => gpu,
        Err(e) => {
            eprintln!("skipping test: no GPU adapter ({e})");
            return None;
        }
    };
    let step = StepPipeline::new(&gpu.device);
    Some(Ctx { gpu, step })
}

#[allow(clippy::too_many_arguments)]
fn direct(
    ctx: &Ctx,
    rule_num: u8,
    start: u32,
    iterations: u32,
    visible_width: u32,
    offset: i32,
    seed: &Seed,
) -> OutputBuffer {
    run(
        &ctx.gpu.device,
        &ctx.gpu.queue,
        &ctx.step,
        rule_num,
        start,
        iterations,
        visible_width,
        offset,
        seed,
    )
}

/// Reads the output back and strips the padding columns from every row.
fn visible_rows(ctx: &Ctx, output: &OutputBuffer) -> Vec<Vec<u32>> {
    let words = output.read_back(&ctx.gpu.device, &ctx.gpu.queue);
    (0..output.height as usize)
        .map(|r| {
            let start = r * output.simulated_width as usize + output.padding_left as usize;
            words[start..start + output.visible_width as usize].to_vec()
        })
        .collect()
}

fn bits(s: &str) -> Vec<u32> {
    s.bytes().map(|b| u32::from(b == b'1')).collect()
}

/// CPU reference for the same viewport, seeded and padded identically.
fn oracle(
    rule_num: u8,
    seed: &Seed,
    start: u32,
    iterations: u32,
    visible_width: u32,
    offset: i32,
) -> Vec<Vec<u32>> {
    let total = start + iterations;
    let padding = total;
    let simulated_width = visible_width + 2 * padding;
    let first = seed.first_row(simulated_width, padding, offset);
    let rows = rule::evolve(rule_num, &first, total);
    rows[start as usize..=total as usize]
        .iter()
        .map(|row| row[padding as usize..(padding + visible_width) as usize].to_vec())
        .collect()
}

#[test]
fn rule_30_triangle_in_window() {
    let Some(ctx) = ctx() else { return };
    let output = direct(&ctx, 30, 0, 3, 7, -3, &Seed::SingleCell);
    let rows = visible_rows(&ctx, &output);
    assert_eq!(rows[0], bits("0001000"));
    assert_eq!(rows[1], bits("0011100"));
    assert_eq!(rows[2], bits("0110010"));
    assert_eq!(rows[3], bits("1101111"));
}

#[test]
fn rule_90_sierpinski_window() {
    let Some(ctx) = ctx() else { return };
    let output = direct(&ctx, 90, 0, 2, 5, -2, &Seed::SingleCell);
    let rows = visible_rows(&ctx, &output);
    assert_eq!(rows[0], bits("00100"));
    assert_eq!(rows[1], bits("01010"));
    assert_eq!(rows[2], bits("10001"));
}

#[test]
fn rule_110_grows_left_from_pattern_seed() {
    let Some(ctx) = ctx() else { return };
    let seed = Seed::Pattern("1".to_owned());
    let output = direct(&ctx, 110, 0, 3, 5, -4, &seed);
    let rows = visible_rows(&ctx, &output);
    assert_eq!(rows[0], bits("00001"));
    assert_eq!(rows[1], bits("00011"));
    assert_eq!(rows[2], bits("00111"));
    assert_eq!(rows[3], bits("01101"));
}

#[test]
fn rule_0_only_the_seed_survives() {
    let Some(ctx) = ctx() else { return };
    let output = direct(&ctx, 0, 0, 10, 100, -50, &Seed::SingleCell);
    let rows = visible_rows(&ctx, &output);
    for (r, row) in rows.iter().enumerate() {
        for (c, &cell) in row.iter().enumerate() {
            let expected = u32::from(r == 0 && c == 50);
            assert_eq!(cell, expected, "row {r}, column {c}");
        }
    }
}

#[test]
fn rule_255_fills_after_the_first_generation() {
    let Some(ctx) = ctx() else { return };
    let output = direct(&ctx, 255, 0, 5, 8, 0, &Seed::SingleCell);
    let rows = visible_rows(&ctx, &output);
    assert_eq!(rows[0], bits("10000000"));
    for row in &rows[1..] {
        assert_eq!(row, &bits("11111111"));
    }
}

#[test]
fn zero_iterations_returns_only_the_seed_row() {
    let Some(ctx) = ctx() else { return };
    let output = direct(&ctx, 30, 0, 0, 5, -2, &Seed::SingleCell);
    assert_eq!(output.height, 1);
    let rows = visible_rows(&ctx, &output);
    assert_eq!(rows, vec![bits("00100")]);
}

#[test]
fn seed_outside_the_window_yields_all_zero() {
    let Some(ctx) = ctx() else { return };
    let output = direct(&ctx, 30, 0, 4, 6, 1000, &Seed::SingleCell);
    let rows = visible_rows(&ctx, &output);
    for row in &rows {
        assert!(row.iter().all(|&c| c == 0));
    }
}

#[test]
fn direct_path_matches_cpu_reference() {
    let Some(ctx) = ctx() else { return };
    let pattern = Seed::Pattern("1101".to_owned());
    let cases: &[(u8, i32, &Seed)] = &[
        (30, -10, &Seed::SingleCell),
        (110, 3, &Seed::SingleCell),
        (90, -7, &pattern),
        (184, 0, &pattern),
    ];
    for &(rule_num, offset, seed) in cases {
        let output = direct(&ctx, rule_num, 2, 8, 21, offset, seed);
        let rows = visible_rows(&ctx, &output);
        let expected = oracle(rule_num, seed, 2, 8, 21, offset);
        assert_eq!(rows, expected, "rule {rule_num}, offset {offset}");
    }
}

#[test]
fn direct_path_matches_cpu_reference_randomised() {
    let Some(ctx) = ctx() else { return };
    let mut rng = StdRng::seed_from_u64(0xCAE_5EED);
    for _ in 0..5 {
        let rule_num: u8 = rng.random();
        let offset: i32 = rng.random_range(-40..40);
        let start: u32 = rng.random_range(0..12);
        let output = direct(&ctx, rule_num, start, 10, 17, offset, &Seed::SingleCell);
        let rows = visible_rows(&ctx, &output);
        let expected = oracle(rule_num, &Seed::SingleCell, start, 10, 17, offset);
        assert_eq!(rows, expected, "rule {rule_num}, offset {offset}, start {start}");
    }
}

/// The cached path blits generations `[vy0, vy1)`; the direct path copies
/// the inclusive row range. Equivalence holds over the blitted rows.
fn assert_cached_matches_direct(
    ctx: &Ctx,
    cache: &mut TileCache,
    rule_num: u8,
    start: u32,
    iterations: u32,
    visible_width: u32,
    offset: i32,
    seed: &Seed,
) {
    let cached = run_with_cache(
        &ctx.gpu.device,
        &ctx.gpu.queue,
        &ctx.step,
        rule_num,
        start,
        iterations,
        visible_width,
        offset,
        seed,
        cache,
    );
    let reference = direct(ctx, rule_num, start, iterations, visible_width, offset, seed);

    let cached_rows = visible_rows(ctx, &cached);
    let reference_rows = visible_rows(ctx, &reference);
    assert_eq!(
        cached_rows[..iterations as usize],
        reference_rows[..iterations as usize],
        "rule {rule_num}, start {start}, offset {offset}"
    );
}

#[test]
fn cached_path_matches_direct_path() {
    let Some(ctx) = ctx() else { return };
    let mut cache = TileCache::new(16, 64);
    assert_cached_matches_direct(&ctx, &mut cache, 30, 10, 30, 50, -37, &Seed::SingleCell);
}

#[test]
fn assembly_is_seamless_across_tile_boundaries() {
    let Some(ctx) = ctx() else { return };
    let mut cache = TileCache::new(16, 64);
    // 200 columns starting at -70 span tiles -2..=2; 40 generations cross
    // the first horizontal tile boundary when starting at 40.
    assert_cached_matches_direct(&ctx, &mut cache, 30, 40, 40, 200, -70, &Seed::SingleCell);
}

#[test]
fn cache_equivalence_holds_regardless_of_prior_state() {
    let Some(ctx) = ctx() else { return };
    let mut cache = TileCache::new(8, 64);
    let seed = Seed::Pattern("10011".to_owned());
    // Populate the cache with unrelated viewports first.
    assert_cached_matches_direct(&ctx, &mut cache, 110, 0, 20, 64, 100, &seed);
    assert_cached_matches_direct(&ctx, &mut cache, 110, 70, 20, 64, -200, &seed);
    // Then a viewport partially overlapping the first.
    assert_cached_matches_direct(&ctx, &mut cache, 110, 5, 25, 90, 80, &seed);
}

#[test]
fn repeated_viewport_is_idempotent_and_hits_only() {
    let Some(ctx) = ctx() else { return };
    let mut cache = TileCache::new(16, 64);

    let compute = |cache: &mut TileCache| {
        run_with_cache(
            &ctx.gpu.device,
            &ctx.gpu.queue,
            &ctx.step,
            30,
            0,
            20,
            100,
            -50,
            &Seed::SingleCell,
            cache,
        )
    };

    let first = compute(&mut cache);
    let misses_after_first = cache.misses;
    let second = compute(&mut cache);

    assert_eq!(cache.misses, misses_after_first, "second call must not miss");
    assert_eq!(
        visible_rows(&ctx, &first),
        visible_rows(&ctx, &second),
        "identical calls must produce identical output"
    );
}

#[test]
fn eviction_stress_refetches_only_the_evicted_tile() {
    let Some(ctx) = ctx() else { return };
    let mut cache = TileCache::new(4, 64);

    // Visit 25 distinct tiles, one per call.
    let visit = |cache: &mut TileCache, tile_x: i32, tile_y: i32| {
        run_with_cache(
            &ctx.gpu.device,
            &ctx.gpu.queue,
            &ctx.step,
            30,
            tile_y as u32 * 64,
            64,
            64,
            tile_x * 64,
            &Seed::SingleCell,
            cache,
        )
    };

    for tile_y in 0..5 {
        for tile_x in 0..5 {
            visit(&mut cache, tile_x, tile_y);
        }
    }
    assert_eq!(cache.misses, 25);
    assert_eq!(cache.len(), 4);

    // The first tile was evicted long ago: exactly one more miss, and the
    // output still matches the direct oracle.
    let output = visit(&mut cache, 0, 0);
    assert_eq!(cache.misses, 26);
    assert_eq!(cache.len(), 4);

    let reference = direct(&ctx, 30, 0, 64, 64, 0, &Seed::SingleCell);
    assert_eq!(
        visible_rows(&ctx, &output)[..64],
        visible_rows(&ctx, &reference)[..64],
    );
}
