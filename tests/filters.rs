use filtermix::ops::filters::{box_blur, convolve_2d, gaussian_blur, gaussian_kernel, to_gray};
use filtermix::ops::{glass_patterns, layered_strokes, pointillism};
use filtermix::{
    Filter, FilterKind, FilterSummary, GlassPatternsParams, LayeredStrokesParams, PixelBuffer,
    PointillismParams,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn noise_image(w: u32, h: u32, seed: u64) -> PixelBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = PixelBuffer::new(w, h);
    for y in 0..h {
        for x in 0..w {
            img.set_pixel(x, y, [rng.random(), rng.random(), rng.random(), 255]);
        }
    }
    img
}

/// Left half warm, right half cool, with a bright diagonal band.
fn structured_image(w: u32, h: u32) -> PixelBuffer {
    let mut img = PixelBuffer::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let base = if x < w / 2 { [210, 120, 40, 255] } else { [30, 80, 190, 255] };
            let on_band = (x as i32 - y as i32).abs() < 3;
            img.set_pixel(x, y, if on_band { [250, 250, 230, 255] } else { base });
        }
    }
    img
}

#[test]
fn every_filter_preserves_dimensions() {
    let src = structured_image(47, 31);
    for kind in FilterKind::ALL {
        let mut rng = StdRng::seed_from_u64(1);
        let out = Filter::with_defaults(kind).apply(&src, &mut rng);
        assert_eq!((out.width(), out.height()), (47, 31), "{kind}");
    }
}

#[test]
fn every_filter_handles_a_single_pixel() {
    let src = PixelBuffer::filled(1, 1, [90, 140, 60, 255]);
    for kind in FilterKind::ALL {
        let mut rng = StdRng::seed_from_u64(2);
        let out = Filter::with_defaults(kind).apply(&src, &mut rng);
        assert_eq!((out.width(), out.height()), (1, 1), "{kind}");
    }
}

#[test]
fn same_seed_same_output() {
    let src = structured_image(40, 40);
    for kind in FilterKind::ALL {
        let filter = Filter::with_defaults(kind);
        let a = filter.apply(&src, &mut StdRng::seed_from_u64(77));
        let b = filter.apply(&src, &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b, "{kind}");
    }
}

#[test]
fn glass_patterns_keep_black_dark() {
    let src = PixelBuffer::filled(10, 10, [0, 0, 0, 255]);
    let mut rng = StdRng::seed_from_u64(3);
    let out = glass_patterns::transform(&src, &GlassPatternsParams::default(), &mut rng);
    let mean = out.mean_channels();
    assert!(mean[0] < 20.0 && mean[1] < 20.0 && mean[2] < 20.0, "{mean:?}");
}

#[test]
fn glass_patterns_without_strength_is_identity_sized() {
    let src = structured_image(24, 24);
    let params = GlassPatternsParams { strength: 0.0, ..GlassPatternsParams::default() };
    let mut rng = StdRng::seed_from_u64(4);
    let out = glass_patterns::transform(&src, &params, &mut rng);
    assert_eq!(out, src);
}

#[test]
fn pointillism_base_layer_spacing() {
    let src = structured_image(100, 100);
    let params = PointillismParams { radius: 5, ..PointillismParams::default() };
    let mut rng = StdRng::seed_from_u64(5);
    let (out, stats) = pointillism::paint(&src, &params, &mut rng);
    assert!((1..100).contains(&stats.base_dots), "{stats:?}");
    assert!(stats.main_dots > 0);
    assert_ne!(out, src);
}

#[test]
fn pointillism_zero_strength_is_a_copy() {
    let src = structured_image(30, 20);
    let params = PointillismParams { strength: 0.0, ..PointillismParams::default() };
    let mut rng = StdRng::seed_from_u64(6);
    let (out, stats) = pointillism::paint(&src, &params, &mut rng);
    assert_eq!(out, src);
    assert_eq!(stats.total(), 0);
}

#[test]
fn noisy_images_need_more_strokes_than_flat_ones() {
    let params = LayeredStrokesParams::default();
    let flat = PixelBuffer::filled(64, 64, [60, 110, 170, 255]);
    let noisy = noise_image(64, 64, 8);

    let (_, flat_stats) = layered_strokes::paint(&flat, &params, &mut StdRng::seed_from_u64(9));
    let (_, noisy_stats) = layered_strokes::paint(&noisy, &params, &mut StdRng::seed_from_u64(9));
    assert!(
        noisy_stats.total() > flat_stats.total(),
        "noisy {:?} vs flat {:?}",
        noisy_stats,
        flat_stats
    );
}

#[test]
fn registry_run_reports_layer_counts() {
    let src = structured_image(50, 50);
    let mut rng = StdRng::seed_from_u64(10);
    let (_, summary) = Filter::from_name("pointillism").unwrap().run(&src, &mut rng);
    match summary {
        FilterSummary::Dots(stats) => assert!(stats.total() > 0),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn gaussian_kernel_is_normalised() {
    for (size, sigma) in [(3, 1.0), (5, 1.5), (9, 4.0)] {
        let sum: f64 = gaussian_kernel(size, sigma).iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "size {size}: {sum}");
    }
}

#[test]
fn blurs_stay_in_range_and_keep_flat_regions() {
    let noisy = noise_image(33, 21, 12);
    let blurred = gaussian_blur(&noisy, 5, 1.5);
    assert_eq!((blurred.width(), blurred.height()), (33, 21));

    let flat = PixelBuffer::filled(16, 16, [77, 77, 77, 255]);
    assert_eq!(box_blur(&flat, 3), flat);
    assert_eq!(gaussian_blur(&flat, 7, 2.0), flat);
}

#[test]
fn sharpening_kernel_saturates_instead_of_wrapping() {
    let mut img = PixelBuffer::filled(9, 9, [0, 0, 0, 255]);
    img.set_pixel(4, 4, [255, 255, 255, 255]);
    let gray = to_gray(&img);
    let sharpen = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
    let out = convolve_2d(&gray, &sharpen, 3);
    assert_eq!(out.get(4, 4), 255);
    assert_eq!(out.get(4, 3), 0);
    assert_eq!(out.get(0, 0), 0);
}
