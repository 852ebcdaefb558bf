use pixelfx_image::{Image, ImageError, Rgba8Image};
use pixelfx_imgproc::{
    color::{ColorMatrix, ColorMatrixFilter, ColorMatrixParams, LUMA},
    filter::{kernels, ConvolutionFilter, ConvolutionParams},
    parallel::ExecutionStrategy,
    statistical::{StatisticalFilter, StatisticalParams},
    FilterError,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_image(width: usize, height: usize, seed: u64) -> Result<Rgba8Image, ImageError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; width * height * 4];
    rng.fill(&mut data[..]);
    Image::new([width, height].into(), data)
}

#[test]
fn test_desaturate_example() -> Result<(), FilterError> {
    init_logger();
    let mut image = Image::<u8, 4>::from_size_pixel([4, 4].into(), [100, 150, 200, 255])?;
    ColorMatrixFilter::new().desaturate().apply(&mut image)?;

    let gray = (100.0 * LUMA[0] + 150.0 * LUMA[1] + 200.0 * LUMA[2]) as u8;
    assert!(image
        .as_slice()
        .chunks_exact(4)
        .all(|px| px == [gray, gray, gray, 255]));
    Ok(())
}

#[test]
fn test_minimum_example() -> Result<(), FilterError> {
    init_logger();
    let data = vec![0, 0, 0, 255, 128, 128, 128, 255, 255, 255, 255, 255];
    let out = StatisticalFilter::new().minimum(3).apply_raw(&data, 3, 1)?;
    assert_eq!(&out[4..8], &[0, 0, 0, 255]);
    Ok(())
}

#[test]
fn test_color_then_blur_pipeline() -> Result<(), FilterError> {
    init_logger();
    let mut image = random_image(32, 24, 11)?;

    let mut color = ColorMatrixFilter::new();
    color.saturate(0.0).brightness_uniform(20.0);
    color.apply(&mut image)?;

    // grayscale input stays gray through a blur
    let blurred = ConvolutionFilter::new().gauss_blur(5).apply(image)?;
    for px in blurred.as_slice().chunks_exact(4) {
        assert!(px[0].abs_diff(px[1]) <= 1 && px[1].abs_diff(px[2]) <= 1);
    }
    Ok(())
}

#[test]
fn test_alpha_preserved_by_spatial_filters() -> Result<(), FilterError> {
    init_logger();
    let src = random_image(16, 9, 12)?;
    let alpha = src.channel(3)?;

    let mut convolution = ConvolutionFilter::new();
    let mut statistical = StatisticalFilter::new();
    let outputs = [
        convolution.sharpen(0.5, 3).apply(src.clone())?,
        convolution.emboss(-45.0, 1.0, 5).apply(src.clone())?,
        convolution.sobel(5).apply(src.clone())?,
        convolution.gauss_blur(3).apply(src.clone())?,
        convolution.fast_gauss(2, 3).apply(src.clone())?,
        statistical.median(3).apply(src.clone())?,
        statistical.dilate(5).apply(src.clone())?,
    ];
    for out in outputs {
        assert_eq!(out.channel(3)?, alpha);
    }
    Ok(())
}

#[test]
fn test_binomial_low_pass_matches_dense() -> Result<(), FilterError> {
    init_logger();
    let src = random_image(20, 15, 13)?;
    let separable = ConvolutionFilter::new().binomial_low_pass(3).apply(src.clone())?;

    let gauss = kernels::gauss_kernel(3);
    let mut dense = ConvolutionFilter::new();
    dense.set(&gauss.kernel, 1.0 / gauss.sum, 0.0)?;
    let direct = dense.apply(src)?;

    for (a, b) in separable.as_slice().iter().zip(direct.as_slice()) {
        assert!(a.abs_diff(*b) <= 1, "{a} vs {b}");
    }
    Ok(())
}

#[test]
fn test_box_blur_matches_dense() -> Result<(), FilterError> {
    init_logger();
    let src = random_image(25, 10, 14)?;
    let fast = ConvolutionFilter::new().box_blur(5).apply(src.clone())?;

    let mut dense = ConvolutionFilter::new();
    dense.set(&kernels::ones(5, 1.0, 1.0), 1.0 / 25.0, 0.0)?;
    let direct = dense.apply(src)?;

    for (a, b) in fast.as_slice().iter().zip(direct.as_slice()) {
        assert!(a.abs_diff(*b) <= 1, "{a} vs {b}");
    }
    Ok(())
}

#[test]
fn test_fixed_thread_pool() -> Result<(), FilterError> {
    init_logger();
    let src = random_image(40, 30, 15)?;
    let mut filter = ConvolutionFilter::new();
    filter.laplace(3);

    let reference = filter.apply(src.clone())?;
    filter.set_strategy(ExecutionStrategy::Fixed(3));
    assert_eq!(filter.apply(src.clone())?, reference);

    filter.set_strategy(ExecutionStrategy::Fixed(0));
    assert!(matches!(filter.apply(src), Err(FilterError::Parallel(_))));
    Ok(())
}

#[test]
fn test_params_json_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let src = random_image(12, 12, 16)?;

    let mut color = ColorMatrixFilter::new();
    color.adjust_hue(90.0).contrast_uniform(0.2);
    let json = serde_json::to_string(&color.serialize())?;
    let params: ColorMatrixParams = serde_json::from_str(&json)?;
    let mut color2 = ColorMatrixFilter::new();
    color2.restore(params);
    let (mut a, mut b) = (src.clone(), src.clone());
    color.apply(&mut a)?;
    color2.apply(&mut b)?;
    assert_eq!(a, b);

    let mut convolution = ConvolutionFilter::new();
    convolution.fast_gauss(2, 5);
    let json = serde_json::to_string(&convolution.serialize())?;
    let params: ConvolutionParams = serde_json::from_str(&json)?;
    let mut convolution2 = ConvolutionFilter::new();
    convolution2.restore(params)?;
    assert_eq!(convolution.apply(src.clone())?, convolution2.apply(src.clone())?);

    let mut statistical = StatisticalFilter::new();
    statistical.median(3);
    let json = serde_json::to_string(&statistical.serialize())?;
    assert!(json.contains("\"filter_name\":\"median\""));
    let params: StatisticalParams = serde_json::from_str(&json)?;
    let mut statistical2 = StatisticalFilter::new();
    statistical2.restore(params)?;
    assert_eq!(statistical.apply(src.clone())?, statistical2.apply(src)?);
    Ok(())
}

#[test]
fn test_matrix_composition_order() -> Result<(), FilterError> {
    init_logger();
    let src = random_image(10, 10, 17)?;

    let mut inverted = ColorMatrixFilter::new();
    inverted.invert();
    let mut brighter = ColorMatrixFilter::new();
    brighter.brightness_uniform(30.0);

    // combined: brighten first, then invert
    let mut combined = inverted.clone();
    combined.combine_with(&brighter);
    let mut one_pass = src.clone();
    combined.apply(&mut one_pass)?;

    let expected = inverted
        .matrix()
        .copied()
        .unwrap_or_else(ColorMatrix::identity)
        .multiply(brighter.matrix().unwrap_or(&ColorMatrix::identity()));
    let mut direct = src.clone();
    ColorMatrixFilter::from_matrix(expected).apply(&mut direct)?;
    assert_eq!(one_pass, direct);

    for (out, inp) in one_pass.as_slice().chunks_exact(4).zip(src.as_slice().chunks_exact(4)) {
        for c in 0..3 {
            assert_eq!(out[c], 255u8.saturating_sub(inp[c].saturating_add(30)));
        }
    }
    Ok(())
}
