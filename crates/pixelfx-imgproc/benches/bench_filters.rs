use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pixelfx_image::Image;
use pixelfx_imgproc::{
    filter::{convolve_dense, convolve_general, integral_convolution, kernels, separable_filter, Output},
    parallel::ExecutionStrategy,
    statistical::{rank_filter, window_indices, Statistic},
};

fn bench_convolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("Convolution");

    for (width, height) in [(256, 224), (512, 448), (1024, 896)].iter() {
        for kernel_size in [3, 5, 7].iter() {
            group.throughput(criterion::Throughput::Elements(
                (*width * *height * *kernel_size) as u64,
            ));

            let parameter_string = format!("{}x{}x{}", width, height, kernel_size);

            let image_size = [*width, *height].into();
            let image = Image::<u8, 4>::from_size_val(image_size, 128).unwrap();
            let output = Image::<u8, 4>::from_size_val(image_size, 0).unwrap();

            let gauss = kernels::gauss_kernel(*kernel_size);
            let scaled = Output::Scaled {
                factor: 1.0 / gauss.sum,
                bias: 0.0,
            };

            group.bench_with_input(
                BenchmarkId::new("convolve_dense", &parameter_string),
                &(&image, &output),
                |b, i| {
                    let (src, mut dst) = (i.0, i.1.clone());
                    b.iter(|| {
                        black_box(convolve_dense(
                            src,
                            &mut dst,
                            *kernel_size,
                            &gauss.kernel,
                            &scaled,
                            ExecutionStrategy::ParallelRows,
                        ))
                    })
                },
            );

            group.bench_with_input(
                BenchmarkId::new("convolve_general", &parameter_string),
                &(&image, &output),
                |b, i| {
                    let (src, mut dst) = (i.0, i.1.clone());
                    b.iter(|| {
                        black_box(convolve_general(
                            src,
                            &mut dst,
                            *kernel_size,
                            &gauss.kernel,
                            &scaled,
                            ExecutionStrategy::ParallelRows,
                        ))
                    })
                },
            );

            let binomial: Vec<f32> = kernels::binomial_kernel_1d(*kernel_size)
                .iter()
                .map(|w| w * 0.5f32.powi(*kernel_size as i32 - 1))
                .collect();

            group.bench_with_input(
                BenchmarkId::new("separable_filter", &parameter_string),
                &(&image, &output),
                |b, i| {
                    let (src, mut dst) = (i.0, i.1.clone());
                    b.iter(|| {
                        black_box(separable_filter(
                            src,
                            &mut dst,
                            &binomial,
                            &binomial,
                            ExecutionStrategy::ParallelRows,
                        ))
                    })
                },
            );

            let ones = kernels::ones(*kernel_size, 1.0, 1.0);
            let box_output = Output::Scaled {
                factor: 1.0 / (*kernel_size * *kernel_size) as f32,
                bias: 0.0,
            };

            group.bench_with_input(
                BenchmarkId::new("integral_convolution", &parameter_string),
                &(&image, &output),
                |b, i| {
                    let (src, mut dst) = (i.0, i.1.clone());
                    b.iter(|| {
                        black_box(integral_convolution(
                            src,
                            &mut dst,
                            *kernel_size,
                            *kernel_size,
                            &ones,
                            &box_output,
                            1,
                            ExecutionStrategy::ParallelRows,
                        ))
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_rank_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("RankFilter");

    for (width, height) in [(256, 224), (512, 448)].iter() {
        for kernel_size in [3, 5].iter() {
            group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

            let parameter_string = format!("{}x{}x{}", width, height, kernel_size);

            let image_size = [*width, *height].into();
            let image = Image::<u8, 4>::from_size_val(image_size, 64).unwrap();
            let output = Image::<u8, 4>::from_size_val(image_size, 0).unwrap();
            let indices = window_indices(*kernel_size);

            for statistic in [Statistic::Median, Statistic::Minimum] {
                group.bench_with_input(
                    BenchmarkId::new(statistic.name(), &parameter_string),
                    &(&image, &output),
                    |b, i| {
                        let (src, mut dst) = (i.0, i.1.clone());
                        b.iter(|| {
                            black_box(rank_filter(
                                src,
                                &mut dst,
                                &indices,
                                statistic,
                                ExecutionStrategy::ParallelRows,
                            ))
                        })
                    },
                );
            }
        }
    }
    group.finish();
}

criterion_group!(benches, bench_convolution, bench_rank_filter);
criterion_main!(benches);
