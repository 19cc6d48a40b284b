use criterion::{criterion_group, criterion_main, Criterion};
use hashspoof_core::{CodecMutator, ImageMutator, SourceImage};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

fn carrier(format: ImageFormat) -> SourceImage {
    let img = RgbImage::from_fn(256, 256, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]));
    SourceImage::from_image(DynamicImage::ImageRgb8(img), format)
}

pub fn mutation(c: &mut Criterion) {
    let mutator = CodecMutator::default();

    let png = carrier(ImageFormat::Png);
    c.bench_function("PNG Mutation", |b| {
        let mut iteration = 0;
        b.iter(|| {
            iteration += 1;
            mutator
                .mutate(&png, iteration)
                .expect("Cannot mutate PNG carrier")
        })
    });

    let jpeg = carrier(ImageFormat::Jpeg);
    c.bench_function("JPEG Mutation", |b| {
        let mut iteration = 0;
        b.iter(|| {
            iteration += 1;
            mutator
                .mutate(&jpeg, iteration)
                .expect("Cannot mutate JPEG carrier")
        })
    });
}

criterion_group!(benches, mutation);
criterion_main!(benches);
