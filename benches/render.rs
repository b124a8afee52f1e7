use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};

use scene_compositor::config::Config;
use scene_compositor::motion::{EffectSpec, EffectType, MotionEngine};
use scene_compositor::render::{FrameRenderer, SourceImage};

fn bench_render_frame(c: &mut Criterion) {
    let config = Config::default();
    let renderer = FrameRenderer::new(&config).expect("renderer");
    let motion = MotionEngine::new(config.motion.clone(), config.video.width, config.video.height);

    let source = SourceImage::new(RgbImage::from_fn(1536, 1024, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }));
    let effect = EffectSpec::new(EffectType::Parallax3d);
    let mut frame = renderer.new_frame();

    c.bench_function("render_1080p_parallax", |b| {
        let mut progress = 0.0;
        b.iter(|| {
            progress = (progress + 0.01) % 1.0;
            let transform = motion.transform(Some(&effect), progress);
            renderer.render(&mut frame, black_box(&source), transform, None);
        })
    });

    c.bench_function("render_1080p_with_caption", |b| {
        let transform = motion.transform(Some(&effect), 0.5);
        b.iter(|| {
            renderer.render(&mut frame, black_box(&source), transform, Some("오늘은 맑습니다."));
        })
    });
}

criterion_group!(benches, bench_render_frame);
criterion_main!(benches);
