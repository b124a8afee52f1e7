use rayon::prelude::*;
use tracing::debug;

use crate::config::Config;
use crate::error::{CompositorError, Result};
use crate::motion::TransformResult;
use crate::render::caption::CaptionRenderer;
use crate::render::frame::{Frame, SourceImage};

/// Precomputed horizontal sampling for one output column
#[derive(Debug, Clone, Copy)]
struct Tap {
    x0: usize,
    x1: usize,
    weight: f32,
}

/// Map an output coordinate onto the source axis, clamping to the edge
fn tap(dst: u32, origin: f64, drawn: f64, src_len: u32) -> Tap {
    let last = src_len.saturating_sub(1) as f64;
    let pos = ((dst as f64 + 0.5 - origin) / drawn * src_len as f64 - 0.5).clamp(0.0, last);
    let x0 = pos.floor();
    Tap {
        x0: x0 as usize,
        x1: (x0 + 1.0).min(last) as usize,
        weight: (pos - x0) as f32,
    }
}

/// Composes one frame: the scene image under a motion transform plus the
/// active caption.
pub struct FrameRenderer {
    width: u32,
    height: u32,
    captions: CaptionRenderer,
    pool: rayon::ThreadPool,
}

impl FrameRenderer {
    pub fn new(config: &Config) -> Result<Self> {
        let threads = config.video.render_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("render-{}", i))
            .build()
            .map_err(|e| CompositorError::generic(format!("Failed to build render thread pool: {}", e)))?;

        let captions = CaptionRenderer::from_config(&config.caption, config.video.width, config.video.height)?;

        debug!(
            "Frame renderer ready: {}x{}, {} threads",
            config.video.width, config.video.height, threads
        );

        Ok(Self {
            width: config.video.width,
            height: config.video.height,
            captions,
            pool,
        })
    }

    /// A black frame of the output size
    pub fn new_frame(&self) -> Frame {
        Frame::new_black(self.width, self.height)
    }

    pub fn captions(&self) -> &CaptionRenderer {
        &self.captions
    }

    /// Render `source` under `transform` into `frame`, then overlay `caption`.
    ///
    /// Every output pixel is rewritten. The image is stretched to
    /// `frame size × scale`, centred, shifted by the offsets and cropped; pixels
    /// beyond the drawn rectangle repeat the image's edge.
    pub fn render(&self, frame: &mut Frame, source: &SourceImage, transform: TransformResult, caption: Option<&str>) {
        if (frame.width(), frame.height()) != (self.width, self.height) {
            *frame = self.new_frame();
        }

        self.draw_image(frame, source, transform);

        if let Some(text) = caption.filter(|t| !t.trim().is_empty()) {
            self.captions.draw(frame, text);
        }
    }

    fn draw_image(&self, frame: &mut Frame, source: &SourceImage, transform: TransformResult) {
        let (w, h) = (self.width as f64, self.height as f64);
        let drawn_w = w * transform.scale;
        let drawn_h = h * transform.scale;
        let origin_x = (w - drawn_w) / 2.0 + transform.offset_x;
        let origin_y = (h - drawn_h) / 2.0 + transform.offset_y;

        let src = source.as_image();
        let (src_w, src_h) = src.dimensions();
        if src_w == 0 || src_h == 0 {
            frame.clear([0, 0, 0]);
            return;
        }

        let columns: Vec<Tap> = (0..self.width)
            .map(|x| tap(x, origin_x, drawn_w, src_w))
            .collect();
        let src_raw = src.as_raw();
        let src_stride = src_w as usize * 3;
        let row_len = self.width as usize * 3;

        self.pool.install(|| {
            frame
                .as_raw_mut()
                .par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(y, row)| {
                    let ty = tap(y as u32, origin_y, drawn_h, src_h);
                    let top = &src_raw[ty.x0 * src_stride..(ty.x0 + 1) * src_stride];
                    let bottom = &src_raw[ty.x1 * src_stride..(ty.x1 + 1) * src_stride];

                    for (out, tx) in row.chunks_exact_mut(3).zip(&columns) {
                        for c in 0..3 {
                            let tl = top[tx.x0 * 3 + c] as f32;
                            let tr = top[tx.x1 * 3 + c] as f32;
                            let bl = bottom[tx.x0 * 3 + c] as f32;
                            let br = bottom[tx.x1 * 3 + c] as f32;

                            let upper = tl + (tr - tl) * tx.weight;
                            let lower = bl + (br - bl) * tx.weight;
                            out[c] = (upper + (lower - upper) * ty.weight).round() as u8;
                        }
                    }
                });
        });
    }
}
