use std::borrow::Cow;

use frame_filter_common::config::{BorderPolicy, OutputDepth};
use frame_filter_common::frame::Frame;
use frame_filter_common::kernel::Kernel;

use super::border::resolve;
use super::StageError;
use crate::kernel::SharedKernel;

/// Neighbourhood filter driven by a shared, editable [`Kernel`].
///
/// The kernel is loaded once per `apply`, so a concurrent edit is seen either
/// entirely or not at all by a given frame.
#[derive(Debug, Clone)]
pub struct Convolution {
    kernel: SharedKernel,
    border: BorderPolicy,
    output: OutputDepth,
}

impl Convolution {
    pub fn new(kernel: SharedKernel, border: BorderPolicy, output: OutputDepth) -> Self {
        Self {
            kernel,
            border,
            output,
        }
    }

    pub fn kernel(&self) -> &SharedKernel {
        &self.kernel
    }

    pub fn border(&self) -> BorderPolicy {
        self.border
    }

    pub fn output(&self) -> OutputDepth {
        self.output
    }

    pub fn apply(&self, frame: &Frame) -> Result<Frame, StageError> {
        if frame.is_empty() {
            return Err(StageError::EmptyFrame {
                width: frame.width(),
                height: frame.height(),
            });
        }

        let kernel = self.kernel.snapshot();
        let src = match self.output {
            OutputDepth::Grayscale => Cow::Owned(frame.to_grayscale()),
            OutputDepth::Same => Cow::Borrowed(frame),
        };
        convolve(&src, &kernel, self.border)
    }
}

/// Correlate `src` with `kernel`, saturating each result into `0..=255`.
///
/// For output pixel `(x, y)` and kernel anchor `(ar, ac)`:
/// `sum(k[p][q] * src[y + p - ar][x + q - ac]) / divisor + bias`, with
/// out-of-frame coordinates mapped back in by `border`.
pub fn convolve(src: &Frame, kernel: &Kernel, border: BorderPolicy) -> Result<Frame, StageError> {
    if src.is_empty() {
        return Err(StageError::EmptyFrame {
            width: src.width(),
            height: src.height(),
        });
    }

    let (width, height, channels) = (src.width(), src.height(), src.channels());
    let n = kernel.size();
    let (anchor_row, anchor_col) = kernel.anchor();
    let weights = kernel.weights();
    let divisor = kernel.divisor();
    let bias = kernel.bias();

    // Border-resolved source rows/columns for every output coordinate and kernel tap.
    let rows = tap_indices(height, n, anchor_row, border);
    let cols = tap_indices(width, n, anchor_col, border);

    let data = src.as_bytes();
    let mut out = Vec::with_capacity(data.len());
    let mut acc = vec![0f32; channels];

    for y in 0..height {
        let src_rows = &rows[y * n..(y + 1) * n];
        for x in 0..width {
            let src_cols = &cols[x * n..(x + 1) * n];
            acc.fill(0.0);

            for (p, &sy) in src_rows.iter().enumerate() {
                let row_base = sy * width;
                for (q, &sx) in src_cols.iter().enumerate() {
                    let w = weights[p * n + q];
                    if w == 0.0 {
                        continue;
                    }
                    let base = (row_base + sx) * channels;
                    for (ch, a) in acc.iter_mut().enumerate() {
                        *a += w * data[base + ch] as f32;
                    }
                }
            }

            out.extend(acc.iter().map(|&a| saturate(a / divisor + bias)));
        }
    }

    Ok(Frame::new(width, height, channels, out)?)
}

fn tap_indices(len: usize, n: usize, anchor: usize, border: BorderPolicy) -> Vec<usize> {
    let mut indices = Vec::with_capacity(len * n);
    for i in 0..len {
        for tap in 0..n {
            let pos = i as isize + tap as isize - anchor as isize;
            indices.push(resolve(border, pos, len));
        }
    }
    indices
}

/// Round to nearest and clamp into the displayable range.
fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_filter_common::frame::{GRAY, RGB};
    use frame_filter_common::kernel::Normalization;

    fn gray(rows: [[u8; 5]; 5]) -> Frame {
        Frame::new(5, 5, GRAY, rows.concat()).unwrap()
    }

    fn ramp() -> Frame {
        gray([
            [10, 20, 30, 40, 50],
            [60, 70, 80, 90, 100],
            [110, 120, 130, 140, 150],
            [160, 170, 180, 190, 200],
            [210, 220, 230, 240, 250],
        ])
    }

    #[test]
    fn identity_kernel_reproduces_source() {
        let src = Frame::from_fn(6, 4, RGB, |x, y, ch| (x * 40 + y * 13 + ch * 77) as u8).unwrap();
        let kernel = Kernel::identity(3).unwrap();
        let out = convolve(&src, &kernel, BorderPolicy::Reflect101).unwrap();
        assert_eq!(out, src);

        let stage = Convolution::new(
            SharedKernel::new(Kernel::identity(5).unwrap()),
            BorderPolicy::Reflect101,
            OutputDepth::Same,
        );
        assert_eq!(stage.apply(&src).unwrap(), src);
    }

    #[test]
    fn box_blur_on_ramp_with_reflect101_corners() {
        let kernel = Kernel::filled(3, 1.0).unwrap();
        assert_eq!(kernel.divisor(), 9.0);
        let out = convolve(&ramp(), &kernel, BorderPolicy::Reflect101).unwrap();
        let expected = gray([
            [50, 53, 63, 73, 77],
            [67, 70, 80, 90, 93],
            [117, 120, 130, 140, 143],
            [167, 170, 180, 190, 193],
            [183, 187, 197, 207, 210],
        ]);
        assert_eq!(out, expected);
    }

    #[test]
    fn box_blur_on_ramp_with_replicated_edges() {
        let kernel = Kernel::filled(3, 1.0).unwrap();
        let out = convolve(&ramp(), &kernel, BorderPolicy::Replicate).unwrap();
        let expected = gray([
            [30, 37, 47, 57, 63],
            [63, 70, 80, 90, 97],
            [113, 120, 130, 140, 147],
            [163, 170, 180, 190, 197],
            [197, 203, 213, 223, 230],
        ]);
        assert_eq!(out, expected);
    }

    #[test]
    fn corner_pixel_is_not_duplicated_by_reflection() {
        let src = gray([
            [0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0],
            [0, 0, 90, 0, 0],
            [0, 0, 0, 0, 0],
            [0, 0, 0, 0, 200],
        ]);
        let out = convolve(&src, &Kernel::filled(3, 1.0).unwrap(), BorderPolicy::Reflect101).unwrap();
        // Reflect-with-edge would count the corner four times (200 * 4 / 9 = 89).
        let expected = gray([
            [0, 0, 0, 0, 0],
            [0, 10, 10, 10, 0],
            [0, 10, 10, 10, 0],
            [0, 10, 10, 32, 22],
            [0, 0, 0, 22, 22],
        ]);
        assert_eq!(out, expected);
    }

    #[test]
    fn results_saturate_instead_of_wrapping() {
        let src = Frame::new(3, 1, GRAY, vec![200, 200, 200]).unwrap();
        let mut doubling = Kernel::identity(3).unwrap();
        doubling.set_weight(1, 1, 2.0).unwrap();
        let out = convolve(&src, &doubling, BorderPolicy::Reflect101).unwrap();
        assert_eq!(out.as_bytes(), &[255, 255, 255]);

        let mut negate = Kernel::identity(3).unwrap();
        negate.set_weight(1, 1, -1.0).unwrap();
        let out = convolve(&src, &negate, BorderPolicy::Reflect101).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 0]);
    }

    #[test]
    fn bias_is_added_after_normalization() {
        let src = Frame::new(2, 2, GRAY, vec![90, 90, 90, 90]).unwrap();
        let kernel = Kernel::filled(3, 1.0).unwrap().with_bias(5.0);
        let out = convolve(&src, &kernel, BorderPolicy::Reflect101).unwrap();
        assert_eq!(out.as_bytes(), &[95, 95, 95, 95]);

        let unit = Kernel::filled(3, 1.0)
            .unwrap()
            .with_normalization(Normalization::Unit)
            .with_bias(-700.0);
        let out = convolve(&src, &unit, BorderPolicy::Reflect101).unwrap();
        // 9 * 90 - 700 = 110
        assert_eq!(out.as_bytes(), &[110, 110, 110, 110]);
    }

    #[test]
    fn anchor_shifts_the_window() {
        let src = Frame::new(3, 1, GRAY, vec![10, 20, 30]).unwrap();
        // Only the top-left tap is set; with a (0, 0) anchor it reads (x + 0, y + 0).
        let mut kernel = Kernel::filled(3, 0.0)
            .unwrap()
            .with_normalization(Normalization::Unit);
        kernel.set_weight(0, 2, 1.0).unwrap();
        let centred = convolve(&src, &kernel, BorderPolicy::Reflect101).unwrap();
        // Centre anchor: tap (0, 2) reads x + 1.
        assert_eq!(centred.as_bytes(), &[20, 30, 20]);

        let shifted = kernel.with_anchor(0, 2).unwrap();
        let out = convolve(&src, &shifted, BorderPolicy::Reflect101).unwrap();
        assert_eq!(out.as_bytes(), &[10, 20, 30]);
    }

    #[test]
    fn grayscale_output_collapses_channels() {
        let src = Frame::new(2, 1, RGB, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let stage = Convolution::new(
            SharedKernel::new(Kernel::identity(3).unwrap()),
            BorderPolicy::Reflect101,
            OutputDepth::Grayscale,
        );
        let out = stage.apply(&src).unwrap();
        assert_eq!(out.channels(), GRAY);
        assert_eq!(out.as_bytes(), &[76, 150]);
    }

    #[test]
    fn empty_frame_is_an_error() {
        let stage = Convolution::new(
            SharedKernel::new(Kernel::filled(3, 1.0).unwrap()),
            BorderPolicy::Reflect101,
            OutputDepth::Same,
        );
        for (w, h) in [(0, 0), (0, 4), (4, 0)] {
            let empty = Frame::new(w, h, RGB, Vec::new()).unwrap();
            assert!(matches!(
                stage.apply(&empty),
                Err(StageError::EmptyFrame { .. })
            ));
        }
    }

    #[test]
    fn single_pixel_frame_reflects_onto_itself() {
        let src = Frame::new(1, 1, GRAY, vec![42]).unwrap();
        let out = convolve(&src, &Kernel::filled(5, 1.0).unwrap(), BorderPolicy::Reflect101).unwrap();
        assert_eq!(out.as_bytes(), &[42]);
    }
}
