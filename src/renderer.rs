/// Annotation renderer
///
/// Draws each subject's skeleton (`SKELETON` connections, then keypoints) onto a copy
/// of the canvas. Subjects are drawn in detection order, additively.
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::config::AnnotationMode;
use crate::types::SubjectPose;
use crate::SKELETON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub point_radius: i32,
    pub line_thickness: u32,
    pub connection_color: Rgb<u8>,
    pub left_color: Rgb<u8>,
    pub right_color: Rgb<u8>,
    pub center_color: Rgb<u8>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            point_radius: 3,
            line_thickness: 2,
            connection_color: Rgb([224, 224, 224]),
            left_color: Rgb([255, 138, 0]),
            right_color: Rgb([0, 217, 231]),
            center_color: Rgb([255, 255, 255]),
        }
    }
}

impl AnnotationStyle {
    // COCO order: 0 nose, then left/right pairs (odd = left, even = right)
    fn point_color(&self, index: usize) -> Rgb<u8> {
        match index {
            0 => self.center_color,
            i if i % 2 == 1 => self.left_color,
            _ => self.right_color,
        }
    }
}

/// Canvas for one frame under the configured annotation mode.
pub fn canvas_for(
    mode: AnnotationMode,
    frame: &RgbImage,
    (width, height): (u32, u32),
    background: Rgb<u8>,
) -> RgbImage {
    match mode {
        AnnotationMode::Overlay => frame.clone(),
        AnnotationMode::Blank => RgbImage::from_pixel(width, height, background),
    }
}

pub fn render(canvas: &RgbImage, subjects: &[SubjectPose]) -> RgbImage {
    render_with(canvas, subjects, &AnnotationStyle::default())
}

pub fn render_with(
    canvas: &RgbImage,
    subjects: &[SubjectPose],
    style: &AnnotationStyle,
) -> RgbImage {
    let mut annotated = canvas.clone();
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    for subject in subjects {
        let pixels: Vec<(f32, f32)> = subject
            .keypoints
            .iter()
            .map(|k| (k.x * w, k.y * h))
            .collect();

        for &(a, b) in SKELETON.iter() {
            if let (Some(&start), Some(&end)) = (pixels.get(a), pixels.get(b)) {
                draw_thick_line(
                    &mut annotated,
                    start,
                    end,
                    style.line_thickness,
                    style.connection_color,
                );
            }
        }

        for (i, &(x, y)) in pixels.iter().enumerate() {
            draw_filled_circle_mut(
                &mut annotated,
                (x.round() as i32, y.round() as i32),
                style.point_radius,
                style.point_color(i),
            );
        }
    }

    annotated
}

fn draw_thick_line(
    canvas: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: Rgb<u8>,
) {
    let steps = thickness.max(1) as i32;
    let mut segment = |dx: f32, dy: f32| {
        draw_line_segment_mut(
            canvas,
            (start.0 + dx, start.1 + dy),
            (end.0 + dx, end.1 + dy),
            color,
        )
    };
    for t in 0..steps {
        let offset = (t - steps / 2) as f32;
        segment(offset, 0.0);
        if t != steps / 2 {
            segment(0.0, offset);
        }
    }
}
