use crate::types::{Frame, Region};
use crate::video_io::{frame_to_mat, mat_into_frame};
use anyhow::{Context, Result};
use opencv::core::{Point, Rect, Scalar};
use opencv::imgproc;

/// Green bounding box around each qualifying region.
pub fn draw_regions(frame: &mut Frame, regions: &[Region]) -> Result<()> {
    let mut mat = frame_to_mat(frame)?;
    for region in regions {
        let rect = Rect::new(
            region.x as i32,
            region.y as i32,
            region.width as i32,
            region.height as i32,
        );
        imgproc::rectangle(
            &mut mat,
            rect,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            imgproc::LINE_8,
            0,
        )
        .context("failed to draw region rectangle")?;
    }
    mat_into_frame(&mat, frame)
}

/// Red status line shown while the schedule keeps detection off.
pub fn draw_disabled_banner(frame: &mut Frame) -> Result<()> {
    let mut mat = frame_to_mat(frame)?;
    imgproc::put_text(
        &mut mat,
        "Detection disabled (outside schedule)",
        Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        Scalar::new(0.0, 0.0, 255.0, 0.0),
        2,
        imgproc::LINE_8,
        false,
    )
    .context("failed to draw status banner")?;
    mat_into_frame(&mat, frame)
}
