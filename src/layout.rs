//! Grid contact sheets.
//!
//! Every sheet has a uniform margin of `gap` pixels on all four sides and
//! `gap` pixels between neighbouring cells:
//!
//! ```text
//! width  = columns * cell_width + (columns + 1) * gap
//! height = rows * (cell_height + caption_height) + (rows + 1) * gap
//! ```
//!
//! Item `i` is placed at column `i % columns`, row `i / columns`.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

use crate::error::SheetError;

/// Layout parameters for a contact sheet.
#[derive(Debug, Clone)]
pub struct GridLayoutSpec {
    /// Fixed cell size; `None` takes the size of the first item.
    pub cell_size: Option<(u32, u32)>,
    /// Height of the band reserved for a caption under each cell.
    pub caption_height: u32,
    pub gap: u32,
    pub columns: u32,
    pub background: Rgb<u8>,
}

impl GridLayoutSpec {
    /// Channel variant sheet: three columns, 75 px caption band, 15 px gaps.
    pub fn variant_sheet() -> Self {
        Self {
            cell_size: None,
            caption_height: 75,
            gap: 15,
            columns: 3,
            background: Rgb([215, 220, 220]),
        }
    }

    /// Face sheet: five 100 px cells per row, packed edge to edge.
    pub fn face_sheet(thumb_size: u32) -> Self {
        Self {
            cell_size: Some((thumb_size, thumb_size)),
            caption_height: 0,
            gap: 0,
            columns: 5,
            background: Rgb([12, 12, 30]),
        }
    }

    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_caption_height(mut self, caption_height: u32) -> Self {
        self.caption_height = caption_height;
        self
    }

    /// Resolve the cell size, row count and canvas size for `item_count` items.
    ///
    /// Fails with [`SheetError::LayoutTooLarge`] when the canvas would not fit
    /// in `u32` pixels on either axis.
    pub fn geometry(&self, first: &DynamicImage, item_count: usize) -> Result<GridGeometry, SheetError> {
        if item_count == 0 {
            return Err(SheetError::EmptyInput);
        }
        let (cell_width, cell_height) = self.cell_size.unwrap_or_else(|| first.dimensions());
        let columns = self.columns.max(1);
        let rows = (item_count as u64).div_ceil(columns as u64);

        let too_large = || SheetError::LayoutTooLarge { columns: columns as u64, rows };
        let width = extent(columns as u64, cell_width as u64, self.gap).ok_or_else(too_large)?;
        let height = (cell_height as u64)
            .checked_add(self.caption_height as u64)
            .and_then(|cell| extent(rows, cell, self.gap))
            .ok_or_else(too_large)?;

        Ok(GridGeometry {
            cell_width,
            cell_height,
            caption_height: self.caption_height,
            gap: self.gap,
            columns,
            rows: u32::try_from(rows).map_err(|_| too_large())?,
            width,
            height,
        })
    }
}

/// `count * cell + (count + 1) * gap`, or `None` when it overflows `u32`.
fn extent(count: u64, cell: u64, gap: u32) -> Option<u32> {
    let cells = count.checked_mul(cell)?;
    let gaps = count.checked_add(1)?.checked_mul(gap as u64)?;
    u32::try_from(cells.checked_add(gaps)?).ok()
}

/// Resolved sheet geometry. All placement math is a pure function of this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub cell_width: u32,
    pub cell_height: u32,
    pub caption_height: u32,
    pub gap: u32,
    pub columns: u32,
    pub rows: u32,
    /// Canvas width, checked against overflow when the geometry was resolved.
    pub width: u32,
    pub height: u32,
}

impl GridGeometry {
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Top-left corner of cell `index`.
    ///
    /// Exact for every index below `columns * rows`; indices past the grid
    /// saturate instead of wrapping.
    pub fn position(&self, index: usize) -> (u32, u32) {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        let column = index % self.columns;
        let row = index / self.columns;
        let pitch_x = self.cell_width.saturating_add(self.gap);
        let pitch_y = self
            .cell_height
            .saturating_add(self.caption_height)
            .saturating_add(self.gap);
        (
            self.gap.saturating_add(column.saturating_mul(pitch_x)),
            self.gap.saturating_add(row.saturating_mul(pitch_y)),
        )
    }

    /// Top-left corner of the caption band under cell `index`.
    pub fn caption_position(&self, index: usize) -> (u32, u32) {
        let (x, y) = self.position(index);
        (x, y.saturating_add(self.cell_height))
    }
}

/// Font and colors used for captions.
pub struct CaptionStyle {
    font: FontVec,
    pub scale: f32,
    pub color: Rgb<u8>,
    /// Left inset of the text inside the caption band.
    pub inset: u32,
}

impl CaptionStyle {
    pub fn new(font: FontVec, scale: f32) -> Self {
        Self {
            font,
            scale,
            color: Rgb([12, 12, 12]),
            inset: 25,
        }
    }

    pub fn from_bytes(data: Vec<u8>, scale: f32) -> Result<Self, SheetError> {
        let font = FontVec::try_from_vec(data).map_err(|e| SheetError::Font(e.to_string()))?;
        Ok(Self::new(font, scale))
    }

    pub fn load(path: impl AsRef<Path>, scale: f32) -> Result<Self, SheetError> {
        Self::from_bytes(std::fs::read(path)?, scale)
    }

    /// Render `text` into a band of the given size. Text that does not fit
    /// is clipped at the band's edges.
    fn render_band(&self, text: &str, width: u32, height: u32, background: Rgb<u8>) -> RgbImage {
        let mut band = RgbImage::from_pixel(width, height, background);
        let y = height.saturating_sub(self.scale.round() as u32) / 2;
        draw_text_mut(
            &mut band,
            self.color,
            self.inset as i32,
            y as i32,
            PxScale::from(self.scale),
            &self.font,
            text,
        );
        band
    }
}

/// One cell's content.
pub struct SheetItem<'a> {
    pub image: &'a DynamicImage,
    pub caption: Option<&'a str>,
}

impl<'a> SheetItem<'a> {
    pub fn new(image: &'a DynamicImage) -> Self {
        Self { image, caption: None }
    }

    pub fn captioned(image: &'a DynamicImage, caption: &'a str) -> Self {
        Self { image, caption: Some(caption) }
    }
}

/// A composed contact sheet and the geometry it was laid out with.
pub struct ContactSheet {
    pub image: DynamicImage,
    pub geometry: GridGeometry,
}

impl ContactSheet {
    /// Lay out `items` row by row on a fresh canvas.
    ///
    /// Items larger than a cell are clipped to the cell; smaller ones sit in
    /// its top-left corner. Captions are drawn only when both a caption and a
    /// style are given and the spec reserves a caption band.
    pub fn compose(
        items: &[SheetItem<'_>],
        spec: &GridLayoutSpec,
        captions: Option<&CaptionStyle>,
    ) -> Result<Self, SheetError> {
        let first = items.first().ok_or(SheetError::EmptyInput)?;
        let geometry = spec.geometry(first.image, items.len())?;
        let (width, height) = geometry.canvas_size();
        debug!(width, height, rows = geometry.rows, columns = geometry.columns, "composing sheet");

        let mut canvas = RgbImage::from_pixel(width, height, spec.background);

        for (index, item) in items.iter().enumerate() {
            let (x, y) = geometry.position(index);
            let cell = fit_to_cell(item.image, geometry.cell_width, geometry.cell_height);
            image::imageops::replace(&mut canvas, &cell, x.into(), y.into());

            if let (Some(text), Some(style)) = (item.caption, captions) {
                if geometry.caption_height == 0 {
                    continue;
                }
                let band = style.render_band(
                    text,
                    geometry.cell_width,
                    geometry.caption_height,
                    spec.background,
                );
                let (bx, by) = geometry.caption_position(index);
                image::imageops::replace(&mut canvas, &band, bx.into(), by.into());
            }
        }

        Ok(Self {
            image: DynamicImage::ImageRgb8(canvas),
            geometry,
        })
    }
}

fn fit_to_cell(image: &DynamicImage, cell_width: u32, cell_height: u32) -> RgbImage {
    let rgb = image.to_rgb8();
    if rgb.width() <= cell_width && rgb.height() <= cell_height {
        return rgb;
    }
    let width = rgb.width().min(cell_width);
    let height = rgb.height().min(cell_height);
    image::imageops::crop_imm(&rgb, 0, 0, width, height).to_image()
}
