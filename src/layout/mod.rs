//! Page geometry, height measurement and the page flow engine.

mod flow;
mod measure;
mod wrap;

pub use flow::{FlowOptions, Page, PageFlowEngine, PlacedBlock, layout};
pub use measure::{RowLayout, TextBlockLayout, TextMeasurer};
pub use wrap::{TextLine, wrap_text};

use crate::content::ContentBlock;

/// Standard paper sizes, in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.276, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Printable canvas of one sheet. `top_inset` is reserved for pre-printed
/// letterhead and `bottom_inset` for the page footer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub printable_width: f32,
    pub printable_height: f32,
    pub top_inset: f32,
    pub bottom_inset: f32,
    pub content_width: f32,
}

impl PageGeometry {
    pub const MAX_TOP_INSET_FRACTION: f32 = 0.35;

    pub fn new(
        printable_width: f32,
        printable_height: f32,
        top_inset: f32,
        bottom_inset: f32,
        content_width: f32,
    ) -> Self {
        Self {
            printable_width,
            printable_height,
            top_inset,
            bottom_inset,
            content_width,
        }
        .normalized()
    }

    /// Geometry for a paper size with equal left/right margins.
    pub fn for_paper(size: PageSize, top_inset: f32, bottom_inset: f32, side_margin: f32) -> Self {
        let (w, h) = size.dimensions();
        Self::new(w, h, top_inset, bottom_inset, w - 2.0 * side_margin)
    }

    /// Clamp insets and width into a usable page: the top inset never takes
    /// more than 35% of the height, and the content never exceeds the canvas.
    pub fn normalized(self) -> Self {
        let h = self.printable_height.max(0.0);
        let w = self.printable_width.max(0.0);
        let top = self.top_inset.clamp(0.0, h * Self::MAX_TOP_INSET_FRACTION);
        Self {
            printable_width: w,
            printable_height: h,
            top_inset: top,
            bottom_inset: self.bottom_inset.clamp(0.0, h),
            content_width: self.content_width.clamp(0.0, w),
        }
    }

    /// Height available to flowing content on every page.
    pub fn usable_height(&self) -> f32 {
        (self.printable_height - self.top_inset - self.bottom_inset).max(0.0)
    }

    /// Left edge of the (horizontally centred) content column.
    pub fn content_left(&self) -> f32 {
        (self.printable_width - self.content_width) / 2.0
    }
}

/// Height of constructed content at a committed width. Implementations must
/// resolve wrapping at exactly `width`, not at an intrinsic size.
pub trait Measure {
    fn measure(&self, block: &ContentBlock, width: f32) -> f32;

    /// Height of blocks stacked top to bottom, as realized on a page.
    fn measure_stack(&self, blocks: &[ContentBlock], width: f32) -> f32 {
        blocks.iter().map(|b| self.measure(b, width)).sum()
    }
}
