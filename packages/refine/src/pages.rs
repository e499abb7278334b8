//! Page image sources.
//!
//! Refinement never renders PDFs itself. A [`PageImageSource`] hands out
//! page sizes and PNG crops; [`RasterPages`] implements it over page images
//! that were rasterized ahead of time.

use std::io::Cursor;
use std::path::Path;

use form_labeler_labels_models::{PageSize, Rect};
use image::{DynamicImage, GenericImageView as _, ImageFormat};

use crate::RefineError;

/// Points per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// Supplies page geometry and cropped page images.
pub trait PageImageSource: Send + Sync {
    /// Size of a 0-based page in points, if the page exists.
    fn page_size(&self, page: u32) -> Option<PageSize>;

    /// Renders a page-relative region of a page as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RefineError`] if the page does not exist, the region is
    /// empty, or encoding fails.
    fn render_crop(&self, page: u32, region: &Rect) -> Result<Vec<u8>, RefineError>;
}

/// Pre-rendered page images, one per page, all at the same resolution.
#[derive(Debug, Clone)]
pub struct RasterPages {
    pages: Vec<DynamicImage>,
    dpi: f64,
}

impl RasterPages {
    /// Wraps images rendered at `dpi` dots per inch.
    #[must_use]
    pub const fn new(pages: Vec<DynamicImage>, dpi: f64) -> Self {
        Self { pages, dpi }
    }

    /// Loads page images from disk, in page order.
    ///
    /// # Errors
    ///
    /// Returns [`RefineError::Image`] if any file cannot be decoded.
    pub fn open<P: AsRef<Path>>(paths: &[P], dpi: f64) -> Result<Self, RefineError> {
        let pages = paths
            .iter()
            .map(|path| -> Result<DynamicImage, RefineError> {
                let img = image::open(path.as_ref())?;
                log::debug!(
                    "Loaded page image {} ({}x{})",
                    path.as_ref().display(),
                    img.width(),
                    img.height()
                );
                Ok(img)
            })
            .collect::<Result<Vec<_>, RefineError>>()?;
        Ok(Self::new(pages, dpi))
    }

    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if there are no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn page(&self, page: u32) -> Option<&DynamicImage> {
        self.pages.get(usize::try_from(page).ok()?)
    }
}

/// Scales a relative coordinate to a pixel index in `[0, max]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixel(value: f64, max: u32, round_up: bool) -> u32 {
    let scaled = value * f64::from(max);
    let scaled = if round_up { scaled.ceil() } else { scaled.floor() };
    scaled.clamp(0.0, f64::from(max)) as u32
}

impl PageImageSource for RasterPages {
    fn page_size(&self, page: u32) -> Option<PageSize> {
        let img = self.page(page)?;
        let scale = POINTS_PER_INCH / self.dpi;
        Some(PageSize::new(
            f64::from(img.width()) * scale,
            f64::from(img.height()) * scale,
        ))
    }

    fn render_crop(&self, page: u32, region: &Rect) -> Result<Vec<u8>, RefineError> {
        let img = self.page(page).ok_or_else(|| RefineError::Crop {
            message: format!("no image for page {page}"),
        })?;
        let (w, h) = img.dimensions();

        let x0 = to_pixel(region.x0, w, false);
        let y0 = to_pixel(region.y0, h, false);
        let x1 = to_pixel(region.x1, w, true);
        let y1 = to_pixel(region.y1, h, true);

        if x1 <= x0 || y1 <= y0 {
            return Err(RefineError::Crop {
                message: format!("empty crop region on page {page}"),
            });
        }

        let cropped = img.crop_imm(x0, y0, x1 - x0, y1 - y0);
        let mut buf = Cursor::new(Vec::new());
        cropped.write_to(&mut buf, ImageFormat::Png)?;

        Ok(buf.into_inner())
    }
}
