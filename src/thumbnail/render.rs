//! Preview renderer built on the `image` crate.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use tempfile::TempDir;

use super::{ThumbnailError, ThumbnailRenderer, ThumbnailStyle};
use crate::ocr::{normalize_doc_type, DocumentKind};

/// Margin around the image for the uniform style, in pixels.
const UNIFORM_MARGIN: u32 = 12;

const CANVAS: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BORDER: Rgba<u8> = Rgba([208, 208, 208, 255]);

/// DPI used when rasterising a PDF page.
const PDF_RENDER_DPI: &str = "150";

/// Renders PDFs (first page) and common raster formats.
#[derive(Debug, Default)]
pub struct ImageRenderer;

impl ImageRenderer {
    pub fn new() -> Self {
        Self
    }

    fn load_source(&self, source: &Path) -> Result<DynamicImage, ThumbnailError> {
        let doc_type = source
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_doc_type)
            .unwrap_or_default();

        match DocumentKind::from_doc_type(&doc_type) {
            Some(DocumentKind::Pdf) => {
                let temp_dir = TempDir::new()?;
                let page = rasterise_first_page(source, temp_dir.path())?;
                Ok(ImageReader::open(&page)?.decode()?)
            }
            _ => Ok(ImageReader::open(source)?
                .with_guessed_format()?
                .decode()?),
        }
    }
}

/// Convert the first page of a PDF to a PNG inside `output_dir`.
fn rasterise_first_page(pdf_path: &Path, output_dir: &Path) -> Result<PathBuf, ThumbnailError> {
    let prefix = output_dir.join("page");
    let status = Command::new("pdftoppm")
        .args(["-png", "-r", PDF_RENDER_DPI, "-f", "1", "-l", "1", "-singlefile"])
        .arg(pdf_path)
        .arg(&prefix)
        .status();

    match status {
        Ok(s) if s.success() => {
            let page = prefix.with_extension("png");
            if page.exists() {
                Ok(page)
            } else {
                Err(ThumbnailError::Render(
                    "pdftoppm produced no page image".to_string(),
                ))
            }
        }
        Ok(_) => Err(ThumbnailError::Render(
            "pdftoppm failed to convert PDF page".to_string(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ThumbnailError::ToolNotFound("pdftoppm".to_string()))
        }
        Err(e) => Err(ThumbnailError::Io(e)),
    }
}

/// Resize `img` to `width` and apply `style`. The result is exactly `width`
/// pixels wide.
pub(crate) fn style_image(img: &DynamicImage, width: u32, style: ThumbnailStyle) -> RgbaImage {
    match style {
        ThumbnailStyle::Plain => img
            .resize(width, width.saturating_mul(10), FilterType::Lanczos3)
            .to_rgba8(),
        ThumbnailStyle::Uniform => {
            let inner_width = width.saturating_sub(2 * UNIFORM_MARGIN).max(1);
            let inner = img
                .resize(inner_width, inner_width.saturating_mul(10), FilterType::Lanczos3)
                .to_rgba8();
            let height = inner.height() + 2 * UNIFORM_MARGIN;

            let mut canvas = RgbaImage::from_pixel(width, height, CANVAS);
            let x = i64::from((width - inner.width()) / 2);
            imageops::overlay(&mut canvas, &inner, x, i64::from(UNIFORM_MARGIN));

            for px in 0..width {
                canvas.put_pixel(px, 0, BORDER);
                canvas.put_pixel(px, height - 1, BORDER);
            }
            for py in 0..height {
                canvas.put_pixel(0, py, BORDER);
                canvas.put_pixel(width - 1, py, BORDER);
            }
            canvas
        }
    }
}

impl ThumbnailRenderer for ImageRenderer {
    fn render(
        &self,
        source: &Path,
        dest: &Path,
        width: u32,
        style: ThumbnailStyle,
    ) -> Result<(), ThumbnailError> {
        if width == 0 {
            return Err(ThumbnailError::Render("width must be positive".to_string()));
        }
        let img = self.load_source(source)?;
        let styled = style_image(&img, width, style);
        styled.save_with_format(dest, ImageFormat::Png)?;
        Ok(())
    }
}
