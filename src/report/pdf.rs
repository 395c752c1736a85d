//! PDF assembly: one chart bitmap per landscape A4 page
//!
//! Text (headings, captions) is set with the built-in Helvetica font;
//! chart bitmaps are embedded as raw RGB image XObjects.

use super::chart::ChartImage;
use crate::error::PipelineError;
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Px,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PAGE_WIDTH_MM: f64 = 297.0;
const PAGE_HEIGHT_MM: f64 = 210.0;
const MARGIN_MM: f64 = 14.0;
const IMAGE_DPI: f64 = 120.0;

fn render_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Render(e.to_string())
}

/// Incrementally built multi-page report
pub struct PdfReport {
    doc: PdfDocumentReference,
    font: printpdf::IndirectFontRef,
    // The document is created with one blank page; reuse it first
    pending_first: Option<(PdfPageIndex, PdfLayerIndex)>,
}

impl PdfReport {
    pub fn new(title: &str) -> Result<Self, PipelineError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM as _), Mm(PAGE_HEIGHT_MM as _), "content");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_err)?;
        Ok(Self {
            doc,
            font,
            pending_first: Some((page, layer)),
        })
    }

    fn next_layer(&mut self) -> PdfLayerReference {
        match self.pending_first.take() {
            Some((page, layer)) => self.doc.get_page(page).get_layer(layer),
            None => {
                let (page, layer) =
                    self.doc
                        .add_page(Mm(PAGE_WIDTH_MM as _), Mm(PAGE_HEIGHT_MM as _), "content");
                self.doc.get_page(page).get_layer(layer)
            }
        }
    }

    fn write_heading(&self, layer: &PdfLayerReference, heading: &str, notes: &[String]) {
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
        layer.use_text(heading, 13.0, Mm(MARGIN_MM as _), Mm(y as _), &self.font);
        for note in notes {
            y -= 6.0;
            layer.use_text(note.as_str(), 9.0, Mm(MARGIN_MM as _), Mm(y as _), &self.font);
        }
    }

    /// Add a page with a heading, caption lines, and one chart bitmap
    pub fn add_chart_page(
        &mut self,
        heading: &str,
        notes: &[String],
        image: &ChartImage,
    ) -> Result<(), PipelineError> {
        let layer = self.next_layer();
        self.write_heading(&layer, heading, notes);

        let xobject = ImageXObject {
            width: Px(image.width as usize),
            height: Px(image.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: image.pixels.clone(),
            image_filter: None,
            clipping_bbox: None,
        };
        // Center horizontally below the heading block
        let width_mm = image.width as f64 / IMAGE_DPI * 25.4;
        let x = ((PAGE_WIDTH_MM - width_mm) / 2.0).max(MARGIN_MM);
        Image::from(xobject).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(x as _)),
                translate_y: Some(Mm(24.0)),
                dpi: Some(IMAGE_DPI as _),
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Add a text-only page (used when nothing qualifies for charting)
    pub fn add_text_page(&mut self, heading: &str, notes: &[String]) -> Result<(), PipelineError> {
        let layer = self.next_layer();
        self.write_heading(&layer, heading, notes);
        Ok(())
    }

    /// Write the document, creating parent directories as needed
    pub fn save(self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::Render(format!(
                        "cannot create output directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let file = File::create(path).map_err(|e| {
            PipelineError::Render(format!(
                "cannot write report to {}: {}",
                path.display(),
                e
            ))
        })?;
        self.doc
            .save(&mut BufWriter::new(file))
            .map_err(render_err)?;
        Ok(())
    }
}
