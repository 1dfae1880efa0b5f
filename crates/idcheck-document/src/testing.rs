// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixtures for tests in this and downstream crates (feature `test-support`).

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use idcheck_core::error::IdCheckError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::extract::TextRecognizer;

/// Build a PDF with one page per entry in `pages`, each drawing that string
/// in Courier. An empty entry produces a page with no text.
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap_or_default(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("in-memory PDF serialisation");
    out
}

/// A photo-like grey ramp, encoded as `format`. Passes both tamper heuristics
/// at their stock thresholds.
pub fn card_photo(format: ImageFormat) -> Vec<u8> {
    let (width, height) = (160u32, 100u32);
    let image = RgbImage::from_fn(width, height, |x, _| {
        let v = (40 + x * 160 / (width - 1)) as u8;
        Rgb([v, v, v])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut out), format)
        .expect("in-memory image encoding");
    out
}

/// A single flat colour, encoded as PNG. Trips the over-smoothing heuristic.
pub fn flat_photo() -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("in-memory image encoding");
    out
}

/// Recognizer that returns fixed text and counts how often it was asked.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    text: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    /// Always recognise `text`.
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with an OCR error.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, IdCheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| IdCheckError::OcrError("scripted failure".into()))
    }
}
