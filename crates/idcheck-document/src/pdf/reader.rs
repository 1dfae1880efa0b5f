// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — load uploaded PDF documents and extract their embedded text
// using the `lopdf` crate.

use idcheck_core::error::IdCheckError;
use lopdf::Document;
use tracing::{debug, info, instrument, warn};

/// Read-only view of a PDF document.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, IdCheckError> {
        let document = Document::load_mem(data).map_err(|err| {
            IdCheckError::PdfError(format!("failed to load PDF from memory: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Extraction -----------------------------------------------------------

    /// Text of a single page (1-indexed). A page with no text layer yields an
    /// empty string.
    pub fn page_text(&self, page_number: u32) -> Result<String, IdCheckError> {
        let pages = self.document.get_pages();
        if !pages.contains_key(&page_number) {
            return Err(IdCheckError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            )));
        }

        self.document
            .extract_text(&[page_number])
            .map_err(|err| IdCheckError::PdfError(format!("page {page_number}: {err}")))
    }

    /// Concatenate the text of every page in page order, with no separator.
    ///
    /// A page whose content cannot be decoded contributes nothing; only a
    /// document that fails to load is an error.
    #[instrument(skip(self), fields(pages = self.page_count()))]
    pub fn extract_text(&self) -> String {
        // `get_pages` is a BTreeMap keyed by page number, so iteration is in order.
        let mut text = String::new();
        for &page_number in self.document.get_pages().keys() {
            match self.page_text(page_number) {
                Ok(page) => text.push_str(&page),
                Err(err) => warn!(page_number, %err, "Skipping unreadable page"),
            }
        }

        info!(chars = text.len(), "PDF text extracted");
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::text_pdf;

    #[test]
    fn reads_page_count() {
        let reader = PdfReader::from_bytes(&text_pdf(&["one", "two", "three"])).unwrap();
        assert_eq!(reader.page_count(), 3);
    }

    #[test]
    fn extracts_text_in_page_order() {
        let reader =
            PdfReader::from_bytes(&text_pdf(&["Government of India", "2345 6789 0124"])).unwrap();
        let text = reader.extract_text();

        let authority = text.find("Government of India").expect("page 1 text");
        let number = text.find("2345 6789 0124").expect("page 2 text");
        assert!(authority < number);
    }

    #[test]
    fn textless_page_contributes_nothing() {
        let reader = PdfReader::from_bytes(&text_pdf(&[""])).unwrap();
        assert!(reader.extract_text().trim().is_empty());
    }

    #[test]
    fn page_out_of_range_is_error() {
        let reader = PdfReader::from_bytes(&text_pdf(&["x"])).unwrap();
        assert!(matches!(reader.page_text(2), Err(IdCheckError::PdfError(_))));
    }

    #[test]
    fn garbage_fails_to_load() {
        let result = PdfReader::from_bytes(b"%PDF-1.4 truncated garbage");
        assert!(matches!(result, Err(IdCheckError::PdfError(_))));
    }
}
