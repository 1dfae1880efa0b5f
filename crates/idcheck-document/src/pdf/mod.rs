// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — loading uploaded PDFs and pulling their embedded text.

pub mod reader;

pub use reader::PdfReader;
