//! obrapdf renders one resolved daily construction report into a paginated PDF
//! document: a summary page sequence with wrapped text blocks (identity header,
//! general comment, activity lists, incidents, metrics), followed by one full
//! page per photo.
//!
//! The crate deliberately consumes an already-resolved `ReportRecord` and an
//! asset-fetch capability: fetching the record from the store, validating the
//! submission and uploading the photos are the surrounding application's job.
//! The entry point is `render::export_report`, which returns the finished byte
//! buffer together with the download filename, or a single error when document
//! assembly itself fails; individual asset failures are logged and skipped,
//! never fatal.

/// The data model of one report: the read-only `ReportRecord`, the `MetricsRow`
/// tagged union and the display helpers.
///
/// The upstream store does not tag the metric rows; their shape is recognized by
/// key presence. That recognition happens exactly once, at the deserialization
/// boundary in this module, so the rest of the crate only ever sees an already
/// disambiguated variant. Rows matching neither recognized shape survive as the
/// `Opaque` variant and render through a structured fallback instead of being
/// rejected.
pub mod report;

/// This module contains the `ExportError` type which is the error type used
/// throughout this library.
///
/// The `ExportError` type is always returned from a `Result` type, which means
/// that the end user can expect to obtain an explanation whenever a function
/// returns an error. If an error happened in a function which was called inside
/// a function of this library, then the user can expect to also obtain
/// information about this propagated error.
pub mod error;

/// The two built-in faces (Helvetica and Helvetica-Bold) and the pure text
/// measurement the wrapping relies on. No font data is loaded or embedded: both
/// faces belong to the standard set every PDF renderer must provide, and their
/// published metrics are carried as width tables.
pub mod fonts;

/// The module where the `PdfDocument` interface for working with PDF documents
/// is presented: in-memory pages with their content operations and images,
/// lowered into the `lopdf` object graph on finalization. Image decoding lives
/// here too, with the JPEG-first, PNG-fallback policy of the export.
pub mod pdf;

/// The pure word-greedy text wrapping with its hard character-break fallback.
pub mod wrap;

/// The `PageCursor` pagination primitive: `ensure_space` and `write_line`, the
/// only two operations through which the drawers touch the page.
pub mod cursor;

/// The content-block drawers and the `export_report` entry point, together with
/// the `AssetFetcher` seam the logo and photo fetches go through.
pub mod render;
