use crate::cursor::{PageCursor, LINE_SPACING, MARGIN};
use crate::error::ExportError;
use crate::fonts::Face;
use crate::pdf::{self, PdfDocument, A4_HEIGHT, A4_WIDTH};
use crate::report::{display_or_placeholder, export_file_name, ReportRecord};
use crate::wrap::wrap_text;

const TITLE_SIZE: f32 = 18.0;
const SECTION_SIZE: f32 = 14.0;
const LABEL_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;
const METRICS_SIZE: f32 = 10.0;
const LIST_INDENT: f32 = 10.0;
const LOGO_WIDTH: f32 = 100.0;
const PHOTO_CAPTION: &str = "Evidencia fotográfica";

/// The asset-fetch capability the export depends on: the logo and every photo go
/// through it, one at a time and in order. Implementations decide the transport;
/// a bounded timeout per fetch is recommended, reported as an ordinary error so
/// the export skips the asset and continues.
pub trait AssetFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ExportError>;
}

/// Caller-tunable knobs of one export.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// URL of the logo drawn in the page header, fetched through the same
    /// `AssetFetcher` as the photos. No logo is drawn when absent.
    pub logo_url: Option<String>,
}

/// The finished document, ready to be offered for download.
#[derive(Debug, Clone)]
pub struct ExportedReport {
    /// The download filename, `reporte_<project>_<date>.pdf`.
    pub file_name: String,
    /// The serialized multi-page PDF.
    pub bytes: Vec<u8>,
}

/// Renders one resolved report into a finished PDF: a summary page sequence with
/// the wrapped text blocks, followed by one full page per photo.
///
/// Asset failures (logo, individual photos) are logged and skipped without
/// aborting; only a failure in document assembly itself propagates, in which case
/// no partial document is returned. The renderer holds no state across calls.
pub fn export_report(
    report: &ReportRecord,
    fetcher: &dyn AssetFetcher,
    options: &ExportOptions,
) -> Result<ExportedReport, ExportError> {
    export_with_serializer(report, fetcher, options, serialize_document)
}

/// Lowers the finished in-memory document into its final byte buffer. Kept as a
/// separate step so the drawing phase can be exercised against a failing
/// serialization.
fn serialize_document(document: &mut PdfDocument) -> Result<Vec<u8>, ExportError> {
    document.write_all()?;
    document.optimize();
    document.save_to_bytes()
}

fn export_with_serializer(
    report: &ReportRecord,
    fetcher: &dyn AssetFetcher,
    options: &ExportOptions,
    serialize: impl FnOnce(&mut PdfDocument) -> Result<Vec<u8>, ExportError>,
) -> Result<ExportedReport, ExportError> {
    let file_name = export_file_name(report);
    let mut document = PdfDocument::new(file_name.trim_end_matches(".pdf"));
    let mut cursor = PageCursor::on_new_page(&mut document, A4_WIDTH, A4_HEIGHT)?;

    draw_header(&mut document, &mut cursor, report, fetcher, options)?;
    draw_general_comment(&mut document, &mut cursor, report)?;
    draw_activities(&mut document, &mut cursor, report)?;
    draw_incidents(&mut document, &mut cursor, report)?;
    draw_metrics(&mut document, &mut cursor, report)?;
    draw_photo_pages(&mut document, report, fetcher)?;

    let bytes = serialize(&mut document)?;

    Ok(ExportedReport { file_name, bytes })
}

/// The logo (best-effort), the document title and the three identity lines.
fn draw_header(
    document: &mut PdfDocument,
    cursor: &mut PageCursor,
    report: &ReportRecord,
    fetcher: &dyn AssetFetcher,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    if let Some(logo_url) = &options.logo_url {
        match fetch_and_decode(fetcher, logo_url) {
            Ok(logo) => {
                let logo_height = logo.height as f32 / logo.width as f32 * LOGO_WIDTH;
                cursor.ensure_space(document, logo_height + 10.0)?;
                document.place_image(
                    cursor.page_index,
                    logo,
                    cursor.page_width - MARGIN - LOGO_WIDTH,
                    cursor.y - logo_height,
                    LOGO_WIDTH,
                    logo_height,
                )?;
                cursor.advance(logo_height + 18.0);
            }
            Err(error) => {
                log::warn!("Unable to add the logo {:?} to the document: {}", logo_url, error);
            }
        }
    }

    cursor.write_line(document, "Reporte diario de obra", TITLE_SIZE, Face::Bold, 0.0)?;
    cursor.advance(4.0);

    let project_line = format!("Proyecto: {}", display_or_placeholder(&report.project_name));
    let supervisor_line = format!(
        "Supervisor: {}",
        display_or_placeholder(report.supervisor_display())
    );
    let date_line = format!("Fecha: {}", display_or_placeholder(&report.date));
    cursor.write_line(document, &project_line, LABEL_SIZE, Face::Regular, 0.0)?;
    cursor.write_line(document, &supervisor_line, LABEL_SIZE, Face::Regular, 0.0)?;
    cursor.write_line(document, &date_line, LABEL_SIZE, Face::Regular, 0.0)?;
    cursor.advance(6.0);

    Ok(())
}

/// The free-text remarks of the day, wrapped at body size. Skipped when blank.
fn draw_general_comment(
    document: &mut PdfDocument,
    cursor: &mut PageCursor,
    report: &ReportRecord,
) -> Result<(), ExportError> {
    if report.general_comment.trim().is_empty() {
        return Ok(());
    }

    cursor.write_line(document, "Comentario general:", LABEL_SIZE, Face::Bold, 0.0)?;
    let max_width = cursor.page_width - 2.0 * MARGIN;
    for line in wrap_text(&report.general_comment, Face::Regular, BODY_SIZE, max_width) {
        cursor.write_line(document, &line, BODY_SIZE, Face::Regular, 0.0)?;
    }
    cursor.advance(6.0);

    Ok(())
}

/// The three activity lists, one bulleted block per non-empty category.
fn draw_activities(
    document: &mut PdfDocument,
    cursor: &mut PageCursor,
    report: &ReportRecord,
) -> Result<(), ExportError> {
    cursor.write_line(document, "Actividades del día:", SECTION_SIZE, Face::Bold, 0.0)?;

    draw_list(document, cursor, "Fabricación:", &report.fabrication_activities)?;
    draw_list(document, cursor, "Instalación:", &report.installation_activities)?;
    draw_list(document, cursor, "Supervisión:", &report.supervision_activities)?;

    Ok(())
}

fn draw_list(
    document: &mut PdfDocument,
    cursor: &mut PageCursor,
    label: &str,
    items: &[String],
) -> Result<(), ExportError> {
    if items.is_empty() {
        return Ok(());
    }

    cursor.write_line(document, label, LABEL_SIZE, Face::Bold, 0.0)?;
    let max_width = cursor.page_width - 2.0 * MARGIN - LIST_INDENT;
    for item in items {
        let bulleted_item = format!("\u{2022} {}", item);
        for line in wrap_text(&bulleted_item, Face::Regular, BODY_SIZE, max_width) {
            cursor.write_line(document, &line, BODY_SIZE, Face::Regular, LIST_INDENT)?;
        }
    }
    cursor.advance(4.0);

    Ok(())
}

/// The incident block, drawn only when at least one of the four fields carries
/// text; each line is present only when its own field does.
fn draw_incidents(
    document: &mut PdfDocument,
    cursor: &mut PageCursor,
    report: &ReportRecord,
) -> Result<(), ExportError> {
    if !report.has_incidents() {
        return Ok(());
    }

    cursor.advance(2.0);
    cursor.write_line(document, "Incidencias:", SECTION_SIZE, Face::Bold, 0.0)?;

    let incident_lines = [
        ("Tiempo muerto:", &report.downtime_reason),
        ("Tiempo muerto (otro):", &report.downtime_reason_other),
        ("Pendiente:", &report.pending_item),
        ("Pendiente (otro):", &report.pending_item_other),
    ];
    for (label, field) in incident_lines {
        if !field.trim().is_empty() {
            let line = format!("{} {}", label, field.trim());
            cursor.write_line(document, &line, BODY_SIZE, Face::Regular, 0.0)?;
        }
    }

    Ok(())
}

/// The metrics block: one dash-prefixed formatted line per row, wrapped because
/// free-text labels routinely run past a hundred characters.
fn draw_metrics(
    document: &mut PdfDocument,
    cursor: &mut PageCursor,
    report: &ReportRecord,
) -> Result<(), ExportError> {
    if report.metrics.is_empty() {
        return Ok(());
    }

    cursor.advance(6.0);
    cursor.write_line(document, "Métricas:", SECTION_SIZE, Face::Bold, 0.0)?;

    let max_width = cursor.page_width - 2.0 * MARGIN;
    for row in &report.metrics {
        for line in wrap_text(&row.formatted_line(), Face::Regular, METRICS_SIZE, max_width) {
            cursor.write_line(document, &line, METRICS_SIZE, Face::Regular, 0.0)?;
        }
    }

    Ok(())
}

/// One dedicated page per photo, in the order of the record. A photo that cannot
/// be fetched or decoded is logged and skipped; the remaining photos keep their
/// relative order.
fn draw_photo_pages(
    document: &mut PdfDocument,
    report: &ReportRecord,
    fetcher: &dyn AssetFetcher,
) -> Result<(), ExportError> {
    for url in &report.photos {
        let image = match fetch_and_decode(fetcher, url) {
            Ok(image) => image,
            Err(error) => {
                log::warn!("Unable to add the photo {:?} to the document: {}", url, error);
                continue;
            }
        };

        let page_index = document.add_page(A4_WIDTH, A4_HEIGHT);
        let (page_width, page_height) = document.page_size(page_index)?;

        let (x, y, display_width, display_height) =
            fitted_rect(image.width, image.height, page_width, page_height);
        document.place_image(page_index, image, x, y, display_width, display_height)?;

        document.write_text(
            page_index,
            PHOTO_CAPTION,
            Face::Regular,
            METRICS_SIZE,
            [MARGIN, MARGIN - LINE_SPACING - 4.0],
            [0.3, 0.3, 0.3],
        )?;
    }

    Ok(())
}

/// Centers the image on the page at the uniform scale that fits it within the
/// margins while preserving its aspect ratio.
fn fitted_rect(
    image_width: u32,
    image_height: u32,
    page_width: f32,
    page_height: f32,
) -> (f32, f32, f32, f32) {
    let max_width = page_width - 2.0 * MARGIN;
    let max_height = page_height - 2.0 * MARGIN;

    let scale = (max_width / image_width as f32).min(max_height / image_height as f32);
    let display_width = image_width as f32 * scale;
    let display_height = image_height as f32 * scale;

    let x = (page_width - display_width) / 2.0;
    let y = (page_height - display_height) / 2.0;

    (x, y, display_width, display_height)
}

fn fetch_and_decode(
    fetcher: &dyn AssetFetcher,
    url: &str,
) -> Result<pdf::ImageXObject, ExportError> {
    let bytes = fetcher.fetch_bytes(url)?;
    pdf::decode_image(&bytes)
}
