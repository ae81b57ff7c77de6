use std::cell::RefCell;
use std::collections::HashMap;

use obrapdf::error::ExportError;
use obrapdf::render::{export_report, AssetFetcher, ExportOptions};
use obrapdf::report::ReportRecord;

/// Serves assets from memory and records the order of the fetches, so the tests
/// can assert that every asset is requested exactly once and in record order.
struct StubFetcher {
    assets: HashMap<String, Vec<u8>>,
    calls: RefCell<Vec<String>>,
}

impl StubFetcher {
    fn new(assets: Vec<(&str, Vec<u8>)>) -> StubFetcher {
        StubFetcher {
            assets: assets
                .into_iter()
                .map(|(url, bytes)| (url.to_string(), bytes))
                .collect(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl AssetFetcher for StubFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ExportError> {
        self.calls.borrow_mut().push(url.to_string());
        self.assets
            .get(url)
            .cloned()
            .ok_or(ExportError::with_context(format!(
                "Unable to reach the asset {:?}",
                url
            )))
    }
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded_image(width, height, image::ImageFormat::Jpeg)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded_image(width, height, image::ImageFormat::Png)
}

fn encoded_image(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let mut pixels = image::RgbImage::new(width, height);
    for pixel in pixels.pixels_mut() {
        *pixel = image::Rgb([200, 180, 40]);
    }
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut std::io::Cursor::new(&mut bytes), format)
        .unwrap();

    bytes
}

fn sample_report() -> ReportRecord {
    serde_json::from_str(
        r#"{
            "date": "2025-03-07",
            "projectName": "Torres 1000 / Fase 2",
            "supervisorName": "Ana Torres",
            "supervisorId": "rec0042",
            "generalComment": "Se terminó la colocación de marcos en el nivel 3; queda pendiente el sellado perimetral de la fachada poniente por lluvia.",
            "fabricationActivities": ["Corte de perfiles", "Armado de marcos"],
            "installationActivities": ["Colocación de ventanas nivel 3"],
            "supervisionActivities": [],
            "downtimeReason": "Otro",
            "downtimeReasonOther": "Lluvia durante la tarde",
            "pendingItem": "",
            "pendingItemOther": "",
            "metrics": [
                { "code": "C-15", "measurement": "2700x2400", "quantity": 3 },
                { "category": "Cristal", "itemLabel": "Puerta", "quantity": 1 },
                { "foo": "bar" }
            ],
            "photos": ["https://photos.example/a.jpg", "https://photos.example/b.png"]
        }"#,
    )
    .unwrap()
}

/// Decodes the content stream of every page and reports how many of them draw an
/// image XObject.
fn pages_with_images(bytes: &[u8]) -> usize {
    let document = lopdf::Document::load_mem(bytes).unwrap();
    document
        .get_pages()
        .values()
        .filter(|page_id| {
            let content = document.get_page_content(**page_id).unwrap();
            let content = lopdf::content::Content::decode(&content).unwrap();
            content
                .operations
                .iter()
                .any(|operation| operation.operator == "Do")
        })
        .count()
}

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

fn first_page_content(bytes: &[u8]) -> Vec<u8> {
    let document = lopdf::Document::load_mem(bytes).unwrap();
    let first_page_id = *document.get_pages().values().next().unwrap();
    document.get_page_content(first_page_id).unwrap()
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

#[test]
fn a_full_report_exports_to_a_parseable_multi_page_document() {
    let report = sample_report();
    let fetcher = StubFetcher::new(vec![
        ("https://photos.example/a.jpg", jpeg_bytes(640, 480)),
        ("https://photos.example/b.png", png_bytes(300, 800)),
    ]);

    let exported = export_report(&report, &fetcher, &ExportOptions::default()).unwrap();

    assert!(exported.bytes.starts_with(b"%PDF-1.5"));
    assert_eq!(
        exported.file_name,
        "reporte_torres-1000-fase-2_2025-03-07.pdf"
    );
    // One summary page plus one page per photo
    assert_eq!(page_count(&exported.bytes), 3);
    assert_eq!(pages_with_images(&exported.bytes), 2);
}

#[test]
fn the_summary_page_carries_the_report_vocabulary() {
    let report = sample_report();
    let fetcher = StubFetcher::new(vec![]);

    let exported = export_report(&report, &fetcher, &ExportOptions::default()).unwrap();
    let content = first_page_content(&exported.bytes);

    // WinAnsi-encoded literal strings in the uncompressed content stream
    assert!(contains_subslice(&content, b"Reporte diario de obra"));
    assert!(contains_subslice(&content, b"Proyecto: Torres 1000 / Fase 2"));
    assert!(contains_subslice(&content, b"Supervisor: Ana Torres"));
    assert!(contains_subslice(&content, b"Comentario general:"));
    assert!(contains_subslice(&content, b"Incidencias:"));
    assert!(contains_subslice(&content, b"Tiempo muerto: Otro"));
    assert!(contains_subslice(&content, b"Tiempo muerto (otro): Lluvia durante la tarde"));
    assert!(contains_subslice(&content, b"M\xe9tricas:"));
    assert!(contains_subslice(
        &content,
        b"- C\xf3digo: C-15 | Medida: 2700x2400 | Cantidad: 3"
    ));
    assert!(contains_subslice(
        &content,
        b"- Categor\xeda: Cristal | Item: Puerta | Cantidad: 1"
    ));
    // The unrecognized row renders its structured dump instead of crashing
    assert!(contains_subslice(&content, b"- {\"foo\":\"bar\"}"));
    // Both pending fields are blank, so their lines are absent entirely
    assert!(!contains_subslice(&content, b"Pendiente"));
}

#[test]
fn blank_fields_render_the_visible_placeholder() {
    let report = ReportRecord::default();
    let fetcher = StubFetcher::new(vec![]);

    let exported = export_report(&report, &fetcher, &ExportOptions::default()).unwrap();
    let content = first_page_content(&exported.bytes);

    assert!(contains_subslice(&content, b"Proyecto: -"));
    assert!(contains_subslice(&content, b"Supervisor: -"));
    assert!(contains_subslice(&content, b"Fecha: -"));
}

#[test]
fn a_failing_photo_is_skipped_and_the_order_of_the_rest_is_preserved() {
    let mut report = sample_report();
    report.photos = vec![
        "https://photos.example/a.jpg".to_string(),
        "https://photos.example/broken.jpg".to_string(),
        "https://photos.example/c.png".to_string(),
    ];
    // The middle photo is served but undecodable, the rest are fine
    let fetcher = StubFetcher::new(vec![
        ("https://photos.example/a.jpg", jpeg_bytes(640, 480)),
        ("https://photos.example/broken.jpg", b"not an image".to_vec()),
        ("https://photos.example/c.png", png_bytes(320, 240)),
    ]);

    let exported = export_report(&report, &fetcher, &ExportOptions::default()).unwrap();

    // Summary page plus the two decodable photos, in record order
    assert_eq!(page_count(&exported.bytes), 3);
    assert_eq!(pages_with_images(&exported.bytes), 2);
    assert_eq!(
        *fetcher.calls.borrow(),
        vec![
            "https://photos.example/a.jpg".to_string(),
            "https://photos.example/broken.jpg".to_string(),
            "https://photos.example/c.png".to_string(),
        ]
    );
}

#[test]
fn an_unreachable_logo_does_not_abort_the_export() {
    let mut report = sample_report();
    report.photos.clear();
    let fetcher = StubFetcher::new(vec![]);
    let options = ExportOptions {
        logo_url: Some("https://assets.example/logo.jpg".to_string()),
    };

    let exported = export_report(&report, &fetcher, &options).unwrap();

    assert_eq!(page_count(&exported.bytes), 1);
    assert_eq!(pages_with_images(&exported.bytes), 0);
    assert_eq!(
        *fetcher.calls.borrow(),
        vec!["https://assets.example/logo.jpg".to_string()]
    );
}

#[test]
fn a_reachable_logo_is_drawn_on_the_summary_page() {
    let mut report = sample_report();
    report.photos.clear();
    let fetcher = StubFetcher::new(vec![(
        "https://assets.example/logo.jpg",
        jpeg_bytes(400, 160),
    )]);
    let options = ExportOptions {
        logo_url: Some("https://assets.example/logo.jpg".to_string()),
    };

    let exported = export_report(&report, &fetcher, &options).unwrap();

    assert_eq!(page_count(&exported.bytes), 1);
    assert_eq!(pages_with_images(&exported.bytes), 1);
}

#[test]
fn every_asset_is_fetched_exactly_once_and_in_order() {
    let report = sample_report();
    let fetcher = StubFetcher::new(vec![
        ("https://assets.example/logo.jpg", jpeg_bytes(400, 160)),
        ("https://photos.example/a.jpg", jpeg_bytes(640, 480)),
        ("https://photos.example/b.png", png_bytes(300, 800)),
    ]);
    let options = ExportOptions {
        logo_url: Some("https://assets.example/logo.jpg".to_string()),
    };

    export_report(&report, &fetcher, &options).unwrap();

    assert_eq!(
        *fetcher.calls.borrow(),
        vec![
            "https://assets.example/logo.jpg".to_string(),
            "https://photos.example/a.jpg".to_string(),
            "https://photos.example/b.png".to_string(),
        ]
    );
}

#[test]
fn a_long_report_paginates_onto_further_pages() {
    let mut report = sample_report();
    report.photos.clear();
    report.fabrication_activities = (0..80)
        .map(|index| format!("Actividad de fabricación número {}", index))
        .collect();

    let exported = export_report(&report, &fetcher_without_assets(), &ExportOptions::default())
        .unwrap();

    assert!(page_count(&exported.bytes) > 1);
}

#[test]
fn two_exports_of_the_same_report_are_identical() {
    let report = sample_report();
    let fetcher = StubFetcher::new(vec![
        ("https://photos.example/a.jpg", jpeg_bytes(640, 480)),
        ("https://photos.example/b.png", png_bytes(300, 800)),
    ]);

    let first = export_report(&report, &fetcher, &ExportOptions::default()).unwrap();
    let second = export_report(&report, &fetcher, &ExportOptions::default()).unwrap();

    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.file_name, second.file_name);
}

fn fetcher_without_assets() -> StubFetcher {
    StubFetcher::new(vec![])
}
