use lopdf::{Object, StringFormat};
use std::{io::BufWriter, mem};
use time::OffsetDateTime;
use unicode_normalization::char::decompose_canonical;
use unicode_normalization::UnicodeNormalization as _;

use crate::error::ExportError;
use crate::fonts::Face;

/// The page geometry every report uses, in points.
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

/// How the image data is carried inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageEncoding {
    /// The original JPEG bytes, embedded verbatim behind a `DCTDecode` filter.
    Jpeg,
    /// Raw 8-bit samples, flate-compressed when the document is finalized.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageColorSpace {
    Rgb,
    Gray,
}

impl ImageColorSpace {
    fn pdf_name(&self) -> &'static str {
        match self {
            ImageColorSpace::Rgb => "DeviceRGB",
            ImageColorSpace::Gray => "DeviceGray",
        }
    }
}

/// The low-level image representation for a PDF document: decoded dimensions plus
/// the byte payload that will back the image `XObject`.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels (original width, not scaled width).
    pub width: u32,
    /// Height of the image in pixels (original height, not scaled height).
    pub height: u32,
    /// The payload behind the `XObject` stream.
    data: Vec<u8>,
    encoding: ImageEncoding,
    color_space: ImageColorSpace,
}

/// Decodes raw asset bytes into an embeddable image. JPEG is attempted first and
/// embedded verbatim; on failure the bytes are retried as PNG and re-encoded into
/// raw RGB samples. Anything else is an error the caller is expected to swallow
/// per-asset.
pub fn decode_image(bytes: &[u8]) -> Result<ImageXObject, ExportError> {
    match image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg) {
        Ok(decoded) => {
            let color_space = match decoded.color() {
                image::ColorType::L8
                | image::ColorType::L16
                | image::ColorType::La8
                | image::ColorType::La16 => ImageColorSpace::Gray,
                _ => ImageColorSpace::Rgb,
            };

            Ok(ImageXObject {
                width: decoded.width(),
                height: decoded.height(),
                data: bytes.to_vec(),
                encoding: ImageEncoding::Jpeg,
                color_space,
            })
        }
        Err(jpeg_error) => match image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        {
            Ok(decoded) => {
                // Alpha is dropped: the page background is white anyway
                let rgb_image = decoded.to_rgb8();

                Ok(ImageXObject {
                    width: rgb_image.width(),
                    height: rgb_image.height(),
                    data: rgb_image.into_raw(),
                    encoding: ImageEncoding::Raw,
                    color_space: ImageColorSpace::Rgb,
                })
            }
            Err(png_error) => Err(ExportError::with_context(format!(
                "Unable to decode the image as JPEG ({}) or as PNG ({})",
                jpeg_error, png_error
            ))),
        },
    }
}

impl ImageXObject {
    /// Converts the image into the stream object backing it in the document.
    fn into_stream(self) -> lopdf::Stream {
        use lopdf::Object::*;

        let mut dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(i64::from(self.width))),
            ("Height", Integer(i64::from(self.height))),
            ("ColorSpace", Name(self.color_space.pdf_name().into())),
            ("BitsPerComponent", Integer(8)),
        ]);

        match self.encoding {
            ImageEncoding::Jpeg => {
                dictionary.set("Filter", Name("DCTDecode".into()));
                // Already compressed, lopdf must not flate it again
                lopdf::Stream::new(dictionary, self.data).with_compression(false)
            }
            ImageEncoding::Raw => lopdf::Stream::new(dictionary, self.data).with_compression(true),
        }
    }
}

/// The in-memory representation of one document page: its geometry, the content
/// operations written to it so far and the images it references.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// Content stream operations, in draw order.
    operations: Vec<lopdf::content::Operation>,
    /// Images placed on this page, indexed by their `X<n>` resource name.
    xobjects: Vec<ImageXObject>,
}

/// This struct represents the actual PDF document on a high-level. It is an interface
/// to the underlying `lopdf::Document` with the addition of the in-memory pages and
/// the document identifier.
///
/// Pages are addressed by the index returned from `add_page`; the content is kept in
/// memory until `write_all` lowers everything into the lopdf object graph, after
/// which `save_to_bytes` produces the final byte buffer.
pub struct PdfDocument {
    /// The underlying PDF document: this is a low-level interface and shouldn't be
    /// directly interacted with unless strictly necessary, anyway this is why it is
    /// exposed to the user.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used in order to set the PDF `ID` tag.
    pub identifier: String,
    pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to
    /// version 1.5 of the PDF specification.
    pub fn new<S: Into<String>>(identifier: S) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: identifier.into(),
            pages: Vec::new(),
        }
    }

    /// Adds a page of the given width and height in points, returning its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            width: page_width,
            height: page_height,
            operations: Vec::new(),
            xobjects: Vec::new(),
        });

        self.pages.len() - 1
    }

    /// The number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The geometry of the given page in points.
    pub fn page_size(&self, page_index: usize) -> Result<(f32, f32), ExportError> {
        let page = self.get_page(page_index)?;
        Ok((page.width, page.height))
    }

    /// Writes one line of text at the given baseline position. The position is in
    /// points from the bottom-left corner of the page, as the PDF specification
    /// expects. The text is NFC-normalized and WinAnsi-encoded; characters with no
    /// WinAnsi equivalent are replaced with `?` and logged.
    pub fn write_text(
        &mut self,
        page_index: usize,
        text: &str,
        face: Face,
        font_size: f32,
        position: [f32; 2],
        color: [f32; 3],
    ) -> Result<(), ExportError> {
        use lopdf::content::Operation;

        let encoded_text = encode_win_ansi(text);
        let page = self.get_mut_page(page_index)?;

        let [x, y] = position;
        let [r, g, b] = color;
        page.operations.extend(vec![
            Operation::new("BT", vec![]), // Begin text section
            Operation::new(
                "Tf",
                vec![Object::Name(face.resource_name().into()), font_size.into()],
            ), // Set the font and the font size
            Operation::new("Td", vec![x.into(), y.into()]), // Set the position where the text begins to be written
            Operation::new(
                "rg",
                vec![r, g, b].into_iter().map(lopdf::Object::Real).collect(),
            ), // Set the filling color of the text
            Operation::new(
                "Tj",
                vec![Object::String(encoded_text, StringFormat::Literal)],
            ), // The actual line content
            Operation::new("ET", vec![]), // End text section
        ]);

        Ok(())
    }

    /// Places a previously decoded image on the given page. The rectangle is in
    /// points, with `(x, y)` the bottom-left corner of the drawn image.
    pub fn place_image(
        &mut self,
        page_index: usize,
        image: ImageXObject,
        x: f32,
        y: f32,
        display_width: f32,
        display_height: f32,
    ) -> Result<(), ExportError> {
        use lopdf::content::Operation;

        let page = self.get_mut_page(page_index)?;
        let resource_name = format!("X{}", page.xobjects.len());
        page.xobjects.push(image);

        page.operations.extend(vec![
            // q/Q isolates the transformation matrix of this image draw
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    display_width.into(),
                    0.into(),
                    0.into(),
                    display_height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(resource_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Lowers the pages, fonts and resources accumulated so far into the underlying
    /// lopdf object graph and finalizes the document trailer. To be called exactly
    /// once, after all the content has been written.
    pub fn write_all(&mut self) -> Result<(), ExportError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        // Construct all the general info that the PDF document needs in order to be
        // parsed correctly and insert it into the PDF document itself. The timestamp
        // is fixed so that identical reports serialize to identical bytes.
        let creation_date = to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            (
                "CreationDate",
                String(creation_date.clone().into_bytes(), Literal),
            ),
            ("ModDate", String(creation_date.into_bytes(), Literal)),
            (
                "Title",
                String("Reporte diario de obra".to_string().into_bytes(), Literal),
            ),
            (
                "Producer",
                String("obrapdf".to_string().into_bytes(), Literal),
            ),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(self.identifier.clone().into_bytes(), Literal),
            ]),
        );

        // The two built-in faces are shared by every page through one dictionary
        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<lopdf::Object>::new();

        for page in mem::take(&mut self.pages) {
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                (
                    "MediaBox",
                    vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
                ),
                ("Parent", Reference(pages_id)),
            ]);

            // Register the images of the page and collect their resource references
            let mut xobjects_dictionary = lopdf::Dictionary::new();
            for (index, image) in page.xobjects.into_iter().enumerate() {
                let stream_id = self.inner_document.add_object(image.into_stream());
                xobjects_dictionary.set(format!("X{index}"), Reference(stream_id));
            }

            let mut resources_dictionary =
                lopdf::Dictionary::from_iter(vec![("Font", Reference(fonts_dictionary_id))]);
            if !xobjects_dictionary.is_empty() {
                resources_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }
            let resources_id = self
                .inner_document
                .add_object(Dictionary(resources_dictionary));
            page_dictionary.set("Resources", Reference(resources_id));

            // Encode the accumulated operations into the page content stream.
            // Page contents are left uncompressed, like the rest of the text objects.
            let content_bytes = lopdf::content::Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|error| {
                ExportError::with_error("Unable to encode the page content stream", &error)
            })?;
            let content_stream =
                lopdf::Stream::new(lopdf::Dictionary::new(), content_bytes).with_compression(false);
            let content_id = self.inner_document.add_object(content_stream);
            page_dictionary.set("Contents", Reference(content_id));

            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id));
        }

        // Use all the collected page references in order to set the "Kids" field and
        // then insert the pages dictionary into the document itself as a last operation
        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", page_ids.into()),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Optimize the PDF document (only superficially).
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or
    /// offered for download.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ExportError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ExportError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Registers the two built-in faces as Type1 fonts and returns the dictionary
    /// referencing them. No font program is embedded: Helvetica and Helvetica-Bold
    /// belong to the standard set every renderer provides.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        use lopdf::Object::*;

        let mut fonts_dictionary = lopdf::Dictionary::new();
        for face in [Face::Regular, Face::Bold] {
            let font_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Font".into())),
                ("Subtype", Name("Type1".into())),
                ("BaseFont", Name(face.base_font().into())),
                ("Encoding", Name("WinAnsiEncoding".into())),
            ]);
            let font_id = self.inner_document.add_object(Dictionary(font_dictionary));
            fonts_dictionary.set(face.resource_name(), Reference(font_id));
        }

        fonts_dictionary
    }

    fn get_page(&self, page_index: usize) -> Result<&PdfPage, ExportError> {
        self.pages
            .get(page_index)
            .ok_or(ExportError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ExportError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ExportError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))
    }
}

/// Encodes the text into the WinAnsi byte encoding the two faces are registered
/// with. The text is NFC-normalized first; characters with no WinAnsi equivalent
/// fall back to their unaccented base letter, then to `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut encoded_text = Vec::with_capacity(text.len());
    for character in text.nfc() {
        if let Some(byte) = win_ansi_byte(character) {
            encoded_text.push(byte);
            continue;
        }

        let base_character = win_ansi_base(character);
        match base_character.and_then(win_ansi_byte) {
            Some(byte) => encoded_text.push(byte),
            None => {
                log::warn!(
                    "Unable to encode the character {:?} into WinAnsi, replacing it",
                    character
                );
                encoded_text.push(b'?');
            }
        }
    }

    encoded_text
}

fn win_ansi_byte(character: char) -> Option<u8> {
    match character {
        // ASCII and the upper latin-1 range map directly
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => Some(character as u8),
        '\u{20ac}' => Some(0x80), // euro sign
        '\u{2026}' => Some(0x85), // ellipsis
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201c}' => Some(0x93),
        '\u{201d}' => Some(0x94),
        '\u{2022}' => Some(0x95), // bullet
        '\u{2013}' => Some(0x96), // en dash
        '\u{2014}' => Some(0x97), // em dash
        '\u{2122}' => Some(0x99), // trade mark sign
        _ => None,
    }
}

/// The first character of the canonical decomposition, when there is one.
fn win_ansi_base(character: char) -> Option<char> {
    let mut base = None;
    decompose_canonical(character, |decomposed| {
        if base.is_none() {
            base = Some(decomposed);
        }
    });

    base.filter(|decomposed| *decomposed != character)
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
