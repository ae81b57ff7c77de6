use crate::error::ExportError;
use crate::fonts::Face;
use crate::pdf::PdfDocument;

/// Uniform page border, in points.
pub const MARGIN: f32 = 50.0;
/// Minimum cursor height before a page break is forced. Slightly above the margin
/// so that the last line of a page never crowds the footer area.
pub const BOTTOM_LIMIT: f32 = 80.0;
/// Fixed vertical gap added below every written line. Shared by every line draw so
/// the vertical rhythm does not drift between blocks.
pub const LINE_SPACING: f32 = 6.0;

/// The renderer's tracked current page and vertical write position.
///
/// The cursor is the only mutable state the drawers share, and it is passed
/// explicitly through every call so the page-break side effect stays visible. `y`
/// is the baseline height measured from the page bottom and only ever decreases,
/// except when `ensure_space` allocates a fresh page and resets it. The state is
/// scoped to one export invocation and discarded with it.
#[derive(Debug, Clone, Copy)]
pub struct PageCursor {
    /// Index of the current page within the document.
    pub page_index: usize,
    /// Geometry of the current page, refreshed on every page break.
    pub page_width: f32,
    pub page_height: f32,
    /// Current baseline height, decreasing as content is written.
    pub y: f32,
}

impl PageCursor {
    /// Allocates the first page of the document and positions the cursor at its
    /// top margin.
    pub fn on_new_page(
        document: &mut PdfDocument,
        page_width: f32,
        page_height: f32,
    ) -> Result<PageCursor, ExportError> {
        let page_index = document.add_page(page_width, page_height);
        let (page_width, page_height) = document.page_size(page_index)?;

        Ok(PageCursor {
            page_index,
            page_width,
            page_height,
            y: page_height - MARGIN,
        })
    }

    /// Guarantees that `needed_height` points can be written starting at `y`
    /// without crossing the bottom limit, allocating a new page when the remaining
    /// space is insufficient. Pagination is unconditional: the call never fails for
    /// lack of space, and the page geometry is re-read from the freshly allocated
    /// page rather than assumed.
    pub fn ensure_space(
        &mut self,
        document: &mut PdfDocument,
        needed_height: f32,
    ) -> Result<(), ExportError> {
        debug_assert!(needed_height > 0.0);

        if self.y - needed_height < BOTTOM_LIMIT {
            self.page_index = document.add_page(self.page_width, self.page_height);
            let (page_width, page_height) = document.page_size(self.page_index)?;
            self.page_width = page_width;
            self.page_height = page_height;
            self.y = page_height - MARGIN;
        }

        Ok(())
    }

    /// Draws one line at `(MARGIN + indent, y)` and advances the cursor by
    /// `font_size + LINE_SPACING`, breaking the page first when needed.
    pub fn write_line(
        &mut self,
        document: &mut PdfDocument,
        text: &str,
        font_size: f32,
        face: Face,
        indent: f32,
    ) -> Result<(), ExportError> {
        self.ensure_space(document, font_size + LINE_SPACING)?;

        document.write_text(
            self.page_index,
            text,
            face,
            font_size,
            [MARGIN + indent, self.y],
            [0.0, 0.0, 0.0],
        )?;
        self.y -= font_size + LINE_SPACING;

        Ok(())
    }

    /// Moves the cursor down by an explicit vertical gap, used between blocks.
    pub fn advance(&mut self, amount: f32) {
        self.y -= amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{A4_HEIGHT, A4_WIDTH};

    #[test]
    fn the_cursor_starts_at_the_top_margin_of_the_first_page() {
        let mut document = PdfDocument::new("cursor-test");
        let cursor = PageCursor::on_new_page(&mut document, A4_WIDTH, A4_HEIGHT).unwrap();

        assert_eq!(cursor.page_index, 0);
        assert_eq!(cursor.y, A4_HEIGHT - MARGIN);
        assert_eq!(document.page_count(), 1);
    }

    #[test]
    fn ensure_space_is_a_no_op_while_space_remains() {
        let mut document = PdfDocument::new("cursor-test");
        let mut cursor = PageCursor::on_new_page(&mut document, A4_WIDTH, A4_HEIGHT).unwrap();
        let initial_y = cursor.y;

        cursor.ensure_space(&mut document, 17.0).unwrap();
        assert_eq!(cursor.y, initial_y);
        assert_eq!(document.page_count(), 1);
    }

    #[test]
    fn exhausting_the_page_allocates_a_new_one() {
        let mut document = PdfDocument::new("cursor-test");
        let mut cursor = PageCursor::on_new_page(&mut document, A4_WIDTH, A4_HEIGHT).unwrap();

        cursor.y = BOTTOM_LIMIT + 10.0;
        cursor.ensure_space(&mut document, 17.0).unwrap();

        assert_eq!(document.page_count(), 2);
        assert_eq!(cursor.page_index, 1);
        assert_eq!(cursor.y, A4_HEIGHT - MARGIN);
    }

    #[test]
    fn the_page_count_never_decreases_and_y_strictly_decreases_between_breaks() {
        let mut document = PdfDocument::new("cursor-test");
        let mut cursor = PageCursor::on_new_page(&mut document, A4_WIDTH, A4_HEIGHT).unwrap();

        let mut previous_page_count = document.page_count();
        for line_number in 0..200 {
            let previous_y = cursor.y;
            let previous_page = cursor.page_index;
            cursor
                .write_line(
                    &mut document,
                    &format!("línea {}", line_number),
                    11.0,
                    Face::Regular,
                    0.0,
                )
                .unwrap();

            assert!(document.page_count() >= previous_page_count);
            previous_page_count = document.page_count();
            if cursor.page_index == previous_page {
                assert!(cursor.y < previous_y);
            }
        }
        assert!(document.page_count() > 1);
    }
}
