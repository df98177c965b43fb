use tracing::debug;

use super::RenderError;
use super::metrics::{self, FontStyle};

const FIT_EPSILON_MM: f32 = 1e-3;

/// Fixed page geometry and typography. All lengths are millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct PageConfig {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_left_mm: f32,
    pub margin_top_mm: f32,
    pub margin_right_mm: f32,
    /// Distance from the bottom edge at which a new page is started.
    pub page_break_margin_mm: f32,
    pub cell_padding_mm: f32,
    pub title: String,
    pub title_size_pt: f32,
    pub title_row_mm: f32,
    pub title_gap_mm: f32,
    pub body_size_pt: f32,
    pub body_row_mm: f32,
    pub block_gap_mm: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_left_mm: 10.0,
            margin_top_mm: 10.0,
            margin_right_mm: 10.0,
            page_break_margin_mm: 15.0,
            cell_padding_mm: 1.0,
            title: "Finance & AI Knowledge Hub".to_string(),
            title_size_pt: 16.0,
            title_row_mm: 10.0,
            title_gap_mm: 10.0,
            body_size_pt: 12.0,
            body_row_mm: 10.0,
            block_gap_mm: 2.0,
        }
    }
}

impl PageConfig {
    pub fn text_width_mm(&self) -> f32 {
        self.page_width_mm - self.margin_left_mm - self.margin_right_mm - 2.0 * self.cell_padding_mm
    }

    fn break_threshold_mm(&self) -> f32 {
        self.page_height_mm - self.page_break_margin_mm
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.text_width_mm() <= 0.0 {
            return Err(RenderError::InvalidConfig(format!(
                "margins leave no horizontal space on a {}mm wide page",
                self.page_width_mm
            )));
        }
        let usable = self.break_threshold_mm() - self.margin_top_mm;
        if usable < self.body_row_mm || usable < self.title_row_mm {
            return Err(RenderError::InvalidConfig(format!(
                "{}mm of usable height cannot hold a single row",
                usable
            )));
        }
        if self.body_row_mm <= 0.0 || self.body_size_pt <= 0.0 || self.title_size_pt <= 0.0 {
            return Err(RenderError::InvalidConfig(
                "row heights and font sizes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single line of text placed on a page. `baseline_mm` is measured from the
/// top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub x_mm: f32,
    pub baseline_mm: f32,
    pub style: FontStyle,
    pub size_pt: f32,
    pub text: String,
    /// Index of the input line this row came from; `None` for the title.
    pub source_line: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub cells: Vec<TextCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Body rows across all pages, in reading order.
    pub fn body_rows(&self) -> impl Iterator<Item = &TextCell> {
        self.pages
            .iter()
            .flat_map(|page| page.cells.iter())
            .filter(|cell| cell.source_line.is_some())
    }
}

struct Cursor<'a> {
    cfg: &'a PageConfig,
    pages: Vec<Page>,
    y_mm: f32,
}

impl<'a> Cursor<'a> {
    fn new(cfg: &'a PageConfig) -> Self {
        Self {
            cfg,
            pages: vec![Page::default()],
            y_mm: cfg.margin_top_mm,
        }
    }

    fn fits(&self, height_mm: f32) -> bool {
        self.y_mm + height_mm <= self.cfg.break_threshold_mm() + FIT_EPSILON_MM
    }

    fn full_page_height(&self) -> f32 {
        self.cfg.break_threshold_mm() - self.cfg.margin_top_mm
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y_mm = self.cfg.margin_top_mm;
    }

    fn place(&mut self, cell: TextCell, row_mm: f32) {
        if let Some(page) = self.pages.last_mut() {
            page.cells.push(cell);
        }
        self.y_mm += row_mm;
    }

    fn baseline(&self, row_mm: f32, size_pt: f32) -> f32 {
        self.y_mm + 0.5 * row_mm + 0.3 * size_pt * super::MM_PER_PT
    }
}

/// Greedy word wrap. Runs of whitespace collapse to one space; an empty line
/// still yields one empty row.
pub fn wrap_line(
    line: &str,
    style: FontStyle,
    size_pt: f32,
    max_width_mm: f32,
) -> Result<Vec<String>, RenderError> {
    let space_mm = metrics::text_width_mm(" ", style, size_pt);
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_mm = 0.0_f32;

    for word in line.split_whitespace() {
        let word_mm = metrics::text_width_mm(word, style, size_pt);
        if word_mm > max_width_mm + FIT_EPSILON_MM {
            return Err(RenderError::TokenTooWide {
                token: word.to_string(),
                width_mm: word_mm,
                available_mm: max_width_mm,
            });
        }

        if current.is_empty() {
            current.push_str(word);
            current_mm = word_mm;
        } else if current_mm + space_mm + word_mm <= max_width_mm + FIT_EPSILON_MM {
            current.push(' ');
            current.push_str(word);
            current_mm += space_mm + word_mm;
        } else {
            rows.push(std::mem::take(&mut current));
            current.push_str(word);
            current_mm = word_mm;
        }
    }

    rows.push(current);
    Ok(rows)
}

/// Lays out a title row and one wrapped block per input line.
///
/// A block that does not fit in the space left above the page-break threshold
/// moves to a fresh page. A block taller than a whole page flows row by row.
pub fn layout_document(text: &str, cfg: &PageConfig) -> Result<Document, RenderError> {
    cfg.validate()?;
    let width_mm = cfg.text_width_mm();
    let mut cursor = Cursor::new(cfg);

    if !cfg.title.trim().is_empty() {
        let title = cfg.title.trim();
        let title_mm = metrics::text_width_mm(title, FontStyle::Bold, cfg.title_size_pt);
        if title_mm > width_mm + FIT_EPSILON_MM {
            return Err(RenderError::TokenTooWide {
                token: title.to_string(),
                width_mm: title_mm,
                available_mm: width_mm,
            });
        }
        let cell = TextCell {
            x_mm: cfg.margin_left_mm + cfg.cell_padding_mm + (width_mm - title_mm) / 2.0,
            baseline_mm: cursor.baseline(cfg.title_row_mm, cfg.title_size_pt),
            style: FontStyle::Bold,
            size_pt: cfg.title_size_pt,
            text: title.to_string(),
            source_line: None,
        };
        cursor.place(cell, cfg.title_row_mm);
        cursor.y_mm += cfg.title_gap_mm;
    }

    for (index, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let rows = wrap_line(line, FontStyle::Regular, cfg.body_size_pt, width_mm)?;
        let block_mm = rows.len() as f32 * cfg.body_row_mm;

        if !cursor.fits(block_mm) && block_mm <= cursor.full_page_height() + FIT_EPSILON_MM {
            cursor.new_page();
        }

        for row in rows {
            if !cursor.fits(cfg.body_row_mm) {
                cursor.new_page();
            }
            let cell = TextCell {
                x_mm: cfg.margin_left_mm + cfg.cell_padding_mm,
                baseline_mm: cursor.baseline(cfg.body_row_mm, cfg.body_size_pt),
                style: FontStyle::Regular,
                size_pt: cfg.body_size_pt,
                text: row,
                source_line: Some(index),
            };
            cursor.place(cell, cfg.body_row_mm);
        }
        cursor.y_mm += cfg.block_gap_mm;
    }

    debug!(
        pages = cursor.pages.len(),
        input_len = text.len(),
        "laid out document"
    );

    Ok(Document {
        title: cfg.title.trim().to_string(),
        page_width_mm: cfg.page_width_mm,
        page_height_mm: cfg.page_height_mm,
        pages: cursor.pages,
    })
}
