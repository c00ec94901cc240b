//! Minimal PDF 1.4 writer for text reports.
//!
//! Uses the standard Helvetica font (no embedding) with WinAnsi encoding, so
//! characters outside that code page are written as `?`.

use std::fmt::Write as _;

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 72.0;
const TITLE_SIZE: f64 = 20.0;
const BODY_SIZE: f64 = 12.0;
const LINE_GAP: f64 = 1.2;

/// Helvetica advance widths (1/1000 em) for bytes 0x20..=0x7E.
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // a..z
    334, 260, 334, 584, // {..~
];
const DEFAULT_WIDTH: u16 = 556;

/// Maps a char to its WinAnsi byte, or `?` when it has none.
fn win_ansi(c: char) -> u8 {
    match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        '„' => 0x84,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        _ => b'?',
    }
}

pub fn encode(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi).collect()
}

fn glyph_width(b: u8) -> u16 {
    match b {
        0x20..=0x7e => HELVETICA_ASCII_WIDTHS[(b - 0x20) as usize],
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width in points of already-encoded text.
pub fn text_width(encoded: &[u8], size: f64) -> f64 {
    encoded.iter().map(|&b| f64::from(glyph_width(b))).sum::<f64>() * size / 1000.0
}

/// Greedy word wrap of one encoded paragraph. Words wider than the line are
/// broken between characters. An empty paragraph yields one empty line.
pub fn wrap(paragraph: &[u8], size: f64, max_width: f64) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut line: Vec<u8> = Vec::new();

    for word in paragraph.split(|&b| b == b' ').filter(|w| !w.is_empty()) {
        let candidate_width = if line.is_empty() {
            text_width(word, size)
        } else {
            text_width(&line, size) + text_width(b" ", size) + text_width(word, size)
        };

        if candidate_width <= max_width {
            if !line.is_empty() {
                line.push(b' ');
            }
            line.extend_from_slice(word);
            continue;
        }

        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }

        if text_width(word, size) <= max_width {
            line.extend_from_slice(word);
            continue;
        }

        for &b in word {
            if !line.is_empty() && text_width(&line, size) + text_width(&[b], size) > max_width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(b);
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn escape_into(out: &mut String, encoded: &[u8]) {
    for &b in encoded {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
}

struct PageBuilder {
    pages: Vec<String>,
    current: String,
    y: f64,
}

impl PageBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Moves to the next baseline for a line of `size`, breaking the page if the
    /// line would cross the bottom margin.
    fn advance(&mut self, size: f64) -> f64 {
        let leading = size * LINE_GAP;
        if self.y - leading < MARGIN {
            self.break_page();
        }
        self.y -= leading;
        self.y
    }

    fn text(&mut self, x: f64, y: f64, size: f64, encoded: &[u8]) {
        let _ = write!(self.current, "BT /F1 {size:.0} Tf {x:.2} {y:.2} Td (");
        escape_into(&mut self.current, encoded);
        self.current.push_str(") Tj ET\n");
    }

    fn underline(&mut self, x: f64, y: f64, width: f64) {
        let _ = writeln!(
            self.current,
            "1 w {x:.2} {y:.2} m {:.2} {y:.2} l S",
            x + width
        );
    }

    fn finish(mut self) -> Vec<String> {
        self.pages.push(self.current);
        self.pages
    }
}

/// Lays out a centered, underlined title, one blank line, then the
/// left-aligned body, and serializes the result as a PDF document.
pub fn render_document(title: &str, body: &str) -> Vec<u8> {
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    let mut pages = PageBuilder::new();

    let title_bytes = encode(title);
    for line in wrap(&title_bytes, TITLE_SIZE, usable) {
        let width = text_width(&line, TITLE_SIZE);
        let x = MARGIN + ((usable - width) / 2.0).max(0.0);
        let y = pages.advance(TITLE_SIZE);
        pages.text(x, y, TITLE_SIZE, &line);
        pages.underline(x, y - 2.0, width);
    }
    pages.advance(TITLE_SIZE);

    for paragraph in body.split('\n') {
        for line in wrap(&encode(paragraph), BODY_SIZE, usable) {
            let y = pages.advance(BODY_SIZE);
            if !line.is_empty() {
                pages.text(MARGIN, y, BODY_SIZE, &line);
            }
        }
    }

    serialize(title, &pages.finish())
}

fn serialize(title: &str, page_streams: &[String]) -> Vec<u8> {
    // 1 catalog, 2 page tree, 3 font, 4 info; page k is 5+2k, its content 6+2k.
    let page_id = |k: usize| 5 + 2 * k;
    let mut objects: Vec<String> = Vec::with_capacity(4 + 2 * page_streams.len());

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());

    let kids = (0..page_streams.len())
        .map(|k| format!("{} 0 R", page_id(k)))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!(
        "<< /Type /Pages /Kids [{kids}] /Count {} >>",
        page_streams.len()
    ));

    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );

    let mut info = String::from("<< /Title (");
    escape_into(&mut info, &encode(title));
    info.push_str(") /Producer (riskdesk) >>");
    objects.push(info);

    for (k, stream) in page_streams.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
/Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            page_id(k) + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}endstream",
            stream.len()
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = write!(out, "{} 0 obj\n{obj}\nendobj\n", i + 1);
    }

    let xref_at = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in offsets {
        let _ = write!(out, "{off:010} 00000 n \n");
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R /Info 4 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    );

    out.into_bytes()
}
