use std::cell::RefCell;

use egui::{Color32, RichText, Stroke};
use pulldown_cmark::{CodeBlockKind, Event, Tag};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::clipboard::{CopyOutcome, CopyTarget, CopyToast};
use crate::theme::ThemeColors;

const MIN_ZOOM: f32 = 0.5;
const MAX_ZOOM: f32 = 3.0;
const ZOOM_STEP: f32 = 1.1;

/// Font size configuration at zoom 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct FontSizes {
    pub body: f32,
    pub h1: f32,
    pub h2: f32,
    pub h3: f32,
    pub h4: f32,
    pub h5: f32,
    pub h6: f32,
    pub code: f32,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            body: 14.0,
            h1: 28.0,
            h2: 24.0,
            h3: 20.0,
            h4: 18.0,
            h5: 16.0,
            h6: 14.0,
            code: 12.0,
        }
    }
}

impl FontSizes {
    fn scaled(&self, zoom: f32) -> Self {
        Self {
            body: self.body * zoom,
            h1: self.h1 * zoom,
            h2: self.h2 * zoom,
            h3: self.h3 * zoom,
            h4: self.h4 * zoom,
            h5: self.h5 * zoom,
            h6: self.h6 * zoom,
            code: self.code * zoom,
        }
    }

    fn heading(&self, level: u8) -> f32 {
        match level {
            1 => self.h1,
            2 => self.h2,
            3 => self.h3,
            4 => self.h4,
            5 => self.h5,
            6 => self.h6,
            _ => self.body,
        }
    }
}

/// Represents an inline text span with formatting
#[derive(Debug, Clone, PartialEq)]
pub enum InlineSpan {
    Text(String),
    Code(String),
    Strong(String),
    Emphasis(String),
    Strikethrough(String),
    Link { text: String, url: String },
}

/// A block of the rendered document, ready to draw
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownElement {
    Paragraph(Vec<InlineSpan>),
    Header {
        level: u8,
        anchor: Option<String>,
        spans: Vec<InlineSpan>,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    List {
        ordered: bool,
        start: u64,
        items: Vec<Vec<InlineSpan>>,
    },
    Quote {
        depth: u8,
        lines: Vec<Vec<InlineSpan>>,
    },
    HorizontalRule,
    Table {
        headers: Vec<Vec<InlineSpan>>,
        rows: Vec<Vec<Vec<InlineSpan>>>,
    },
}

type TableParseResult = (Vec<Vec<InlineSpan>>, Vec<Vec<Vec<InlineSpan>>>, usize);
type QuoteLines = Vec<Vec<InlineSpan>>;

/// Something the user asked for while the document was drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    /// Copy the text of code block number `block` (document order).
    CopyCode { block: usize, text: String },
}

// ---------------------------------------------------------------------------
// Event stream -> blocks
// ---------------------------------------------------------------------------

/// Build display blocks from a processed event stream.
pub fn parse_events(events: &[Event<'_>]) -> Vec<MarkdownElement> {
    let mut elements = Vec::new();
    let mut i = 0;
    while i < events.len() {
        i = parse_element(events, i, &mut elements);
    }
    elements
}

fn parse_element(events: &[Event<'_>], start: usize, elements: &mut Vec<MarkdownElement>) -> usize {
    match &events[start] {
        Event::Start(Tag::Paragraph) => {
            let (spans, next) = parse_inline_spans(events, start + 1, &Tag::Paragraph, false);
            if !spans.is_empty() {
                elements.push(MarkdownElement::Paragraph(spans));
            }
            next
        }
        Event::Start(tag @ Tag::Heading(level, anchor, _)) => {
            let (spans, next) = parse_inline_spans(events, start + 1, tag, false);
            elements.push(MarkdownElement::Header {
                level: *level as u8,
                anchor: anchor.map(str::to_string),
                spans,
            });
            next
        }
        Event::Start(Tag::CodeBlock(kind)) => {
            let language = match kind {
                CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                _ => None,
            };
            let mut text = String::new();
            let mut i = start + 1;
            while i < events.len() {
                match &events[i] {
                    Event::End(Tag::CodeBlock(_)) => break,
                    Event::Text(t) => text.push_str(t),
                    _ => {}
                }
                i += 1;
            }
            elements.push(MarkdownElement::CodeBlock { language, text });
            i + 1
        }
        Event::Start(Tag::List(first)) => {
            let (items, next) = parse_list(events, start + 1);
            elements.push(MarkdownElement::List {
                ordered: first.is_some(),
                start: first.unwrap_or(1),
                items,
            });
            next
        }
        Event::Rule => {
            elements.push(MarkdownElement::HorizontalRule);
            start + 1
        }
        Event::Start(Tag::BlockQuote) => {
            let (quotes, next) = collect_blockquotes(events, start + 1, 1);
            for (depth, lines) in quotes {
                if !lines.is_empty() {
                    elements.push(MarkdownElement::Quote { depth, lines });
                }
            }
            next
        }
        Event::Start(Tag::Table(_)) => {
            let (headers, rows, next) = parse_table(events, start + 1);
            elements.push(MarkdownElement::Table { headers, rows });
            next
        }
        _ => start + 1,
    }
}

fn same_tag(a: &Tag<'_>, b: &Tag<'_>) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Collect inline spans until the end of `end_tag`. Hard breaks always
/// become line breaks; soft breaks only when `keep_soft_breaks` is set.
fn parse_inline_spans(
    events: &[Event<'_>],
    start: usize,
    end_tag: &Tag<'_>,
    keep_soft_breaks: bool,
) -> (Vec<InlineSpan>, usize) {
    let (spans, stop) = collect_inline(events, start, keep_soft_breaks, |event| {
        matches!(event, Event::End(tag) if same_tag(tag, end_tag))
    });
    (spans, (stop + 1).min(events.len()))
}

/// Collect inline spans up to (not including) the first event `stop`
/// accepts. Returns the spans and the index of that event.
fn collect_inline(
    events: &[Event<'_>],
    start: usize,
    keep_soft_breaks: bool,
    stop: impl Fn(&Event<'_>) -> bool,
) -> (Vec<InlineSpan>, usize) {
    let mut spans = Vec::new();
    let mut buffer = String::new();
    let mut i = start;

    fn flush(buffer: &mut String, spans: &mut Vec<InlineSpan>) {
        if !buffer.is_empty() {
            spans.push(InlineSpan::Text(std::mem::take(buffer)));
        }
    }

    while i < events.len() {
        if stop(&events[i]) {
            flush(&mut buffer, &mut spans);
            return (spans, i);
        }
        match &events[i] {
            Event::Text(text) => {
                buffer.push_str(text);
                i += 1;
            }
            Event::HardBreak => {
                buffer.push('\n');
                i += 1;
            }
            Event::SoftBreak => {
                buffer.push(if keep_soft_breaks { '\n' } else { ' ' });
                i += 1;
            }
            Event::TaskListMarker(checked) => {
                buffer.push_str(if *checked { "[x] " } else { "[ ] " });
                i += 1;
            }
            Event::Code(code) => {
                flush(&mut buffer, &mut spans);
                spans.push(InlineSpan::Code(code.to_string()));
                i += 1;
            }
            Event::Start(tag @ (Tag::Strong | Tag::Emphasis | Tag::Strikethrough)) => {
                flush(&mut buffer, &mut spans);
                let (inner, next) = collect_until_tag_end(events, i + 1, tag);
                spans.push(match tag {
                    Tag::Strong => InlineSpan::Strong(inner),
                    Tag::Emphasis => InlineSpan::Emphasis(inner),
                    _ => InlineSpan::Strikethrough(inner),
                });
                i = next;
            }
            Event::Start(tag @ (Tag::Link(_, url, _) | Tag::Image(_, url, _))) => {
                flush(&mut buffer, &mut spans);
                let url = url.to_string();
                let (mut text, next) = collect_until_tag_end(events, i + 1, tag);
                if text.is_empty() {
                    text = url.clone();
                }
                spans.push(InlineSpan::Link { text, url });
                i = next;
            }
            _ => i += 1,
        }
    }

    flush(&mut buffer, &mut spans);
    (spans, i)
}

/// Collect plain text until a specific end tag
fn collect_until_tag_end(events: &[Event<'_>], start: usize, end_tag: &Tag<'_>) -> (String, usize) {
    let mut text = String::new();
    let mut i = start;
    while i < events.len() {
        match &events[i] {
            Event::End(tag) if same_tag(tag, end_tag) => return (text, i + 1),
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
        i += 1;
    }
    (text, i)
}

/// Parse list items; nested lists are flattened into the parent item as
/// extra lines.
fn parse_list(events: &[Event<'_>], start: usize) -> (Vec<Vec<InlineSpan>>, usize) {
    let mut items = Vec::new();
    let mut i = start;

    while i < events.len() {
        match &events[i] {
            Event::End(Tag::List(_)) => return (items, i + 1),
            Event::Start(Tag::Item) => {
                i += 1;
                let mut spans: Vec<InlineSpan> = Vec::new();
                while i < events.len() {
                    match &events[i] {
                        Event::End(Tag::Item) => {
                            i += 1;
                            break;
                        }
                        Event::Start(Tag::Paragraph) => {
                            if !spans.is_empty() {
                                spans.push(InlineSpan::Text("\n".into()));
                            }
                            let (ps, next) =
                                parse_inline_spans(events, i + 1, &Tag::Paragraph, false);
                            spans.extend(ps);
                            i = next;
                        }
                        Event::Start(Tag::List(child_first)) => {
                            let (child_items, next) = parse_list(events, i + 1);
                            i = next;
                            let first = child_first.unwrap_or(1);
                            for (idx, child) in child_items.into_iter().enumerate() {
                                spans.push(InlineSpan::Text("\n".into()));
                                let marker = match child_first {
                                    Some(_) => format!("{}.", first + idx as u64),
                                    None => "◦".to_string(),
                                };
                                spans.push(InlineSpan::Text(format!("    {marker} ")));
                                spans.extend(child);
                            }
                        }
                        _ => {
                            // Tight items carry their inline content directly.
                            let (inline, next) = collect_inline(events, i, false, |event| {
                                matches!(
                                    event,
                                    Event::End(Tag::Item)
                                        | Event::Start(Tag::List(_))
                                        | Event::Start(Tag::Paragraph)
                                )
                            });
                            spans.extend(inline);
                            i = next;
                        }
                    }
                }
                items.push(spans);
            }
            _ => i += 1,
        }
    }

    (items, i)
}

/// Collect blockquotes into (depth, lines) entries; supports nesting
fn collect_blockquotes(events: &[Event<'_>], start: usize, depth: u8) -> (Vec<(u8, QuoteLines)>, usize) {
    let mut i = start;
    let mut result: Vec<(u8, QuoteLines)> = Vec::new();
    let mut lines: QuoteLines = Vec::new();

    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::Paragraph) => {
                let (para, next) = parse_inline_spans(events, i + 1, &Tag::Paragraph, true);
                lines.extend(split_lines(&para));
                i = next;
            }
            Event::Start(Tag::BlockQuote) => {
                if !lines.is_empty() {
                    result.push((depth, std::mem::take(&mut lines)));
                }
                let (nested, next) = collect_blockquotes(events, i + 1, depth + 1);
                result.extend(nested);
                i = next;
            }
            Event::End(Tag::BlockQuote) => {
                if !lines.is_empty() {
                    result.push((depth, lines));
                }
                return (result, i + 1);
            }
            _ => i += 1,
        }
    }
    if !lines.is_empty() {
        result.push((depth, lines));
    }
    (result, i)
}

/// Parse a table with headers and rows
fn parse_table(events: &[Event<'_>], start: usize) -> TableParseResult {
    let mut headers: Vec<Vec<InlineSpan>> = Vec::new();
    let mut rows: Vec<Vec<Vec<InlineSpan>>> = Vec::new();
    let mut row: Vec<Vec<InlineSpan>> = Vec::new();
    let mut in_head = false;
    let mut i = start;

    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::TableHead) => {
                in_head = true;
                i += 1;
            }
            Event::End(Tag::TableHead) => {
                in_head = false;
                i += 1;
            }
            Event::Start(Tag::TableCell) => {
                let (spans, next) = parse_inline_spans(events, i + 1, &Tag::TableCell, false);
                if in_head {
                    headers.push(spans);
                } else {
                    row.push(spans);
                }
                i = next;
            }
            Event::End(Tag::TableRow) => {
                if !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                }
                i += 1;
            }
            Event::End(Tag::Table(_)) => return (headers, rows, i + 1),
            _ => i += 1,
        }
    }
    (headers, rows, i)
}

/// Split spans into visual lines on embedded newlines.
fn split_lines(spans: &[InlineSpan]) -> Vec<Vec<InlineSpan>> {
    let mut lines: Vec<Vec<InlineSpan>> = vec![Vec::new()];
    for span in spans {
        match span {
            InlineSpan::Text(t) if t.contains('\n') => {
                let parts: Vec<&str> = t.split('\n').collect();
                for (pi, part) in parts.iter().enumerate() {
                    if !part.is_empty() {
                        if let Some(line) = lines.last_mut() {
                            line.push(InlineSpan::Text(part.to_string()));
                        }
                    }
                    if pi + 1 < parts.len() {
                        lines.push(Vec::new());
                    }
                }
            }
            other => {
                if let Some(line) = lines.last_mut() {
                    line.push(other.clone());
                }
            }
        }
    }
    lines
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Draws rendered blocks into an egui `Ui`.
pub struct DocumentView {
    base_sizes: FontSizes,
    font_sizes: FontSizes,
    zoom: f32,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    /// Heading anchor to scroll to on the next frame (internal `#links`).
    pending_anchor: RefCell<Option<String>>,
}

impl Default for DocumentView {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentView {
    pub fn new() -> Self {
        Self {
            base_sizes: FontSizes::default(),
            font_sizes: FontSizes::default(),
            zoom: 1.0,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            pending_anchor: RefCell::new(None),
        }
    }

    pub fn font_sizes(&self) -> &FontSizes {
        &self.font_sizes
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.font_sizes = self.base_sizes.scaled(self.zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    /// Draw `elements`. `toast` drives the Copy button label of the block
    /// it refers to.
    pub fn render_to_ui(
        &self,
        ui: &mut egui::Ui,
        elements: &[MarkdownElement],
        toast: Option<&CopyToast>,
    ) -> Option<ViewAction> {
        let colors = ThemeColors::current(ui.visuals().dark_mode);
        let mut action = None;
        let mut code_index = 0;
        let mut table_index = 0;

        for element in elements {
            match element {
                MarkdownElement::Paragraph(spans) => {
                    for line in split_lines(spans) {
                        self.render_inline_line(ui, &line, None, false, colors);
                    }
                    ui.add_space(4.0);
                }
                MarkdownElement::Header {
                    level,
                    anchor,
                    spans,
                } => {
                    ui.add_space(8.0);
                    let size = self.font_sizes.heading(*level);
                    let response = ui
                        .horizontal_wrapped(|ui| {
                            ui.spacing_mut().item_spacing.x = 0.0;
                            for span in spans {
                                self.render_inline_span(ui, span, Some(size), true, colors);
                            }
                        })
                        .response;
                    let mut pending = self.pending_anchor.borrow_mut();
                    if anchor.is_some() && *pending == *anchor {
                        response.scroll_to_me(Some(egui::Align::TOP));
                        *pending = None;
                    }
                    ui.add_space(6.0);
                }
                MarkdownElement::CodeBlock { language, text } => {
                    let label = copy_label(toast, code_index);
                    if self.render_code_block(ui, language.as_deref(), text, label, colors) {
                        action = Some(ViewAction::CopyCode {
                            block: code_index,
                            text: text.clone(),
                        });
                    }
                    code_index += 1;
                }
                MarkdownElement::List {
                    ordered,
                    start,
                    items,
                } => {
                    self.render_list(ui, *ordered, *start, items, colors);
                }
                MarkdownElement::Quote { depth, lines } => {
                    self.render_quote(ui, *depth, lines, colors);
                }
                MarkdownElement::HorizontalRule => {
                    ui.add_space(8.0);
                    ui.separator();
                    ui.add_space(8.0);
                }
                MarkdownElement::Table { headers, rows } => {
                    self.render_table(ui, table_index, headers, rows, colors);
                    table_index += 1;
                }
            }
        }
        action
    }

    fn render_inline_line(
        &self,
        ui: &mut egui::Ui,
        spans: &[InlineSpan],
        size: Option<f32>,
        strong: bool,
        colors: &ThemeColors,
    ) {
        ui.horizontal_wrapped(|ui| {
            // Avoid adding UI spacing between inline fragments
            ui.spacing_mut().item_spacing.x = 0.0;
            for span in spans {
                self.render_inline_span(ui, span, size, strong, colors);
            }
        });
    }

    fn render_inline_span(
        &self,
        ui: &mut egui::Ui,
        span: &InlineSpan,
        font_size: Option<f32>,
        strong: bool,
        colors: &ThemeColors,
    ) {
        let size = font_size.unwrap_or(self.font_sizes.body);
        let styled = |text: &str| {
            let rich = RichText::new(text).size(size);
            if strong {
                rich.strong()
            } else {
                rich
            }
        };

        match span {
            InlineSpan::Text(text) => {
                ui.label(styled(text));
            }
            InlineSpan::Code(code) => {
                ui.add(
                    egui::Label::new(
                        RichText::new(code)
                            .size(self.font_sizes.code)
                            .family(egui::FontFamily::Monospace)
                            .background_color(colors.inline_code_bg)
                            .color(colors.inline_code_fg),
                    )
                    .wrap(false),
                );
            }
            InlineSpan::Strong(text) => {
                ui.label(RichText::new(text).size(size).strong());
            }
            InlineSpan::Emphasis(text) => {
                ui.label(styled(text).italics());
            }
            InlineSpan::Strikethrough(text) => {
                ui.label(styled(text).strikethrough());
            }
            InlineSpan::Link { text, url } => {
                let internal = url.starts_with('#');
                let color = if internal {
                    colors.link_internal
                } else {
                    colors.link
                };
                let response = ui
                    .add(egui::Label::new(styled(text).color(color).underline()).sense(egui::Sense::click()))
                    .on_hover_text(url.as_str());
                if response.clicked() {
                    self.follow_link(url);
                }
            }
        }
    }

    fn follow_link(&self, url: &str) {
        if let Some(anchor) = url.strip_prefix('#') {
            *self.pending_anchor.borrow_mut() = Some(anchor.to_string());
        } else if let Err(e) = webbrowser::open(url) {
            log::warn!("failed to open URL {url}: {e}");
        }
    }

    fn render_list(
        &self,
        ui: &mut egui::Ui,
        ordered: bool,
        start: u64,
        items: &[Vec<InlineSpan>],
        colors: &ThemeColors,
    ) {
        if items.is_empty() {
            return;
        }
        ui.add_space(4.0);
        for (index, spans) in items.iter().enumerate() {
            for (li, line) in split_lines(spans).into_iter().enumerate() {
                ui.horizontal_wrapped(|ui| {
                    if li == 0 {
                        let marker = if ordered {
                            format!("{}.", start + index as u64)
                        } else {
                            "•".to_string()
                        };
                        ui.label(
                            RichText::new(format!("{marker} "))
                                .size(self.font_sizes.body)
                                .color(colors.list_marker),
                        );
                    } else {
                        ui.add_space(18.0);
                    }
                    ui.spacing_mut().item_spacing.x = 0.0;
                    for span in &line {
                        self.render_inline_span(ui, span, None, false, colors);
                    }
                });
            }
        }
        ui.add_space(4.0);
    }

    fn render_quote(&self, ui: &mut egui::Ui, depth: u8, lines: &[Vec<InlineSpan>], colors: &ThemeColors) {
        ui.add_space(4.0);
        let bar_width = 3.0;
        let bar_gap = 6.0;
        let left_pad = 10.0 + f32::from(depth) * (bar_width + bar_gap);

        let resp = egui::Frame::none()
            .fill(colors.blockquote_bg)
            .stroke(Stroke::new(1.0, colors.blockquote_border))
            .rounding(egui::Rounding::same(6.0))
            .inner_margin(egui::Margin {
                left: left_pad,
                right: 10.0,
                top: 8.0,
                bottom: 8.0,
            })
            .show(ui, |ui| {
                ui.style_mut().visuals.override_text_color = Some(colors.blockquote_text);
                for (li, line) in lines.iter().enumerate() {
                    self.render_inline_line(ui, line, None, false, colors);
                    if li + 1 < lines.len() {
                        ui.add_space(3.0);
                    }
                }
            });

        let rect = resp.response.rect;
        let top = rect.top() + 6.0;
        let bottom = rect.bottom() - 6.0;
        for d in 0..depth {
            let x = rect.left() + 6.0 + f32::from(d) * (bar_width + bar_gap);
            let bar_rect =
                egui::Rect::from_min_max(egui::pos2(x, top), egui::pos2(x + bar_width, bottom));
            ui.painter().rect_filled(bar_rect, 2.0, colors.blockquote_bar);
        }
        ui.add_space(6.0);
    }

    /// Draw a code block with its Copy button. Returns true when the button
    /// was clicked this frame.
    fn render_code_block(
        &self,
        ui: &mut egui::Ui,
        language: Option<&str>,
        code: &str,
        copy_label: &str,
        colors: &ThemeColors,
    ) -> bool {
        let mut clicked = false;
        ui.add_space(8.0);

        egui::Frame::none()
            .fill(colors.code_bg)
            .stroke(Stroke::new(1.0, colors.code_border))
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.horizontal(|ui| {
                    if let Some(lang) = language {
                        ui.label(
                            RichText::new(lang)
                                .size(self.font_sizes.code - 1.0)
                                .color(colors.code_label)
                                .family(egui::FontFamily::Monospace),
                        );
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button(copy_label).clicked() {
                            clicked = true;
                        }
                    });
                });

                let dark = ui.visuals().dark_mode;
                let syntax = language
                    .and_then(|lang| self.find_syntax_for_language(lang))
                    .or_else(|| self.syntax_set.find_syntax_by_first_line(code));
                let theme = self
                    .theme_set
                    .themes
                    .get(ThemeColors::syntect_theme(dark));

                match (syntax, theme) {
                    (Some(syntax), Some(theme)) => {
                        let mut h = HighlightLines::new(syntax, theme);
                        for line in LinesWithEndings::from(code) {
                            let ranges = h.highlight_line(line, &self.syntax_set).unwrap_or_default();
                            let mut job = egui::text::LayoutJob::default();
                            for (style, text) in ranges {
                                let text = text.trim_end_matches(['\n', '\r']);
                                if text.is_empty() {
                                    continue;
                                }
                                let fg = style.foreground;
                                let italics = style
                                    .font_style
                                    .contains(syntect::highlighting::FontStyle::ITALIC);
                                job.append(
                                    text,
                                    0.0,
                                    egui::TextFormat {
                                        font_id: egui::FontId::monospace(self.font_sizes.code),
                                        color: Color32::from_rgb(fg.r, fg.g, fg.b),
                                        italics,
                                        ..Default::default()
                                    },
                                );
                            }
                            if job.sections.is_empty() {
                                job.append(
                                    " ",
                                    0.0,
                                    egui::TextFormat {
                                        font_id: egui::FontId::monospace(self.font_sizes.code),
                                        ..Default::default()
                                    },
                                );
                            }
                            ui.label(job);
                        }
                    }
                    _ => {
                        ui.label(
                            RichText::new(code.trim_end_matches('\n'))
                                .size(self.font_sizes.code)
                                .color(colors.code_fallback_text)
                                .family(egui::FontFamily::Monospace),
                        );
                    }
                }
            });

        ui.add_space(8.0);
        clicked
    }

    fn render_table(
        &self,
        ui: &mut egui::Ui,
        index: usize,
        headers: &[Vec<InlineSpan>],
        rows: &[Vec<Vec<InlineSpan>>],
        colors: &ThemeColors,
    ) {
        if headers.is_empty() {
            return;
        }
        ui.add_space(8.0);
        let columns = headers.len();
        let spacing = ui.spacing().item_spacing.x;
        let col_width =
            ((ui.available_width() - spacing * columns as f32) / columns as f32).max(60.0);

        egui::Frame::none()
            .stroke(Stroke::new(1.0, colors.code_border))
            .inner_margin(4.0)
            .show(ui, |ui| {
                egui::Grid::new(("md_table", index))
                    .striped(true)
                    .show(ui, |ui| {
                        for header in headers {
                            ui.scope(|ui| {
                                ui.set_min_width(col_width);
                                ui.set_max_width(col_width);
                                self.render_inline_line(ui, header, None, true, colors);
                            });
                        }
                        ui.end_row();

                        for row in rows {
                            for cell in row.iter().take(columns) {
                                ui.scope(|ui| {
                                    ui.set_min_width(col_width);
                                    ui.set_max_width(col_width);
                                    self.render_inline_line(ui, cell, None, false, colors);
                                });
                            }
                            ui.end_row();
                        }
                    });
            });
        ui.add_space(8.0);
    }

    /// Find syntax definition for a given language name
    fn find_syntax_for_language(&self, lang: &str) -> Option<&syntect::parsing::SyntaxReference> {
        let lang_lower = lang.to_lowercase();

        if let Some(syntax) = self.syntax_set.find_syntax_by_token(&lang_lower) {
            return Some(syntax);
        }

        let mapped = match lang_lower.as_str() {
            "rust" => "rs",
            "python" => "py",
            "javascript" => "js",
            "typescript" => "ts",
            "c++" | "cpp" => "cpp",
            "c#" | "csharp" => "cs",
            "shell" | "bash" | "zsh" => "sh",
            "yaml" => "yml",
            "markdown" => "md",
            "ruby" => "rb",
            other => other,
        };
        self.syntax_set
            .find_syntax_by_extension(mapped)
            .or_else(|| self.syntax_set.find_syntax_by_name(mapped))
    }
}

fn copy_label(toast: Option<&CopyToast>, block: usize) -> &'static str {
    match toast {
        Some(toast) if toast.target == CopyTarget::CodeBlock(block) => match toast.outcome {
            CopyOutcome::Copied => "Copied!",
            CopyOutcome::Failed => "Copy failed",
        },
        _ => "Copy",
    }
}
