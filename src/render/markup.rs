//! Inline markup for tooltip bodies.
//!
//! Task descriptions may use Markdown-style inline emphasis: `**bold**`,
//! `*italic*`, `` `code` `` and `[links](https://…)`. Everything else is text.
//! Raw HTML is shown literally and link targets outside `http`, `https` and
//! `mailto` are dropped, so a description can never inject markup.

use egui::text::{LayoutJob, TextFormat};
use egui::{Color32, Stroke};
use pulldown_cmark::{Event, Options, Parser, Tag};

use crate::render::theme;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub style: SpanStyle,
}

/// Keep only link targets that are safe to show as links.
pub fn safe_link(url: &str) -> Option<String> {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
        .then(|| trimmed.to_string())
}

#[derive(Default)]
struct SpanBuilder {
    spans: Vec<InlineSpan>,
    bold: u32,
    italic: u32,
    links: Vec<Option<String>>,
}

impl SpanBuilder {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            code: false,
            link: self.links.iter().rev().flatten().next().cloned(),
        }
    }

    fn push(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(InlineSpan {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn text(&mut self, text: &str) {
        let style = self.style();
        self.push(text, style);
    }

    fn finish(mut self) -> Vec<InlineSpan> {
        while let Some(last) = self.spans.last_mut() {
            let trimmed = last.text.trim_end_matches('\n').len();
            last.text.truncate(trimmed);
            if last.text.is_empty() {
                self.spans.pop();
            } else {
                break;
            }
        }
        self.spans
    }
}

/// Split `source` into styled runs.
pub fn parse_inline(source: &str) -> Vec<InlineSpan> {
    let mut builder = SpanBuilder::default();
    for event in Parser::new_ext(source, Options::empty()) {
        match event {
            Event::Start(Tag::Strong) => builder.bold += 1,
            Event::End(Tag::Strong) => builder.bold = builder.bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => builder.italic += 1,
            Event::End(Tag::Emphasis) => builder.italic = builder.italic.saturating_sub(1),
            Event::Start(Tag::Link(_, url, _)) => builder.links.push(safe_link(&url)),
            Event::End(Tag::Link(..)) => {
                builder.links.pop();
            }
            Event::Start(Tag::Item) => builder.text("• "),
            Event::End(Tag::Paragraph | Tag::Heading(..) | Tag::Item | Tag::CodeBlock(_)) => {
                builder.text("\n")
            }
            Event::Text(text) | Event::Html(text) => builder.text(&text),
            Event::Code(code) => {
                let style = SpanStyle {
                    code: true,
                    ..builder.style()
                };
                builder.push(&code, style);
            }
            Event::SoftBreak => builder.text(" "),
            Event::HardBreak => builder.text("\n"),
            _ => {}
        }
    }
    builder.finish()
}

/// Colours used when turning spans into an egui layout job.
#[derive(Debug, Clone, Copy)]
pub struct MarkupColors {
    pub text: Color32,
    pub strong: Color32,
    pub link: Color32,
    pub code_bg: Color32,
}

pub fn layout_job(spans: &[InlineSpan], colors: MarkupColors, wrap_width: f32) -> LayoutJob {
    let mut job = LayoutJob::default();
    job.wrap.max_width = wrap_width;
    for span in spans {
        let mut format = TextFormat {
            font_id: if span.style.code {
                theme::font_code()
            } else {
                theme::font_glyph()
            },
            color: if span.style.bold {
                colors.strong
            } else {
                colors.text
            },
            italics: span.style.italic,
            ..Default::default()
        };
        if span.style.code {
            format.background = colors.code_bg;
        }
        if span.style.link.is_some() {
            format.color = colors.link;
            format.underline = Stroke::new(1.0, colors.link);
        }
        job.append(&span.text, 0.0, format);
    }
    job
}
