//! Rendering dispatch: a pure function from parts to visual blocks.
//!
//! The output is a structural description, not markup. Text splits into
//! paragraphs and fenced code; tool traffic becomes collapsed-by-default
//! blocks carrying the exact payload; unknown parts degrade to a generically
//! labeled block and never panic.

use crate::message::Part;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde_json::Value;

/// One visual block produced by rendering a part.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderBlock {
    /// Flowing prose.
    Paragraph(String),
    /// Preformatted code span.
    CodeBlock { language: String, code: String },
    /// Transient processing indicator; never persisted as content.
    Processing,
    /// Collapsible payload block, collapsed by default.
    Collapsible {
        label: String,
        payload: Value,
        open: bool,
    },
}

/// Render one part. Pure: the same part always yields the same blocks.
pub fn render_part(part: &Part) -> Vec<RenderBlock> {
    match part {
        Part::Text { text } => render_text(text),
        Part::StepStart => vec![RenderBlock::Processing],
        Part::ToolInvocation { .. } | Part::ToolResult { .. } | Part::Unknown { .. } => {
            vec![RenderBlock::Collapsible {
                label: part_label(part).to_string(),
                payload: part.to_value(),
                open: false,
            }]
        }
    }
}

/// Human-readable label for a collapsible part block.
fn part_label(part: &Part) -> &'static str {
    match part {
        Part::ToolInvocation { .. } => "Tool Call",
        Part::ToolResult { tool_name, .. } => match tool_name.as_str() {
            "db" => "Database Result",
            "schema" => "Schema",
            _ => "Tool Result",
        },
        _ => "Unknown Part",
    }
}

/// Split prose into paragraphs and code blocks via the markdown event stream.
fn render_text(text: &str) -> Vec<RenderBlock> {
    let mut blocks = Vec::new();
    let mut paragraph = String::new();
    let mut code: Option<(String, String)> = None;

    let flush_paragraph = |paragraph: &mut String, blocks: &mut Vec<RenderBlock>| {
        let trimmed = paragraph.trim();
        if !trimmed.is_empty() {
            blocks.push(RenderBlock::Paragraph(trimmed.to_string()));
        }
        paragraph.clear();
    };

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                flush_paragraph(&mut paragraph, &mut blocks);
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, body)) = code.take() {
                    blocks.push(RenderBlock::CodeBlock {
                        language,
                        code: body.trim_end_matches('\n').to_string(),
                    });
                }
            }
            Event::Text(t) => {
                if let Some((_, body)) = code.as_mut() {
                    body.push_str(&t);
                } else {
                    paragraph.push_str(&t);
                }
            }
            Event::Code(t) => {
                paragraph.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak => {
                paragraph.push(' ');
            }
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                flush_paragraph(&mut paragraph, &mut blocks);
            }
            _ => {}
        }
    }
    flush_paragraph(&mut paragraph, &mut blocks);

    blocks
}
