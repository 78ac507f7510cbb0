//! DOCX document assembler.
//!
//! Turns a header and an ordered list of [`Segment`]s into a minimal OOXML
//! word-processing package. Styling is a fixed policy: a centered bold
//! Calibri heading followed by one justified Calibri paragraph per line.
//! Segments are merged cleanly, without per-segment sub-headings.
//!
//! Output is byte-for-byte deterministic for identical input: ZIP entries
//! are written in a fixed order with a fixed timestamp, and no generated
//! metadata (dates, revision ids) is embedded.

use std::io::{Cursor, Write};

use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;

use crate::models::Segment;

/// MIME type of the assembled output.
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const FONT: &str = "Calibri";
const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

/// Fixed paragraph styling.
#[derive(Debug, Clone, Copy)]
struct ParagraphStyle {
    /// Font size in half-points (`w:sz`).
    size: u32,
    bold: bool,
    /// `w:jc` value.
    align: &'static str,
    /// Space after the paragraph, in twentieths of a point.
    spacing_after: u32,
}

/// 24pt, bold, centered.
const HEADING: ParagraphStyle = ParagraphStyle {
    size: 48,
    bold: true,
    align: "center",
    spacing_after: 400,
};

/// 16pt, justified.
const BODY: ParagraphStyle = ParagraphStyle {
    size: 32,
    bold: false,
    align: "both",
    spacing_after: 240,
};

/// Assemble a DOCX package from a header and ordered segments.
pub fn assemble_document(header: &str, segments: &[Segment]) -> Result<Vec<u8>> {
    let document_xml = render_document_xml(header, segments)?;

    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(PACKAGE_RELS_XML.as_bytes())?;
    zip.start_file("word/document.xml", options)?;
    zip.write_all(&document_xml)?;
    let cursor = zip.finish()?;

    Ok(cursor.into_inner())
}

/// Render `word/document.xml`.
fn render_document_xml(header: &str, segments: &[Segment]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("w:document");
    root.push_attribute(("xmlns:w", WORDML_NS));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;

    write_paragraph(&mut writer, header, HEADING)?;
    for line in segments.iter().flat_map(|s| s.lines.iter()) {
        write_paragraph(&mut writer, line, BODY)?;
    }

    writer.write_event(Event::Start(BytesStart::new("w:sectPr")))?;
    let mut page_size = BytesStart::new("w:pgSz");
    page_size.push_attribute(("w:w", "11906"));
    page_size.push_attribute(("w:h", "16838"));
    writer.write_event(Event::Empty(page_size))?;
    let mut margins = BytesStart::new("w:pgMar");
    for side in ["w:top", "w:right", "w:bottom", "w:left"] {
        margins.push_attribute((side, "1440"));
    }
    writer.write_event(Event::Empty(margins))?;
    writer.write_event(Event::End(BytesEnd::new("w:sectPr")))?;

    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;

    Ok(writer.into_inner().into_inner())
}

fn write_paragraph(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    text: &str,
    style: ParagraphStyle,
) -> Result<()> {
    let size = style.size.to_string();
    let after = style.spacing_after.to_string();

    writer.write_event(Event::Start(BytesStart::new("w:p")))?;

    writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
    let mut spacing = BytesStart::new("w:spacing");
    spacing.push_attribute(("w:after", after.as_str()));
    writer.write_event(Event::Empty(spacing))?;
    let mut jc = BytesStart::new("w:jc");
    jc.push_attribute(("w:val", style.align));
    writer.write_event(Event::Empty(jc))?;
    writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;

    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
    let mut fonts = BytesStart::new("w:rFonts");
    fonts.push_attribute(("w:ascii", FONT));
    fonts.push_attribute(("w:hAnsi", FONT));
    fonts.push_attribute(("w:cs", FONT));
    writer.write_event(Event::Empty(fonts))?;
    if style.bold {
        writer.write_event(Event::Empty(BytesStart::new("w:b")))?;
    }
    for tag in ["w:sz", "w:szCs"] {
        let mut sz = BytesStart::new(tag);
        sz.push_attribute(("w:val", size.as_str()));
        writer.write_event(Event::Empty(sz))?;
    }
    writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;

    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;

    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}
