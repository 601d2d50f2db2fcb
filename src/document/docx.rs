//! Minimal Office Open XML writer for archive documents.
//!
//! Produces the smallest part set Word and LibreOffice accept: content types,
//! package relationships, core properties, the main document and its
//! relationships (one per hyperlink).

use std::borrow::Cow;
use std::io::{self, Cursor, Write};

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{Block, Paragraph, Run};

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const OFFICE_RELS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const DOCUMENT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const CORE_PROPS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const HYPERLINK_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Color and underline Word uses for hyperlinks by default.
const LINK_COLOR: &str = "0563C1";

/// Serialize blocks into `.docx` bytes.
pub(super) fn write_docx(
    title: &str,
    blocks: &[Block],
    created: DateTime<Utc>,
) -> zip::result::ZipResult<Vec<u8>> {
    let mut links = Vec::new();
    let body = document_body(blocks, &mut links)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", content_types()?),
        ("_rels/.rels", package_relationships()?),
        ("docProps/core.xml", core_properties(title, created)?),
        ("word/document.xml", body),
        ("word/_rels/document.xml.rels", document_relationships(&links)?),
    ];
    for (name, xml) in parts {
        zip.start_file(name, options)?;
        zip.write_all(&xml)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// One XML part being written, starting with the standalone declaration.
struct Part {
    writer: Writer<Vec<u8>>,
}

impl Part {
    fn new() -> io::Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        self.writer.write_event(Event::Start(element(name, attrs)))
    }

    fn close(&mut self, name: &str) -> io::Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        self.writer.write_event(Event::Empty(element(name, attrs)))
    }

    /// `<name>text</name>`.
    fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> io::Result<()> {
        self.open(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(&xml_chars(text))))?;
        self.close(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    BytesStart::new(name).with_attributes(attrs.iter().copied())
}

fn content_types() -> io::Result<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("Types", &[("xmlns", CONTENT_TYPES_NS)])?;
    part.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    part.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    part.empty(
        "Override",
        &[
            ("PartName", "/word/document.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            ),
        ],
    )?;
    part.empty(
        "Override",
        &[
            ("PartName", "/docProps/core.xml"),
            ("ContentType", "application/vnd.openxmlformats-package.core-properties+xml"),
        ],
    )?;
    part.close("Types")?;
    Ok(part.finish())
}

fn package_relationships() -> io::Result<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("Relationships", &[("xmlns", RELATIONSHIPS_NS)])?;
    part.empty(
        "Relationship",
        &[("Id", "rId1"), ("Type", DOCUMENT_REL_TYPE), ("Target", "word/document.xml")],
    )?;
    part.empty(
        "Relationship",
        &[("Id", "rId2"), ("Type", CORE_PROPS_REL_TYPE), ("Target", "docProps/core.xml")],
    )?;
    part.close("Relationships")?;
    Ok(part.finish())
}

fn core_properties(title: &str, created: DateTime<Utc>) -> io::Result<Vec<u8>> {
    let created = created.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut part = Part::new()?;
    part.open(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    part.text_element("dc:title", &[], title)?;
    part.text_element("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &created)?;
    part.close("cp:coreProperties")?;
    Ok(part.finish())
}

/// `word/document.xml`. Every hyperlink target is pushed to `links`; its
/// relationship id is `rId<position>`.
fn document_body(blocks: &[Block], links: &mut Vec<String>) -> io::Result<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("w:document", &[("xmlns:w", WORDML_NS), ("xmlns:r", OFFICE_RELS_NS)])?;
    part.open("w:body", &[])?;
    for paragraph in blocks.iter().flat_map(Block::paragraphs) {
        write_paragraph(&mut part, paragraph, links)?;
    }
    part.close("w:body")?;
    part.close("w:document")?;
    Ok(part.finish())
}

fn write_paragraph(
    part: &mut Part,
    paragraph: &Paragraph,
    links: &mut Vec<String>,
) -> io::Result<()> {
    part.open("w:p", &[])?;
    for run in &paragraph.runs {
        match run {
            Run::Text {
                text,
                size_pt,
                color,
            } => {
                // Word sizes are in half-points.
                let half_points = (size_pt * 2).to_string();
                part.open("w:r", &[])?;
                part.open("w:rPr", &[])?;
                part.empty("w:color", &[("w:val", color.as_str())])?;
                part.empty("w:sz", &[("w:val", half_points.as_str())])?;
                part.close("w:rPr")?;
                write_text(part, text)?;
                part.close("w:r")?;
            }
            Run::Link { text, url } => {
                links.push(xml_chars(url).into_owned());
                let id = format!("rId{}", links.len());
                part.open("w:hyperlink", &[("r:id", id.as_str())])?;
                part.open("w:r", &[])?;
                part.open("w:rPr", &[])?;
                part.empty("w:color", &[("w:val", LINK_COLOR)])?;
                part.empty("w:u", &[("w:val", "single")])?;
                part.close("w:rPr")?;
                write_text(part, text)?;
                part.close("w:r")?;
                part.close("w:hyperlink")?;
            }
        }
    }
    part.close("w:p")
}

/// `<w:t>` elements, with newlines turned into `<w:br/>`.
fn write_text(part: &mut Part, text: &str) -> io::Result<()> {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            part.empty("w:br", &[])?;
        }
        part.text_element("w:t", &[("xml:space", "preserve")], line)?;
    }
    Ok(())
}

fn document_relationships(links: &[String]) -> io::Result<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("Relationships", &[("xmlns", RELATIONSHIPS_NS)])?;
    for (i, url) in links.iter().enumerate() {
        let id = format!("rId{}", i + 1);
        part.empty(
            "Relationship",
            &[
                ("Id", id.as_str()),
                ("Type", HYPERLINK_REL_TYPE),
                ("Target", url.as_str()),
                ("TargetMode", "External"),
            ],
        )?;
    }
    part.close("Relationships")?;
    Ok(part.finish())
}

/// Drop characters XML 1.0 does not allow: control characters other than
/// tab, newline and carriage return, and the noncharacters U+FFFE and U+FFFF.
fn xml_chars(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| {
        !matches!(c, '\u{FFFE}' | '\u{FFFF}')
            && (!c.is_control() || matches!(c, '\t' | '\n' | '\r'))
    };
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}
