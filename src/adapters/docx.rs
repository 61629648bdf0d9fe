//! Minimal WordprocessingML package access: paragraph text in, highlighted runs out.

use crate::utils::error::{PhosphomError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

pub const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Highlight {
    Yellow,
    /// Word's GRAY_25.
    LightGray,
    Red,
}

impl Highlight {
    pub fn ooxml_value(&self) -> &'static str {
        match self {
            Highlight::Yellow => "yellow",
            Highlight::LightGray => "lightGray",
            Highlight::Red => "red",
        }
    }

    pub fn from_ooxml(value: &str) -> Option<Highlight> {
        match value {
            "yellow" => Some(Highlight::Yellow),
            "lightGray" => Some(Highlight::LightGray),
            "red" => Some(Highlight::Red),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub highlight: Option<Highlight>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlight: None,
        }
    }

    pub fn highlighted(text: impl Into<String>, highlight: Highlight) -> Self {
        Self {
            text: text.into(),
            highlight: Some(highlight),
        }
    }
}

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

#[derive(Debug, Clone)]
struct Paragraph {
    /// Opening tag through closing tag; a single `Empty` event for `<w:p/>`.
    events: Vec<Event<'static>>,
    /// Inclusive event range of the direct `w:pPr` child.
    props: Option<(usize, usize)>,
    text: String,
    runs: Vec<Run>,
    rewritten: bool,
}

#[derive(Debug, Clone)]
enum Segment {
    Markup(Event<'static>),
    Paragraph(usize),
}

/// A `.docx` package whose top-level paragraphs can be read and rewritten.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    entries: Vec<PackageEntry>,
    segments: Vec<Segment>,
    paragraphs: Vec<Paragraph>,
}

impl DocxDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            if !is_dir {
                file.read_to_end(&mut data)?;
            }
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
                is_dir,
            });
        }

        Self::from_entries(entries)
    }

    /// Builds a minimal package holding one plain paragraph per text.
    pub fn from_paragraph_texts<S: AsRef<str>>(texts: &[S]) -> Result<Self> {
        let mut body = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
        );
        for text in texts {
            let text = text.as_ref();
            if text.is_empty() {
                body.push_str("<w:p/>");
            } else {
                body.push_str(&format!(
                    r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    quick_xml::escape::escape(text)
                ));
            }
        }
        body.push_str("<w:sectPr/></w:body></w:document>");

        Self::from_entries(vec![
            PackageEntry {
                name: "[Content_Types].xml".to_string(),
                data: CONTENT_TYPES_XML.as_bytes().to_vec(),
                is_dir: false,
            },
            PackageEntry {
                name: "_rels/.rels".to_string(),
                data: PACKAGE_RELS_XML.as_bytes().to_vec(),
                is_dir: false,
            },
            PackageEntry {
                name: DOCUMENT_PART.to_string(),
                data: body.into_bytes(),
                is_dir: false,
            },
        ])
    }

    fn from_entries(entries: Vec<PackageEntry>) -> Result<Self> {
        let body = entries
            .iter()
            .find(|e| e.name == DOCUMENT_PART)
            .ok_or_else(|| PhosphomError::DocumentError {
                message: format!("package has no {}", DOCUMENT_PART),
            })?;
        let xml = std::str::from_utf8(&body.data).map_err(|e| PhosphomError::DocumentError {
            message: format!("{} is not valid UTF-8: {}", DOCUMENT_PART, e),
        })?;

        let (segments, paragraphs) = parse_body(xml)?;
        tracing::debug!("Parsed document body: {} paragraphs", paragraphs.len());

        Ok(Self {
            entries,
            segments,
            paragraphs,
        })
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn paragraph_text(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(|p| p.text.as_str())
    }

    pub fn paragraph_texts(&self) -> impl Iterator<Item = &str> {
        self.paragraphs.iter().map(|p| p.text.as_str())
    }

    pub fn paragraph_runs(&self, index: usize) -> Option<&[Run]> {
        self.paragraphs.get(index).map(|p| p.runs.as_slice())
    }

    /// Replaces the paragraph's content with `runs`, keeping its properties.
    pub fn replace_runs(&mut self, index: usize, runs: Vec<Run>) -> Result<()> {
        let count = self.paragraphs.len();
        let paragraph =
            self.paragraphs
                .get_mut(index)
                .ok_or_else(|| PhosphomError::DocumentError {
                    message: format!("paragraph {} out of range ({} paragraphs)", index, count),
                })?;

        let runs: Vec<Run> = runs.into_iter().filter(|r| !r.text.is_empty()).collect();
        paragraph.text = runs.iter().map(|r| r.text.as_str()).collect();
        paragraph.runs = runs;
        paragraph.rewritten = true;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = self.render_body()?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            if entry.is_dir {
                zip.add_directory::<_, ()>(entry.name.clone(), FileOptions::default())?;
                continue;
            }
            zip.start_file::<_, ()>(entry.name.clone(), FileOptions::default())?;
            if entry.name == DOCUMENT_PART {
                zip.write_all(&body)?;
            } else {
                zip.write_all(&entry.data)?;
            }
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn render_body(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());

        for segment in &self.segments {
            match segment {
                Segment::Markup(event) => writer.write_event(event.clone())?,
                Segment::Paragraph(idx) => {
                    let paragraph = &self.paragraphs[*idx];
                    if paragraph.rewritten {
                        write_rewritten_paragraph(&mut writer, paragraph)?;
                    } else {
                        for event in &paragraph.events {
                            writer.write_event(event.clone())?;
                        }
                    }
                }
            }
        }

        Ok(writer.into_inner())
    }
}

fn write_rewritten_paragraph(writer: &mut Writer<Vec<u8>>, paragraph: &Paragraph) -> Result<()> {
    match paragraph.events.first() {
        Some(Event::Empty(start)) => {
            writer.write_event(Event::Start(start.clone()))?;
            write_runs(writer, &paragraph.runs)?;
            writer.write_event(Event::End(start.to_end()))?;
        }
        Some(Event::Start(start)) => {
            writer.write_event(Event::Start(start.clone()))?;
            if let Some((from, to)) = paragraph.props {
                for event in &paragraph.events[from..=to] {
                    writer.write_event(event.clone())?;
                }
            }
            write_runs(writer, &paragraph.runs)?;
            writer.write_event(Event::End(start.to_end()))?;
        }
        _ => {
            return Err(PhosphomError::DocumentError {
                message: "paragraph without an opening tag".to_string(),
            })
        }
    }
    Ok(())
}

fn write_runs(writer: &mut Writer<Vec<u8>>, runs: &[Run]) -> Result<()> {
    for run in runs {
        writer.write_event(Event::Start(BytesStart::new("w:r")))?;
        if let Some(highlight) = run.highlight {
            writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
            let mut marker = BytesStart::new("w:highlight");
            marker.push_attribute(("w:val", highlight.ooxml_value()));
            writer.write_event(Event::Empty(marker))?;
            writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
        }
        let mut text = BytesStart::new("w:t");
        text.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(text))?;
        writer.write_event(Event::Text(BytesText::new(&run.text)))?;
        writer.write_event(Event::End(BytesEnd::new("w:t")))?;
        writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    }
    Ok(())
}

/// State of the outermost `w:p` being read.
struct OpenParagraph {
    paragraph: Paragraph,
    /// Element depth below the paragraph element.
    depth: usize,
    props_start: Option<usize>,
    in_text: bool,
    run: Option<Run>,
}

impl OpenParagraph {
    fn push_text(&mut self, text: &str) {
        self.paragraph.text.push_str(text);
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }
}

fn read_highlight(element: &BytesStart<'_>) -> Result<Option<Highlight>> {
    match element
        .try_get_attribute("w:val")
        .map_err(quick_xml::Error::from)?
    {
        Some(attr) => {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            Ok(Highlight::from_ooxml(&value))
        }
        None => Ok(None),
    }
}

fn parse_body(xml: &str) -> Result<(Vec<Segment>, Vec<Paragraph>)> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut paragraphs: Vec<Paragraph> = Vec::new();
    let mut open: Option<OpenParagraph> = None;
    // Elements enclosing the current position, outside any open paragraph
    let mut parents: Vec<Vec<u8>> = Vec::new();

    loop {
        let event = reader.read_event()?.into_owned();
        if matches!(event, Event::Eof) {
            break;
        }

        let Some(current) = open.as_mut() else {
            let in_body = parents.last().is_some_and(|name| name.as_slice() == b"w:body");
            match &event {
                Event::Start(e) if in_body && e.name().as_ref() == b"w:p" => {
                    open = Some(OpenParagraph {
                        paragraph: Paragraph {
                            events: vec![event.clone()],
                            props: None,
                            text: String::new(),
                            runs: Vec::new(),
                            rewritten: false,
                        },
                        depth: 0,
                        props_start: None,
                        in_text: false,
                        run: None,
                    });
                }
                Event::Empty(e) if in_body && e.name().as_ref() == b"w:p" => {
                    segments.push(Segment::Paragraph(paragraphs.len()));
                    paragraphs.push(Paragraph {
                        events: vec![event.clone()],
                        props: None,
                        text: String::new(),
                        runs: Vec::new(),
                        rewritten: false,
                    });
                }
                _ => {
                    match &event {
                        Event::Start(e) => parents.push(e.name().as_ref().to_vec()),
                        Event::End(_) => {
                            parents.pop();
                        }
                        _ => {}
                    }
                    segments.push(Segment::Markup(event));
                }
            }
            continue;
        };

        if current.depth == 0 && matches!(event, Event::End(_)) {
            // closing tag of the paragraph itself
            if let Some(mut finished) = open.take() {
                finished.paragraph.events.push(event);
                segments.push(Segment::Paragraph(paragraphs.len()));
                paragraphs.push(finished.paragraph);
            }
            continue;
        }

        let index = current.paragraph.events.len();
        match &event {
            Event::Start(e) => {
                match e.name().as_ref() {
                    b"w:pPr" if current.depth == 0 => current.props_start = Some(index),
                    b"w:r" => current.run = Some(Run::plain(String::new())),
                    b"w:t" => current.in_text = true,
                    b"w:highlight" => {
                        if let Some(highlight) = read_highlight(e)? {
                            if let Some(run) = current.run.as_mut() {
                                run.highlight = Some(highlight);
                            }
                        }
                    }
                    _ => {}
                }
                current.depth += 1;
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"w:pPr" if current.depth == 0 => current.paragraph.props = Some((index, index)),
                b"w:tab" => current.push_text("\t"),
                b"w:br" | b"w:cr" => current.push_text("\n"),
                b"w:highlight" => {
                    if let Some(highlight) = read_highlight(e)? {
                        if let Some(run) = current.run.as_mut() {
                            run.highlight = Some(highlight);
                        }
                    }
                }
                _ => {}
            },
            Event::Text(e) if current.in_text => {
                let text = e.unescape().map_err(quick_xml::Error::from)?;
                current.push_text(&text);
            }
            Event::CData(e) if current.in_text => {
                let text = String::from_utf8_lossy(e).into_owned();
                current.push_text(&text);
            }
            Event::End(e) => {
                current.depth -= 1;
                match e.name().as_ref() {
                    b"w:pPr" if current.depth == 0 => {
                        if let Some(start) = current.props_start.take() {
                            current.paragraph.props = Some((start, index));
                        }
                    }
                    b"w:t" => current.in_text = false,
                    b"w:r" => {
                        if let Some(run) = current.run.take() {
                            current.paragraph.runs.push(run);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        current.paragraph.events.push(event);
    }

    if open.is_some() {
        return Err(PhosphomError::DocumentError {
            message: "unterminated paragraph in document body".to_string(),
        });
    }

    Ok((segments, paragraphs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_texts_roundtrip() {
        let doc = DocxDocument::from_paragraph_texts(&["Header line", "", "A & B <c>"]).unwrap();
        assert_eq!(doc.paragraph_count(), 3);
        assert_eq!(doc.paragraph_text(0), Some("Header line"));
        assert_eq!(doc.paragraph_text(1), Some(""));
        assert_eq!(doc.paragraph_text(2), Some("A & B <c>"));

        let reread = DocxDocument::from_bytes(&doc.to_bytes().unwrap()).unwrap();
        let texts: Vec<&str> = reread.paragraph_texts().collect();
        assert_eq!(texts, vec!["Header line", "", "A & B <c>"]);
    }

    #[test]
    fn test_replace_runs_writes_highlights() {
        let mut doc = DocxDocument::from_paragraph_texts(&["first", "", "third"]).unwrap();
        doc.replace_runs(
            0,
            vec![
                Run::plain("PEP"),
                Run::highlighted("S", Highlight::Red),
                Run::highlighted("(0.9)", Highlight::Yellow),
                Run::plain(""),
            ],
        )
        .unwrap();
        doc.replace_runs(1, vec![Run::highlighted("AAA", Highlight::LightGray)])
            .unwrap();

        let reread = DocxDocument::from_bytes(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(reread.paragraph_text(0), Some("PEPS(0.9)"));
        assert_eq!(reread.paragraph_text(1), Some("AAA"));
        assert_eq!(reread.paragraph_text(2), Some("third"));

        let runs = reread.paragraph_runs(0).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], Run::plain("PEP"));
        assert_eq!(runs[1].highlight, Some(Highlight::Red));
        assert_eq!(runs[2].highlight, Some(Highlight::Yellow));
        assert_eq!(
            reread.paragraph_runs(1).unwrap()[0].highlight,
            Some(Highlight::LightGray)
        );
    }

    #[test]
    fn test_replace_runs_out_of_range() {
        let mut doc = DocxDocument::from_paragraph_texts(&["only"]).unwrap();
        assert!(doc.replace_runs(3, vec![Run::plain("x")]).is_err());
    }

    #[test]
    fn test_tabs_breaks_and_properties_survive_rewrite() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>after</w:t></w:r></w:p></w:body></w:document>"#;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file::<_, ()>(DOCUMENT_PART, FileOptions::default()).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let mut doc = DocxDocument::from_bytes(&bytes).unwrap();
        // table cell paragraphs are not body paragraphs
        assert_eq!(doc.paragraph_count(), 2);
        assert_eq!(doc.paragraph_text(0), Some("a\tb\nc"));
        assert_eq!(doc.paragraph_text(1), Some("after"));

        doc.replace_runs(0, vec![Run::plain("new")]).unwrap();
        let rendered = String::from_utf8(doc.render_body().unwrap()).unwrap();
        assert!(rendered.contains(r#"<w:pPr><w:jc w:val="center"/></w:pPr>"#));
        assert!(rendered.contains("<w:tbl>"));
        assert!(rendered.contains("<w:t>cell</w:t>"));
        assert!(rendered.contains("<w:t>after</w:t>"));
        assert!(!rendered.contains("<w:tab/>"));
    }

    #[test]
    fn test_missing_document_part_is_rejected() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file::<_, ()>("word/other.xml", FileOptions::default()).unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(
            DocxDocument::from_bytes(&bytes),
            Err(PhosphomError::DocumentError { .. })
        ));
    }
}
