//! Text extraction for uploaded documents (PDF, Word, plain text).
//!
//! The format is chosen from the declared filename's extension,
//! case-insensitively. Extraction never panics: every failure, including a
//! panic inside the PDF parser, comes back as an [`ExtractError`] so the
//! caller can discard the partially uploaded file.

use std::io::Read;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions accepted for upload, lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "doc", "txt"];

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Error extracting text: PDF: {0}")]
    Pdf(String),
    #[error("Error extracting text: Word document: {0}")]
    Word(String),
    #[error("Error extracting text: {0}")]
    Text(String),
}

impl ExtractError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ExtractError::UnsupportedFormat(_))
    }
}

/// Lowercased extension of a filename, without the dot. Empty when absent.
pub fn file_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub fn is_supported(filename: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&file_extension(filename).as_str())
}

/// Extracts plain text from an uploaded document.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    match file_extension(filename).as_str() {
        "pdf" => extract_pdf(bytes),
        "docx" | "doc" => extract_word(bytes),
        "txt" => String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractError::Text(format!("invalid UTF-8: {}", e))),
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs.
    let pages = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ExtractError::Pdf("parser aborted on malformed input".to_string()))?
    .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(pages.join("\n"))
}

fn extract_word(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Word(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Word("word/document.xml not found".to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Word(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Word(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    Ok(word_paragraphs(&doc_xml)?.join("\n"))
}

/// Collects the text of every `w:p` paragraph, in document order.
fn word_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if in_paragraph => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(String::new());
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Word(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Word(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn unsupported_extension_carries_extension() {
        let err = extract_text(b"MZ", "setup.EXE").unwrap_err();
        assert!(err.is_unsupported());
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref e) if e == "exe"));
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let err = extract_text(b"data", "README").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref e) if e.is_empty()));
    }

    #[test]
    fn txt_is_verbatim() {
        let body = "line one\n  line two\r\n\ttabbed ✓";
        let text = extract_text(body.as_bytes(), "notes.TXT").unwrap();
        assert_eq!(text, body);
    }

    #[test]
    fn invalid_utf8_txt_fails() {
        let err = extract_text(&[0xff, 0xfe, 0x00], "bad.txt").unwrap_err();
        assert!(matches!(err, ExtractError::Text(_)));
        assert!(!err.is_unsupported());
    }

    fn pdf_with_text(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn pdf_text_is_extracted() {
        let bytes = pdf_with_text("Quarterly revenue grew");
        let text = extract_text(&bytes, "report.pdf").unwrap();
        assert!(text.contains("Quarterly"), "extracted: {:?}", text);
    }

    #[test]
    fn invalid_pdf_fails_without_panicking() {
        let err = extract_text(b"not a pdf", "paper.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        assert!(err.to_string().starts_with("Error extracting text"));
    }

    #[test]
    fn invalid_zip_fails_for_docx_and_doc() {
        assert!(matches!(
            extract_text(b"not a zip", "a.docx").unwrap_err(),
            ExtractError::Word(_)
        ));
        assert!(matches!(
            extract_text(b"\xd0\xcf\x11\xe0legacy", "a.doc").unwrap_err(),
            ExtractError::Word(_)
        ));
    }

    #[test]
    fn docx_paragraphs_joined_by_newline() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>paragraph.</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>Second</w:t><w:tab/><w:t>col</w:t></w:r></w:p>\
             <w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p>",
        );
        let text = extract_text(&bytes, "Report.DOCX").unwrap();
        assert_eq!(text, "First paragraph.\n\nSecond\tcol\nA & B");
    }

    #[test]
    fn docx_without_document_xml_fails() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text(&buf, "a.docx").unwrap_err();
        assert!(err.to_string().contains("word/document.xml not found"));
    }

    #[test]
    fn supported_extension_check_is_case_insensitive() {
        assert!(is_supported("A.PDF"));
        assert!(is_supported("b.Docx"));
        assert!(is_supported("c.doc"));
        assert!(is_supported("d.txt"));
        assert!(!is_supported("e.md"));
        assert!(!is_supported("archive.tar.gz"));
    }
}
