//! Word (.docx) paragraph text.
//!
//! A .docx is a zip archive; body text lives in `word/document.xml` as
//! `w:p` paragraphs holding `w:t` runs. Paragraph texts are joined with
//! a newline, empty paragraphs included.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract paragraph text from raw .docx bytes.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::DocxParsing(format!("not a zip archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::DocxParsing(format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)?;

    Ok(paragraphs_from_xml(&xml)?.join("\n"))
}

fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ExtractionError::DocxParsing(format!("malformed document.xml: {e}")))?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match (e.name().as_ref(), current.as_mut()) {
                (b"w:p", _) => paragraphs.push(String::new()),
                (b"w:tab", Some(p)) => p.push('\t'),
                (b"w:br" | b"w:cr", Some(p)) => p.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| ExtractionError::DocxParsing(e.to_string()))?;
                    p.push_str(&text);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod test_docx {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    /// Build a minimal .docx whose body holds one `w:p` per entry.
    pub fn make_test_docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );
        zip_with_document(&xml)
    }

    pub fn zip_with_document(xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_docx::{make_test_docx, zip_with_document};
    use super::*;

    #[test]
    fn joins_paragraphs_with_newlines() {
        let docx = make_test_docx(&["Jane Doe", "Senior Python Engineer", "5+ years, AWS"]);
        assert_eq!(
            extract_docx_text(&docx).unwrap(),
            "Jane Doe\nSenior Python Engineer\n5+ years, AWS"
        );
    }

    #[test]
    fn runs_within_a_paragraph_concatenate() {
        let xml = "<w:document xmlns:w=\"w\"><w:body>\
                   <w:p><w:r><w:t>Py</w:t></w:r><w:r><w:t>thon</w:t></w:r><w:r><w:tab/><w:t>Rust</w:t></w:r></w:p>\
                   </w:body></w:document>";
        assert_eq!(extract_docx_text(&zip_with_document(xml)).unwrap(), "Python\tRust");
    }

    #[test]
    fn empty_paragraphs_are_kept() {
        let xml = "<w:document xmlns:w=\"w\"><w:body>\
                   <w:p><w:r><w:t>Top</w:t></w:r></w:p><w:p/><w:p></w:p>\
                   <w:p><w:r><w:t>Bottom</w:t></w:r></w:p>\
                   </w:body></w:document>";
        assert_eq!(extract_docx_text(&zip_with_document(xml)).unwrap(), "Top\n\n\nBottom");
    }

    #[test]
    fn entities_are_unescaped() {
        let docx = make_test_docx(&["R&amp;D &lt;lead&gt;"]);
        assert_eq!(extract_docx_text(&docx).unwrap(), "R&D <lead>");
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let xml = "<w:document xmlns:w=\"w\"><w:body>\
                   <w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr><w:r><w:t>Skills</w:t></w:r></w:p>\
                   </w:body></w:document>";
        assert_eq!(extract_docx_text(&zip_with_document(xml)).unwrap(), "Skills");
    }

    #[test]
    fn non_zip_bytes_fail() {
        assert!(matches!(
            extract_docx_text(b"plain text, not a docx"),
            Err(ExtractionError::DocxParsing(_))
        ));
    }

    #[test]
    fn zip_without_document_part_fails() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(
            extract_docx_text(&bytes),
            Err(ExtractionError::DocxParsing(ref m)) if m.contains("word/document.xml")
        ));
    }
}
