use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Extracts paragraph text from a DOCX container.
///
/// Each `w:p` becomes one line; only `w:t` runs contribute text, so field
/// codes and deleted-text markup are skipped. Table cells are paragraphs too
/// and come out in document order.
pub(super) fn extract_docx_text(data: &[u8]) -> Result<String> {
    let cursor = Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor).context("not a valid DOCX (zip) container")?;

    let mut document_file = archive
        .by_name("word/document.xml")
        .context("DOCX container has no word/document.xml part")?;
    let mut xml = String::new();
    document_file
        .read_to_string(&mut xml)
        .context("word/document.xml is not valid UTF-8")?;

    let mut reader = Reader::from_str(&xml);

    let mut buf = Vec::new();
    let mut current = String::new();
    let mut lines = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current.clear(),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:p" => {
                    if !current.trim().is_empty() {
                        lines.push(current.trim().to_string());
                    }
                    current.clear();
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push(' '),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    current.push_str(&e.xml_content()?);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text {
                    if let Some(c) = resolve_entity(&e.decode()?) {
                        current.push(c);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err).context("malformed word/document.xml"),
            _ => {}
        }

        buf.clear();
    }

    Ok(lines.join("\n"))
}

/// Resolves the predefined XML entities and numeric character references.
fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
