//! Small streaming helpers over `quick-xml` shared by the catalog, resolver
//! and activation response parser.

use quick_xml::NsReader;
use quick_xml::events::Event;

pub(crate) type XmlReader<'i> = NsReader<&'i [u8]>;

/// Decodes raw document bytes, honoring a UTF-8 or UTF-16 byte order mark.
pub(crate) fn decode_document(bytes: &[u8]) -> Result<String, String> {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => {
            String::from_utf8(rest.to_vec()).map_err(|e| format!("invalid UTF-8: {e}"))
        }
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => String::from_utf8(bytes.to_vec()).map_err(|e| format!("invalid UTF-8: {e}")),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("odd byte count in UTF-16 document".to_string());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| format!("invalid UTF-16: {e}"))
}

/// Reads the text content of the element whose start tag was just consumed,
/// up to and including its end tag. Text of nested elements is included.
pub(crate) fn read_text(reader: &mut XmlReader<'_>) -> Result<String, String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(text),
            Event::End(_) => depth -= 1,
            Event::Text(t) => text.push_str(&t.unescape().map_err(|e| e.to_string())?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Eof => return Err("unexpected end of document".to_string()),
            _ => {}
        }
    }
}

/// Advances to the next element named `local` (any namespace) and returns
/// its text, or `None` if the document ends first.
pub(crate) fn next_element_text(
    reader: &mut XmlReader<'_>,
    local: &str,
) -> Result<Option<String>, String> {
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.local_name().as_ref() == local.as_bytes() => {
                return read_text(reader).map(Some);
            }
            Event::Empty(e) if e.local_name().as_ref() == local.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
