//! Header and body decoding, plus the RFC 5322 text handed to the provider on send.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Base64 as found in RFC 2047 words, tolerant of missing padding.
const WORD_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode RFC 2047 encoded words (`=?charset?B|Q?text?=`) per their declared charset.
/// Whitespace between two adjacent encoded words is dropped; anything that does not parse
/// as an encoded word is kept verbatim.
pub fn decode_header_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut prev_encoded = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        match parse_encoded_word(candidate) {
            Some((decoded, consumed)) => {
                let only_space = before.chars().all(char::is_whitespace);
                if !(prev_encoded && only_space) {
                    out.push_str(before);
                }
                out.push_str(&decoded);
                rest = &candidate[consumed..];
                prev_encoded = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                prev_encoded = false;
            }
        }
    }
    out.push_str(rest);
    out
}

/// `s` starts with `=?`. Returns the decoded text and the number of bytes consumed.
fn parse_encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.get(2..)?;
    let charset_end = inner.find('?')?;
    let charset = &inner[..charset_end];
    let after_charset = &inner[charset_end + 1..];
    let encoding = after_charset.get(..1)?;
    if after_charset.get(1..2)? != "?" {
        return None;
    }
    let text_and_rest = &after_charset[2..];
    let text_end = text_and_rest.find("?=")?;
    let text = &text_and_rest[..text_end];
    if charset.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => WORD_BASE64.decode(text).ok()?,
        "Q" | "q" => decode_q(text),
        _ => return None,
    };
    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    let consumed = 2 + charset_end + 1 + 2 + text_end + 2;
    Some((decode_charset(charset, &bytes), consumed))
}

fn decode_q(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = text
                    .get(i + 1..i + 3)
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'='),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

/// Bytes to text for the charsets tenants actually send; anything else is read as UTF-8.
pub(crate) fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match charset.trim().to_ascii_lowercase().as_str() {
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => {
            bytes.iter().map(|&b| char::from(b)).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// `charset` parameter of a `Content-Type` header value.
pub(crate) fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// `Jane Doe <jane@example.com>` becomes `jane@example.com`; a bare header is trimmed.
pub fn extract_email_address(from: &str) -> String {
    let trimmed = from.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start + 1..].find('>') {
            let candidate = trimmed[start + 1..start + 1 + end].trim();
            if !candidate.is_empty() {
                return candidate.to_string();
            }
        }
    }
    trimmed.to_string()
}

fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
}

pub(crate) fn build_mime_message(
    from: &str,
    to: &str,
    cc: Option<&str>,
    subject: &str,
    body: &str,
) -> String {
    let normalized = body.replace('\r', "").replace('\n', "\r\n");
    let mut headers = String::new();
    if !from.trim().is_empty() {
        headers.push_str(&format!("From: {from}\r\n"));
    }
    headers.push_str(&format!("To: {to}\r\n"));
    if let Some(cc) = cc.map(str::trim).filter(|cc| !cc.is_empty()) {
        headers.push_str(&format!("Cc: {cc}\r\n"));
    }
    headers.push_str(&format!("Subject: {}\r\n", encode_header_value(subject)));
    format!(
        "{headers}MIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{normalized}\r\n"
    )
}
