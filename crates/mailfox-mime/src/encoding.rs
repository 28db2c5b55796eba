//! Transfer, header and charset decoding.
//!
//! Mail arrives with mis-declared charsets, unpadded Base64 and stray `=`
//! signs in quoted-printable bodies. The decoders here accept all of that
//! and only fail where the caller explicitly asks for [`DecodeMode::Strict`].

use std::borrow::Cow;

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// Base64 engine that tolerates missing padding and trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// How undecodable bytes are handled when turning bytes into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Fail on the first undecodable byte sequence.
    Strict,
    /// Drop undecodable byte sequences and keep the rest.
    #[default]
    Lossy,
}

/// Decodes Base64 data, ignoring embedded whitespace and missing padding.
///
/// # Errors
///
/// Returns an error if the input contains characters outside the Base64 alphabet.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(cleaned).map_err(Into::into)
}

/// Decodes quoted-printable data (RFC 2045).
///
/// Soft line breaks are removed and `=XX` escapes are resolved. A `=` that
/// does not start a valid escape is kept literally.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if data[i] == b'=' {
            match (data.get(i + 1), data.get(i + 2)) {
                (Some(&b'\r'), Some(&b'\n')) => {
                    i += 3;
                    continue;
                }
                (Some(&b'\n'), _) => {
                    i += 2;
                    continue;
                }
                (Some(&high), Some(&low)) => {
                    if let (Some(high), Some(low)) = (hex_value(high), hex_value(low)) {
                        result.push((high << 4) | low);
                        i += 3;
                        continue;
                    }
                }
                _ => {}
            }
        }
        result.push(data[i]);
        i += 1;
    }

    result
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decodes bytes declared as `charset` into a string.
///
/// The label is resolved with the WHATWG encoding table, so aliases such
/// as `latin1`, `cp1252` or `x-sjis` work. Unknown labels are treated as
/// UTF-8. In lossy mode, sequences the encoding cannot map are dropped.
///
/// # Errors
///
/// In [`DecodeMode::Strict`], returns an error on bytes the charset cannot map.
pub fn decode_charset(bytes: &[u8], charset: &str, mode: DecodeMode) -> Result<String> {
    let label = charset.trim().trim_matches('"');
    let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
        return decode_utf8(bytes, mode);
    };

    match mode {
        DecodeMode::Strict => encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(Cow::into_owned)
            .ok_or_else(|| {
                Error::InvalidEncoding(format!("bytes not valid in {}", encoding.name()))
            }),
        DecodeMode::Lossy => {
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            Ok(text
                .chars()
                .filter(|&c| c != char::REPLACEMENT_CHARACTER)
                .collect())
        }
    }
}

/// Decodes UTF-8 in the given mode.
///
/// # Errors
///
/// In [`DecodeMode::Strict`], returns an error on invalid UTF-8.
pub fn decode_utf8(bytes: &[u8], mode: DecodeMode) -> Result<String> {
    match mode {
        DecodeMode::Strict => String::from_utf8(bytes.to_vec()).map_err(Into::into),
        DecodeMode::Lossy => Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()),
    }
}

/// One `=?charset?encoding?text?=` token.
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    text: &'a str,
}

/// Splits an encoded word off the front of `s`, returning it and its length.
fn split_encoded_word(s: &str) -> Option<(EncodedWord<'_>, usize)> {
    let rest = s.strip_prefix("=?")?;
    let (charset, rest) = rest.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let text = &rest[..end];

    if charset.is_empty() || encoding.len() != 1 || text.contains(char::is_whitespace) {
        return None;
    }

    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
    Some((
        EncodedWord {
            charset,
            encoding,
            text,
        },
        consumed,
    ))
}

fn decode_word(word: &EncodedWord<'_>, mode: DecodeMode) -> Result<String> {
    // RFC 2231 allows a language suffix: `utf-8*en`
    let charset = word.charset.split('*').next().unwrap_or(word.charset);

    let bytes = match word.encoding {
        "B" | "b" => decode_base64(word.text.as_bytes())?,
        "Q" | "q" => decode_quoted_printable(word.text.replace('_', " ").as_bytes()),
        other => {
            return Err(Error::InvalidEncoding(format!(
                "Unknown encoded-word encoding: {other}"
            )));
        }
    };

    decode_charset(&bytes, charset, mode)
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Plain text between encoded words is kept, except whitespace separating
/// two adjacent encoded words, which RFC 2047 says to drop.
///
/// # Errors
///
/// Returns an error if an encoded word has an unknown encoding, invalid
/// Base64, or (in strict mode) undecodable bytes.
pub fn decode_rfc2047(value: &str, mode: DecodeMode) -> Result<String> {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        if let Some((word, consumed)) = split_encoded_word(candidate) {
            if !(after_word && before.trim().is_empty()) {
                result.push_str(before);
            }
            result.push_str(&decode_word(&word, mode)?);
            rest = &candidate[consumed..];
            after_word = true;
        } else {
            result.push_str(before);
            result.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }

    result.push_str(rest);
    Ok(result)
}

/// Decodes an RFC 2231 extended parameter value (`charset'lang'%XX...`).
///
/// Values without the two `'` separators are percent-decoded as UTF-8.
///
/// # Errors
///
/// In [`DecodeMode::Strict`], returns an error on undecodable bytes.
pub fn decode_rfc2231(value: &str, mode: DecodeMode) -> Result<String> {
    let mut pieces = value.splitn(3, '\'');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(charset), Some(_language), Some(encoded)) => {
            decode_charset(&percent_decode(encoded), charset, mode)
        }
        _ => decode_utf8(&percent_decode(value), mode),
    }
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(&high), Some(&low)) = (bytes.get(i + 1), bytes.get(i + 2))
            && let (Some(high), Some(low)) = (hex_value(high), hex_value(low))
        {
            out.push((high << 4) | low);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_tolerates_whitespace_and_missing_padding() {
        assert_eq!(decode_base64(b"SGVs\r\nbG8=").unwrap(), b"Hello");
        assert_eq!(decode_base64(b"SGVsbG8").unwrap(), b"Hello");
        assert!(decode_base64(b"!!!").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"soft=\nbreak"), b"softbreak");
    }

    #[test]
    fn test_quoted_printable_keeps_broken_escapes() {
        assert_eq!(decode_quoted_printable(b"100=% sure"), b"100=% sure");
        assert_eq!(decode_quoted_printable(b"trailing="), b"trailing=");
    }

    #[test]
    fn test_lossy_mode_drops_invalid_bytes() {
        let bytes = b"caf\xC3\xA9 \xFF\xFEbar";
        assert_eq!(decode_utf8(bytes, DecodeMode::Lossy).unwrap(), "café bar");
        assert!(decode_utf8(bytes, DecodeMode::Strict).is_err());
    }

    #[test]
    fn test_latin1_charset() {
        let decoded = decode_charset(b"caf\xE9", "ISO-8859-1", DecodeMode::Strict).unwrap();
        assert_eq!(decoded, "café");
    }

    #[test]
    fn test_windows_1252_punctuation() {
        let decoded =
            decode_charset(b"\x93quoted\x94 \x80 5", "windows-1252", DecodeMode::Strict).unwrap();
        assert_eq!(decoded, "\u{201c}quoted\u{201d} \u{20ac} 5");
    }

    #[test]
    fn test_koi8_r_body() {
        let decoded =
            decode_charset(b"\xf0\xd2\xc9\xd7\xc5\xd4", "koi8-r", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "\u{41f}\u{440}\u{438}\u{432}\u{435}\u{442}");
    }

    #[test]
    fn test_shift_jis_modes() {
        // "日本" followed by a truncated lead byte
        let bytes = b"\x93\xfa\x96\x7b\x82";
        assert_eq!(
            decode_charset(bytes, "Shift_JIS", DecodeMode::Lossy).unwrap(),
            "\u{65e5}\u{672c}"
        );
        assert!(decode_charset(bytes, "shift_jis", DecodeMode::Strict).is_err());
    }

    #[test]
    fn test_quoted_charset_label() {
        let decoded = decode_charset(b"caf\xE9", "\"latin1\"", DecodeMode::Strict).unwrap();
        assert_eq!(decoded, "caf\u{e9}");
    }

    #[test]
    fn test_rfc2047_koi8_r_word() {
        let decoded = decode_rfc2047("=?koi8-r?B?8NLJ18XU?=", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "\u{41f}\u{440}\u{438}\u{432}\u{435}\u{442}");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        let decoded = decode_charset("żółw".as_bytes(), "x-unknown", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "żółw");
    }

    #[test]
    fn test_rfc2047_plain_text_passthrough() {
        assert_eq!(decode_rfc2047("Hello", DecodeMode::Lossy).unwrap(), "Hello");
    }

    #[test]
    fn test_rfc2047_base64_word() {
        let decoded = decode_rfc2047("=?utf-8?B?SMOpbGxv?=", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_rfc2047_q_word_with_underscores() {
        let decoded = decode_rfc2047("=?UTF-8?Q?Caf=C3=A9_au_lait?=", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "Café au lait");
    }

    #[test]
    fn test_rfc2047_mixed_with_plain_text() {
        let decoded = decode_rfc2047(
            "Re: =?iso-8859-1?Q?Pr=E9sentation?= du projet",
            DecodeMode::Lossy,
        )
        .unwrap();
        assert_eq!(decoded, "Re: Présentation du projet");
    }

    #[test]
    fn test_rfc2047_adjacent_words_drop_whitespace() {
        let decoded =
            decode_rfc2047("=?utf-8?Q?Hello_?= =?utf-8?Q?World?=", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "Hello World");
    }

    #[test]
    fn test_rfc2047_not_an_encoded_word() {
        let decoded = decode_rfc2047("a =? b", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "a =? b");
    }

    #[test]
    fn test_rfc2047_unknown_encoding_is_error() {
        assert!(decode_rfc2047("=?utf-8?X?abc?=", DecodeMode::Lossy).is_err());
    }

    #[test]
    fn test_rfc2231_value() {
        let decoded = decode_rfc2231("utf-8''r%C3%A9sum%C3%A9.pdf", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "résumé.pdf");

        let decoded = decode_rfc2231("iso-8859-1'en'caf%E9.txt", DecodeMode::Lossy).unwrap();
        assert_eq!(decoded, "café.txt");
    }
}
