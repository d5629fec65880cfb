//! Text grammar of the credential commands.
//!
//! Builders produce the exact command strings sent to the modem; parsers turn
//! reply lines back into typed values.

use super::types::{CredType, Credential, FunctionalMode, TypeFilter};
use crate::error::{CredStoreError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

/// `%CMNG` opcodes.
const CMNG_WRITE: u8 = 0;
const CMNG_LIST: u8 = 1;
const CMNG_DELETE: u8 = 3;

/// `%KEYGEN` key type: EC P-256 private key.
const KEYGEN_KEY_TYPE: u8 = 2;
/// `%KEYGEN` output format: PKCS#10 CSR.
const KEYGEN_FORMAT_CSR: u8 = 0;

/// `%CMNG: <tag>,<type>,<sha>[,...]`
static CMNG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^%CMNG:\s*(\d+)\s*,\s*(\d+)\s*,\s*"?([^",]*)"?\s*(?:,.*)?$"#)
        .expect("cmng pattern is valid")
});

const KEYGEN_PREFIX: &str = "%KEYGEN:";

pub fn functional_mode(mode: FunctionalMode) -> String {
    format!("AT+CFUN={}", mode.code())
}

/// Listing command; omitted filters stay wildcards.
///
/// A type filter without a tag cannot be expressed and is rejected.
pub fn list(tag: Option<u32>, filter: TypeFilter) -> Result<String> {
    let mut cmd = format!("AT%CMNG={CMNG_LIST}");
    match (tag, filter) {
        (None, TypeFilter::Any) => {}
        (None, TypeFilter::Only(t)) => {
            return Err(CredStoreError::contract(format!(
                "cannot list credentials of type {t} without a secure tag"
            )))
        }
        (Some(tag), TypeFilter::Any) => cmd.push_str(&format!(",{tag}")),
        (Some(tag), TypeFilter::Only(t)) => cmd.push_str(&format!(",{tag},{}", t.code())),
    }
    Ok(cmd)
}

pub fn write(tag: u32, cred_type: CredType, content: &str) -> String {
    format!(
        "AT%CMNG={CMNG_WRITE},{tag},{},\"{}\"",
        cred_type.code(),
        escape_content(content)
    )
}

pub fn delete(tag: u32, cred_type: CredType) -> String {
    format!("AT%CMNG={CMNG_DELETE},{tag},{}", cred_type.code())
}

/// Key generation command.
///
/// The attribute string is passed through verbatim; the modem decides whether
/// it is well formed. Only a double quote is refused since it would end the
/// quoted argument early.
pub fn keygen(tag: u32, attributes: &str) -> Result<String> {
    let mut cmd = format!("AT%KEYGEN={tag},{KEYGEN_KEY_TYPE},{KEYGEN_FORMAT_CSR}");
    if !attributes.is_empty() {
        if attributes.contains('"') {
            return Err(CredStoreError::contract(
                "CSR attributes must not contain double quotes",
            ));
        }
        cmd.push_str(&format!(",\"{attributes}\""));
    }
    Ok(cmd)
}

/// Escape content for a quoted command argument.
///
/// Backslashes and double quotes are backslash-escaped. Line breaks are kept
/// as they are; the modem accepts them inside a quoted string.
pub fn escape_content(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 8);
    for c in content.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_content`].
pub fn unescape_content(escaped: &str) -> Result<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(e @ ('\\' | '"')) => out.push(e),
                Some(other) => {
                    return Err(CredStoreError::parse(
                        escaped,
                        format!("invalid escape sequence '\\{other}'"),
                    ))
                }
                None => return Err(CredStoreError::parse(escaped, "dangling escape")),
            },
            '"' => return Err(CredStoreError::parse(escaped, "unescaped quote")),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Parse one `%CMNG:` list line.
pub fn parse_credential(line: &str) -> Result<Credential> {
    let caps = CMNG_LINE
        .captures(line)
        .ok_or_else(|| CredStoreError::parse(line, "not a %CMNG record"))?;

    let tag = caps[1]
        .parse::<u32>()
        .map_err(|_| CredStoreError::parse(line, "secure tag out of range"))?;
    let code = caps[2]
        .parse::<u32>()
        .map_err(|_| CredStoreError::parse(line, "type code out of range"))?;
    let cred_type = CredType::try_from(code)
        .map_err(|code| CredStoreError::parse(line, format!("unknown credential type {code}")))?;

    Ok(Credential {
        tag,
        cred_type,
        sha: caps[3].to_string(),
    })
}

/// Extract and decode the DER CSR from a `%KEYGEN:` reply.
///
/// The payload is `<base64url DER>[.<base64url COSE>]`; only the DER part is
/// returned. Padding is optional.
pub fn parse_keygen(lines: &[String]) -> Result<Vec<u8>> {
    let line = lines
        .iter()
        .find(|l| l.starts_with(KEYGEN_PREFIX))
        .ok_or_else(|| CredStoreError::parse(lines.join("\n"), "missing %KEYGEN payload"))?;

    let payload = line[KEYGEN_PREFIX.len()..].trim().trim_matches('"');
    let der_part = payload.split('.').next().unwrap_or_default();
    let der_part = der_part.trim_end_matches('=');
    if der_part.is_empty() {
        return Err(CredStoreError::parse(line.as_str(), "empty CSR payload"));
    }

    URL_SAFE_NO_PAD
        .decode(der_part)
        .map_err(|e| CredStoreError::parse(line.as_str(), format!("invalid base64: {e}")))
}
