//! Contact card parsing.
//!
//! The webmail contact card is a text blob whose layout shifts between
//! interface versions, so extraction runs in two phases: labeled anchors
//! first (field labels like `Departamento:` with the value on the same or the
//! following line), then free-text pattern fallbacks over the whole blob.
//! A field found by phase one is never overwritten by phase two.

use crate::core::config::Patterns;
use crate::core::error::Result;
use crate::core::models::ContactInfo;
use crate::driver::UiDriver;
use regex::Regex;

/// Labels that terminate a multi-line address value.
const FIELD_LABELS: &[&str] = &[
    "Departamento",
    "Compañía",
    "Oficina",
    "Trabajo:",
    "MI:",
    "Calendario",
];

/// Generic card headings that must never be mistaken for a value.
const GENERIC_HEADINGS: &[&str] = &["CONTACTO", "NOTAS", "ORGANIZACIÓN"];

/// Placeholder values the directory view injects under several labels.
const PLACEHOLDER_VALUES: &[&str] = &["directorio", "directory", "trabajo"];

/// Parses contact cards into [`ContactInfo`].
pub struct ContactExtractionEngine {
    patterns: Patterns,
    full_sip: Regex,
    name_line: Regex,
}

impl ContactExtractionEngine {
    pub fn new(patterns: Patterns) -> Self {
        Self {
            patterns,
            // Compiled from literals; cannot fail.
            full_sip: Regex::new(r"(?i)^sip:[\w.+-]+@[\w.-]+\.[a-z]{2,}$").unwrap(),
            name_line: Regex::new(r"(?i)^[A-ZÁÉÍÓÚÑ\s]+,\s*[A-ZÁÉÍÓÚÑ\s]+$").unwrap(),
        }
    }

    /// Reads the card's visible text through the driver and parses it.
    /// Returns `None` only when the card text cannot be read at all.
    pub async fn extract<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        card_css: &str,
    ) -> Result<Option<ContactInfo>> {
        let text = match driver.inner_text(card_css).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(target: "extractor", "Could not read card text: {}", e);
                return Ok(None);
            }
        };
        Ok(Some(self.extract_text(&text)))
    }

    /// Pure parse of a card text blob.
    pub fn extract_text(&self, text: &str) -> ContactInfo {
        let lines: Vec<&str> = text.lines().collect();
        let mut info = ContactInfo::default();

        // Phase 1: labeled anchors.
        info.department = labeled_value(&lines, &["Departamento:", "Department:", "Título:", "Puesto:"]);
        info.company = labeled_value(
            &lines,
            &["Compañía:", "Empresa:", "Organización:", "Company:"],
        );
        info.office_location = labeled_value(&lines, &["Oficina:", "Ubicación:", "Office:"]);
        info.phone = labeled_phone(&lines);
        info.sip = labeled_sip(&lines);
        info.address = labeled_address(&lines);

        // Phase 2: free-text fallbacks. Phase 1 wins per field.
        info.personal_email = self.find_email(text);
        if info.sip.is_none() {
            info.sip = self.find_sip(text);
        }
        if info.phone.is_none() {
            info.phone = self.find_phone(text);
        }
        if info.address.is_none() {
            info.address = self.find_address(text);
        }
        info.name = self.find_name(text, &lines);
        if info.department.is_none() {
            info.department = find_uppercase_heading(&lines);
        }

        info
    }

    /// First email in the blob that does not match the generic prefix
    /// pattern; falls back to the first email of any kind.
    fn find_email(&self, text: &str) -> Option<String> {
        let mut first_any = None;
        for m in self.patterns.email.find_iter(text) {
            let email = m.as_str().trim();
            if first_any.is_none() {
                first_any = Some(email.to_string());
            }
            if !self.patterns.generic_email.is_match(email) {
                return Some(email.to_string());
            }
        }
        first_any
    }

    fn find_sip(&self, text: &str) -> Option<String> {
        let candidate = self.patterns.sip.find(text)?.as_str().trim();
        // Reject matches with no domain label; truncated addresses show up
        // when the card renders mid-load.
        if self.full_sip.is_match(candidate) {
            Some(candidate.to_string())
        } else {
            None
        }
    }

    /// 9-digit number on any line that is neither a SIP URI nor a postal
    /// code; failing that, a 6-8 digit number with a `Trabajo` label on the
    /// same line or an adjacent one.
    fn find_phone(&self, text: &str) -> Option<String> {
        let nine_digits = Regex::new(r"\b\d{9}\b").unwrap();
        let short_digits = Regex::new(r"\b\d{6,8}\b").unwrap();
        let postcode = Regex::new(r"\d{5}\s+[A-Z]").unwrap();

        let lines: Vec<&str> = text.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            if line.to_lowercase().contains("sip:") || postcode.is_match(line) {
                continue;
            }
            if let Some(m) = nine_digits.find(line) {
                return Some(m.as_str().to_string());
            }
            if let Some(m) = short_digits.find(line) {
                let near_work = line.contains("Trabajo")
                    || (i > 0 && lines[i - 1].contains("Trabajo"))
                    || lines.get(i + 1).is_some_and(|l| l.contains("Trabajo"));
                if near_work {
                    return Some(m.as_str().to_string());
                }
            }
        }
        None
    }

    fn find_address(&self, text: &str) -> Option<String> {
        if let Some(m) = self.patterns.street_addr.find(text) {
            return Some(m.as_str().trim().to_string());
        }
        self.patterns
            .postal_addr
            .find(text)
            .map(|m| m.as_str().trim().to_string())
    }

    /// `SURNAME, NAME` via regex, else a scan of the first ten lines for a
    /// comma-separated all-letters line that is not a heading.
    fn find_name(&self, text: &str, lines: &[&str]) -> Option<String> {
        if let Some(captures) = self.patterns.name.captures(text) {
            if let Some(m) = captures.get(1) {
                return Some(m.as_str().trim().to_string());
            }
        }

        for line in lines.iter().take(10) {
            let line = line.trim();
            if !line.contains(',') || line.len() <= 5 {
                continue;
            }
            if GENERIC_HEADINGS.contains(&line) || line.starts_with("C/") {
                continue;
            }
            if self.name_line.is_match(line) {
                return Some(line.to_string());
            }
        }
        None
    }
}

/// Value attached to one of `labels`: the rest of the line after the label,
/// or the following line when the label stands alone. Directory placeholder
/// values are rejected.
fn labeled_value(lines: &[&str], labels: &[&str]) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        for label in labels {
            if !line.contains(label) {
                continue;
            }
            let mut value = line.replacen(label, "", 1).trim().to_string();
            if value.is_empty() {
                if let Some(next) = lines.get(i + 1) {
                    value = next.trim().to_string();
                }
            }
            if !value.is_empty() && !PLACEHOLDER_VALUES.contains(&value.to_lowercase().as_str()) {
                return Some(value);
            }
        }
    }
    None
}

/// Work phone: the value after a `Trabajo:`/`Work:` label on the same line,
/// falling back to the following line, stripped down to digits and phone
/// punctuation.
fn labeled_phone(lines: &[&str]) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        let label = if line.contains("Trabajo:") && !line.contains("Departamento") {
            "Trabajo:"
        } else if line.contains("Work:") {
            "Work:"
        } else {
            continue;
        };
        let rest = line.splitn(2, label).nth(1).unwrap_or("");
        if let Some(cleaned) = clean_phone(rest) {
            return Some(cleaned);
        }
        if let Some(next) = lines.get(i + 1) {
            if let Some(cleaned) = clean_phone(next) {
                return Some(cleaned);
            }
        }
    }
    None
}

/// Keeps digits and phone punctuation; requires at least one digit.
fn clean_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.chars().any(|c| c.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}

/// SIP URI: the line after a standalone `MI:`/`IM:` label, accepted only when
/// it carries the `sip:` scheme.
fn labeled_sip(lines: &[&str]) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        if !matches!(line.trim(), "MI:" | "MI" | "IM:" | "IM") {
            continue;
        }
        if let Some(next) = lines.get(i + 1) {
            let value = next.trim();
            if value.starts_with("sip:") {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Business address: up to three lines following the address label, stopping
/// at the next field label or a blank line.
fn labeled_address(lines: &[&str]) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        let is_address_label = line.contains("Dirección de trabajo")
            || line.contains("Dirección profesional")
            || line.contains("Business Address");
        if !is_address_label {
            continue;
        }
        let mut parts = Vec::new();
        for offset in 1..=3 {
            let Some(candidate) = lines.get(i + offset) else {
                break;
            };
            let candidate = candidate.trim();
            if candidate.is_empty() || FIELD_LABELS.iter().any(|l| candidate.contains(l)) {
                break;
            }
            parts.push(candidate);
        }
        if !parts.is_empty() {
            return Some(parts.join(" "));
        }
    }
    None
}

/// First all-uppercase line longer than three characters that is not one of
/// the card's generic headings. Lines carrying an address are skipped; an
/// all-caps mailbox is not a department.
fn find_uppercase_heading(lines: &[&str]) -> Option<String> {
    for line in lines {
        let line = line.trim();
        if line.len() <= 3 || GENERIC_HEADINGS.contains(&line) || line.contains('@') {
            continue;
        }
        let has_letters = line.chars().any(|c| c.is_alphabetic());
        let all_upper = line
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_uppercase());
        if has_letters && all_upper {
            return Some(line.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Patterns, DEFAULT_GENERIC_EMAIL_PREFIX};

    fn engine() -> ContactExtractionEngine {
        ContactExtractionEngine::new(Patterns::compile(DEFAULT_GENERIC_EMAIL_PREFIX).unwrap())
    }

    #[test]
    fn labeled_work_phone_on_following_line() {
        let info = engine().extract_text("Trabajo:\n912345678");
        assert_eq!(info.phone.as_deref(), Some("912345678"));
    }

    #[test]
    fn labeled_work_phone_on_same_line() {
        let info = engine().extract_text("Trabajo: 91 234 56 78\nOficina: B-12");
        assert_eq!(info.phone.as_deref(), Some("91 234 56 78"));
    }

    #[test]
    fn sip_only_card_yields_sip() {
        let info = engine().extract_text("MI:\nsip:jlopez@madrid.org");
        assert_eq!(info.sip.as_deref(), Some("sip:jlopez@madrid.org"));
        assert!(info.phone.is_none());
    }

    #[test]
    fn free_text_sip_requires_domain_label() {
        let info = engine().extract_text("contact via sip:jlopez@madrid");
        assert!(info.sip.is_none());

        let info = engine().extract_text("contact via sip:jlopez@madrid.org");
        assert_eq!(info.sip.as_deref(), Some("sip:jlopez@madrid.org"));
    }

    #[test]
    fn surname_comma_name_is_recognized() {
        let info = engine().extract_text("GARCIA LOPEZ, MARIA\nCONTACTO");
        assert_eq!(info.name.as_deref(), Some("GARCIA LOPEZ, MARIA"));
    }

    #[test]
    fn generic_headings_are_not_names() {
        let info = engine().extract_text("CONTACTO\nNOTAS");
        assert!(info.name.is_none());
    }

    #[test]
    fn non_generic_email_preferred_over_generic() {
        let text = "ASP164@MADRID.ORG\nmaria.garcia@madrid.org";
        let info = engine().extract_text(text);
        assert_eq!(info.personal_email.as_deref(), Some("maria.garcia@madrid.org"));
    }

    #[test]
    fn generic_only_email_still_captured() {
        let info = engine().extract_text("ASP164@MADRID.ORG");
        assert_eq!(info.personal_email.as_deref(), Some("ASP164@MADRID.ORG"));
    }

    #[test]
    fn department_label_same_line() {
        let info = engine().extract_text("Departamento: SUBDIRECCIÓN DE SISTEMAS");
        assert_eq!(info.department.as_deref(), Some("SUBDIRECCIÓN DE SISTEMAS"));
    }

    #[test]
    fn department_placeholder_rejected() {
        let info = engine().extract_text("Departamento: Directorio");
        // Falls through to the uppercase-line heuristic, which finds nothing.
        assert!(info.department.is_none());
    }

    #[test]
    fn multiline_business_address_collected() {
        let text = "Dirección de trabajo\nC/ GRAN VIA 10\n28013 MADRID\nTrabajo:\n915551234";
        let info = engine().extract_text(text);
        assert_eq!(info.address.as_deref(), Some("C/ GRAN VIA 10 28013 MADRID"));
        assert_eq!(info.phone.as_deref(), Some("915551234"));
    }

    #[test]
    fn postal_code_line_not_mistaken_for_phone() {
        let info = engine().extract_text("28013 MADRID");
        assert!(info.phone.is_none());
    }

    #[test]
    fn short_phone_requires_nearby_work_label() {
        let info = engine().extract_text("room 123456");
        assert!(info.phone.is_none());

        let info = engine().extract_text("Trabajo: ext\n123456");
        assert_eq!(info.phone.as_deref(), Some("123456"));
    }

    #[test]
    fn distant_work_label_does_not_qualify_short_digits() {
        let text = "Trabajo:\nsin datos\n\nNOTAS\nexpediente 123456";
        let info = engine().extract_text(text);
        assert!(info.phone.is_none());
    }

    #[test]
    fn work_label_on_adjacent_line_qualifies_short_digits() {
        let info = engine().extract_text("Extensión de Trabajo\n123456");
        assert_eq!(info.phone.as_deref(), Some("123456"));
    }

    #[test]
    fn uppercase_line_becomes_department_fallback() {
        let info = engine().extract_text("jose@madrid.org\nDIRECCIÓN GENERAL DE MEDIOS");
        assert_eq!(
            info.department.as_deref(),
            Some("DIRECCIÓN GENERAL DE MEDIOS")
        );
    }

    #[test]
    fn empty_card_yields_empty_info() {
        let info = engine().extract_text("");
        assert!(!info.has_any_field());
    }
}
