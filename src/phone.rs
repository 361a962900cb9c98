// 📞 Phone helpers - numbers as the WhatsApp webhook expects them (55DDDNNNNNNNNN)

fn digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize to the international Brazilian form.
/// Already-prefixed numbers are kept; a leading trunk zero is dropped.
pub fn to_international(phone: &str) -> String {
    let cleaned = digits(phone);
    if cleaned.is_empty() {
        return cleaned;
    }
    if cleaned.starts_with("55") {
        return cleaned;
    }
    let local = cleaned.strip_prefix('0').unwrap_or(&cleaned);
    format!("55{}", local)
}

/// `55` + two-digit area code without zeros + optional mobile `9` + 8 digits
pub fn is_valid_brazilian(phone: &str) -> bool {
    let cleaned = digits(phone);
    let Some(rest) = cleaned.strip_prefix("55") else {
        return false;
    };

    let bytes = rest.as_bytes();
    if bytes.len() < 2 || !bytes[..2].iter().all(|b| (b'1'..=b'9').contains(b)) {
        return false;
    }

    match bytes.len() - 2 {
        8 => true,
        9 => bytes[2] == b'9',
        _ => false,
    }
}
