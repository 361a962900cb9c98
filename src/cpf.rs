// 🪪 CPF helpers - Brazilian taxpayer id
// The patients table stores the bare 11 digits; forms may send the masked form.

/// Strip everything except ASCII digits
pub fn clean(cpf: &str) -> String {
    cpf.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Mask as `XXX.XXX.XXX-XX` using the first 11 digits.
/// Inputs with fewer than 11 digits are returned cleaned but unmasked.
pub fn format(cpf: &str) -> String {
    let digits = clean(cpf);
    if digits.len() < 11 {
        return digits;
    }
    let d = &digits[..11];
    format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
}

fn digits_of(cpf: &str) -> Vec<u32> {
    clean(cpf).chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Mod-11 verifier over `digits`, weights counting down to 2
fn verifier(digits: &[u32]) -> u32 {
    let len = digits.len() as u32;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (len + 1 - i as u32))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// Both verifier digits for the first nine digits; None unless exactly nine
pub fn check_digits(first_nine: &str) -> Option<(u32, u32)> {
    let mut digits = digits_of(first_nine);
    if digits.len() != 9 {
        return None;
    }
    let first = verifier(&digits);
    digits.push(first);
    let second = verifier(&digits);
    Some((first, second))
}

/// Nine digits completed into an 11-digit CPF
pub fn with_check_digits(first_nine: &str) -> Option<String> {
    let (first, second) = check_digits(first_nine)?;
    Some(format!("{}{}{}", clean(first_nine), first, second))
}

/// Check length, repeated digits and both verifier digits
pub fn is_valid(cpf: &str) -> bool {
    let digits = digits_of(cpf);

    if digits.len() != 11 {
        return false;
    }

    // 000.000.000-00, 111.111.111-11, ... pass the checksum but are invalid
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let base: String = clean(cpf).chars().take(9).collect();
    check_digits(&base) == Some((digits[9], digits[10]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removes_mask() {
        assert_eq!(clean("715.961.006-72"), "71596100672");
        assert_eq!(clean(" 112 287 306-95 "), "11228730695");
    }

    #[test]
    fn test_format_masks_digits() {
        assert_eq!(format("71596100672"), "715.961.006-72");
        assert_eq!(format("715.961.006-72"), "715.961.006-72");
    }

    #[test]
    fn test_format_short_input_unmasked() {
        assert_eq!(format("1234"), "1234");
    }

    #[test]
    fn test_format_uses_first_eleven_digits() {
        assert_eq!(format("715961006729999"), "715.961.006-72");
    }

    #[test]
    fn test_valid_cpf() {
        assert!(is_valid("529.982.247-25"));
        assert!(is_valid("52998224725"));
    }

    #[test]
    fn test_invalid_check_digit() {
        assert!(!is_valid("529.982.247-24"));
    }

    #[test]
    fn test_repeated_digits_rejected() {
        assert!(!is_valid("99999999999"));
        assert!(!is_valid("000.000.000-00"));
    }

    #[test]
    fn test_check_digits() {
        assert_eq!(check_digits("529982247"), Some((2, 5)));
        assert_eq!(check_digits("529.982.247"), Some((2, 5)));
        assert_eq!(check_digits("52998224"), None);
        assert_eq!(with_check_digits("111444777").as_deref(), Some("11144477735"));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(!is_valid("5299822472"));
        assert!(!is_valid(""));
    }
}
