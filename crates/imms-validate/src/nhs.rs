//! NHS number validation.
//!
//! An NHS number is 10 digits; the last is a modulus 11 check digit over the
//! first nine, weighted 10 down to 2.

pub const NHS_NUMBER_LENGTH: usize = 10;

/// Returns true if `nhs_number` is 10 ASCII digits with a valid check digit.
pub fn is_valid_nhs_number(nhs_number: &str) -> bool {
    let bytes = nhs_number.as_bytes();
    if bytes.len() != NHS_NUMBER_LENGTH || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let total: u32 = bytes[..9]
        .iter()
        .zip((2..=10u32).rev())
        .map(|(byte, weight)| u32::from(byte - b'0') * weight)
        .sum();
    let remainder = total % 11;
    let check_digit = if remainder == 0 { 0 } else { 11 - remainder };
    // A computed check digit of 10 means the number is never issued.
    check_digit == u32::from(bytes[9] - b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_numbers() {
        for number in ["9732928395", "9000000009", "9693632109", "9449306060"] {
            assert!(is_valid_nhs_number(number), "{number} should be valid");
        }
    }

    #[test]
    fn invalid_numbers() {
        assert!(!is_valid_nhs_number("1234567890"));
        assert!(!is_valid_nhs_number("973292839"));
        assert!(!is_valid_nhs_number("97329283955"));
        assert!(!is_valid_nhs_number("973292839X"));
        assert!(!is_valid_nhs_number(""));
    }
}
