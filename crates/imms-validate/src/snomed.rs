//! SNOMED CT concept id validation.
//!
//! A simple SNOMED code is an all-digit string of 6 to 18 characters whose
//! last digit is a Verhoeff check digit. The two digits before the check
//! digit are the partition identifier, which must be `00` or `10` for a
//! concept id.

/// Minimum length of a SNOMED CT identifier.
pub const MIN_SNOMED_LENGTH: usize = 6;
/// Maximum length of a SNOMED CT identifier.
pub const MAX_SNOMED_LENGTH: usize = 18;

const CONCEPT_PARTITIONS: [&[u8]; 2] = [b"00", b"10"];

/// Verhoeff multiplication table (dihedral group D5).
const MULTIPLICATION: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

/// Verhoeff permutation table; row `i` applies to the digit at position
/// `i mod 8`, counted from the right starting at 0.
const PERMUTATION: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 6, 8, 7, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

/// Returns true if `digits` (check digit included) passes the Verhoeff
/// checksum. Any non-ASCII-digit character makes the input invalid.
pub fn verhoeff_is_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut check = 0u8;
    for (position, byte) in digits.bytes().rev().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let digit = usize::from(byte - b'0');
        let permuted = PERMUTATION[position % 8][digit];
        check = MULTIPLICATION[usize::from(check)][usize::from(permuted)];
    }
    check == 0
}

/// Returns true if `code` is a valid simple SNOMED CT concept id.
///
/// Fails closed: empty input, non-digits, a length outside
/// [`MIN_SNOMED_LENGTH`]..=[`MAX_SNOMED_LENGTH`], a failed checksum or a
/// partition other than `00`/`10` all yield `false`.
pub fn is_valid_simple_snomed(code: &str) -> bool {
    let bytes = code.as_bytes();
    if !(MIN_SNOMED_LENGTH..=MAX_SNOMED_LENGTH).contains(&bytes.len()) {
        return false;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let partition = &bytes[bytes.len() - 3..bytes.len() - 1];
    verhoeff_is_valid(code) && CONCEPT_PARTITIONS.contains(&partition)
}

/// [`is_valid_simple_snomed`] for an optional value; `None` is invalid.
pub fn is_valid_optional_snomed(code: Option<&str>) -> bool {
    code.is_some_and(is_valid_simple_snomed)
}
