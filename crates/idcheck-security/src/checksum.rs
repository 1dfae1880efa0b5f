// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verhoeff check-digit validation for 12-digit identity numbers.
//
// The scheme works in the dihedral group D5: `D` is the group's
// multiplication table, `P` the position-dependent permutations and `INV`
// the inverse of each element. It catches every single-digit error and every
// adjacent transposition.

/// Number of digits in an identity number, check digit included.
pub const IDENTIFIER_LEN: usize = 12;

/// Multiplication table of the dihedral group D5.
static D: [[u8; 10]; 10] = [
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

/// Position permutations; row `i mod 8` applies to the `i`-th digit from the right.
static P: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 6, 8, 7, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

static INV: [u8; 10] = [0, 4, 3, 2, 1, 5, 6, 7, 8, 9];

/// Fold `digits` (most significant first) through the Verhoeff tables,
/// starting the position counter at `offset`.
fn fold(digits: &[u8], offset: usize) -> u8 {
    digits
        .iter()
        .rev()
        .enumerate()
        .fold(0u8, |c, (i, &digit)| {
            D[c as usize][P[(i + offset) % 8][digit as usize] as usize]
        })
}

/// Parse `input` into digit values after dropping all whitespace. Returns
/// `None` if anything other than ASCII digits remains.
fn digits_of(input: &str) -> Option<Vec<u8>> {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

/// Validate a 12-digit identity number against its Verhoeff check digit.
///
/// Whitespace anywhere in `identifier` is ignored. Any other shape (wrong
/// length, letters, non-ASCII digits) is simply invalid.
pub fn validate(identifier: &str) -> bool {
    match digits_of(identifier) {
        Some(digits) if digits.len() == IDENTIFIER_LEN => fold(&digits, 0) == 0,
        _ => false,
    }
}

/// Compute the Verhoeff check digit to append to `payload`.
///
/// Returns `None` if `payload` is empty or contains non-digits.
pub fn check_digit(payload: &str) -> Option<u8> {
    let digits = digits_of(payload)?;
    if digits.is_empty() {
        return None;
    }
    Some(INV[fold(&digits, 1) as usize])
}
