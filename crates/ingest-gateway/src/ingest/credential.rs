//! Source credentials.

use subtle::ConstantTimeEq;

/// Query parameter carrying the source token.
pub const API_TOKEN_PARAM: &str = "Api-Token";

/// First `Api-Token` value from decoded query pairs; empty when absent.
pub fn extract_token(params: &[(String, String)]) -> &str {
    params
        .iter()
        .find(|(name, _)| name == API_TOKEN_PARAM)
        .map(|(_, value)| value.as_str())
        .unwrap_or("")
}

/// Compare a presented token with the stored key.
///
/// Runs over the full length of `expected` whatever the content of
/// `presented`, so timing reveals nothing about how much of the key matched.
pub fn constant_time_compare(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();

    let mut equal = (presented.len() as u64).ct_eq(&(expected.len() as u64));
    for (i, byte) in expected.iter().enumerate() {
        // Past the end of the presented token, compare against a byte that cannot match.
        let candidate = presented.get(i).copied().unwrap_or(!*byte);
        equal &= candidate.ct_eq(byte);
    }
    equal.into()
}
