extern crate rand;

use gf256::gf256;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Result, ShareError};

/// Represents a polynomial over the Galois field GF(2^8).
///
/// Each polynomial is represented by its coefficients, stored in a vector.
/// Coefficients are elements of the GF(2^8) field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    /// The coefficients of the polynomial, where each coefficient is an element of GF(2^8).
    pub coefficients: Vec<gf256>,
}

impl Polynomial {
    /// Constructs a new polynomial of a given degree with random coefficients,
    /// where the constant term is the provided secret.
    ///
    /// # Arguments
    ///
    /// * `degree` - The degree of the polynomial.
    /// * `secret` - The secret (constant term) of the polynomial.
    pub fn new(degree: usize, secret: gf256) -> Self {
        let mut rng = rand::thread_rng();
        let mut coefficients = vec![secret; degree + 1];

        for coeff in coefficients.iter_mut().skip(1) {
            *coeff = gf256::new(rng.gen());
        }

        Polynomial { coefficients }
    }

    /// Evaluates the polynomial at a given point.
    ///
    /// # Arguments
    ///
    /// * `x` - The point at which to evaluate the polynomial.
    ///
    /// # Returns
    ///
    /// The value of the polynomial at point `x`.
    pub fn evaluate(&self, x: gf256) -> gf256 {
        let mut result = gf256::new(0);
        let mut term = gf256::new(1);

        for &coeff in &self.coefficients {
            result += coeff * term;
            term *= x;
        }

        result
    }
}

/// Splits a secret into a specified number of shares using Shamir's Secret Sharing Scheme.
///
/// Every byte of the secret gets its own random polynomial; share `i` holds the evaluations
/// at `x = i` for `i` in `1..=shares`.
///
/// # Arguments
/// * `secret` - A byte slice representing the secret to be split.
/// * `threshold` - The minimum number of shares required to reconstruct the secret.
/// * `shares` - The total number of shares to be created.
///
/// # Errors
/// `InvalidParameters` if the threshold is below 2, the share count is below the threshold,
/// or the share count does not fit in a field element.
///
/// # Examples
/// ```rust
/// use lastresort::sss::split_secret;
///
/// let shares = split_secret(b"hello world", 3, 5).unwrap();
/// assert_eq!(shares.len(), 5);
/// ```
pub fn split_secret(
    secret: &[u8],
    threshold: usize,
    shares: usize,
) -> Result<HashMap<u8, Vec<u8>>> {
    if threshold <= 1 {
        return Err(ShareError::InvalidParameters(format!(
            "threshold {threshold} must be at least 2"
        )));
    }

    if shares < threshold {
        return Err(ShareError::InvalidParameters(format!(
            "share count {shares} is below threshold {threshold}"
        )));
    }

    if shares > u8::MAX as usize {
        return Err(ShareError::InvalidParameters(format!(
            "share count {shares} exceeds {}",
            u8::MAX
        )));
    }

    let mut shares_map: HashMap<u8, Vec<u8>> = (1..=shares as u8)
        .map(|i| (i, Vec::with_capacity(secret.len())))
        .collect();

    for &byte in secret {
        let poly = Polynomial::new(threshold - 1, gf256::new(byte));

        for (&i, share) in shares_map.iter_mut() {
            share.push(poly.evaluate(gf256::new(i)).into());
        }
    }

    Ok(shares_map)
}

/// Combines shares to reconstruct a secret using Shamir's Secret Sharing Scheme.
///
/// # Arguments
/// * `shares_map` - A `HashMap` where each key-value pair represents a share of the secret.
///
/// # Errors
/// `CombineError` if the map is empty, contains the reserved x-coordinate 0, or holds shares
/// of different lengths.
///
/// Fewer shares than the threshold still interpolate, but to unrelated bytes.
pub fn combine_shares(shares_map: &HashMap<u8, Vec<u8>>) -> Result<Vec<u8>> {
    let secret_length = shares_map
        .values()
        .next()
        .ok_or_else(|| ShareError::CombineError("no shares supplied".to_string()))?
        .len();

    if shares_map.contains_key(&0) {
        return Err(ShareError::CombineError(
            "share id 0 is not a valid evaluation point".to_string(),
        ));
    }

    if shares_map.values().any(|v| v.len() != secret_length) {
        return Err(ShareError::CombineError(
            "shares have different lengths".to_string(),
        ));
    }

    let mut secret = vec![0; secret_length];
    let mut points = Vec::with_capacity(shares_map.len());

    for (i, byte) in secret.iter_mut().enumerate() {
        points.clear();
        for (&k, v) in shares_map {
            points.push((gf256::new(k), gf256::new(v[i])));
        }
        *byte = interpolate(&points, gf256::new(0)).into();
    }

    Ok(secret)
}

/// Performs Lagrange interpolation on a set of points to find the value of the polynomial at a specific point.
///
/// # Arguments
///
/// * `points` - A slice of tuples, each representing a point `(x, y)` on the polynomial.
/// * `x` - The `x` value at which to evaluate the polynomial.
///
/// # Returns
///
/// The interpolated value at `x`.
fn interpolate(points: &[(gf256, gf256)], x: gf256) -> gf256 {
    let mut value = gf256::new(0);

    for (i, &(a_x, a_y)) in points.iter().enumerate() {
        let mut weight = gf256::new(1);

        for (j, &(b_x, _)) in points.iter().enumerate() {
            if i != j {
                let top = x + b_x; // XOR in GF(2^8) is equivalent to addition
                let bottom = a_x + b_x; // XOR in GF(2^8) is equivalent to addition
                let factor = top / bottom; // Using gf256 division
                weight *= factor;
            }
        }

        value += weight * a_y; // Using gf256 multiplication and addition
    }

    value
}

/// A threshold secret-sharing primitive operating on hex payloads.
///
/// Any `threshold`-sized subset of the tokens returned by `split` must reconstruct the
/// payload through `combine`; smaller subsets must reveal nothing about it.
pub trait ShareScheme {
    /// Splits `payload` (hex) into `shares` hex tokens, ordered by share number.
    fn split(&self, payload: &str, shares: usize, threshold: usize) -> Result<Vec<String>>;

    /// Reconstructs the hex payload from a set of tokens.
    fn combine(&self, tokens: &[String]) -> Result<String>;
}

/// Field-width nibble leading every token: 8 bits per field element.
const TOKEN_HEADER: char = '8';

/// Hex digits before the share bytes: header nibble, threshold byte, share id byte.
const TOKEN_PREFIX_LEN: usize = 5;

/// Shamir sharing over GF(2^8), one polynomial per payload byte.
///
/// Tokens are hex: the header nibble `8`, the threshold as one byte, the share id as one
/// byte, then the share bytes. The embedded threshold lets `combine` refuse a set that is
/// too small instead of interpolating garbage.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShamirScheme;

#[derive(Debug)]
struct Token {
    threshold: u8,
    id: u8,
    data: Vec<u8>,
}

impl Token {
    fn format(threshold: u8, id: u8, data: &[u8]) -> String {
        format!(
            "{TOKEN_HEADER}{threshold:02x}{id:02x}{}",
            hex::encode(data)
        )
    }

    fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.len() < TOKEN_PREFIX_LEN || !token.is_ascii() {
            return Err(ShareError::CombineError(format!(
                "token of length {} is not a share token",
                token.len()
            )));
        }

        if !token.starts_with(TOKEN_HEADER) {
            return Err(ShareError::CombineError(
                "token header does not name an 8-bit field".to_string(),
            ));
        }

        let byte_at = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&token[range], 16)
                .map_err(|e| ShareError::CombineError(format!("bad token prefix: {e}")))
        };
        let threshold = byte_at(1..3)?;
        let id = byte_at(3..5)?;
        let data = hex::decode(&token[TOKEN_PREFIX_LEN..])
            .map_err(|e| ShareError::CombineError(format!("bad token body: {e}")))?;

        Ok(Token {
            threshold,
            id,
            data,
        })
    }
}

impl ShareScheme for ShamirScheme {
    fn split(&self, payload: &str, shares: usize, threshold: usize) -> Result<Vec<String>> {
        let secret = hex::decode(payload)
            .map_err(|e| ShareError::InvalidParameters(format!("payload is not hex: {e}")))?;

        let shares_map = split_secret(&secret, threshold, shares)?;
        // split_secret bounds shares to u8, and threshold <= shares
        let threshold = threshold as u8;

        let mut ids: Vec<&u8> = shares_map.keys().collect();
        ids.sort();

        let tokens = ids
            .into_iter()
            .map(|id| Token::format(threshold, *id, &shares_map[id]))
            .collect();

        debug!(
            "split {} payload bytes into {} tokens, threshold {}",
            secret.len(),
            shares,
            threshold
        );
        Ok(tokens)
    }

    fn combine(&self, tokens: &[String]) -> Result<String> {
        if tokens.len() < 2 {
            return Err(ShareError::CombineError(format!(
                "at least 2 shares are required, got {}",
                tokens.len()
            )));
        }

        let parsed = tokens
            .iter()
            .map(|t| Token::parse(t))
            .collect::<Result<Vec<_>>>()?;

        let threshold = parsed[0].threshold;
        if parsed.iter().any(|t| t.threshold != threshold) {
            return Err(ShareError::CombineError(
                "shares come from plans with different thresholds".to_string(),
            ));
        }

        let mut shares_map: HashMap<u8, Vec<u8>> = HashMap::with_capacity(parsed.len());
        for token in parsed {
            if shares_map.insert(token.id, token.data).is_some() {
                return Err(ShareError::CombineError(format!(
                    "share {} supplied more than once",
                    token.id
                )));
            }
        }

        if shares_map.len() < threshold as usize {
            return Err(ShareError::CombineError(format!(
                "{} shares supplied but {} are required",
                shares_map.len(),
                threshold
            )));
        }

        debug!("combining {} tokens", shares_map.len());
        Ok(hex::encode(combine_shares(&shares_map)?))
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::IteratorRandom;

    use super::*;

    #[test]
    fn test_split_and_combine_secret() {
        let secret = "test secret";
        let threshold = 3;
        let total_shares = 5;

        let shares_map = split_secret(secret.as_bytes(), threshold, total_shares).unwrap();
        let recovered = combine_shares(&shares_map).unwrap();

        assert_eq!(secret.as_bytes(), recovered.as_slice());
    }

    #[test]
    fn test_invalid_threshold_and_share_count() {
        let secret = "invalid params";
        assert!(split_secret(secret.as_bytes(), 0, 5).is_err());
        assert!(split_secret(secret.as_bytes(), 1, 5).is_err());
        assert!(split_secret(secret.as_bytes(), 6, 5).is_err());
        assert!(split_secret(secret.as_bytes(), 2, 256).is_err());
    }

    #[test]
    fn test_share_uniqueness() {
        let secret = "unique shares";
        let threshold = 3;
        let total_shares = 5;

        let shares_map = split_secret(secret.as_bytes(), threshold, total_shares).unwrap();
        let shares: Vec<_> = shares_map.values().collect();
        let all_unique = shares
            .iter()
            .all(|&v| shares.iter().filter(|&&x| x == v).count() == 1);

        assert!(all_unique);
    }

    #[test]
    fn test_share_subset_combination() {
        let secret = "subset test";
        let threshold = 3;
        let total_shares = 5;

        let shares_map = split_secret(secret.as_bytes(), threshold, total_shares).unwrap();
        let mut rng = rand::thread_rng();
        let subset: HashMap<u8, Vec<u8>> = shares_map
            .iter()
            .choose_multiple(&mut rng, threshold)
            .into_iter()
            .map(|(&key, value)| (key, value.clone()))
            .collect();

        let recovered = combine_shares(&subset).unwrap();

        assert_eq!(secret.as_bytes(), recovered.as_slice());
    }

    #[test]
    fn test_should_fail_with_shares_below_threshold() {
        let secret = b"Remember what the dormouse said.";
        let threshold = 12;
        let total_shares = 30;

        let shares_map = split_secret(secret, threshold, total_shares).unwrap();
        assert!(shares_map.len() == total_shares);

        let mut rng = rand::thread_rng();
        let subset: HashMap<u8, Vec<u8>> = shares_map
            .iter()
            .choose_multiple(&mut rng, threshold - 1)
            .into_iter()
            .map(|(&key, value)| (key, value.clone()))
            .collect();

        let recovered = combine_shares(&subset).unwrap();
        assert_ne!(recovered.as_slice(), secret);
    }

    #[test]
    fn test_combine_rejects_inconsistent_maps() {
        assert!(combine_shares(&HashMap::new()).is_err());

        let mut uneven = HashMap::new();
        uneven.insert(1, vec![1, 2, 3]);
        uneven.insert(2, vec![1, 2]);
        assert!(matches!(
            combine_shares(&uneven),
            Err(ShareError::CombineError(_))
        ));

        let mut zero = HashMap::new();
        zero.insert(0, vec![1]);
        zero.insert(1, vec![1]);
        assert!(combine_shares(&zero).is_err());
    }

    #[test]
    fn test_scheme_tokens_are_ordered_and_odd_length() {
        let tokens = ShamirScheme.split("789c0102", 4, 2).unwrap();
        assert_eq!(tokens.len(), 4);
        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(token.len() % 2, 1);
            assert_eq!(&token[..3], "802");
            assert_eq!(&token[3..5], format!("{:02x}", i + 1));
        }
    }

    #[test]
    fn test_scheme_round_trip_with_any_subset() {
        let payload = hex::encode(b"payload bytes for the scheme");
        let tokens = ShamirScheme.split(&payload, 6, 4).unwrap();

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let subset: Vec<String> = tokens.iter().cloned().choose_multiple(&mut rng, 4);
            assert_eq!(ShamirScheme.combine(&subset).unwrap(), payload);
        }
        assert_eq!(ShamirScheme.combine(&tokens).unwrap(), payload);
    }

    #[test]
    fn test_scheme_rejects_too_few_tokens() {
        let tokens = ShamirScheme.split("00ff00ff", 5, 3).unwrap();
        assert!(matches!(
            ShamirScheme.combine(&tokens[..2]),
            Err(ShareError::CombineError(_))
        ));
        assert!(matches!(
            ShamirScheme.combine(&tokens[..1]),
            Err(ShareError::CombineError(_))
        ));
    }

    #[test]
    fn test_scheme_rejects_duplicates_and_mixed_sets() {
        let tokens = ShamirScheme.split("00ff00ff", 5, 2).unwrap();
        let duplicated = vec![tokens[0].clone(), tokens[0].clone()];
        assert!(matches!(
            ShamirScheme.combine(&duplicated),
            Err(ShareError::CombineError(_))
        ));

        let other = ShamirScheme.split("00ff00ff", 5, 3).unwrap();
        let mixed = vec![tokens[0].clone(), other[1].clone(), other[2].clone()];
        assert!(matches!(
            ShamirScheme.combine(&mixed),
            Err(ShareError::CombineError(_))
        ));

        let longer = ShamirScheme.split("00ff00ff11", 5, 2).unwrap();
        let uneven = vec![tokens[0].clone(), longer[1].clone()];
        assert!(matches!(
            ShamirScheme.combine(&uneven),
            Err(ShareError::CombineError(_))
        ));
    }

    #[test]
    fn test_scheme_rejects_garbage_tokens() {
        for bad in ["", "8", "70201aa", "8zz01aa", "80201a"] {
            let tokens = vec![bad.to_string(), "80202aa".to_string()];
            assert!(
                matches!(ShamirScheme.combine(&tokens), Err(ShareError::CombineError(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
