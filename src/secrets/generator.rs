//! Constrained random secret generation.
//!
//! One character is drawn from each required class, the rest uniformly from
//! the policy's alphabet, and the result is shuffled. All randomness comes
//! from the OS CSPRNG.

use super::error::GenerationError;
use super::types::SecretString;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Special characters used when a policy does not name its own.
pub const DEFAULT_SPECIAL_CHARSET: &str = "@#`~_-[]|+=";

pub const DEFAULT_LENGTH: usize = 16;

/// Candidates per [`generate`] call that may fail the final class check.
pub const MAX_ATTEMPTS: u32 = 256;

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

/// What a generated secret must look like.
///
/// A `custom_charset` replaces the class flags entirely: characters are drawn
/// from it and nothing is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPolicy {
    pub length: usize,
    pub upper: bool,
    pub lower: bool,
    pub digits: bool,
    pub special: bool,
    pub special_charset: String,
    pub custom_charset: Option<String>,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            upper: true,
            lower: true,
            digits: true,
            special: true,
            special_charset: DEFAULT_SPECIAL_CHARSET.to_string(),
            custom_charset: None,
        }
    }
}

impl GenerationPolicy {
    /// Upper, lower, digits and special characters all required.
    pub fn nist(length: usize) -> Self {
        Self { length, ..Self::default() }
    }

    /// Draw only from `charset`.
    pub fn custom(length: usize, charset: impl Into<String>) -> Self {
        Self { length, custom_charset: Some(charset.into()), ..Self::default() }
    }

    fn alphabet(&self) -> Vec<char> {
        let mut alphabet: Vec<char> = Vec::new();
        let classes = [
            (self.upper, UPPER),
            (self.lower, LOWER),
            (self.digits, DIGITS),
            (self.special, self.special_charset.as_str()),
        ];
        for (enabled, chars) in classes {
            if enabled {
                for c in chars.chars() {
                    if !alphabet.contains(&c) {
                        alphabet.push(c);
                    }
                }
            }
        }
        alphabet
    }

    fn required_classes(&self) -> usize {
        [self.upper, self.lower, self.digits, self.special].into_iter().filter(|required| *required).count()
    }

    /// Rejects policies no draw could ever satisfy.
    fn check(&self, alphabet: &[char]) -> Result<(), GenerationError> {
        if alphabet.is_empty() {
            return Err(GenerationError::EmptyAlphabet);
        }
        let required = self.required_classes();
        if self.length < required {
            return Err(GenerationError::unsatisfiable(format!(
                "length {} is shorter than the {} required character classes",
                self.length, required
            )));
        }
        if self.special && !alphabet.iter().any(|c| is_special(*c)) {
            return Err(GenerationError::unsatisfiable("special characters required but none are available"));
        }
        Ok(())
    }

    /// Members of `alphabet` for each required class.
    fn required_pools(&self, alphabet: &[char]) -> Vec<Vec<char>> {
        let classes: [(bool, fn(char) -> bool); 4] = [
            (self.upper, char::is_uppercase),
            (self.lower, char::is_lowercase),
            (self.digits, |c: char| c.is_ascii_digit()),
            (self.special, is_special),
        ];
        classes
            .into_iter()
            .filter(|(required, _)| *required)
            .map(|(_, member)| alphabet.iter().copied().filter(|c| member(*c)).collect())
            .collect()
    }

    fn accepts(&self, candidate: &[char]) -> bool {
        (!self.upper || candidate.iter().any(|c| c.is_uppercase()))
            && (!self.lower || candidate.iter().any(|c| c.is_lowercase()))
            && (!self.digits || candidate.iter().any(|c| c.is_ascii_digit()))
            && (!self.special || candidate.iter().any(|c| is_special(*c)))
    }
}

fn is_special(c: char) -> bool {
    !c.is_alphanumeric()
}

fn draw<R: Rng>(rng: &mut R, alphabet: &[char], length: usize) -> Vec<char> {
    (0..length).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect()
}

/// One member of every pool, then uniform fill up to `length`, shuffled.
fn draw_covering<R: Rng>(rng: &mut R, alphabet: &[char], pools: &[Vec<char>], length: usize) -> Vec<char> {
    let mut candidate: Vec<char> = pools.iter().filter_map(|pool| pool.choose(rng).copied()).collect();
    let remaining = length.saturating_sub(candidate.len());
    candidate.extend(draw(rng, alphabet, remaining));
    candidate.shuffle(rng);
    candidate
}

/// Generates a secret under `policy` from the OS random number generator.
pub fn generate(policy: &GenerationPolicy) -> Result<SecretString, GenerationError> {
    generate_with(policy, &mut OsRng)
}

/// [`generate`] with an explicit random source.
pub fn generate_with<R: Rng>(
    policy: &GenerationPolicy,
    rng: &mut R,
) -> Result<SecretString, GenerationError> {
    if policy.length == 0 {
        return Err(GenerationError::InvalidLength);
    }

    if let Some(charset) = &policy.custom_charset {
        let alphabet: Vec<char> = charset.chars().collect();
        if alphabet.is_empty() {
            return Err(GenerationError::EmptyAlphabet);
        }
        return Ok(SecretString::new(draw(rng, &alphabet, policy.length).into_iter().collect::<String>()));
    }

    let alphabet = policy.alphabet();
    policy.check(&alphabet)?;
    let pools = policy.required_pools(&alphabet);

    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = draw_covering(rng, &alphabet, &pools, policy.length);
        if policy.accepts(&candidate) {
            debug!(length = policy.length, attempt = attempt, "Generated secret value");
            return Ok(SecretString::new(candidate.into_iter().collect::<String>()));
        }
    }

    Err(GenerationError::Exhausted { attempts: MAX_ATTEMPTS })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classes(value: &str) -> (bool, bool, bool, bool) {
        (
            value.chars().any(|c| c.is_ascii_uppercase()),
            value.chars().any(|c| c.is_ascii_lowercase()),
            value.chars().any(|c| c.is_ascii_digit()),
            value.chars().any(|c| !c.is_alphanumeric()),
        )
    }

    #[test]
    fn nist_policy_has_every_class() {
        let value = generate(&GenerationPolicy::nist(16)).unwrap();
        assert_eq!(value.char_count(), 16);
        assert_eq!(classes(value.expose_secret()), (true, true, true, true));
        assert!(value.expose_secret().chars().all(|c| c.is_ascii_alphanumeric() || DEFAULT_SPECIAL_CHARSET.contains(c)));
    }

    #[test]
    fn custom_charset_overrides_classes() {
        let value = generate(&GenerationPolicy::custom(32, "ab")).unwrap();
        assert_eq!(value.char_count(), 32);
        assert!(value.expose_secret().chars().all(|c| c == 'a' || c == 'b'));
    }

    #[test]
    fn disabled_special_means_alphanumeric_only() {
        let policy = GenerationPolicy { special: false, ..GenerationPolicy::default() };
        let value = generate(&policy).unwrap();
        assert!(value.expose_secret().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn twelve_alphanumerics_cover_every_required_class() {
        let policy = GenerationPolicy { length: 12, special: false, ..GenerationPolicy::default() };
        for _ in 0..500 {
            let value = generate(&policy).unwrap();
            assert_eq!(value.char_count(), 12);
            assert_eq!(classes(value.expose_secret()), (true, true, true, false));
        }
    }

    #[test]
    fn zero_length_is_invalid() {
        assert_eq!(generate(&GenerationPolicy::nist(0)).unwrap_err(), GenerationError::InvalidLength);
        assert_eq!(generate(&GenerationPolicy::custom(0, "abc")).unwrap_err(), GenerationError::InvalidLength);
    }

    #[test]
    fn empty_alphabets_are_rejected() {
        assert_eq!(generate(&GenerationPolicy::custom(8, "")).unwrap_err(), GenerationError::EmptyAlphabet);

        let policy =
            GenerationPolicy { upper: false, lower: false, digits: false, special: false, ..GenerationPolicy::default() };
        assert_eq!(generate(&policy).unwrap_err(), GenerationError::EmptyAlphabet);
    }

    #[test]
    fn impossible_policies_fail_up_front() {
        assert!(matches!(
            generate(&GenerationPolicy::nist(3)).unwrap_err(),
            GenerationError::Unsatisfiable { .. }
        ));

        let policy = GenerationPolicy { special_charset: "abc".into(), ..GenerationPolicy::default() };
        assert!(matches!(generate(&policy).unwrap_err(), GenerationError::Unsatisfiable { .. }));
    }

    #[test]
    fn exact_length_of_required_classes_is_satisfiable() {
        let value = generate(&GenerationPolicy::nist(4)).unwrap();
        assert_eq!(classes(value.expose_secret()), (true, true, true, true));
    }

    #[test]
    fn single_special_character_at_minimum_length_never_fails() {
        let policy = GenerationPolicy { length: 4, special_charset: "@".into(), ..GenerationPolicy::default() };
        for _ in 0..2000 {
            let value = generate(&policy).unwrap();
            assert_eq!(value.char_count(), 4);
            assert_eq!(classes(value.expose_secret()), (true, true, true, true));
            assert_eq!(value.expose_secret().matches('@').count(), 1);
        }
    }

    #[test]
    fn required_characters_are_not_always_in_front() {
        let policy = GenerationPolicy { length: 4, special_charset: "@".into(), ..GenerationPolicy::default() };
        let positions: std::collections::HashSet<usize> = (0..200)
            .filter_map(|_| generate(&policy).unwrap().expose_secret().find('@'))
            .collect();
        assert!(positions.len() > 1);
    }

    proptest! {
        #[test]
        fn generated_values_meet_policy(
            length in 4usize..64,
            upper in any::<bool>(),
            lower in any::<bool>(),
            digits in any::<bool>(),
            special in any::<bool>(),
        ) {
            prop_assume!(upper || lower || digits || special);
            let policy = GenerationPolicy { length, upper, lower, digits, special, ..GenerationPolicy::default() };
            let value = generate(&policy).unwrap();
            let (has_upper, has_lower, has_digits, has_special) = classes(value.expose_secret());

            prop_assert_eq!(value.char_count(), length);
            prop_assert!(!upper || has_upper);
            prop_assert!(!lower || has_lower);
            prop_assert!(!digits || has_digits);
            prop_assert_eq!(has_special, special);
        }
    }
}
