use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::ErrorMessage;

/// Upper bound on password length. Argon2 is deliberately slow, so very long
/// inputs would let a client burn server CPU for free.
const MAX_PASSWORD_LENGTH: usize = 64;

/// Hash a password with Argon2id and a fresh random salt.
///
/// The returned PHC string embeds the salt and cost parameters, so it is the
/// only thing that needs to be stored.
pub fn hash(password: impl Into<String>) -> Result<String, ErrorMessage> {
    let password = password.into();

    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let salt = SaltString::generate(&mut OsRng);

    let hashed_password = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ErrorMessage::HashingError)?
        .to_string();

    Ok(hashed_password)
}

/// Verify a password against a stored PHC hash string.
///
/// Returns `Ok(false)` on mismatch; `Err` only for malformed input or an
/// unparseable stored hash.
pub fn compare(password: &str, hashed_password: &str) -> Result<bool, ErrorMessage> {
    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let parsed_hash =
        PasswordHash::new(hashed_password).map_err(|_| ErrorMessage::InvalidHashFormat)?;

    let password_matched = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_or(false, |_| true);

    Ok(password_matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_compare_roundtrip() {
        let hashed = hash("correct horse battery").unwrap();
        assert!(compare("correct horse battery", &hashed).unwrap());
        assert!(!compare("wrong password", &hashed).unwrap());
    }

    #[test]
    fn empty_password_is_rejected() {
        assert_eq!(hash(""), Err(ErrorMessage::EmptyPassword));
        assert_eq!(compare("", "$argon2id$"), Err(ErrorMessage::EmptyPassword));
    }

    #[test]
    fn overlong_password_is_rejected() {
        let long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert_eq!(
            hash(long),
            Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH))
        );
    }

    #[test]
    fn garbage_stored_hash_is_invalid_format() {
        assert_eq!(
            compare("whatever", "not-a-phc-string"),
            Err(ErrorMessage::InvalidHashFormat)
        );
    }
}
