use crate::error::{AppError, AppResult};

pub fn hash_password(password: impl AsRef<[u8]>) -> AppResult<String> {
    let salt = password_hash::SaltString::generate(&mut rand::thread_rng());

    let hash =
        password_hash::PasswordHash::generate(argon2::Argon2::default(), password.as_ref(), &salt)
            .map_err(|err| anyhow::anyhow!(err))?
            .to_string();
    Ok(hash)
}

/// Returns `Ok(false)` for a wrong password; errors only on a corrupt stored hash.
pub fn verify_password(hash: &str, password: impl AsRef<[u8]>) -> AppResult<bool> {
    let hash = password_hash::PasswordHash::new(hash).map_err(|err| anyhow::anyhow!(err))?;

    match hash.verify_password(&[&argon2::Argon2::default()], password) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AppError::Anyhow(anyhow::anyhow!(err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "battery staple").unwrap());
    }

    #[test]
    fn corrupt_hash_is_an_error() {
        assert!(verify_password("not-a-phc-string", "anything").is_err());
    }
}
