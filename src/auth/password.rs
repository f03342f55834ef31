use std::sync::OnceLock;

/// Hash checked when the username does not exist, so a miss costs the same
/// as a wrong password.
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Check `password` against a stored hash, or against a throwaway hash when
/// there is no such user. Returns `false` in the latter case.
pub fn verify_password(
    password: &str,
    stored_hash: Option<&str>,
    cost: u32,
) -> Result<bool, bcrypt::BcryptError> {
    match stored_hash {
        Some(hash) => bcrypt::verify(password, hash),
        None => {
            let dummy = match DUMMY_HASH.get() {
                Some(h) => h,
                None => {
                    let h = bcrypt::hash("not-a-real-password", cost)?;
                    DUMMY_HASH.get_or_init(|| h)
                }
            };
            bcrypt::verify(password, dummy)?;
            Ok(false)
        }
    }
}
