//! Placeholder passwords for accounts created from directory records.

use rand::Rng;

/// Alphabet used for placeholder passwords.
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";

/// Length of the placeholder assigned to every directory user.
pub const PLACEHOLDER_PASSWORD_LENGTH: usize = 30;

/// Generate a random alphanumeric password of the given length.
///
/// Directories never hand out real passwords, so new accounts get one of
/// these and the user sets a real one later.
pub fn generate_placeholder_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
