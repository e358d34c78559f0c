/// Microblog Crypto Library
///
/// One-way derivations the data layer stores or renders:
/// - Argon2id password hashes (PHC string format, salted per call)
/// - MD5 email digests for gravatar avatar URLs

pub mod avatar;
pub mod password;

pub use avatar::{gravatar_url, email_digest};
pub use password::{hash_password, verify_password};
