/// Authentication module
///
/// Handles token issuance/validation, password hashing, and the
/// jti-based revocation blocklist.

mod blocklist;
mod claims;
mod jwt;
mod password;
mod validator;

pub use blocklist::{MemoryBlocklist, RedisBlocklist, TokenBlocklist};
pub use claims::{Claims, TokenKind};
pub use jwt::{decode_token, issue_token, issue_token_with_expiry};
pub use password::{hash_password, verify_password};
pub use validator::{extract_bearer, validate_bearer, validate_request};
