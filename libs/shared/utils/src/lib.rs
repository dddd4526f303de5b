pub mod hashing;
pub mod test_utils;
pub mod text;
pub mod validation;
