pub mod canonicalize;
pub mod check;
pub mod digest;
pub mod sign_append;
pub mod wrap;
