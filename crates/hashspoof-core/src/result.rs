use crate::error::SpoofError;

pub type Result<T> = std::result::Result<T, SpoofError>;
