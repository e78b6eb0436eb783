use thiserror::Error;

/// Failures while turning one input token into addresses.
///
/// Both variants are local to the offending token; callers skip the token
/// and keep going.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    /// The token is neither a CIDR block nor a parseable IP literal.
    #[error("not a valid IP address: {0}")]
    InvalidAddressFormat(String),

    /// The token looks like CIDR notation but does not parse.
    #[error("malformed CIDR block: {0}")]
    InvalidCidr(String),
}
