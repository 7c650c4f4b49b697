//! Account contexts.
//!
//! An [`AccountContext`] decides which API host a client talks to and which
//! audience its tokens are minted for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const STANDARD_BASE_URL: &str = "https://api.appstoreconnect.apple.com";
const STANDARD_AUDIENCE: &str = "appstoreconnect-v1";
const ENTERPRISE_BASE_URL: &str = "https://api.enterprise.developer.apple.com";
const ENTERPRISE_AUDIENCE: &str = "apple-developer-enterprise-v1";

/// The kind of developer account an API key belongs to.
///
/// # Examples
///
/// ```
/// use connectkit_core::AccountContext;
///
/// let account: AccountContext = "enterprise".parse().unwrap();
/// assert_eq!(account.audience(), "apple-developer-enterprise-v1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountContext {
    /// Standard App Store Connect account.
    Standard,
    /// Enterprise program account.
    Enterprise,
}

impl AccountContext {
    /// Every account context, in the default trial order.
    pub const ALL: &'static [AccountContext] =
        &[AccountContext::Standard, AccountContext::Enterprise];

    /// Base URL requests are sent to. No trailing slash.
    pub fn base_url(&self) -> &'static str {
        match self {
            AccountContext::Standard => STANDARD_BASE_URL,
            AccountContext::Enterprise => ENTERPRISE_BASE_URL,
        }
    }

    /// Value of the `aud` claim for tokens used with this account.
    pub fn audience(&self) -> &'static str {
        match self {
            AccountContext::Standard => STANDARD_AUDIENCE,
            AccountContext::Enterprise => ENTERPRISE_AUDIENCE,
        }
    }

    /// Get the context name as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountContext::Standard => "standard",
            AccountContext::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for AccountContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(AccountContext::Standard),
            "enterprise" => Ok(AccountContext::Enterprise),
            other => Err(format!("unknown account type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_endpoints() {
        assert_eq!(
            AccountContext::Standard.base_url(),
            "https://api.appstoreconnect.apple.com"
        );
        assert_eq!(AccountContext::Standard.audience(), "appstoreconnect-v1");
        assert_eq!(
            AccountContext::Enterprise.base_url(),
            "https://api.enterprise.developer.apple.com"
        );
        assert_eq!(
            AccountContext::Enterprise.audience(),
            "apple-developer-enterprise-v1"
        );
    }

    #[test]
    fn test_parse_and_display() {
        for account in AccountContext::ALL {
            let parsed: AccountContext = account.to_string().parse().unwrap();
            assert_eq!(parsed, *account);
        }
        assert!("developer".parse::<AccountContext>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&AccountContext::Enterprise).unwrap();
        assert_eq!(json, "\"enterprise\"");
    }
}
