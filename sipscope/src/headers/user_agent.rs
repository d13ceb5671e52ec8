use std::{fmt, str};

use crate::error::Result;
use crate::parser::Parser;

use crate::headers::SipHeaderParse;

use super::Header;

/// The `User-Agent` SIP header.
///
/// Contains information about the `UAC` originating the
/// request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserAgent<'a>(&'a str);

impl<'a> UserAgent<'a> {
    /// Returns the raw `User-Agent` header value.
    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

impl<'a> SipHeaderParse<'a> for UserAgent<'a> {
    const NAME: &'static str = "User-Agent";
    /*
     * User-Agent  =  "User-Agent" HCOLON server-val *(LWS server-val)
     */
    fn parse(parser: &mut Parser<'a>) -> Result<Self> {
        let agent = parser.parse_header_str()?;

        Ok(UserAgent(agent))
    }
}

impl fmt::Display for UserAgent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", UserAgent::NAME, self.0)
    }
}
