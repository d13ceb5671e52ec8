use super::SipHeaderParse;
use crate::{error::Result, macros::parse_header_param, message::Params, parser::ParseCtx};
use core::fmt;

/// The `Reason` SIP header (RFC 3326).
///
/// Carries the reason a request was generated, e.g. `CANCEL` after a
/// forked `INVITE` was answered elsewhere, or a `BYE` closing a call
/// because of a Q.850 cause from the PSTN side.
///
/// # Examples
///
/// ```
/// # use sipscope::headers::Reason;
/// let r = Reason::new("SIP");
///
/// assert_eq!("Reason: SIP", r.to_string());
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Reason<'a> {
    protocol: &'a str,
    params: Option<Params<'a>>,
}

impl<'a> Reason<'a> {
    /// Creates a new `Reason` header with the given protocol token and no params.
    pub fn new(protocol: &'a str) -> Self {
        Self { protocol, params: None }
    }

    /// The protocol token (`SIP`, `Q.850`, or an extension token).
    pub fn protocol(&self) -> &str {
        self.protocol
    }

    /// The `cause` param, if present.
    pub fn cause(&self) -> Option<u32> {
        self.params
            .as_ref()
            .and_then(|p| p.get("cause"))
            .flatten()
            .and_then(|v| v.parse().ok())
    }

    /// The `text` param, if present.
    pub fn text(&self) -> Option<&str> {
        self.params.as_ref().and_then(|p| p.get("text")).flatten()
    }
}

impl<'a> SipHeaderParse<'a> for Reason<'a> {
    const NAME: &'static str = "Reason";
    /*
     * Reason            =  "Reason" HCOLON reason-value *(COMMA reason-value)
     * reason-value      =  protocol *(SEMI reason-params)
     * protocol          =  "SIP" / "Q.850" / token
     * reason-params     =  protocol-cause / reason-text / reason-extension
     * protocol-cause    =  "cause" EQUAL cause
     * cause             =  1*DIGIT
     * reason-text       =  "text" EQUAL quoted-string
     */
    fn parse(parser: &mut ParseCtx<'a>) -> Result<Self> {
        let protocol = parser.parse_token()?;
        let params = parse_header_param!(parser);

        Ok(Reason { protocol, params })
    }
}

impl fmt::Display for Reason<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", Reason::NAME, self.protocol)?;
        if let Some(params) = &self.params {
            write!(f, ";{}", params)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let src = b"SIP ;cause=200 ;text=\"Call completed elsewhere\"\r\n";
        let mut scanner = ParseCtx::new(src);
        let reason = Reason::parse(&mut scanner).unwrap();

        assert_eq!(reason.protocol(), "SIP");
        assert_eq!(reason.cause(), Some(200));
        assert_eq!(reason.text(), Some("Call completed elsewhere"));
    }

    #[test]
    fn test_parse_no_params() {
        let src = b"Q.850\r\n";
        let mut scanner = ParseCtx::new(src);
        let reason = Reason::parse(&mut scanner).unwrap();

        assert_eq!(reason.protocol(), "Q.850");
        assert_eq!(reason.cause(), None);
    }
}
