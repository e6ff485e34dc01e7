const HTTPS_PREFIX: &str = "https://";
const HTTP_PREFIX: &str = "http://";
const HTTPS_DEFAULT_PORT: u16 = 443;
const HTTP_DEFAULT_PORT: u16 = 80;
/// Port used when the destination names neither a port nor a scheme.
pub const DEFAULT_GRPC_PORT: u16 = 8079;

/// A normalized `host:port` authority plus the scheme hint it came with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub authority: String,
    /// Whether the raw destination started with `https://`.
    pub scheme_tls: bool,
}

impl Destination {
    /// Host part of the authority, without brackets or port.
    #[must_use]
    pub fn host(&self) -> &str {
        if let Some(bracketed) = self.authority.strip_prefix('[') {
            return bracketed
                .split_once(']')
                .map_or(bracketed, |(host, _)| host);
        }
        self.authority
            .rsplit_once(':')
            .map_or(self.authority.as_str(), |(host, _)| host)
    }

    /// URI tonic dials for this destination.
    #[must_use]
    pub fn uri(&self, tls: bool) -> String {
        let scheme = if tls { "https" } else { "http" };
        format!("{}://{}", scheme, self.authority)
    }
}

/// Canonical `host:port` form of a user supplied destination.
#[must_use]
pub fn normalize_destination(dest: &str) -> String {
    parse_destination(dest).authority
}

/// Splits an optional `http://`/`https://` scheme off `dest`, drops any
/// trailing path and fills in the scheme's default port.
#[must_use]
pub fn parse_destination(dest: &str) -> Destination {
    let trimmed = dest.trim();
    let (rest, default_port, scheme_tls) = if let Some(rest) = strip_scheme(trimmed, HTTPS_PREFIX)
    {
        (rest, HTTPS_DEFAULT_PORT, true)
    } else if let Some(rest) = strip_scheme(trimmed, HTTP_PREFIX) {
        (rest, HTTP_DEFAULT_PORT, false)
    } else {
        (trimmed, DEFAULT_GRPC_PORT, false)
    };
    let authority = rest.split_once('/').map_or(rest, |(authority, _)| authority);

    Destination {
        authority: with_port(authority, default_port),
        scheme_tls,
    }
}

fn strip_scheme<'input>(dest: &'input str, prefix: &str) -> Option<&'input str> {
    let head = dest.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        dest.get(prefix.len()..)
    } else {
        None
    }
}

fn with_port(authority: &str, default_port: u16) -> String {
    if authority.starts_with('[') {
        return match authority.split_once(']') {
            Some((_, port)) if port.len() > 1 && port.starts_with(':') => authority.to_owned(),
            Some((host, _)) => format!("{}]:{}", host, default_port),
            None => format!("{}]:{}", authority, default_port),
        };
    }
    match authority.matches(':').count() {
        0 => format!("{}:{}", authority, default_port),
        1 => authority.to_owned(),
        _ => format!("[{}]:{}", authority, default_port),
    }
}
