//! FILENAME: core/olap-client/src/url.rs
//! OData URL helpers: quoting object names inside resource paths.

/// Fills each `{}` in `template` with the next argument, doubling single
/// quotes so the argument is safe inside an OData string literal.
///
/// Surplus placeholders are left untouched; surplus arguments are ignored.
///
/// ```
/// use olap_client::url::format_url;
///
/// let url = format_url("/api/v1/Cubes('{}')/Views('{}')", &["Sales", "Don't touch"]);
/// assert_eq!(url, "/api/v1/Cubes('Sales')/Views('Don''t touch')");
/// ```
pub fn format_url<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut result = String::with_capacity(template.len() + 16 * args.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(position) = rest.find("{}") {
        result.push_str(&rest[..position]);
        match args.next() {
            Some(arg) => result.push_str(&arg.as_ref().replace('\'', "''")),
            None => result.push_str("{}"),
        }
        rest = &rest[position + 2..];
    }
    result.push_str(rest);
    result
}

/// Doubles single quotes that sit inside quoted object names of an
/// already assembled URL.
///
/// A quote opening a literal (preceded by `(` or `eq `) or closing one
/// (followed by `)` or the end of the URL) is kept as is.
pub fn odata_escape_single_quotes_in_object_names(url: &str) -> String {
    let mut escaped = String::with_capacity(url.len());
    for (position, ch) in url.char_indices() {
        if ch != '\'' {
            escaped.push(ch);
            continue;
        }
        let before = &url[..position];
        let after = &url[position + 1..];
        let opens = before.ends_with('(') || before.ends_with("eq ");
        let closes = after.is_empty() || after.starts_with(')');
        if opens || closes {
            escaped.push('\'');
        } else {
            escaped.push_str("''");
        }
    }
    escaped
}

/// Percent-encodes the characters the server rejects in raw request paths.
pub fn encode_path(url: &str) -> String {
    url.replace(' ', "%20").replace('#', "%23")
}
