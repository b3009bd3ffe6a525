use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in URL parameters: everything outside the URL query allowed set, plus the
/// single quote. Some provider query grammars (Google Drive search, for one) reserve `'`.
const URL_PARAMETERS: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'\'');

pub fn escape_url_parameters(url_parameters: &str) -> String {
    utf8_percent_encode(url_parameters, URL_PARAMETERS).to_string()
}

/// Joins a request path and optional URL parameters into the path-and-query part of a URL.
pub fn path_with_parameters(path: &str, url_parameters: Option<&str>) -> String {
    match url_parameters {
        Some(parameters) => format!("{}?{}", path, escape_url_parameters(parameters)),
        None => path.to_owned(),
    }
}
