/// Canonicalize a domain for comparison and display.
///
/// Strips surrounding whitespace, a leading `http://` or `https://`, a leading
/// `www.` and a single trailing `/`. Case is otherwise preserved.
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let mut d = raw.trim();
    loop {
        let before = d;
        d = strip_prefix_ignore_case(d, "https://");
        d = strip_prefix_ignore_case(d, "http://");
        d = strip_prefix_ignore_case(d, "www.");
        d = d.strip_suffix('/').unwrap_or(d).trim();
        if d == before {
            return d.to_string();
        }
    }
}

/// Element-wise [`normalize`], preserving input order.
pub fn normalize_list<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter().map(|d| normalize(d.as_ref())).collect()
}

/// First DNS label of a normalized domain, e.g. `"ahrefs"` for `ahrefs.com`.
pub fn brand_label(domain: &str) -> &str {
    domain.split('.').next().unwrap_or(domain)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}
