use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static PASSWORD_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(PASSWORD\s*=\s*")[^"]*(")"#).expect("password mask pattern is valid")
});

pub(crate) fn enabled() -> bool {
    std::env::var("RIBCL_DEBUG")
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

pub(crate) fn dump_text(label: &str, bytes: &[u8]) {
    if !enabled() {
        return;
    }
    let text = String::from_utf8_lossy(bytes);
    let out = format!("{label} ({}): {}", bytes.len(), mask_password(&text).trim_end());

    #[cfg(feature = "tracing")]
    tracing::trace!("{out}");

    #[cfg(not(feature = "tracing"))]
    eprintln!("{out}");
}

fn mask_password(text: &str) -> Cow<'_, str> {
    PASSWORD_ATTR.replace_all(text, "${1}***${2}")
}
