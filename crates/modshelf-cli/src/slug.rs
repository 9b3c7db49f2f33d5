//! Identifier suggestions derived from labels

const MAX_SLUG_LEN: usize = 60;
const FALLBACK_SLUG: &str = "custom-block";

/// Turn a label into a lowercase, dash-separated slug
///
/// Runs of anything other than ASCII letters and digits collapse to a single
/// dash; leading and trailing dashes are dropped and the result is capped at
/// 60 characters. An empty result becomes `custom-block`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Default module id for a label
pub fn module_id_for(label: &str) -> String {
    format!("custom-{}", slugify(label))
}
