use std::future::Future;

/// Lower-case, collapse every run of non-alphanumeric characters into a single
/// hyphen and trim hyphens from both ends.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Find a free slug starting from `base`, trying `base-1`, `base-2`, ... until
/// `exists` reports the candidate unused.
///
/// There is no upper bound on attempts; every attempt is one lookup. The check
/// and the later insert are not atomic, so two concurrent writers can still
/// pick the same slug.
pub async fn unique_slug<F, Fut, E>(base: &str, mut exists: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut candidate = base.to_string();
    let mut suffix = 0u64;

    while exists(candidate.clone()).await? {
        suffix += 1;
        candidate = format!("{base}-{suffix}");
    }

    Ok(candidate)
}
