use url::Url;

use crate::SegfetchResult;

pub(crate) fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("file://")
        || s.starts_with("ftp://")
}

/// Resolves `new` against `current` with standard relative URL resolution.
///
/// Template placeholders such as `$Number$` are left untouched: `$` is not part of any
/// percent-encode set used by [`Url::join`].
pub fn merge_baseurls(current: &Url, new: &str) -> SegfetchResult<Url> {
    let new = new.trim();
    if is_absolute_url(new) {
        Ok(Url::parse(new)?)
    } else {
        Ok(current.join(new)?)
    }
}

/// Appends an object key to a bucket URL, encoding each path segment of the key.
pub fn object_url(bucket: &Url, key: &str) -> Url {
    let mut url = bucket.clone();
    url.set_query(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(key.split('/'));
    }
    url
}
