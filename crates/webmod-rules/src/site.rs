//! Site matching

use crate::module::SiteKey;

/// Pick the module serving `(url, window_title)` among `keys`
///
/// A non-empty window-title substring wins first (catalog order).
/// Otherwise the longest URL fragment contained in the URL decides; ties
/// keep the earlier module.
pub fn select<'a, I>(keys: I, url: &str, window_title: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a SiteKey>,
    I::IntoIter: Clone,
{
    let keys = keys.into_iter();

    if !window_title.is_empty() {
        let by_title = keys.clone().position(|key| {
            key.window_title
                .as_deref()
                .is_some_and(|t| !t.is_empty() && window_title.contains(t))
        });
        if by_title.is_some() {
            return by_title;
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (idx, key) in keys.enumerate() {
        let longest = key
            .urls
            .iter()
            .filter(|u| !u.is_empty() && url.contains(u.as_str()))
            .map(String::len)
            .max();
        if let Some(len) = longest {
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((idx, len));
            }
        }
    }
    best.map(|(idx, _)| idx)
}
