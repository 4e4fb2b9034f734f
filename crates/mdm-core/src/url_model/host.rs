//! Host normalisation and domain lookup tables.

/// Lowercased host of `url` with any leading `www.` removed.
///
/// Accepts bare `host/path` strings (as pasted in forum posts) by retrying
/// with an `https://` prefix.
pub fn normalize_host(url: &str) -> Option<String> {
    let trimmed = url.trim();
    let parsed = url::Url::parse(trimmed)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| url::Url::parse(&format!("https://{trimmed}")).ok())?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Ordered table of domain keys.
///
/// A key matches a URL when it equals the host, is a dotted suffix of it
/// (`1fichier.com` matches `dl.1fichier.com`), or equals one of its labels
/// (`drive` matches `drive.google.com`, `mega` matches `mega.nz`).
/// Lookups return the first matching entry in insertion order.
#[derive(Debug, Clone)]
pub struct HostTable<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for HostTable<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> HostTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `key`; blank keys are ignored.
    pub fn insert(&mut self, key: &str, value: V) {
        let key = key.trim().trim_start_matches("www.").to_ascii_lowercase();
        if key.is_empty() {
            return;
        }
        self.entries.push((key, value));
    }

    /// Index and value of the first entry matching `url`.
    pub fn lookup(&self, url: &str) -> Option<(usize, &V)> {
        let host = normalize_host(url)?;
        self.entries
            .iter()
            .enumerate()
            .find(|(_, (key, _))| key_matches(key, &host))
            .map(|(i, (_, v))| (i, v))
    }

    pub fn get(&self, url: &str) -> Option<&V> {
        self.lookup(url).map(|(_, v)| v)
    }
}

impl<V, K: AsRef<str>> FromIterator<(K, V)> for HostTable<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = HostTable::new();
        for (k, v) in iter {
            table.insert(k.as_ref(), v);
        }
        table
    }
}

fn key_matches(key: &str, host: &str) -> bool {
    if host == key {
        return true;
    }
    if key.contains('.') {
        return host
            .strip_suffix(key)
            .is_some_and(|rest| rest.ends_with('.'));
    }
    host.split('.').any(|label| label == key)
}
