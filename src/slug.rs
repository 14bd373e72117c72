//! # Slug Module
//!
//! Deriva identificatori sicuri per il filesystem dai titoli dei video.
//! Lo slug nomina ogni artefatto di un task: `<tmp>/<slug>.mp4`,
//! `<tmp>/<slug>.jpg` e `<out>/<slug>.mp3`.

use sha2::{Digest, Sha256};

const MAX_LEN: usize = 80;

/// Transliterate `title` to ASCII, lower-case it, keep letters and digits and
/// collapse everything else into single `-` separators.
pub fn slugify(title: &str) -> String {
    let ascii = deunicode::deunicode(title);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_sep = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if slug.chars().count() > MAX_LEN {
        slug = slug.chars().take(MAX_LEN).collect();
        slug.truncate(slug.trim_end_matches('-').len());
    }

    slug
}

/// Slug for a task: `title` when it yields one, otherwise a stable name
/// hashed from `url`.
pub fn slug_or_fallback(title: &str, url: &str) -> String {
    let slug = slugify(title);
    if !slug.is_empty() {
        return slug;
    }

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("video-{}", &hex::encode(hasher.finalize())[..12])
}
