//! # Utility Functions Module
//!
//! Helpers for building external tool command lines and for reporting
//! tool failures.

/// Converts an iterable of string-like items to `Vec<String>`.
///
/// # Example
/// ```rust
/// use yt2mp3::utils::to_string_vec;
///
/// let args = to_string_vec(["-f", "best", "-o", "-"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for convenient argument building.
///
/// # Example
/// ```rust
/// use yt2mp3::args;
///
/// let version = 3;
/// let args = args!["-id3v2_version", version, "-write_id3v1", 1];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// Last non-empty line of a tool's stderr, or `fallback` when there is none.
///
/// yt-dlp and ffmpeg print the actual failure reason last.
pub fn last_stderr_line(stderr: &[u8], fallback: &str) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or(fallback)
        .to_string()
}
