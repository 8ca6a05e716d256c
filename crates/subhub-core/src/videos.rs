use url::Url;

pub const VIDEO_ID_LEN: usize = 11;

const YOUTUBE_HOSTS: [&str; 4] = [
    "youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "m.youtube.com",
];
const ID_PATH_PREFIXES: [&str; 4] = ["embed", "shorts", "live", "v"];

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

/// Extracts the YouTube video id from a share link, watch/embed/shorts URL or bare id.
#[must_use]
pub fn extract_video_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_video_id(trimmed) {
        return Some(trimmed.to_string());
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());

    let candidate = if host == "youtu.be" {
        segments.next().map(str::to_string)
    } else if YOUTUBE_HOSTS.contains(&host) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some(prefix) if ID_PATH_PREFIXES.contains(&prefix) => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| is_video_id(id))
}

#[must_use]
pub fn embed_url(video_ref: &str) -> String {
    format!("https://www.youtube-nocookie.com/embed/{video_ref}")
}

#[must_use]
pub fn thumbnail_url(video_ref: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_ref}/hqdefault.jpg")
}

#[cfg(test)]
mod tests {
    use super::{embed_url, extract_video_id};

    #[test]
    fn short_links_yield_the_id() {
        assert_eq!(
            extract_video_id("https://youtu.be/abc12345678"),
            Some("abc12345678".to_string())
        );
        assert_eq!(
            extract_video_id("youtu.be/abc12345678?t=42"),
            Some("abc12345678".to_string())
        );
    }

    #[test]
    fn watch_embed_and_shorts_urls_yield_the_id() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ] {
            assert_eq!(
                extract_video_id(url),
                Some("dQw4w9WgXcQ".to_string()),
                "{url}"
            );
        }
    }

    #[test]
    fn foreign_or_malformed_links_are_rejected() {
        for url in [
            "",
            "https://vimeo.com/123456789",
            "https://youtu.be/short",
            "https://www.youtube.com/watch?list=PL123",
            "https://www.youtube.com/channel/UCabcdefghijk",
            "not a url at all",
        ] {
            assert_eq!(extract_video_id(url), None, "{url}");
        }
    }

    #[test]
    fn embed_url_uses_privacy_host() {
        assert_eq!(
            embed_url("abc12345678"),
            "https://www.youtube-nocookie.com/embed/abc12345678"
        );
    }
}
