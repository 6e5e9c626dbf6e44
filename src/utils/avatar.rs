use md5::{Digest, Md5};
use url::Url;

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar/";

/// Default avatar size in pixels.
pub const DEFAULT_SIZE: u32 = 128;

/// Gravatar URL for an email, falling back to the "mystery man" image.
pub fn gravatar_url(email: &str, size: u32) -> String {
    let digest = Md5::digest(email.trim().to_lowercase().as_bytes());
    let hash: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();

    match Url::parse(GRAVATAR_BASE).and_then(|base| base.join(&hash)) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("d", "mm")
                .append_pair("s", &size.to_string());
            url.into()
        }
        Err(_) => format!("{}{}?d=mm&s={}", GRAVATAR_BASE, hash, size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_the_normalized_email() {
        let url = gravatar_url("  MyEmailAddress@example.com ", 80);
        assert_eq!(
            url,
            "https://www.gravatar.com/avatar/0bc83cb571cd1c50ba6f3e8a78ef1346?d=mm&s=80"
        );
    }
}
