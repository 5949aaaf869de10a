//! Randomized browser `User-Agent` values.
//!
//! A new value is generated for every outgoing request so consecutive requests
//! do not share an identifying header.

/// Platform tokens as they appear inside the parenthesised UA comment.
const PLATFORMS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Windows NT 6.3; Win64; x64",
    "Windows NT 6.1; WOW64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 10_14_6",
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Browser {
    Chrome,
    Firefox,
}

/// Generates browser-like `User-Agent` header values.
#[derive(Debug, Clone, Default)]
pub struct UserAgentGenerator;

impl UserAgentGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Returns a freshly randomized `User-Agent` value.
    pub fn generate(&self) -> String {
        let platform = PLATFORMS[rand::random_range(0..PLATFORMS.len())];
        let browser = if rand::random_bool(0.5) {
            Browser::Chrome
        } else {
            Browser::Firefox
        };

        match browser {
            Browser::Chrome => {
                let major = rand::random_range(100..=126u32);
                let build = rand::random_range(4000..=6500u32);
                let patch = rand::random_range(0..=200u32);
                format!(
                    "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.{}.{} Safari/537.36",
                    platform, major, build, patch
                )
            }
            Browser::Firefox => {
                let version = rand::random_range(100..=128u32);
                format!(
                    "Mozilla/5.0 ({}; rv:{}.0) Gecko/20100101 Firefox/{}.0",
                    platform, version, version
                )
            }
        }
    }
}
