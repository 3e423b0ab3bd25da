//! Synthetic addresses and user agents attached to simulated clicks.
//!
//! Neither is ever used on the wire; they only populate the dashboard.

use traffic_sim_abstract::RandomSource;

/// Four independently drawn octets joined with dots, e.g. `203.0.113.7`.
pub fn generate_marker(rng: &mut dyn RandomSource) -> String {
    let octets = [
        rng.next_octet(),
        rng.next_octet(),
        rng.next_octet(),
        rng.next_octet(),
    ];
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
}

const BROWSERS: [Browser; 5] = [
    Browser::Chrome,
    Browser::Firefox,
    Browser::Safari,
    Browser::Edge,
    Browser::Opera,
];

const PLATFORMS: [&str; 6] = [
    "Windows NT 10.0",
    "Windows NT 11.0",
    "Macintosh; Intel Mac OS X 10_15_7",
    "X11; Linux x86_64",
    "iPhone; CPU iPhone OS 16_0 like Mac OS X",
    "Android 13; Mobile",
];

impl Browser {
    fn versions(self) -> &'static [&'static str] {
        match self {
            Browser::Chrome => &["104.0.0.0", "105.0.0.0", "106.0.0.0", "107.0.0.0"],
            Browser::Firefox => &["104.0", "105.0", "106.0", "107.0"],
            Browser::Safari => &["15.6.1", "16.0", "16.1", "16.2"],
            Browser::Edge => &["104.0.1293.47", "105.0.1343.27", "106.0.1370.37"],
            Browser::Opera => &["90", "91", "92", "93"],
        }
    }

    fn format(self, platform: &str, version: &str) -> String {
        match self {
            Browser::Chrome => format!(
                "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version} Safari/537.36"
            ),
            Browser::Firefox => format!(
                "Mozilla/5.0 ({platform}; rv:{version}) Gecko/20100101 Firefox/{version}"
            ),
            Browser::Safari => format!(
                "Mozilla/5.0 ({platform}) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{version} Safari/605.1.15"
            ),
            Browser::Edge => format!(
                "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version} Safari/537.36 Edg/{version}"
            ),
            Browser::Opera => format!(
                "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version} Safari/537.36 OPR/{version}"
            ),
        }
    }
}

/// A plausible desktop or mobile user-agent string.
///
/// Draws, in order: browser, version for that browser, platform.
pub fn generate_user_agent(rng: &mut dyn RandomSource) -> String {
    let browser = BROWSERS[rng.next_index(BROWSERS.len())];
    let versions = browser.versions();
    let version = versions[rng.next_index(versions.len())];
    let platform = PLATFORMS[rng.next_index(PLATFORMS.len())];
    browser.format(platform, version)
}
