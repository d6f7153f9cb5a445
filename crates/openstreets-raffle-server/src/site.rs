// SPDX-License-Identifier: Apache-2.0

//! Plain-data site resources: crawler directives, the sitemap, and the event
//! structured data.

use serde_json::{json, Value};

pub const SITEMAP_ROUTES: [&str; 7] = [
    "",
    "about",
    "artists",
    "sponsor",
    "volunteer",
    "donate",
    "newsletter",
];

#[must_use]
pub fn robots_txt() -> &'static str {
    "User-agent: *\nAllow: /"
}

#[must_use]
pub fn sitemap_xml(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for route in SITEMAP_ROUTES {
        let (loc, priority) = if route.is_empty() {
            (base.to_string(), "1.0")
        } else {
            (format!("{base}/{route}"), "0.8")
        };
        out.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <changefreq>weekly</changefreq>\n    <priority>{priority}</priority>\n  </url>\n",
            xml_escape(&loc)
        ));
    }
    out.push_str("</urlset>");
    out
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[must_use]
pub fn event_json_ld() -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "Event",
        "name": "Open Streets Tempe",
        "startDate": "2026-04-12T10:00:00-07:00",
        "endDate": "2026-04-12T15:00:00-07:00",
        "description": "A car-free celebration where people can walk, bike, roll, dance, and play. Experience the city like never before as our streets transform into vibrant public spaces.",
        "eventStatus": "https://schema.org/EventScheduled",
        "eventAttendanceMode": "https://schema.org/OfflineEventAttendanceMode",
        "isAccessibleForFree": true,
        "location": {
            "@type": "Place",
            "name": "Downtown Tempe",
            "address": {
                "@type": "PostalAddress",
                "addressLocality": "Tempe",
                "addressRegion": "AZ",
                "addressCountry": "US"
            }
        },
        "organizer": {
            "@type": "Organization",
            "name": "Tempe Bicycle Action Group",
            "url": "https://biketempe.org"
        },
        "offers": {
            "@type": "Offer",
            "price": 0,
            "priceCurrency": "USD",
            "availability": "https://schema.org/InStock",
            "validFrom": "2025-01-01"
        },
        "keywords": "open streets, car-free, cycling, walking, community event, street festival, active transportation, Tempe events, family-friendly, public spaces"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sitemap_lists_home_first_with_top_priority() {
        let xml = sitemap_xml("https://openstreetstempe.org/");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<loc>https://openstreetstempe.org</loc>\n    <changefreq>weekly</changefreq>\n    <priority>1.0</priority>"
        ));
        assert!(xml.contains("<loc>https://openstreetstempe.org/newsletter</loc>"));
        assert_eq!(xml.matches("<priority>0.8</priority>").count(), 6);
        assert!(!xml.contains("raffle"));
    }

    #[test]
    fn event_json_ld_is_a_schema_org_event() {
        let doc = event_json_ld();
        assert_eq!(doc["@type"], "Event");
        assert_eq!(doc["location"]["address"]["addressLocality"], "Tempe");
        assert_eq!(doc["isAccessibleForFree"], true);
    }
}
