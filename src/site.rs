// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Crawler-facing files for the landing page.

use chrono::NaiveDate;
use url::Url;

/// Paths crawlers are asked to skip.
const DISALLOWED: &[&str] = &["/api/", "/private/"];

/// Landing page sections listed in the sitemap, with crawl priority.
const SECTIONS: &[(&str, f32)] = &[
    ("", 1.0),
    ("#services", 0.8),
    ("#features", 0.8),
    ("#testimonials", 0.7),
    ("#contact", 0.9),
];

/// Render `robots.txt` for the site rooted at `base`.
pub fn robots_txt(base: &Url) -> String {
    let mut out = String::from("User-agent: *\nAllow: /\n");
    for path in DISALLOWED {
        out.push_str("Disallow: ");
        out.push_str(path);
        out.push('\n');
    }
    out.push_str(&format!("\nSitemap: {}\n", page_url(base, "sitemap.xml")));
    out
}

/// Render `sitemap.xml`, stamping every entry with `last_modified`.
pub fn sitemap_xml(base: &Url, last_modified: NaiveDate) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (fragment, priority) in SECTIONS {
        let loc = if fragment.is_empty() {
            site_root(base)
        } else {
            format!("{}/{}", site_root(base), fragment)
        };
        out.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>monthly</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            xml_escape(&loc),
            last_modified.format("%Y-%m-%d"),
            priority
        ));
    }
    out.push_str("</urlset>\n");
    out
}

/// Site URL without a trailing slash.
fn site_root(base: &Url) -> String {
    base.as_str().trim_end_matches('/').to_string()
}

fn page_url(base: &Url, path: &str) -> String {
    format!("{}/{}", site_root(base), path)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
