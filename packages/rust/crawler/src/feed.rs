//! Uniform reader over RSS 2.0 and Atom 1.0 documents.
//!
//! RSS is tried first, then Atom. A document that is neither is a parse
//! error for the whole feed; individual entries are never rejected here.

use chrono::{DateTime, Utc};

use ainews_shared::{AiNewsError, Result};

use crate::normalize::parse_feed_date;

/// One entry of a feed, before any source-specific mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    /// RSS guid or Atom id.
    pub id: Option<String>,
    pub title: String,
    pub link: Option<String>,
    pub authors: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    /// RSS description or Atom summary, still HTML.
    pub summary_html: Option<String>,
    /// RSS `content:encoded` or Atom content, still HTML.
    pub content_html: Option<String>,
    /// RSS category names or Atom category terms.
    pub categories: Vec<String>,
}

/// Parse a feed document into its entries.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    if let Ok(channel) = rss::Channel::read_from(xml.as_bytes()) {
        return Ok(channel.items().iter().map(rss_entry).collect());
    }

    match atom_syndication::Feed::read_from(xml.as_bytes()) {
        Ok(feed) => Ok(feed.entries().iter().map(atom_entry).collect()),
        Err(e) => Err(AiNewsError::parse(format!(
            "document is neither RSS nor Atom: {e}"
        ))),
    }
}

fn rss_entry(item: &rss::Item) -> FeedEntry {
    // TechCrunch and most WordPress feeds put the byline in dc:creator
    let authors = match item.author() {
        Some(author) => vec![author.to_string()],
        None => item
            .dublin_core_ext()
            .map(|dc| dc.creators().to_vec())
            .unwrap_or_default(),
    };

    FeedEntry {
        id: item.guid().map(|g| g.value().to_string()),
        title: item.title().unwrap_or_default().to_string(),
        link: non_empty(item.link()),
        authors: authors
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
        published: item.pub_date().and_then(parse_feed_date),
        summary_html: non_empty(item.description()),
        content_html: non_empty(item.content()),
        categories: item
            .categories()
            .iter()
            .map(|c| c.name().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    }
}

fn atom_entry(entry: &atom_syndication::Entry) -> FeedEntry {
    let link = entry
        .links()
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|l| l.href());

    FeedEntry {
        id: non_empty(Some(entry.id())),
        title: entry.title().as_str().to_string(),
        link: non_empty(link),
        authors: entry
            .authors()
            .iter()
            .map(|p| p.name().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect(),
        published: entry
            .published()
            .copied()
            .or(Some(*entry.updated()))
            .map(|d| d.with_timezone(&Utc)),
        summary_html: non_empty(entry.summary().map(|s| s.as_str())),
        content_html: non_empty(entry.content().and_then(|c| c.value())),
        categories: entry
            .categories()
            .iter()
            .map(|c| c.term().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>AI</title>
    <link>https://example.com</link>
    <description>AI news</description>
    <item>
      <title>First post</title>
      <link>https://example.com/first</link>
      <guid>https://example.com/?p=1</guid>
      <dc:creator><![CDATA[Jane Doe]]></dc:creator>
      <pubDate>Tue, 14 May 2024 16:05:00 +0000</pubDate>
      <category><![CDATA[AI]]></category>
      <category><![CDATA[Startups]]></category>
      <description><![CDATA[<p>Short teaser</p>]]></description>
      <content:encoded><![CDATA[<p>Full <b>body</b> text</p>]]></content:encoded>
    </item>
    <item>
      <title>No link</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>AI</title>
  <id>urn:feed</id>
  <updated>2024-05-14T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2405.01234v1</id>
    <title>A Paper</title>
    <updated>2024-05-14T10:00:00Z</updated>
    <published>2024-05-13T09:30:00Z</published>
    <link rel="related" href="http://arxiv.org/pdf/2405.01234v1"/>
    <link rel="alternate" href="http://arxiv.org/abs/2405.01234v1"/>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <category term="cs.AI"/>
    <category term="cs.LG"/>
    <summary>An abstract.</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let entries = parse_feed(RSS).expect("parse rss");
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.title, "First post");
        assert_eq!(first.link.as_deref(), Some("https://example.com/first"));
        assert_eq!(first.authors, vec!["Jane Doe".to_string()]);
        assert_eq!(first.categories, vec!["AI".to_string(), "Startups".to_string()]);
        assert_eq!(first.summary_html.as_deref(), Some("<p>Short teaser</p>"));
        assert_eq!(
            first.content_html.as_deref(),
            Some("<p>Full <b>body</b> text</p>")
        );
        assert_eq!(
            first.published.map(|d| d.to_rfc3339()),
            Some("2024-05-14T16:05:00+00:00".to_string())
        );

        assert!(entries[1].link.is_none());
    }

    #[test]
    fn parses_atom_entries() {
        let entries = parse_feed(ATOM).expect("parse atom");
        assert_eq!(entries.len(), 1);

        let e = &entries[0];
        assert_eq!(e.id.as_deref(), Some("http://arxiv.org/abs/2405.01234v1"));
        assert_eq!(e.link.as_deref(), Some("http://arxiv.org/abs/2405.01234v1"));
        assert_eq!(e.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(e.categories, vec!["cs.AI", "cs.LG"]);
        assert_eq!(e.summary_html.as_deref(), Some("An abstract."));
        assert_eq!(
            e.published.map(|d| d.to_rfc3339()),
            Some("2024-05-13T09:30:00+00:00".to_string())
        );
    }

    #[test]
    fn rejects_non_feed_documents() {
        assert!(parse_feed("<html><body>not a feed</body></html>").is_err());
        assert!(parse_feed("").is_err());
    }
}
