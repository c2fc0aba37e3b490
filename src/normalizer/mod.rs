use feed_rs::model::{Link, Text};
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{BrookError, Result};
use crate::parser::{ParsedFeed, ParsedItem};

/// Decodes RSS, Atom and JSON Feed documents into [`ParsedFeed`].
#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, url: &str, body: &[u8]) -> Result<ParsedFeed> {
        let feed = parser::parse(body).map_err(|e| BrookError::parse_failed(url, e))?;

        let feed_link = self_link(&feed.links).unwrap_or_default();
        let site_link = site_link(&feed.links).unwrap_or_default();

        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                let link = site_link_of(&entry.links);
                let external_id = if entry.id.is_empty() {
                    link.clone()
                } else {
                    entry.id
                };

                ParsedItem {
                    external_id,
                    link,
                    title: text(entry.title),
                    description: text(entry.summary),
                    content: entry
                        .content
                        .and_then(|c| c.body)
                        .map(|b| decode_html_entities(&b).to_string())
                        .unwrap_or_default(),
                    published: entry.published,
                    updated: entry.updated,
                }
            })
            .collect();

        Ok(ParsedFeed {
            title: text(feed.title),
            feed_link,
            description: text(feed.description),
            site_link,
            updated: feed.updated,
            items,
        })
    }
}

fn text(t: Option<Text>) -> String {
    t.map(|t| decode_html_entities(t.content.trim()).to_string())
        .unwrap_or_default()
}

fn self_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("self"))
        .map(|l| l.href.clone())
}

fn site_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() != Some("self"))
        .map(|l| l.href.clone())
}

fn site_link_of(links: &[Link]) -> String {
    site_link(links)
        .or_else(|| links.first().map(|l| l.href.clone()))
        .unwrap_or_default()
}
