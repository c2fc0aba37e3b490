//! OPML encoding of the subscription document.
//!
//! Tags travel in the `category` attribute as a comma-separated list. On
//! import, feeds nested under a folder outline also get the folder name as a
//! tag. OPML has no notion of starring, so `is_starred` is not exported and
//! imports unset, which leaves an existing feed's flag alone.

use ::opml::{Body, Head, Outline, OPML};

use crate::app::Result;
use crate::domain::{Subscription, SubscriptionFeed};
use crate::util::{clean_tags, non_empty};

pub fn to_opml(document: &Subscription) -> Result<String> {
    let outlines = document.feeds.iter().map(feed_outline).collect();
    let opml = OPML {
        version: "2.0".to_string(),
        head: Some(Head {
            title: document.title.clone(),
            ..Default::default()
        }),
        body: Body { outlines },
    };
    Ok(opml.to_string()?)
}

pub fn from_opml(xml: &str) -> Result<Subscription> {
    let opml = OPML::from_str(xml)?;

    let mut feeds = Vec::new();
    collect_feeds(&opml.body.outlines, &[], &mut feeds);

    Ok(Subscription {
        title: opml.head.and_then(|head| head.title).and_then(non_empty),
        feeds,
    })
}

fn feed_outline(feed: &SubscriptionFeed) -> Outline {
    let title = non_empty(&feed.title).unwrap_or_else(|| feed.feed_url.clone());
    Outline {
        text: title.clone(),
        title: Some(title),
        r#type: Some("rss".to_string()),
        xml_url: Some(feed.feed_url.clone()),
        html_url: feed.site_url.clone(),
        description: feed.description.clone(),
        category: (!feed.tags.is_empty()).then(|| feed.tags.join(",")),
        ..Default::default()
    }
}

/// Walks `outlines` depth-first in document order. Outlines without an
/// `xmlUrl` are folders whose name tags every feed beneath them.
fn collect_feeds(outlines: &[Outline], folders: &[String], feeds: &mut Vec<SubscriptionFeed>) {
    for outline in outlines {
        let Some(feed_url) = outline.xml_url.as_deref().and_then(non_empty) else {
            let mut nested = folders.to_vec();
            if let Some(name) = non_empty(&outline.text).or_else(|| outline.title.as_deref().and_then(non_empty)) {
                nested.push(name);
            }
            collect_feeds(&outline.outlines, &nested, feeds);
            continue;
        };

        let mut tags: Vec<String> = outline
            .category
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|tag| tag.trim().trim_matches('/').to_string())
            .collect();
        tags.extend_from_slice(folders);

        let title = outline
            .title
            .as_deref()
            .and_then(non_empty)
            .or_else(|| non_empty(&outline.text))
            .unwrap_or_default();

        feeds.push(SubscriptionFeed {
            feed_url,
            title,
            site_url: outline.html_url.as_deref().and_then(non_empty),
            description: outline.description.as_deref().and_then(non_empty),
            is_starred: None,
            tags: clean_tags(&tags),
        });
    }
}
