//! HTML pages for the mirrored gallery.
//!
//! Pages live in `html/` and reference images and the stylesheet relative to
//! it, so the mirror can be browsed straight from disk.

use maud::{DOCTYPE, Markup, html};

use super::layout::STYLESHEET_FILE;
use crate::feed::{Collection, Item};

/// Renditions linked under each item, largest first.
const ITEM_RENDITIONS: [(&str, &str); 4] = [
    ("s2048", "Max"),
    ("s640", "s640"),
    ("w236", "w236"),
    ("h196", "h196"),
];

const CARD_STYLE: &str = "width: 197px; margin: 3px 0 0 3px;";
const CAPTION_STYLE: &str =
    "margin-top: 0px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;";
const MUTED_STYLE: &str = "font-size: 11px; margin-top: -10px; margin-bottom: -5px;";
const PLAIN_LINK_STYLE: &str = "color: #000; text-decoration: none;";

/// Root `index.html`: an immediate redirect into `html/index.html`.
#[must_use]
pub fn render_redirect() -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta http-equiv="refresh" content="0; URL=html/index.html";
            }
        }
    }
}

fn page(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="UTF-8";
                title { (title) }
                link href={ "../" (STYLESHEET_FILE) } rel="stylesheet";
            }
            body {
                div.row { (content) }
            }
        }
    }
}

fn photo_count(count: usize) -> String {
    if count == 1 {
        "1 photo".to_string()
    } else {
        format!("{count} photos")
    }
}

/// `html/index.html`: one card per collection linking to its page.
#[must_use]
pub fn render_index(collections: &[Collection]) -> Markup {
    let content = html! {
        @for collection in collections {
            div."col-sm-4"."col-md-2" {
                a href={ (collection.id) ".html" } style=(PLAIN_LINK_STYLE) {
                    div.thumbnail style=(CARD_STYLE) {
                        img src={ "../img/index/" (collection.id) ".jpg" } alt=(collection.title);
                        div.caption {
                            h6 style=(CAPTION_STYLE) { (collection.title) }
                            p.muted style=(MUTED_STYLE) { (photo_count(collection.item_count)) }
                        }
                    }
                }
                @if !collection.owner.is_empty() {
                    a.pull-right
                        href={ "https://plus.google.com/photos/" (collection.owner) "/albums/" (collection.id) }
                        style="color: #000; text-decoration: none; font-size: 13px; margin: -25px 9px 0 0;" {
                        "G+"
                    }
                }
            }
        }
    };
    page("Albums", content)
}

/// `html/<collectionId>.html`: one card per item with links to larger
/// renditions on the remote service.
#[must_use]
pub fn render_collection(collection: &Collection, items: &[Item]) -> Markup {
    let content = html! {
        @for item in items {
            @if let Some(file_name) = item.file_name() {
                div."col-sm-4"."col-md-2" {
                    div.thumbnail style=(CARD_STYLE) {
                        img src={ "../img/" (collection.id) "/" (file_name) } alt=(item.title);
                        h6 style=(CAPTION_STYLE) {
                            (item.title)
                            @if let Some(taken) = item.timestamp {
                                " "
                                span.muted { (taken.format("%Y-%m-%dT%H:%M:%S").to_string()) }
                            }
                        }
                        p.muted style=(MUTED_STYLE) {
                            @for (size, label) in ITEM_RENDITIONS {
                                @if let Some(url) = item.sized_url(size) {
                                    a href=(url) { (label) }
                                    " "
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    page(&collection.title, content)
}
