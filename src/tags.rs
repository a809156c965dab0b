//! Constructor functions for the common HTML tag set.
//!
//! Each function builds a [`Tag`] with the matching name; tags built inside
//! a render call pick up the rendering instance's scoping token
//! automatically. Void tags reject children.

use estuary_core::Tag;

macro_rules! tag_fns {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Creates an `<", stringify!($name), ">` tag.")]
            #[must_use]
            pub fn $name() -> Tag {
                Tag::new(stringify!($name))
            }
        )*
    };
}

macro_rules! void_tag_fns {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Creates a void `<", stringify!($name), ">` tag.")]
            #[must_use]
            pub fn $name() -> Tag {
                Tag::void(stringify!($name))
            }
        )*
    };
}

tag_fns!(
    a, article, aside, blockquote, body, button, canvas, caption, code, div, em, footer, form,
    h1, h2, h3, h4, h5, h6, head, header, html, iframe, label, li, main, nav, ol, option, p,
    pre, section, select, small, span, strong, table, tbody, td, textarea, tfoot, th, thead,
    title, tr, ul, video,
);

void_tag_fns!(area, base, br, col, embed, hr, img, input, link, meta, source, track);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names() {
        assert_eq!(div().name(), "div");
        assert_eq!(input().name(), "input");
    }

    #[test]
    #[should_panic(expected = "cannot have children")]
    fn test_void_tags_reject_children() {
        let _ = br().child("no");
    }
}
