//! The banner page the headless browser screenshots.
//!
//! The page is self-contained (inline CSS, no scripts fetched) and flips
//! `body[data-ready]` once web fonts and the logo have settled, so the
//! capture never races layout.

use crate::export::escape_markup;
use crate::models::{BannerColor, Palette};
use crate::validation::is_http_url;

pub const BANNER_WIDTH: u32 = 1584;
pub const BANNER_HEIGHT: u32 = 396;
pub const READY_SELECTOR: &str = "body[data-ready=\"true\"]";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BannerContent {
    pub palette: Palette,
    pub banner_color: BannerColor,
    /// Only http(s) logos are rendered; anything else is dropped.
    pub logo: Option<String>,
    pub name: String,
    pub headline: String,
}

pub fn render_banner_html(content: &BannerContent) -> String {
    let colors = content.palette.colors();
    let background = content.banner_color.rgb().hex();
    let foreground = content.banner_color.foreground().hex();
    let accent = colors.accent.hex();

    let logo = content
        .logo
        .as_deref()
        .filter(|url| is_http_url(url))
        .map(|url| format!(r#"<img class="logo" src="{}" alt="">"#, escape_markup(url)))
        .unwrap_or_default();

    format!(
        r##"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
html, body {{ margin: 0; padding: 0; }}
#banner {{
  position: relative; box-sizing: border-box; overflow: hidden;
  width: {width}px; height: {height}px; padding: 0 96px;
  display: flex; align-items: center; gap: 56px;
  background: #{background}; color: #{foreground};
  font-family: "Inter", "Helvetica Neue", Helvetica, Arial, sans-serif;
}}
#banner .logo {{ max-height: 176px; max-width: 352px; object-fit: contain; }}
#banner h1 {{ margin: 0; font-size: 72px; font-weight: 700; letter-spacing: -1px; }}
#banner p {{ margin: 16px 0 0; font-size: 32px; opacity: 0.85; }}
#banner .stripe {{ position: absolute; left: 0; bottom: 0; width: 100%; height: 18px; background: #{accent}; }}
</style>
</head>
<body>
<div id="banner">{logo}<div class="text"><h1>{name}</h1><p>{headline}</p></div><div class="stripe"></div></div>
<script>
(function () {{
  var img = document.querySelector("#banner .logo");
  var logo = !img || img.complete ? Promise.resolve() : new Promise(function (done) {{
    img.addEventListener("load", done);
    img.addEventListener("error", done);
  }});
  Promise.all([document.fonts.ready, logo]).then(function () {{
    document.body.dataset.ready = "true";
  }});
}})();
</script>
</body>
</html>
"##,
        title = escape_markup(&content.name),
        width = BANNER_WIDTH,
        height = BANNER_HEIGHT,
        name = escape_markup(&content.name),
        headline = escape_markup(&content.headline),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_uses_selected_colors() {
        let html = render_banner_html(&BannerContent {
            palette: Palette::Sunset,
            banner_color: BannerColor::Teal,
            ..BannerContent::default()
        });
        assert!(html.contains(&format!("background: #{};", BannerColor::Teal.rgb().hex())));
        assert!(html.contains(&Palette::Sunset.colors().accent.hex()));
        assert!(html.contains(r#"<div id="banner">"#));
        assert!(html.contains("document.body.dataset.ready = \"true\""));
    }

    #[test]
    fn test_content_is_escaped() {
        let html = render_banner_html(&BannerContent {
            name: "<script>alert(1)</script>".to_string(),
            logo: Some("https://cdn.example.com/logo.png?a=1&b=2".to_string()),
            ..BannerContent::default()
        });
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"src="https://cdn.example.com/logo.png?a=1&amp;b=2""#));
    }

    #[test]
    fn test_non_http_logo_is_dropped() {
        let html = render_banner_html(&BannerContent {
            logo: Some("file:///etc/passwd".to_string()),
            ..BannerContent::default()
        });
        assert!(!html.contains("<img"));
    }
}
