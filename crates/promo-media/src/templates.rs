//! HTML card templates.
//!
//! All product fields are HTML-escaped before substitution. Colours come
//! from the scheme palette or a validated `#hex` accent, so they are safe to
//! place in CSS unescaped.

use html_escape::{encode_double_quoted_attribute, encode_text};

use promo_models::encoding::{CARD_HEIGHT, CARD_WIDTH};
use promo_models::{CardOptions, CardTemplate, Palette, Product};

/// Escaped, formatted fields shared by every template.
struct CardFields {
    name: String,
    image: String,
    price: Option<String>,
    original_price: Option<String>,
    badge: Option<String>,
    description: Option<String>,
    shop: String,
    stats: String,
}

impl CardFields {
    fn new(product: &Product, description: Option<&str>, options: &CardOptions) -> Self {
        let name = if product.name.trim().is_empty() {
            "Sản phẩm".to_string()
        } else {
            encode_text(product.name.trim()).into_owned()
        };

        let mut stats = Vec::new();
        if let Some(rating) = product.rating.filter(|r| *r > 0.0) {
            stats.push(format!("★ {:.1}", rating));
        }
        if product.sales > 0 {
            stats.push(format!("Đã bán {}", product.sales));
        }

        Self {
            name,
            image: encode_double_quoted_attribute(&css_safe_url(&product.image_url)).into_owned(),
            price: options
                .show_price
                .then(|| encode_text(&product.price_label()).into_owned()),
            original_price: options
                .show_price
                .then(|| product.original_price_label())
                .flatten()
                .map(|p| encode_text(&p).into_owned()),
            badge: options
                .show_badge
                .then(|| product.discount_label())
                .flatten()
                .map(|b| encode_text(&b).into_owned()),
            description: description
                .filter(|_| options.show_description)
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(|d| encode_text(d).into_owned().replace('\n', "<br>")),
            shop: encode_text(product.shop_name.trim()).into_owned(),
            stats: stats.join(" · "),
        }
    }

    fn price_block(&self, class: &str) -> String {
        match &self.price {
            Some(price) => {
                let original = self
                    .original_price
                    .as_ref()
                    .map(|p| format!(r#"<span class="original">{}</span>"#, p))
                    .unwrap_or_default();
                format!(r#"<div class="{}"><span class="price">{}</span>{}</div>"#, class, price, original)
            }
            None => String::new(),
        }
    }

    fn badge_block(&self) -> String {
        self.badge
            .as_ref()
            .map(|b| format!(r#"<div class="badge">{}</div>"#, b))
            .unwrap_or_default()
    }

    fn description_block(&self) -> String {
        self.description
            .as_ref()
            .map(|d| format!(r#"<p class="description">{}</p>"#, d))
            .unwrap_or_default()
    }

    fn meta_block(&self) -> String {
        if self.shop.is_empty() && self.stats.is_empty() {
            return String::new();
        }
        format!(
            r#"<div class="meta"><span>{}</span><span>{}</span></div>"#,
            self.shop, self.stats
        )
    }
}

/// Only http(s) URLs, with characters that could close a CSS `url("")` percent-encoded.
fn css_safe_url(url: &str) -> String {
    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return String::new();
    }
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            '"' => out.push_str("%22"),
            '\'' => out.push_str("%27"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '\\' => out.push_str("%5C"),
            c if c.is_whitespace() => out.push_str("%20"),
            c => out.push(c),
        }
    }
    out
}

/// Render a complete HTML document for one card.
pub fn render_card_html(product: &Product, description: Option<&str>, options: &CardOptions) -> String {
    let palette = options.color_scheme.palette();
    let accent = options.resolved_accent();
    let fields = CardFields::new(product, description, options);

    let (style, body) = match options.template {
        CardTemplate::Modern => (modern_style(&palette, &accent), modern_body(&fields)),
        CardTemplate::Minimal => (minimal_style(&palette, &accent), minimal_body(&fields)),
        CardTemplate::Bold => (bold_style(&palette, &accent), bold_body(&fields)),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="vi">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
* {{ box-sizing: border-box; margin: 0; padding: 0; }}
html, body {{ width: {w}px; height: {h}px; overflow: hidden; }}
body {{ font-family: "Be Vietnam Pro", "Segoe UI", Roboto, Arial, sans-serif; }}
{style}
</style>
</head>
<body class="template-{template}">
{body}
</body>
</html>
"#,
        title = fields.name,
        w = CARD_WIDTH,
        h = CARD_HEIGHT,
        style = style,
        template = options.template.as_str(),
        body = body,
    )
}

fn modern_style(p: &Palette, accent: &str) -> String {
    format!(
        r#"body {{ background: {bg}; color: {text}; padding: 48px; }}
.card {{ background: {surface}; border-radius: 32px; height: 100%; overflow: hidden; display: flex; flex-direction: column; box-shadow: 0 12px 40px rgba(0,0,0,.12); position: relative; }}
.hero {{ height: 62%; background: #fff center/contain no-repeat; }}
.content {{ padding: 36px 44px; display: flex; flex-direction: column; gap: 18px; flex: 1; }}
.name {{ font-size: 46px; font-weight: 700; line-height: 1.2; }}
.prices .price {{ font-size: 64px; font-weight: 800; color: {accent}; }}
.prices .original {{ font-size: 34px; color: {muted}; text-decoration: line-through; margin-left: 20px; }}
.description {{ font-size: 30px; color: {muted}; line-height: 1.4; }}
.meta {{ margin-top: auto; display: flex; justify-content: space-between; font-size: 28px; color: {muted}; }}
.badge {{ position: absolute; top: 32px; right: 32px; background: {accent}; color: #fff; font-size: 44px; font-weight: 800; padding: 14px 26px; border-radius: 20px; }}"#,
        bg = p.background,
        text = p.text,
        surface = p.surface,
        muted = p.muted,
        accent = accent,
    )
}

fn modern_body(f: &CardFields) -> String {
    format!(
        r#"<div class="card">
  <div class="hero" style="background-image: url(&quot;{image}&quot;)"></div>
  {badge}
  <div class="content">
    <h1 class="name">{name}</h1>
    {prices}
    {description}
    {meta}
  </div>
</div>"#,
        image = f.image,
        badge = f.badge_block(),
        name = f.name,
        prices = f.price_block("prices"),
        description = f.description_block(),
        meta = f.meta_block(),
    )
}

fn minimal_style(p: &Palette, accent: &str) -> String {
    format!(
        r#"body {{ background: {surface}; color: {text}; display: flex; align-items: center; justify-content: center; text-align: center; }}
.card {{ width: 80%; display: flex; flex-direction: column; align-items: center; gap: 28px; }}
.hero {{ width: 640px; height: 640px; object-fit: contain; }}
.name {{ font-size: 38px; font-weight: 500; line-height: 1.3; }}
.prices .price {{ font-size: 48px; font-weight: 600; color: {accent}; }}
.prices .original {{ font-size: 28px; color: {muted}; text-decoration: line-through; margin-left: 16px; }}
.description {{ font-size: 26px; color: {muted}; line-height: 1.5; }}
.meta {{ display: flex; gap: 24px; font-size: 24px; color: {muted}; }}
.badge {{ border: 2px solid {accent}; color: {accent}; font-size: 30px; padding: 6px 18px; border-radius: 999px; }}
.rule {{ width: 96px; height: 3px; background: {accent}; }}"#,
        surface = p.surface,
        text = p.text,
        muted = p.muted,
        accent = accent,
    )
}

fn minimal_body(f: &CardFields) -> String {
    format!(
        r#"<div class="card">
  <img class="hero" src="{image}" alt="">
  {badge}
  <h1 class="name">{name}</h1>
  <div class="rule"></div>
  {prices}
  {description}
  {meta}
</div>"#,
        image = f.image,
        badge = f.badge_block(),
        name = f.name,
        prices = f.price_block("prices"),
        description = f.description_block(),
        meta = f.meta_block(),
    )
}

fn bold_style(p: &Palette, accent: &str) -> String {
    format!(
        r#"body {{ background: {bg}; color: #fff; }}
.card {{ position: relative; width: 100%; height: 100%; background: #000 center/cover no-repeat; }}
.shade {{ position: absolute; inset: 0; background: linear-gradient(180deg, rgba(0,0,0,0) 35%, rgba(0,0,0,.85) 100%); }}
.content {{ position: absolute; left: 0; right: 0; bottom: 0; padding: 56px; display: flex; flex-direction: column; gap: 22px; }}
.name {{ font-size: 56px; font-weight: 800; line-height: 1.15; text-transform: uppercase; }}
.banner {{ background: {accent}; padding: 20px 32px; border-radius: 16px; align-self: flex-start; }}
.banner .price {{ font-size: 76px; font-weight: 900; }}
.banner .original {{ font-size: 36px; opacity: .8; text-decoration: line-through; margin-left: 24px; }}
.description {{ font-size: 32px; line-height: 1.35; color: #f2f2f2; }}
.meta {{ display: flex; justify-content: space-between; font-size: 28px; color: #dddddd; }}
.badge {{ position: absolute; top: 48px; left: 48px; background: {accent}; color: #fff; font-size: 64px; font-weight: 900; padding: 18px 34px; border-radius: 999px; transform: rotate(-6deg); }}"#,
        bg = p.background,
        accent = accent,
    )
}

fn bold_body(f: &CardFields) -> String {
    format!(
        r#"<div class="card" style="background-image: url(&quot;{image}&quot;)">
  <div class="shade"></div>
  {badge}
  <div class="content">
    <h1 class="name">{name}</h1>
    {prices}
    {description}
    {meta}
  </div>
</div>"#,
        image = f.image,
        badge = f.badge_block(),
        name = f.name,
        prices = f.price_block("banner"),
        description = f.description_block(),
        meta = f.meta_block(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::{sample_products, ColorScheme};

    fn product() -> Product {
        sample_products().remove(0)
    }

    #[test]
    fn test_every_template_contains_product_fields() {
        let product = product();
        for template in CardTemplate::ALL {
            let options = CardOptions {
                template: *template,
                ..Default::default()
            };
            let html = render_card_html(&product, Some("Mô tả ngắn"), &options);
            assert!(html.contains(&format!("template-{}", template.as_str())));
            assert!(html.contains(&product.price_label()));
            assert!(html.contains("-35%"));
            assert!(html.contains("Mô tả ngắn"));
        }
    }

    #[test]
    fn test_fields_are_escaped() {
        let mut product = product();
        product.name = "<script>alert(1)</script> & co".to_string();
        product.image_url = "https://x/\" onerror=\"alert(1)".to_string();

        let html = render_card_html(&product, Some("<b>bold</b>"), &CardOptions::default());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; co"));
        assert!(!html.contains("\" onerror=\""));
        assert!(!html.contains("<b>bold</b>"));
    }

    #[test]
    fn test_css_safe_url() {
        assert_eq!(css_safe_url("javascript:alert(1)"), "");
        assert_eq!(css_safe_url("https://x/a b\"c)"), "https://x/a%20b%22c%29");
    }

    #[test]
    fn test_toggles_hide_badge_price_and_description() {
        let options = CardOptions {
            show_badge: false,
            show_price: false,
            show_description: false,
            ..Default::default()
        };
        let product = product();
        let html = render_card_html(&product, Some("hidden text"), &options);
        assert!(!html.contains(r#"class="badge""#));
        assert!(!html.contains(&product.price_label()));
        assert!(!html.contains("hidden text"));
    }

    #[test]
    fn test_accent_and_scheme_applied() {
        let options = CardOptions {
            color_scheme: ColorScheme::Dark,
            accent_color: Some("#00ff88".to_string()),
            ..Default::default()
        };
        let html = render_card_html(&product(), None, &options);
        assert!(html.contains("#00ff88"));
        assert!(html.contains(ColorScheme::Dark.palette().background));

        let bad = CardOptions {
            accent_color: Some("red;}</style><script>".to_string()),
            ..Default::default()
        };
        let html = render_card_html(&product(), None, &bad);
        assert!(!html.contains("<script>"));
        assert!(html.contains(ColorScheme::Shopee.palette().accent));
    }
}
