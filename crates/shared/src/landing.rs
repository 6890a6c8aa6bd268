/// Copy blocks for one rendered landing page. Field fallbacks are the
/// caller's job; the renderer escapes everything it interpolates.
#[derive(Debug, Clone)]
pub struct LandingContent {
    pub title: String,
    pub headline: String,
    pub subheadline: String,
    pub bullets: Vec<String>,
    pub cta_text: String,
    pub cta_url: String,
    pub disclaimer: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Lowercases, collapses every non-alphanumeric run to a single dash, trims
/// dashes, caps at 60 characters.
pub fn slugify(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;

    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug.chars().take(60).collect()
}

pub fn render_landing_html(content: &LandingContent) -> String {
    let bullets = content
        .bullets
        .iter()
        .map(|bullet| format!("<li>{}</li>", escape_html(bullet)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <style>
    body{{font-family:system-ui,-apple-system,Segoe UI,Roboto,Arial,sans-serif;margin:0;background:#0b0f17;color:#e8eefc;}}
    .wrap{{max-width:920px;margin:0 auto;padding:56px 20px;}}
    .card{{background:#121a2a;border:1px solid rgba(255,255,255,.08);border-radius:16px;padding:28px;}}
    h1{{font-size:40px;line-height:1.1;margin:0 0 14px;}}
    p{{font-size:18px;line-height:1.6;margin:0 0 18px;color:rgba(232,238,252,.86);}}
    ul{{margin:16px 0 0 20px;}}
    li{{margin:10px 0;font-size:18px;line-height:1.5;}}
    .cta{{display:inline-block;margin-top:22px;background:#4f7cff;color:white;text-decoration:none;padding:14px 18px;border-radius:12px;font-weight:700;}}
    .small{{margin-top:22px;font-size:13px;color:rgba(232,238,252,.6);}}
  </style>
</head>
<body>
  <div class="wrap">
    <div class="card">
      <h1>{headline}</h1>
      <p>{subheadline}</p>
      <ul>
        {bullets}
      </ul>
      <a class="cta" href="{cta_url}">{cta_text}</a>
      <div class="small">{disclaimer}</div>
    </div>
  </div>
</body>
</html>"#,
        title = escape_html(&content.title),
        headline = escape_html(&content.headline),
        subheadline = escape_html(&content.subheadline),
        bullets = bullets,
        cta_url = escape_html(&content.cta_url),
        cta_text = escape_html(&content.cta_text),
        disclaimer = escape_html(&content.disclaimer),
    )
}

/// Minimal meta-refresh page for `go/{slug}.html` redirects.
pub fn render_redirect_html(target_url: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\" />\
         <meta http-equiv=\"refresh\" content=\"0; url={}\" /></head>\
         <body>Redirecting...</body></html>",
        escape_html(target_url)
    )
}

#[cfg(test)]
mod tests {
    use super::{LandingContent, escape_html, render_landing_html, render_redirect_html, slugify};

    #[test]
    fn escapes_the_five_html_entities() {
        assert_eq!(
            escape_html(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#039;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("B2B SaaS -- Growth!!"), "b2b-saas-growth");
        assert_eq!(slugify("  leading & trailing  "), "leading-trailing");
    }

    #[test]
    fn slugify_caps_length_at_sixty() {
        let long = "word ".repeat(30);
        assert!(slugify(&long).chars().count() <= 60);
    }

    #[test]
    fn slugify_drops_non_ascii() {
        assert_eq!(slugify("Déjà vu 2024"), "d-j-vu-2024");
    }

    #[test]
    fn landing_page_escapes_generated_copy() {
        let html = render_landing_html(&LandingContent {
            title: "A <title>".to_string(),
            headline: "Grow & win".to_string(),
            subheadline: "".to_string(),
            bullets: vec!["<script>alert(1)</script>".to_string()],
            cta_text: "Learn more".to_string(),
            cta_url: "https://example.com/?a=1&b=2".to_string(),
            disclaimer: "Informational only.".to_string(),
        });

        assert!(html.contains("<title>A &lt;title&gt;</title>"));
        assert!(html.contains("<h1>Grow &amp; win</h1>"));
        assert!(html.contains("<li>&lt;script&gt;alert(1)&lt;/script&gt;</li>"));
        assert!(html.contains("href=\"https://example.com/?a=1&amp;b=2\""));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn redirect_page_points_at_target() {
        let html = render_redirect_html("https://example.com/offer?x=1&y=2");
        assert!(html.contains("url=https://example.com/offer?x=1&amp;y=2"));
    }
}
