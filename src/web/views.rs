//! Server-rendered pages: shell layout, landing, explore gallery, voice news.

use std::fmt::Write;

use crate::news::Article;
use crate::speech::narrator::PlaybackState;
use crate::theme::{Theme, ThemeSnapshot};

use super::Route;

pub struct Feature {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub description: &'static str,
    pub target: &'static str,
}

pub const FEATURES: [Feature; 3] = [
    Feature {
        title: "Voice News Reader",
        subtitle: "Stay Informed",
        description: "Experience news like never before with AI-powered voice synthesis that brings headlines to life with natural, engaging narration.",
        target: "/voice",
    },
    Feature {
        title: "Real-time Translator",
        subtitle: "Break Barriers",
        description: "Speak naturally and watch language barriers disappear with instant, high-quality voice translation powered by advanced AI.",
        target: "/translation",
    },
    Feature {
        title: "AI Storyteller",
        subtitle: "Unleash Imagination",
        description: "Transform your ideas into captivating stories with AI creativity and bring them to life through beautiful voice narration.",
        target: "/story",
    },
];

const STYLE: &str = "\
body{margin:0;font-family:system-ui,sans-serif;background:#fff;color:#000;transition:all .5s}\
html.dark body{background:#000;color:#fff}\
main{max-width:72rem;margin:0 auto;padding:4rem 2rem}\
.overlay{position:fixed;top:1.5rem;right:1.5rem;display:flex;flex-direction:column;gap:.5rem}\
.overlay button{border-radius:1rem;border:1px solid rgba(128,128,128,.3);background:transparent;color:inherit;padding:.6rem 1rem;cursor:pointer}\
.hero{text-align:center}.hero h1{font-size:6rem;margin:.5rem 0}\
.badge{font-size:.8rem;letter-spacing:.1em;opacity:.7}\
.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(18rem,1fr));gap:1.5rem;margin-top:3rem}\
.card{border:1px solid rgba(128,128,128,.3);border-radius:1.5rem;padding:1.5rem}\
.card img{width:100%;border-radius:1rem}\
.muted{opacity:.6}.synced{font-weight:bold}";

/// Escape text for HTML element and attribute content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap a page body in the shell: theme class on the root element and the
/// floating theme overlay.
pub fn layout(title: &str, theme: ThemeSnapshot, refresh_secs: Option<u32>, body: &str) -> String {
    let root_class = if theme.resolved == Theme::Dark { " class=\"dark\"" } else { "" };
    let refresh = refresh_secs
        .map(|s| format!("<meta http-equiv=\"refresh\" content=\"{s}\">"))
        .unwrap_or_default();
    let synced = if theme.synced {
        " <span class=\"synced\" title=\"Synced with system\">&#9679;</span>"
    } else {
        ""
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"{root_class}>\n<head>\n<meta charset=\"utf-8\">\n{refresh}\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
<div class=\"overlay\">\n\
<form method=\"post\" action=\"/theme/toggle\"><button type=\"submit\" title=\"Switch to {next} mode\">{icon}</button></form>\n\
<form method=\"post\" action=\"/theme/system\"><button type=\"submit\" title=\"System theme: {system}. Click to sync with system\">System: {system}{synced}</button></form>\n\
</div>\n{body}\n</body>\n</html>\n",
        title = escape(title),
        next = theme.resolved.toggled(),
        icon = if theme.resolved == Theme::Dark { "&#9790;" } else { "&#9728;" },
        system = theme.system,
    )
}

pub fn landing() -> String {
    format!(
        "<main class=\"hero\">\n\
<div class=\"badge\">NEXT-GENERATION VOICE AI</div>\n\
<h1>newsvoice</h1>\n\
<p class=\"muted\">The future of voice technology. Intelligent. Elegant. Limitless possibilities.</p>\n\
<p class=\"badge\">AI POWERED &middot; REAL-TIME &middot; LIMITLESS</p>\n\
<a href=\"{explore}\"><button>Explore Features</button></a>\n\
</main>",
        explore = Route::Explore.path(),
    )
}

pub fn explore() -> String {
    let mut cards = String::new();
    for feature in &FEATURES {
        let _ = write!(
            cards,
            "<div class=\"card\">\n<div class=\"badge\">{subtitle}</div>\n<h3>{title}</h3>\n\
<p class=\"muted\">{description}</p>\n<a href=\"{target}\"><button>Try Now</button></a>\n</div>\n",
            subtitle = escape(feature.subtitle),
            title = escape(feature.title),
            description = escape(feature.description),
            target = feature.target,
        );
    }

    format!(
        "<main>\n<div class=\"hero\">\n<div class=\"badge\">POWERED BY VOICE AI</div>\n<h1>Explore</h1>\n\
<p class=\"muted\">Discover the future of voice technology with our cutting-edge AI features</p>\n</div>\n\
<div class=\"grid\">\n{cards}</div>\n</main>"
    )
}

fn status_line(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Idle => "",
        PlaybackState::Starting(_) => "Preparing narration...",
        PlaybackState::PlayingRemote(_) => "Playing",
        PlaybackState::PlayingFallback(_) => "Playing (local voice)",
    }
}

pub fn voice(articles: &[Article], state: PlaybackState) -> String {
    let mut cards = String::new();
    for article in articles {
        let _ = write!(cards, "<div class=\"card\" id=\"article-{}\">\n", article.id);
        if let Some(image) = &article.image_url {
            let _ = write!(cards, "<img src=\"{}\" alt=\"\">\n", escape(image));
        }
        let source = article.source_name.as_deref().unwrap_or("News");
        let _ = write!(cards, "<div class=\"badge\">{}", escape(source));
        if let Some(published) = article.published_at {
            let _ = write!(cards, " &middot; {}", published.format("%b %e, %Y"));
        }
        let _ = write!(
            cards,
            "</div>\n<h3>{}</h3>\n<p class=\"muted\">{}</p>\n",
            escape(&article.title),
            escape(&article.summary),
        );

        if state.article() == Some(article.id) {
            let _ = write!(
                cards,
                "<p>{}</p>\n<form method=\"post\" action=\"/voice/stop\"><button type=\"submit\">Stop</button></form>\n",
                status_line(state),
            );
        } else {
            let _ = write!(
                cards,
                "<form method=\"post\" action=\"/voice/listen/{}\"><button type=\"submit\">Listen</button></form>\n",
                article.id,
            );
        }
        cards.push_str("</div>\n");
    }

    format!(
        "<main>\n<div class=\"hero\">\n<div class=\"badge\">AI-POWERED NEWS</div>\n<h1>Voice News</h1>\n\
<p class=\"muted\">Stay informed with AI-generated summaries and voice narration</p>\n\
<p><a href=\"/voice?refresh=1\">Refresh headlines</a></p>\n</div>\n\
<div class=\"grid\">\n{cards}</div>\n</main>"
    )
}

pub fn coming_soon(feature: &str) -> String {
    format!(
        "<main class=\"hero\">\n<div class=\"badge\">COMING SOON</div>\n<h1>{}</h1>\n\
<p class=\"muted\">This feature is not available yet.</p>\n\
<a href=\"{}\"><button>Back to Explore</button></a>\n</main>",
        escape(feature),
        Route::Explore.path(),
    )
}

pub fn not_found() -> String {
    format!(
        "<main class=\"hero\">\n<h1>404</h1>\n<p class=\"muted\">Page not found.</p>\n\
<a href=\"{}\"><button>Home</button></a>\n</main>",
        Route::Landing.path(),
    )
}
