//! HTML body for a post. Every value taken from the sheet is escaped.
use std::fmt::Write as _;

use crate::sheet::record::{
    Record, ACTRESSES, AFFILIATE_URL, DIRECTORS, GENRES, JACKET_IMAGE, LABEL, MAKER, SERIES, TITLE,
};

const REVIEW_EXCERPT_CHARS: usize = 150;
const NO_SERIES: &str = "----";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Plain text gets escaped with newlines turned into `<br>`; text that already
/// looks like markup is passed through.
fn nl2br(raw: &str) -> String {
    if raw.contains('<') && raw.contains('>') {
        return raw.to_string();
    }
    escape(raw).replace("\r\n", "\n").replace('\n', "<br>")
}

fn tax_links(names: &[&str], base: &str) -> String {
    names
        .iter()
        .map(|n| {
            format!(
                "<a href=\"/{base}/{}/\">{}</a>",
                urlencoding::encode(n),
                escape(n)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn stars(rating: &str) -> String {
    let r = rating
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 5.0) as usize)
        .unwrap_or(0);
    format!(
        "<span class=\"stars\">{}{}</span>",
        "★".repeat(r),
        "☆".repeat(5 - r)
    )
}

fn excerpt(raw: &str, max_chars: usize) -> String {
    raw.chars().take(max_chars).collect()
}

fn info_row(out: &mut String, label: &str, value_html: &str) {
    let _ = writeln!(out, "<tr><th>{label}</th><td>{value_html}</td></tr>");
}

/// Render the full post body for one record.
pub fn build_post_html(r: &Record) -> String {
    let title = r.get(TITLE);
    let affiliate = escape(r.get(AFFILIATE_URL));
    let mut html = String::new();

    let jacket = r.get(JACKET_IMAGE);
    if !jacket.is_empty() {
        let _ = writeln!(
            html,
            "<figure class=\"fanza-jacket\"><img src=\"{}\" alt=\"{}\"></figure>",
            escape(jacket),
            escape(title)
        );
    }

    html.push_str("<h2>作品基本情報</h2>\n<table class=\"fanza-table\">\n");
    info_row(&mut html, "作品名", &escape(title));
    info_row(&mut html, "メーカー番号", &escape(r.get("maker_code")));
    info_row(&mut html, "配信番号", &escape(r.content_id()));
    info_row(&mut html, "配信開始日", &escape(r.get("release_date")));
    info_row(
        &mut html,
        "収録時間",
        &format!("{}分", escape(r.get("duration_minutes"))),
    );
    info_row(&mut html, "ジャンル", &escape(r.get(GENRES)));
    info_row(
        &mut html,
        "動画ページ",
        &format!(
            "<a href=\"{affiliate}\" target=\"_blank\" rel=\"nofollow sponsored\">動画ページはこちら</a>"
        ),
    );
    let play_count = r.get("play_count");
    if !play_count.is_empty() {
        info_row(&mut html, "再生数", &escape(play_count));
    }
    let series: Vec<&str> = r
        .list(SERIES)
        .into_iter()
        .filter(|s| *s != NO_SERIES)
        .collect();
    let linked = [
        ("メーカー", r.list(MAKER), "maker"),
        ("レーベル", r.list(LABEL), "label"),
        ("シリーズ", series, "series"),
        ("監督", r.list(DIRECTORS), "director"),
        ("出演者", r.list(ACTRESSES), "actress"),
    ];
    for (label, names, base) in linked {
        if !names.is_empty() {
            info_row(&mut html, label, &tax_links(&names, base));
        }
    }
    html.push_str("</table>\n");

    let images: String = r
        .sample_images()
        .iter()
        .enumerate()
        .map(|(i, u)| format!("<img src=\"{}\" alt=\"サンプル画像{}\">", escape(u), i + 1))
        .collect();
    let _ = writeln!(
        html,
        "<h2>画像一覧</h2>\n<div class=\"fanza-images\">{}</div>",
        if images.is_empty() {
            "<p>画像なし</p>"
        } else {
            images.as_str()
        }
    );

    let movie = r.get("sampleMovieURL");
    if !movie.is_empty() {
        let _ = writeln!(
            html,
            "<h2>サンプル動画</h2>\n<iframe src=\"{}\" width=\"560\" height=\"360\" loading=\"lazy\" allowfullscreen></iframe>",
            escape(movie)
        );
    }

    let _ = writeln!(
        html,
        "<h2>作品説明</h2>\n<div class=\"description\">{}</div>",
        nl2br(r.get("description"))
    );
    let _ = writeln!(
        html,
        "<h2>レビュー評価</h2>\n<p>{}</p>",
        escape(r.get("review_summary"))
    );

    html.push_str("<h2>レビュー本文（一部抜粋）</h2>\n");
    let reviews = r.reviews();
    if reviews.is_empty() {
        html.push_str("<p>レビューなし</p>\n");
    }
    for review in reviews {
        let _ = writeln!(
            html,
            "<div class=\"review\">{}<p>{}…</p></div>",
            stars(review.rating),
            escape(&excerpt(review.comment, REVIEW_EXCERPT_CHARS))
        );
    }

    let _ = writeln!(
        html,
        "<h2>動画はこちらから</h2>\n<p><a href=\"{affiliate}\" target=\"_blank\" rel=\"nofollow sponsored\">▶ 動画はこちらから</a></p>"
    );
    let _ = writeln!(
        html,
        "<h2>作品概要</h2>\n<p>本ページでは「{}（{}）」の作品情報、ジャンル、レビュー評価、サンプル動画などを一覧形式で掲載しています。</p>",
        escape(title),
        escape(r.get("maker_code"))
    );
    html.push_str("<p class=\"pr\">※当記事はPRを含みます。</p>\n");
    html
}
