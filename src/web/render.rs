//! Page rendering for the upload form
//!
//! A single HTML template with `{{TOKEN}}` placeholders is embedded at
//! compile time. Every piece of text comes from the translator in the
//! session's locale; unfilled tokens are blanked.

use crate::{
    config::ProcessorConfig,
    i18n::Translator,
    session::SessionContext,
    styles::Style,
};

const TEMPLATE: &str = include_str!("assets/page.html");

/// Escapes text for safe inclusion in HTML content and attributes.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders the full page for one session
#[must_use]
pub fn render_page(
    translator: &Translator,
    config: &ProcessorConfig,
    session: &SessionContext,
) -> String {
    let locale = translator.resolve_locale(&session.locale);
    let t = |key: &str| html_escape(&translator.t(locale, key));

    let replacements = [
        ("{{LANG}}", html_escape(locale)),
        ("{{TITLE}}", t("app.title")),
        ("{{HEADER}}", t("app.header")),
        ("{{SUBHEADER}}", t("app.subheader")),
        ("{{LANGUAGE_LABEL}}", t("language.label")),
        ("{{LANGUAGE_APPLY}}", t("language.apply")),
        ("{{LANGUAGE_OPTIONS}}", language_options(translator, locale)),
        ("{{UPLOAD_TITLE}}", t("upload.title")),
        ("{{UPLOAD_LABEL}}", t("upload.label")),
        ("{{UPLOAD_BUTTON}}", t("upload.button")),
        ("{{UPLOAD_LIMITS}}", upload_limits(translator, locale, config)),
        ("{{STYLE_LABEL}}", t("style.label")),
        ("{{STYLE_OPTIONS}}", style_options(translator, locale, session.style)),
        ("{{STYLE_DESCRIPTIONS}}", style_descriptions(translator, locale)),
        ("{{LEARN_MORE}}", t("style.learn_more")),
        ("{{CREATE_BUTTON}}", t("actions.create")),
        ("{{CREATING}}", t("actions.creating")),
        (
            "{{CREATE_DISABLED}}",
            if session.has_image() { String::new() } else { "disabled".to_string() },
        ),
        ("{{FLASH}}", flash(translator, locale, session)),
        ("{{GALLERY_ORIGINAL}}", t("gallery.original")),
        ("{{GALLERY_RESULT}}", t("gallery.result")),
        ("{{ORIGINAL}}", original_figure(translator, locale, session)),
        ("{{RESULT}}", result_figure(translator, locale, session)),
        ("{{DOWNLOADS}}", downloads(translator, locale, session)),
    ];

    let html = replacements
        .iter()
        .fold(TEMPLATE.to_owned(), |html, (token, value)| html.replace(token, value));
    blank_remaining(html)
}

/// Replaces any `{{TOKEN}}` that wasn't already substituted with an empty string.
fn blank_remaining(mut html: String) -> String {
    while let Some(start) = html.find("{{") {
        let Some(end) = html.get(start..).and_then(|rest| rest.find("}}")) else {
            break;
        };
        html.replace_range(start..start + end + 2, "");
    }
    html
}

fn language_options(translator: &Translator, locale: &str) -> String {
    translator
        .language_options()
        .into_iter()
        .map(|(code, label)| {
            let selected = if code == locale { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                html_escape(&code),
                selected,
                html_escape(&label)
            )
        })
        .collect()
}

fn upload_limits(translator: &Translator, locale: &str, config: &ProcessorConfig) -> String {
    let size_mb = config.max_file_size / (1024 * 1024);
    html_escape(&translator.text(
        locale,
        "upload.limits",
        &[
            ("size", size_mb.to_string()),
            ("dimension", config.max_dimension.to_string()),
        ],
    ))
}

fn style_options(translator: &Translator, locale: &str, current: Style) -> String {
    Style::ALL
        .iter()
        .map(|style| {
            let selected = if *style == current { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                style.key(),
                selected,
                html_escape(&translator.style_name(locale, *style))
            )
        })
        .collect()
}

fn style_descriptions(translator: &Translator, locale: &str) -> String {
    Style::ALL
        .iter()
        .map(|style| {
            format!(
                "<dt>{}</dt><dd>{}</dd>",
                html_escape(&translator.style_name(locale, *style)),
                html_escape(&translator.style_description(locale, *style))
            )
        })
        .collect()
}

fn flash(translator: &Translator, locale: &str, session: &SessionContext) -> String {
    if let Some(error) = &session.last_error {
        return format!(
            "<div class=\"flash error\"><strong>{}</strong><p>{}</p>\
             <details><summary>{}</summary><pre>{}</pre></details></div>",
            html_escape(&translator.t(locale, "errors.title")),
            html_escape(&translator.text(locale, error.message_key, &error.message_args)),
            html_escape(&translator.t(locale, "errors.details")),
            html_escape(&error.details)
        );
    }

    if let Some(result) = &session.result {
        let seconds = format!("{:.1}", result.timings.total_ms as f64 / 1000.0);
        let mut text = translator.text(locale, "status.done", &[("seconds", seconds)]);
        if let Some(prepared) = &session.prepared {
            if prepared.record.was_resized {
                let (width, height) = prepared.record.scaled_size;
                text.push(' ');
                text.push_str(&translator.text(
                    locale,
                    "status.resized",
                    &[("width", width.to_string()), ("height", height.to_string())],
                ));
            }
        }
        return format!("<div class=\"flash ok\">{}</div>", html_escape(&text));
    }

    if let Some(prepared) = &session.prepared {
        let (width, height) = prepared.record.original_size;
        let text = translator.text(
            locale,
            "upload.success",
            &[
                ("name", prepared.file_name.clone()),
                ("width", width.to_string()),
                ("height", height.to_string()),
            ],
        );
        return format!("<div class=\"flash ok\">{}</div>", html_escape(&text));
    }

    String::new()
}

fn original_figure(translator: &Translator, locale: &str, session: &SessionContext) -> String {
    if session.has_image() {
        format!(
            "<img src=\"/image/original\" alt=\"{}\">",
            html_escape(&translator.t(locale, "gallery.original"))
        )
    } else {
        format!(
            "<div class=\"empty\">{}</div>",
            html_escape(&translator.t(locale, "gallery.empty_original"))
        )
    }
}

fn result_figure(translator: &Translator, locale: &str, session: &SessionContext) -> String {
    if session.has_result() {
        format!(
            "<img src=\"/image/styled\" alt=\"{}\">",
            html_escape(&translator.t(locale, "gallery.result"))
        )
    } else {
        format!(
            "<div class=\"empty\">{}</div>",
            html_escape(&translator.t(locale, "gallery.empty_result"))
        )
    }
}

fn downloads(translator: &Translator, locale: &str, session: &SessionContext) -> String {
    if !session.has_result() {
        return String::new();
    }
    format!(
        concat!(
            "<div class=\"downloads\"><h3>{}</h3>",
            "<a href=\"/download/png\">{}</a>",
            "<a href=\"/download/jpeg\">{}</a></div>"
        ),
        html_escape(&translator.t(locale, "download.title")),
        html_escape(&translator.t(locale, "download.png")),
        html_escape(&translator.t(locale, "download.jpeg"))
    )
}
