//! GET / - the home page
//!
//! Signed out: a greeting and a login link. Signed in: a submit form and the
//! user's thoughts. A failed read does not fail the page; it renders with an
//! inline notice and an empty list.

use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use std::fmt::Write;
use tracing::warn;

use super::{html_response, FullBody};
use crate::server::AppState;
use crate::types::{Thought, ThoughtCollection};

/// What the page shows
#[derive(Debug)]
pub enum HomePage {
    SignedOut,
    SignedIn {
        username: String,
        thoughts: ThoughtCollection,
        notice: Option<&'static str>,
    },
}

pub async fn handle_home(state: &AppState, headers: &HeaderMap) -> Response<FullBody> {
    let page = match state.sessions.read(headers) {
        None => HomePage::SignedOut,
        Some(session) => match state.documents.read(&session.username, &session.access_token).await {
            Ok(thoughts) => HomePage::SignedIn {
                username: session.username,
                thoughts,
                notice: None,
            },
            Err(e) => {
                warn!(user = %session.username, error = %e, "Home page read failed");
                HomePage::SignedIn {
                    username: session.username,
                    thoughts: ThoughtCollection::new(),
                    notice: Some(e.public_message()),
                }
            }
        },
    };

    html_response(StatusCode::OK, render_home(&page))
}

/// Render the page
pub fn render_home(page: &HomePage) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>tinymind</title></head>\n<body>\n",
    );

    match page {
        HomePage::SignedOut => {
            html.push_str("<p>hi</p>\n<a href=\"/auth/github\">Login with GitHub</a>\n");
        }
        HomePage::SignedIn {
            username,
            thoughts,
            notice,
        } => {
            let _ = writeln!(
                html,
                "<p>hi, {} <a href=\"/auth/logout\">Logout</a></p>",
                escape_html(username)
            );
            html.push_str(
                "<form method=\"post\" action=\"/submit\">\n<textarea name=\"content\" required></textarea>\n<button type=\"submit\">Share thought</button>\n</form>\n",
            );
            if let Some(notice) = notice {
                let _ = writeln!(html, "<p class=\"error\">{}</p>", escape_html(notice));
            }
            html.push_str("<ul class=\"thoughts\">\n");
            for thought in thoughts.iter() {
                render_thought(&mut html, thought);
            }
            html.push_str("</ul>\n");
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_thought(html: &mut String, thought: &Thought) {
    let _ = writeln!(
        html,
        "<li id=\"t-{}\"><time datetime=\"{}\">{}</time><p>{}</p></li>",
        escape_html(&thought.id),
        escape_html(&thought.date),
        escape_html(&thought.date),
        escape_html(&thought.content)
    );
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
