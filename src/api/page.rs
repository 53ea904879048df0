//! Server-rendered HTML for the analysis page.
//!
//! One page per session: upload form, preview with the Analyze trigger once an
//! image is held, then the latest report or error. The only script disables
//! the trigger and shows the working indicator while the POST is outstanding.

use crate::config::{APP_NAME, APP_VERSION, MAX_IMAGE_BYTES};
use crate::pipeline::ingest::ACCEPTED_EXTENSIONS;
use crate::pipeline::presenter::escape_html;
use crate::pipeline::AnalysisError;
use crate::session::{AttemptState, SessionView};

pub const PAGE_TITLE: &str = "Malaria Cell Analysis";
pub const CONFIG_ERROR_MESSAGE: &str = "API configuration error";
pub const WORKING_LABEL: &str = "Analyzing...";

/// Everything one render needs.
pub struct PageModel<'a> {
    pub session: &'a SessionView,
    /// False when the model backend could not be configured at startup.
    pub configured: bool,
    /// Error raised by the request that produced this page, if any.
    pub notice: Option<&'a str>,
}

/// `accept` attribute for the file picker, e.g. `.png,.jpg,.jpeg`.
pub fn accept_attribute() -> String {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn render_page(model: &PageModel<'_>) -> String {
    let body = if model.configured {
        render_workspace(model)
    } else {
        format!(
            "<div class=\"alert error\">{}</div>\n",
            escape_html(CONFIG_ERROR_MESSAGE)
        )
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
*,*::before,*::after{{box-sizing:border-box}}
body{{margin:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:#fafaf9;color:#1c1917;display:flex;justify-content:center;padding:24px}}
main{{max-width:720px;width:100%}}
h1{{font-size:1.75rem;margin:0 0 16px}}
h2{{font-size:1.25rem;margin:24px 0 8px}}
.card{{background:#fff;border-radius:16px;box-shadow:0 4px 24px rgba(0,0,0,.08);padding:24px;margin-bottom:16px}}
.btn{{padding:12px 20px;border:none;border-radius:10px;font-size:1rem;font-weight:600;cursor:pointer;background:#b91c1c;color:#fff}}
.btn:disabled{{opacity:.5;cursor:not-allowed}}
.preview{{max-width:400px;width:100%;border-radius:8px;display:block;margin-bottom:8px}}
.caption{{color:#78716c;font-size:.85rem;margin:0 0 16px}}
.alert{{border-radius:10px;padding:12px 16px;margin-bottom:16px}}
.alert.error{{background:#fef2f2;border:1px solid #fecaca;color:#991b1b}}
.hint{{color:#78716c;font-size:.85rem}}
.spinner{{margin-left:12px;color:#78716c}}
.report dt{{font-weight:600;margin-top:8px}}
.report dd{{margin:2px 0 0}}
pre.raw{{white-space:pre-wrap;word-break:break-word;background:#f5f5f4;border-radius:8px;padding:12px;font-size:.85rem}}
footer{{color:#a8a29e;font-size:.75rem;margin-top:24px}}
</style>
</head>
<body>
<main>
<h1>{title}</h1>
{body}<footer>{app} v{version}</footer>
</main>
<script>
(function(){{
  var form=document.getElementById('analyze-form');
  if(!form)return;
  form.addEventListener('submit',function(){{
    var btn=document.getElementById('analyze-btn');
    var spin=document.getElementById('analyze-spinner');
    if(btn)btn.disabled=true;
    if(spin)spin.hidden=false;
  }});
}})();
</script>
</body>
</html>
"##,
        title = escape_html(PAGE_TITLE),
        body = body,
        app = escape_html(APP_NAME),
        version = escape_html(APP_VERSION),
    )
}

fn render_workspace(model: &PageModel<'_>) -> String {
    let session = model.session;
    let mut out = String::new();

    if let Some(notice) = model.notice {
        out.push_str(&alert(notice));
    }

    out.push_str(&format!(
        r#"<div class="card">
<form method="post" action="/upload" enctype="multipart/form-data">
<label for="file">Upload microscopy image</label><br>
<input type="file" id="file" name="file" accept="{accept}" required>
<button class="btn" type="submit">Upload</button>
</form>
<p class="hint">PNG or JPEG, up to {limit} MB.</p>
</div>
"#,
        accept = escape_html(&accept_attribute()),
        limit = MAX_IMAGE_BYTES / (1024 * 1024),
    ));

    if let Some(err) = &session.upload_error {
        out.push_str(&alert(&err.to_string()));
    }

    if let Some(image) = &session.image {
        let (width, height) = image.dimensions();
        let requesting = session.state == AttemptState::Requesting;
        out.push_str(&format!(
            r#"<div class="card">
<img class="preview" src="{src}" alt="Uploaded blood smear">
<p class="caption">Uploaded Blood Smear Image: {name} ({width}&times;{height})</p>
<form id="analyze-form" method="post" action="/analyze">
<button class="btn" id="analyze-btn" type="submit"{disabled}>Analyze</button>
<span class="spinner" id="analyze-spinner"{hidden}>{working}</span>
</form>
</div>
"#,
            src = image.to_data_url(),
            name = escape_html(image.file_name()),
            disabled = if requesting { " disabled" } else { "" },
            hidden = if requesting { "" } else { " hidden" },
            working = escape_html(WORKING_LABEL),
        ));
    }

    match &session.outcome {
        Some(Ok(report)) => {
            out.push_str("<div class=\"card\">\n");
            out.push_str(&report.to_html());
            out.push_str("</div>\n");
        }
        Some(Err(err)) => out.push_str(&render_failure(err)),
        None => {}
    }

    out
}

/// Error view for a failed attempt. A malformed answer is shown verbatim.
pub fn render_failure(err: &AnalysisError) -> String {
    match err {
        AnalysisError::MalformedResponse { raw, .. } => format!(
            "<div class=\"card\">\n{}<p>Raw output:</p>\n<pre class=\"raw\">{}</pre>\n</div>\n",
            alert("Failed to parse analysis response."),
            escape_html(raw)
        ),
        AnalysisError::Unexpected(_) => alert("Analysis failed: an internal error occurred"),
        other => alert(&other.to_string()),
    }
}

fn alert(message: &str) -> String {
    format!(
        "<div class=\"alert error\" role=\"alert\">{}</div>\n",
        escape_html(message)
    )
}
