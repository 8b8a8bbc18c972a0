//! Server-rendered HTML pages.

use std::fmt::Write;

use matrisk_core::{Assessment, FeatureImportance, FeatureRecord};

use crate::flash::Flash;

/// Escapes text for use in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Pregnancy Risk Predictor</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css">
</head>
<body class="bg-light">
<nav class="navbar navbar-dark bg-primary mb-4">
  <div class="container">
    <a class="navbar-brand" href="/">Pregnancy Risk Predictor</a>
    <a class="nav-link text-white" href="/model_info">Model Info</a>
  </div>
</nav>
<main class="container">
{body}
</main>
<script src="/static/js/script.js"></script>
</body>
</html>
"#,
        title = escape(title),
        body = body,
    )
}

fn alert_class(category: &str) -> &'static str {
    match category {
        "error" => "danger",
        "success" => "success",
        _ => "info",
    }
}

struct FieldSpec {
    name: &'static str,
    label: &'static str,
    step: &'static str,
    placeholder: &'static str,
}

const FORM_FIELDS: [FieldSpec; 6] = [
    FieldSpec { name: "Age", label: "Age (years)", step: "1", placeholder: "28" },
    FieldSpec { name: "SystolicBP", label: "Systolic BP (mmHg)", step: "1", placeholder: "120" },
    FieldSpec { name: "DiastolicBP", label: "Diastolic BP (mmHg)", step: "1", placeholder: "80" },
    FieldSpec { name: "BS", label: "Blood Sugar (mg/dL)", step: "0.1", placeholder: "95" },
    FieldSpec { name: "BodyTemp", label: "Body Temperature (°F)", step: "0.1", placeholder: "98.6" },
    FieldSpec { name: "HeartRate", label: "Heart Rate (bpm)", step: "1", placeholder: "80" },
];

/// The input form, with any pending flash messages above it.
pub fn index(flashes: &[Flash]) -> String {
    let mut body = String::new();
    for flash in flashes {
        let _ = writeln!(
            body,
            r#"<div class="alert alert-{}" role="alert">{}</div>"#,
            alert_class(flash.category),
            escape(&flash.message)
        );
    }

    body.push_str(
        r#"<div class="card shadow-sm"><div class="card-body">
<h1 class="h4 mb-3">Enter vital signs</h1>
<form id="pregnancyForm" method="post" action="/predict" novalidate>
<div class="row">
"#,
    );
    for field in &FORM_FIELDS {
        let _ = writeln!(
            body,
            r#"<div class="col-md-6 mb-3">
  <label class="form-label" for="{name}">{label}</label>
  <input class="form-control" type="number" id="{name}" name="{name}" step="{step}" placeholder="{placeholder}" required>
  <div class="invalid-feedback"></div>
</div>"#,
            name = field.name,
            label = escape(field.label),
            step = field.step,
            placeholder = field.placeholder,
        );
    }
    body.push_str(
        r#"</div>
<button id="predictBtn" type="submit" class="btn btn-primary">Predict Risk</button>
</form>
</div></div>
"#,
    );

    layout("Home", &body)
}

/// The prediction results page.
pub fn results(features: &FeatureRecord, assessment: &Assessment) -> String {
    let info = &assessment.info;
    let mut body = String::new();

    let _ = write!(
        body,
        r#"<div class="card border-{color} shadow-sm mb-4">
<div class="card-header bg-{color} text-white"><h1 class="h4 mb-0">{level}</h1></div>
<div class="card-body">
<p class="lead">{message}</p>
<p>Confidence: <strong>{confidence}</strong></p>
<h2 class="h6">Recommendations</h2>
<ul>
"#,
        color = escape(&info.color),
        level = escape(&info.risk_level),
        message = escape(&info.message),
        confidence = escape(&info.confidence),
    );
    for rec in &info.recommendations {
        let _ = writeln!(body, "<li>{}</li>", escape(rec));
    }
    body.push_str("</ul>\n<h2 class=\"h6\">Probability breakdown</h2>\n");
    for class in &info.probabilities {
        let _ = writeln!(
            body,
            r#"<div class="mb-2"><small>{label}: {pct}%</small>
<div class="progress"><div class="progress-bar" role="progressbar" style="width: {width}%"></div></div></div>"#,
            label = escape(&class.label),
            pct = escape(&class.percentage),
            width = escape(&class.width),
        );
    }
    body.push_str("</div></div>\n");

    body.push_str(
        "<div class=\"card shadow-sm mb-4\"><div class=\"card-body\">\n<h2 class=\"h5\">Input values</h2>\n<table class=\"table table-sm\">\n",
    );
    for (name, value) in features.iter() {
        let _ = writeln!(
            body,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(name),
            escape(&value.to_string())
        );
    }
    let _ = write!(
        body,
        "</table>\n<p class=\"text-muted mb-0\">Model: {}</p>\n</div></div>\n<a class=\"btn btn-outline-primary\" href=\"/\">New prediction</a>\n",
        escape(&assessment.model_name)
    );

    layout("Results", &body)
}

/// Model name, feature columns and importance table.
pub fn model_info(model_name: &str, features: &[String], importance: &[FeatureImportance]) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<h1 class=\"h4\">Model information</h1>\n<p>Best model: <strong>{}</strong></p>\n<h2 class=\"h5\">Features</h2>\n<ul>\n",
        escape(model_name)
    );
    for feature in features {
        let _ = writeln!(body, "<li>{}</li>", escape(feature));
    }
    body.push_str("</ul>\n<h2 class=\"h5\">Feature importance</h2>\n");

    if importance.is_empty() {
        body.push_str("<p class=\"text-muted\">Feature importance not available for this model.</p>\n");
    } else {
        body.push_str(
            "<table class=\"table table-striped\">\n<thead><tr><th>Feature</th><th>Importance</th></tr></thead>\n<tbody>\n",
        );
        for row in importance {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{:.4}</td></tr>",
                escape(&row.feature),
                row.importance
            );
        }
        body.push_str("</tbody>\n</table>\n");
    }

    layout("Model Info", &body)
}

pub fn not_found() -> String {
    layout(
        "Page Not Found",
        "<h1 class=\"h3\">404 - Page not found</h1>\n<p>The page you requested does not exist.</p>\n<a href=\"/\">Back to the form</a>\n",
    )
}

pub fn internal_error() -> String {
    layout(
        "Server Error",
        "<h1 class=\"h3\">500 - Internal server error</h1>\n<p>Something went wrong while handling your request.</p>\n<a href=\"/\">Back to the form</a>\n",
    )
}
