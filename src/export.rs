use crate::types::FilledField;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::PathBuf;

/// Escape a value before embedding it into the artifact markup.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

pub fn timestamped_filename() -> String {
    format!("filled_document_{}.html", chrono::Utc::now().timestamp_millis())
}

fn image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Render the full standalone document: inlined styling, no external
/// references; the rendered form image, when present, is embedded as a
/// base64 data URI.
pub fn render_document(filled: &[FilledField], image: Option<&[u8]>) -> String {
    let mut rows = String::new();
    for field in filled {
        rows.push_str(&format!(
            "            <div class=\"field-row\">\n                <strong>{}:</strong>\n                <span>{}</span>\n            </div>\n",
            escape_html(&field.label),
            escape_html(&field.value)
        ));
    }

    let image_block = match image {
        Some(bytes) => format!(
            "        <div class=\"form-image\">\n            <img src=\"data:{};base64,{}\" alt=\"Filled form\"/>\n        </div>\n",
            image_mime(bytes),
            BASE64.encode(bytes)
        ),
        None => String::new(),
    };

    let generated_on = chrono::Local::now().format("%B %e, %Y");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Filled Document</title>
    <style>
        body {{
            font-family: 'Inter', -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
            background: white;
        }}
        .header {{
            text-align: center;
            margin-bottom: 2rem;
            padding-bottom: 1rem;
            border-bottom: 2px solid #e5e7eb;
        }}
        .header h1 {{ font-size: 2rem; font-weight: 700; color: #1a1a1a; margin-bottom: 0.5rem; }}
        .header p {{ color: #6c757d; }}
        .field-row {{
            display: grid;
            grid-template-columns: 200px 1fr;
            gap: 1rem;
            padding: 1rem;
            margin-bottom: 1.5rem;
            background-color: #f8f9fa;
            border-radius: 0.5rem;
        }}
        .field-row strong {{ color: #1a1a1a; }}
        .field-row span {{ color: #374151; }}
        .form-image {{ text-align: center; margin-bottom: 2rem; }}
        .form-image img {{ max-width: 100%; }}
        .footer {{
            margin-top: 3rem;
            padding-top: 1rem;
            border-top: 1px solid #e5e7eb;
            text-align: center;
            color: #6c757d;
            font-size: 0.875rem;
        }}
    </style>
</head>
<body>
    <div class="header">
        <h1>Filled Document</h1>
        <p>Auto-filled from your profile</p>
    </div>
{image_block}    <div class="fields">
{rows}    </div>
    <div class="footer">
        <p>Generated on {generated_on}</p>
    </div>
</body>
</html>
"#
    )
}

/// Write the artifact to the given path, or to Downloads/Desktop under a
/// timestamped name when no path is given. Returns the written path.
pub fn export_filled_document(
    filled: &[FilledField],
    image: Option<&[u8]>,
    path_override: Option<&str>,
) -> Result<String, String> {
    let path = if let Some(p) = path_override.filter(|s| !s.trim().is_empty()) {
        let mut pb = PathBuf::from(p.trim());
        if pb.extension().map(|e| e.to_str()) != Some(Some("html")) {
            pb.set_extension("html");
        }
        pb
    } else {
        let dir = dirs::download_dir()
            .or_else(dirs::desktop_dir)
            .ok_or("Could not find Downloads or Desktop folder.")?;
        let mut p = dir.join(timestamped_filename());
        let mut counter = 2u32;
        while p.exists() {
            let millis = chrono::Utc::now().timestamp_millis();
            p = dir.join(format!("filled_document_{}_{}.html", millis, counter));
            counter += 1;
        }
        p
    };

    let html = render_document(filled, image);
    std::fs::write(&path, html).map_err(|e| format!("Could not write file: {}", e))?;
    path.to_str()
        .map(String::from)
        .ok_or_else(|| "Invalid path characters.".to_string())
}
