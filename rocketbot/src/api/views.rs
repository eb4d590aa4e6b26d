//! Server rendered pages of the install flow.

pub fn index_page(authorization_url: &str) -> String {
    page(
        "Home",
        &format!(
            r#"<h1>Rocket</h1>
<p>Look up people from Slack with <code>/linkedin &lt;profile url&gt;</code>.</p>
<p><a class="add-to-slack" href="{}">Add to Slack</a></p>"#,
            escape(authorization_url)
        ),
    )
}

/// Result of the OAuth callback. `Ok` carries the workspace name when Slack reported one.
pub fn auth_result_page(result: Result<Option<&str>, &str>) -> String {
    let body = match result {
        Ok(Some(team)) => format!(
            "<h1>Installed</h1>\n<p>Rocket app was installed in <b>{}</b>.</p>",
            escape(team)
        ),
        Ok(None) => "<h1>Installed</h1>\n<p>Rocket app was installed in your workspace.</p>"
            .to_owned(),
        Err(error) => format!(
            "<h1>Installation failed</h1>\n<p class=\"error\">{}</p>",
            escape(error)
        ),
    };
    page("Installation", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    )
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
