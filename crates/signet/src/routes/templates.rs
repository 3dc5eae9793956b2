// Built-in HTML pages.
//
// Deployments that want real branding mount their own frontend; these
// pages keep the flows usable without one. Everything user-controlled is
// escaped before interpolation.

use crate::handler::GenericResponse;

/// Minimal HTML escaping for text and attribute positions.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif;
           display: flex; justify-content: center; min-height: 100vh;
           margin: 0; background: #f8f9fa; color: #333; }}
    .card {{ max-width: 26rem; width: 100%; margin-top: 6rem; padding: 2rem;
            background: #fff; border-radius: 8px;
            box-shadow: 0 1px 4px rgba(0,0,0,.12); }}
    h1 {{ font-size: 1.25rem; margin-top: 0; }}
    label {{ display: block; margin: .75rem 0 .25rem; font-size: .875rem; }}
    input {{ width: 100%; padding: .5rem; box-sizing: border-box; }}
    button {{ margin-top: 1rem; padding: .5rem 1.25rem; }}
    ul {{ list-style: none; padding: 0; }}
    li {{ margin: .5rem 0; }}
    code {{ background: #f1f3f5; padding: .25rem .5rem; border-radius: 4px; }}
    .error {{ color: #dc3545; font-size: .875rem; }}
  </style>
</head>
<body>
  <div class="card">
{body}
  </div>
</body>
</html>"#,
        title = html_escape(title),
        body = body,
    )
}

/// Generic error page for failures that cannot be redirected to the client.
pub fn error_page(status: u16, heading: &str, message: &str) -> GenericResponse {
    let body = format!(
        "    <h1>{}</h1>\n    <p>{}</p>\n",
        html_escape(heading),
        html_escape(message)
    );
    GenericResponse::html(status, &page(heading, &body))
}

/// Connector picker shown when more than one connector is configured.
pub fn login_page(
    issuer_name: &str,
    connectors: &[(String, String)],
    login_url: impl Fn(&str) -> String,
) -> String {
    let mut items = String::new();
    for (id, name) in connectors {
        items.push_str(&format!(
            "      <li><a href=\"{}\">Log in with {}</a></li>\n",
            html_escape(&login_url(id)),
            html_escape(name),
        ));
    }
    let body = format!(
        "    <h1>Log in to {}</h1>\n    <ul>\n{items}    </ul>\n",
        html_escape(issuer_name),
    );
    page("Log in", &body)
}

/// Credential form for password-style connectors.
pub fn password_page(post_url: &str, prompt: &str, invalid: bool) -> String {
    let error = if invalid {
        "    <p class=\"error\">Invalid credentials.</p>\n"
    } else {
        ""
    };
    let body = format!(
        r#"    <h1>Log in</h1>
{error}    <form method="post" action="{action}">
      <label for="login">{prompt}</label>
      <input type="text" id="login" name="login" autofocus>
      <label for="password">Password</label>
      <input type="password" id="password" name="password">
      <button type="submit">Login</button>
    </form>
"#,
        action = html_escape(post_url),
        prompt = html_escape(prompt),
    );
    page("Log in", &body)
}

/// Consent screen.
pub fn approval_page(
    issuer_name: &str,
    client_name: &str,
    scopes: &[String],
    post_url: &str,
    req: &str,
    hmac: &str,
) -> String {
    let mut scope_items = String::new();
    for scope in scopes {
        scope_items.push_str(&format!("      <li><code>{}</code></li>\n", html_escape(scope)));
    }
    let body = format!(
        r#"    <h1>Grant access</h1>
    <p><strong>{client}</strong> wants to access your {issuer} account:</p>
    <ul>
{scope_items}    </ul>
    <form method="post" action="{action}">
      <input type="hidden" name="req" value="{req}">
      <input type="hidden" name="hmac" value="{hmac}">
      <button type="submit" name="approval" value="approve">Grant access</button>
      <button type="submit" name="approval" value="reject">Cancel</button>
    </form>
"#,
        client = html_escape(client_name),
        issuer = html_escape(issuer_name),
        action = html_escape(post_url),
        req = html_escape(req),
        hmac = html_escape(hmac),
    );
    page("Grant access", &body)
}

/// Out-of-band page for the `urn:ietf:wg:oauth:2.0:oob` redirect, showing
/// the code for manual copy.
pub fn oob_page(code: &str) -> String {
    let body = format!(
        "    <h1>Login successful</h1>\n    <p>Enter this code in your application:</p>\n    <p><code>{}</code></p>\n",
        html_escape(code),
    );
    page("Login successful", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_error_page_escapes_message() {
        let resp = error_page(400, "Bad request", "<script>alert(1)</script>");
        let html = String::from_utf8(resp.body).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_approval_page_carries_request_fields() {
        let html = approval_page(
            "signet",
            "Example App",
            &["openid".to_string(), "email".to_string()],
            "/approval",
            "req123",
            "mac456",
        );
        assert!(html.contains("name=\"req\" value=\"req123\""));
        assert!(html.contains("name=\"hmac\" value=\"mac456\""));
        assert!(html.contains("<code>openid</code>"));
    }
}
