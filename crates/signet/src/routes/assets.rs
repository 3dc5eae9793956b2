// Static asset serving for the web frontend.
//
// `/static/*` maps into `<web.dir>/static`, `/theme/*` into
// `<web.dir>/themes/<theme>`. Paths are rebuilt from validated components
// so requests cannot escape the asset directory.

use std::path::{Component, Path, PathBuf};

use crate::handler::GenericResponse;
use crate::server::Server;

pub async fn handle_asset(server: &Server, route: &str) -> GenericResponse {
    let (base, rest) = if let Some(rest) = route.strip_prefix("/static/") {
        (server.web.dir.join("static"), rest)
    } else if let Some(rest) = route.strip_prefix("/theme/") {
        (
            server.web.dir.join("themes").join(&server.web.theme),
            rest,
        )
    } else {
        return GenericResponse::not_found();
    };

    let Some(relative) = sanitize(rest) else {
        return GenericResponse::not_found();
    };
    let path = base.join(relative);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mut response = GenericResponse {
                status: 200,
                headers: Default::default(),
                body: bytes,
            };
            response.set_header("content-type", content_type(&path));
            response
        }
        Err(_) => GenericResponse::not_found(),
    }
}

/// Keep only plain path segments; anything absolute or dot-dot is out.
fn sanitize(rest: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(rest).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
