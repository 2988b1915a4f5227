//! UI routes - registration form and song list

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use songreg_common::models::{format_timestamp, SongRecord, ALGORAND_ADDRESS_LEN};

use crate::flash::{self, FlashMessage};
use crate::AppState;

const PAGE_STYLE: &str = r#"
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: #1a1a1a; color: #e0e0e0; margin: 0; }
        header { background: #2a2a2a; border-bottom: 1px solid #3a3a3a; padding: 20px; display: flex; justify-content: space-between; }
        h1 { color: #4a9eff; margin: 0; font-size: 26px; }
        h2 { color: #4a9eff; }
        .build-info { color: #888; font-family: 'Courier New', monospace; font-size: 13px; text-align: right; }
        .content { padding: 0 20px 20px; }
        .flash { padding: 10px 14px; border-radius: 4px; margin: 10px 0; }
        .flash-success { background: #10b981; color: #fff; }
        .flash-info { background: #3b82f6; color: #fff; }
        .flash-error { background: #ef4444; color: #fff; }
        form label { display: block; margin-top: 10px; }
        form input { width: 420px; padding: 6px; background: #2a2a2a; color: #e0e0e0; border: 1px solid #3a3a3a; }
        button { margin-top: 14px; padding: 10px 20px; background: #4a9eff; color: #fff; border: 0; border-radius: 4px; font-weight: 600; }
        table { border-collapse: collapse; width: 100%; margin-top: 10px; }
        th, td { border-bottom: 1px solid #3a3a3a; padding: 6px 8px; text-align: left; font-size: 14px; }
        td.mono { font-family: 'Courier New', monospace; word-break: break-all; }
        .status-pending { color: #f59e0b; }
        .status-confirmed { color: #10b981; }
        .status-failed { color: #ef4444; }
        .muted { color: #888; }
"#;

/// Reload the list whenever a song is registered or settled elsewhere
///
/// The stream is closed once the form submits so a reload cannot cancel the
/// redirect that carries the flash cookie.
const LIVE_UPDATE_SCRIPT: &str = r#"
    <script>
        if (typeof EventSource !== 'undefined') {
            const source = new EventSource('/events');
            const reload = () => window.location.reload();
            source.addEventListener('SongRegistered', reload);
            source.addEventListener('SongSettled', reload);
            document.getElementById('register-form')
                .addEventListener('submit', () => source.close());
        }
    </script>
"#;

/// GET /
///
/// Renders pending flash messages (and clears them) plus the song list.
pub async fn index_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let flashes = flash::read_from_headers(&headers, &state.secret_key);
    let songs = state.registry.list().await;
    let page = render_index(&songs, &flashes, state.webhook_url.as_deref());

    if flashes.is_empty() {
        Html(page).into_response()
    } else {
        ([(header::SET_COOKIE, flash::clear_cookie())], Html(page)).into_response()
    }
}

/// Render the full index page
pub fn render_index(songs: &[SongRecord], flashes: &[FlashMessage], webhook_url: Option<&str>) -> String {
    let flash_html: String = flashes
        .iter()
        .map(|f| {
            format!(
                "<div class=\"flash flash-{}\">{}</div>\n",
                f.level.as_str(),
                escape_html(&f.message)
            )
        })
        .collect();

    let webhook_html = match webhook_url {
        Some(url) => format!(
            "<p class=\"muted\">BaaS notifications: <code>{}</code></p>",
            escape_html(url)
        ),
        None => "<p class=\"muted\">BaaS notification URL not configured.</p>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Song Registry</title>
    <style>{style}</style>
</head>
<body>
    <header>
        <div>
            <h1>Song Registry</h1>
            <p class="muted">Register songs on the Algorand blockchain</p>
        </div>
        <div class="build-info">
            <div>songreg-web v{version}</div>
            <div>{git_hash} ({profile})</div>
        </div>
    </header>
    <div class="content">
        {flashes}
        <h2>Register a Song</h2>
        <form id="register-form" method="post" action="/register_song">
            <label for="title">Title</label>
            <input id="title" name="title" type="text" required>
            <label for="url">URL</label>
            <input id="url" name="url" type="url" required>
            <label for="price">Price</label>
            <input id="price" name="price" type="number" min="0" step="1" required>
            <label for="owner">Owner (Algorand address)</label>
            <input id="owner" name="owner" type="text" minlength="{addr_len}" maxlength="{addr_len}" required>
            <button type="submit">Register</button>
        </form>
        {webhook}
        <h2>Registered Songs ({count})</h2>
        {table}
    </div>
    {script}
</body>
</html>"#,
        style = PAGE_STYLE,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        profile = env!("BUILD_PROFILE"),
        flashes = flash_html,
        addr_len = ALGORAND_ADDRESS_LEN,
        webhook = webhook_html,
        count = songs.len(),
        table = render_song_table(songs),
        script = LIVE_UPDATE_SCRIPT,
    )
}

fn render_song_table(songs: &[SongRecord]) -> String {
    if songs.is_empty() {
        return "<p class=\"muted\">No songs registered yet.</p>".to_string();
    }

    let rows: String = songs
        .iter()
        .map(|song| {
            format!(
                r#"<tr>
                <td>{id}</td>
                <td>{title}</td>
                <td>{url}</td>
                <td>{price}</td>
                <td class="mono">{owner}</td>
                <td>{timestamp}</td>
                <td class="status-{status}">{status}</td>
                <td class="mono">{data_id}</td>
                <td class="mono">{task_id}</td>
                <td class="mono">{tx_id}</td>
            </tr>
"#,
                id = song.id,
                title = escape_html(&song.title),
                url = render_url(&song.url),
                price = song.price,
                owner = escape_html(&song.owner),
                timestamp = format_timestamp(&song.timestamp),
                status = song.status,
                data_id = escape_html(&song.data_id),
                task_id = escape_html(song.baas_task_id.as_deref().unwrap_or("-")),
                tx_id = escape_html(song.transaction_id.as_deref().unwrap_or("-")),
            )
        })
        .collect();

    format!(
        r#"<table>
            <thead>
                <tr><th>#</th><th>Title</th><th>URL</th><th>Price</th><th>Owner</th><th>Submitted</th><th>Status</th><th>Tracking ID</th><th>BaaS Task</th><th>Transaction</th></tr>
            </thead>
            <tbody>
            {}
            </tbody>
        </table>"#,
        rows
    )
}

/// Link only http(s) URLs; anything else is shown as text
fn render_url(url: &str) -> String {
    let escaped = escape_html(url);
    if url.starts_with("http://") || url.starts_with("https://") {
        format!("<a href=\"{0}\">{0}</a>", escaped)
    } else {
        escaped
    }
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(index_page))
}
