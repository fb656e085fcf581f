//! HTML pages: caller simulator, supervisor dashboard and the 404 page
//!
//! The pages are static shells that drive the JSON API and the change feed.

use axum::{
    http::{StatusCode, Uri},
    response::{Html, IntoResponse},
};
use tracing::warn;

const STYLE: &str = r#"<style>
body { font-family: system-ui, sans-serif; margin: 0; background: #fafafa; color: #1f2937; }
.container { max-width: 960px; margin: 0 auto; padding: 2rem 1.5rem; }
.muted { color: #6b7280; }
.card { background: #fff; border: 1px solid #e5e7eb; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
.msg { padding: .5rem .75rem; border-radius: 8px; margin: .25rem 0; max-width: 80%; }
.agent { background: #eef2ff; }
.caller { background: #2563eb; color: #fff; margin-left: auto; }
.badge { font-size: .75rem; padding: .1rem .5rem; border-radius: 999px; background: #e5e7eb; }
.badge.resolved { background: #dcfce7; }
.badge.pending { background: #fef3c7; }
#notice { position: fixed; bottom: 1rem; right: 1rem; }
#notice div { background: #111827; color: #fff; padding: .75rem 1rem; border-radius: 6px; margin-top: .5rem; }
#notice div.destructive { background: #b91c1c; }
nav button.active { font-weight: bold; }
pre.caller-info { background: #f3f4f6; padding: .5rem; border-radius: 6px; font-size: .8rem; overflow-x: auto; }
</style>"#;

const NOTICE_SCRIPT: &str = r#"<script>
function showNotice(n) {
  const el = document.createElement('div');
  if (n.variant === 'destructive') el.className = 'destructive';
  el.innerHTML = '<strong></strong><div></div>';
  el.querySelector('strong').textContent = n.title;
  el.querySelector('div').textContent = n.description;
  document.getElementById('notice').appendChild(el);
  setTimeout(() => el.remove(), 4000);
}
async function api(method, path, body) {
  const res = await fetch(path, {
    method,
    headers: { 'content-type': 'application/json' },
    body: body === undefined ? undefined : JSON.stringify(body),
  });
  const data = res.status === 204 ? null : await res.json();
  if (!res.ok) { showNotice(data); throw data; }
  return data;
}
function text(tag, value, cls) {
  const el = document.createElement(tag);
  el.textContent = value;
  if (cls) el.className = cls;
  return el;
}
</script>"#;

const SIMULATOR_BODY: &str = r#"<div class="container">
  <div style="display:flex;justify-content:space-between;align-items:center">
    <div>
      <h1>AI Agent Call Simulator</h1>
      <p class="muted">Test the AI agent's ability to handle questions and request help</p>
    </div>
    <a href="/supervisor">Supervisor Dashboard</a>
  </div>
  <div class="card">
    <button id="start">Start Call</button>
    <button id="end" disabled>End Call</button>
    <div id="conversation" style="display:flex;flex-direction:column;margin-top:1rem"></div>
    <form id="ask" style="margin-top:1rem">
      <input id="question" placeholder="Ask a question..." disabled style="width:70%">
      <button disabled>Send</button>
    </form>
  </div>
</div>
<div id="notice"></div>
<script>
let callId = null;
function render(call) {
  const box = document.getElementById('conversation');
  box.replaceChildren(...call.conversation.map(m => text('div', m.message, 'msg ' + m.role)));
}
function setActive(active) {
  document.getElementById('start').disabled = active;
  document.getElementById('end').disabled = !active;
  document.querySelectorAll('#ask input, #ask button').forEach(el => el.disabled = !active);
}
document.getElementById('start').onclick = async () => {
  const data = await api('POST', '/api/calls');
  callId = data.call.id;
  render(data.call);
  setActive(true);
  showNotice(data.notice);
};
document.getElementById('end').onclick = async () => {
  const data = await api('DELETE', '/api/calls/' + callId);
  callId = null;
  document.getElementById('conversation').replaceChildren();
  setActive(false);
  showNotice(data.notice);
};
document.getElementById('ask').onsubmit = async (e) => {
  e.preventDefault();
  const input = document.getElementById('question');
  const question = input.value;
  input.value = '';
  try {
    const data = await api('POST', '/api/calls/' + callId + '/questions', { question });
    render(data.call);
    if (data.notice) showNotice(data.notice);
  } finally {
    render(await api('GET', '/api/calls/' + callId));
  }
};
</script>"#;

const DASHBOARD_BODY: &str = r#"<header class="container">
  <h1>AI Agent Supervisor Dashboard</h1>
  <p class="muted">Manage help requests and knowledge base</p>
  <nav>
    <button data-tab="pending" class="active">Pending <span id="pending-count" class="badge pending">0</span></button>
    <button data-tab="history">History</button>
    <button data-tab="knowledge">Knowledge Base</button>
  </nav>
</header>
<main class="container">
  <section id="pending"></section>
  <section id="history" hidden>
    <p id="history-total" class="muted"></p>
    <div id="rows"></div>
  </section>
  <section id="knowledge" hidden>
    <input id="search" placeholder="Search knowledge base..." style="width:100%;margin-bottom:1rem">
    <div id="entries"></div>
  </section>
</main>
<div id="notice"></div>
<script>
document.querySelectorAll('nav button').forEach(btn => btn.onclick = () => {
  document.querySelectorAll('nav button').forEach(b => b.classList.toggle('active', b === btn));
  document.querySelectorAll('main section').forEach(s => s.hidden = s.id !== btn.dataset.tab);
});
async function loadPending() {
  const data = await api('GET', '/api/requests/pending');
  document.getElementById('pending-count').textContent = data.count;
  const root = document.getElementById('pending');
  if (data.requests.length === 0) {
    root.replaceChildren(
      text('p', 'No pending requests'),
      text('p', 'All caught up! New requests will appear here.', 'muted'));
    return;
  }
  root.replaceChildren(...data.requests.map(r => {
    const card = text('div', '', 'card');
    card.append(text('strong', r.question), text('p', new Date(r.created_at).toLocaleString(), 'muted'));
    if (r.caller_info && Object.keys(r.caller_info).length > 0) {
      card.append(text('pre', JSON.stringify(r.caller_info, null, 2), 'caller-info'));
    }
    const area = document.createElement('textarea');
    area.placeholder = 'Type your answer...';
    area.style.width = '100%';
    const btn = text('button', 'Submit Answer');
    btn.onclick = async () => {
      btn.disabled = true;
      try {
        const res = await api('POST', '/api/requests/' + r.id + '/answer', { answer: area.value });
        showNotice(res.notice);
      } finally { btn.disabled = false; }
    };
    card.append(area, btn);
    return card;
  }));
}
async function loadHistory() {
  const data = await api('GET', '/api/requests/history');
  document.getElementById('history-total').textContent =
    data.count + ' total, ' + data.resolved + ' resolved';
  const root = document.getElementById('rows');
  if (data.requests.length === 0) {
    root.replaceChildren(text('p', 'No request history yet', 'muted'));
    return;
  }
  root.replaceChildren(...data.requests.map(r => {
    const card = text('div', '', 'card');
    card.append(text('strong', r.question), text('span', r.status, 'badge ' + r.status));
    if (r.answer) card.append(text('p', r.answer));
    return card;
  }));
}
async function loadKnowledge() {
  const q = encodeURIComponent(document.getElementById('search').value);
  const data = await api('GET', '/api/knowledge?q=' + q);
  const root = document.getElementById('entries');
  if (data.entries.length === 0) {
    root.replaceChildren(text('p', data.empty.title), text('p', data.empty.hint, 'muted'));
    return;
  }
  root.replaceChildren(...data.entries.map(e => {
    const card = text('div', '', 'card');
    card.append(text('strong', e.question), text('p', e.answer));
    return card;
  }));
}
document.getElementById('search').oninput = loadKnowledge;
function follow(query, reload) {
  reload();
  const source = new EventSource('/api/events?' + query);
  source.onmessage = reload;
  source.addEventListener('resync', reload);
}
follow('table=help_requests&status=pending', loadPending);
follow('table=help_requests&event=update', loadHistory);
follow('table=knowledge_base', loadKnowledge);
</script>"#;

const NOT_FOUND_BODY: &str = r#"<div class="container" style="text-align:center">
  <h1 style="font-size:4rem">404</h1>
  <p class="muted">Page not found</p>
  <a href="/">Return Home</a>
</div>"#;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n{}\n{}\n</head>\n<body>\n{}\n</body>\n</html>\n",
        title, STYLE, NOTICE_SCRIPT, body
    ))
}

/// `GET /`
pub async fn simulator_page() -> Html<String> {
    page("AI Agent Call Simulator", SIMULATOR_BODY)
}

/// `GET /supervisor`
pub async fn supervisor_page() -> Html<String> {
    page("AI Agent Supervisor Dashboard", DASHBOARD_BODY)
}

/// Fallback for every unmatched path
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    warn!("404: no route for {}", uri.path());
    (StatusCode::NOT_FOUND, page("Page not found", NOT_FOUND_BODY))
}
