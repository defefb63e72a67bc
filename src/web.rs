use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use colored::*;
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::chat::Conversation;
use crate::config::Settings;
use crate::diagram::{self, DiagramOutput};
use crate::error::AppError;
use crate::extract::ExtractionResult;
use crate::personas::{find_personality, PersonaSession, PERSONALITIES};
use crate::providers::{ChatMessage, ModelChoice};
use crate::translate::{self, preview, TranslationHistory, LANGUAGES, PREVIEW_CHARS};
use crate::CompletionClient;

const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Sessions kept in memory; the least recently used one is evicted beyond this.
pub const MAX_SESSIONS: usize = 256;

const SSE_HEADERS: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\nAccess-Control-Allow-Origin: *\r\n\r\n";

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Everything one browser tab accumulates while the process runs.
#[derive(Debug, Default)]
pub struct WebSession {
    pub chat: Conversation,
    pub persona: PersonaSession,
    pub translations: TranslationHistory,
    last_used: u64,
}

pub type SessionStore = Arc<Mutex<HashMap<String, WebSession>>>;

pub fn new_session_store() -> SessionStore {
    Arc::new(Mutex::new(HashMap::new()))
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: SessionStore,
    ticks: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions: new_session_store(),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, WebSession>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the session `id`, creating it on first use. Creating
    /// one past [`MAX_SESSIONS`] evicts the least recently used session.
    fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut WebSession) -> R) -> R {
        let mut guard = self.lock_sessions();
        if !guard.contains_key(id) && guard.len() >= MAX_SESSIONS {
            let oldest = guard.iter().min_by_key(|(_, s)| s.last_used).map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(session = %oldest, "evicting idle session");
                guard.remove(&oldest);
            }
        }
        let session = guard.entry(id.to_string()).or_default();
        session.last_used = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        f(session)
    }

    /// A client using the per-request key when given, else the configured one.
    fn client(&self, key: Option<&String>) -> Result<CompletionClient, AppError> {
        let settings = (*self.settings).clone().with_api_key(key.cloned());
        CompletionClient::new(&settings)
    }

    fn model(&self, params: &HashMap<String, String>) -> String {
        params
            .get("model")
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.default_model.clone())
    }
}

/// One server-sent event on `/stream`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent<'a> {
    Snapshot {
        text: &'a str,
    },
    Final {
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        diagram: Option<&'a ExtractionResult<String>>,
    },
    Error {
        message: String,
    },
}

/// Embedded single-page UI: Chat, Personality, Diagram and Translator tabs.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AI World</title>
<script src="https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"></script>
<style>
*{margin:0;padding:0;box-sizing:border-box}
body{background:#0d1117;color:#c9d1d9;font-family:system-ui,sans-serif;min-height:100vh;display:flex;flex-direction:column}
header{padding:14px 24px;border-bottom:1px solid #21262d;display:flex;align-items:center;gap:18px;flex-wrap:wrap}
header h1{font-size:1.15rem;color:#58a6ff}
nav button,.btn{border:none;padding:6px 14px;border-radius:6px;font-size:.85rem;cursor:pointer;color:#fff;background:#30363d}
nav button.active{background:#1f6feb}
.btn-go{background:#238636}.btn-go:hover{background:#2ea043}
.cfg{display:flex;gap:10px;margin-left:auto}
input,select,textarea{background:#0d1117;border:1px solid #30363d;color:#c9d1d9;padding:6px 10px;border-radius:6px;font:inherit}
textarea{width:100%;min-height:90px}
main{flex:1;padding:18px 24px}
.page{display:none;flex-direction:column;gap:12px}
.page.show{display:flex}
.msgs{display:flex;flex-direction:column;gap:8px}
.msg{padding:10px 14px;border-radius:8px;white-space:pre-wrap;line-height:1.55}
.msg.user{background:#161b22;align-self:flex-end;max-width:80%}
.msg.assistant{background:#0f2a1a;max-width:90%}
.row{display:flex;gap:8px;flex-wrap:wrap}
.persona.active{outline:2px solid #58a6ff}
.out{white-space:pre-wrap;line-height:1.55;background:#161b22;padding:12px;border-radius:8px;min-height:40px}
.info{color:#e3b341}.err{color:#f85149}
.muted{color:#8b949e;font-size:.85rem}
</style>
</head>
<body>
<header>
<h1>AI World</h1>
<nav>
<button data-page="chat" class="active">💬 Chat</button>
<button data-page="persona">🎭 Personality Bot</button>
<button data-page="diagram">📊 Diagrams</button>
<button data-page="translate">🌐 Translator</button>
</nav>
<div class="cfg">
<input id="key" type="password" placeholder="OpenRouter API key">
<select id="model"></select>
</div>
</header>
<main>
<section id="p-chat" class="page show">
<div class="msgs" id="chat-msgs"></div>
<div class="row"><input id="chat-in" style="flex:1" placeholder="Type your message here..."><button class="btn btn-go" id="chat-go">Send</button><button class="btn" data-clear="chat">Clear Chat</button></div>
</section>
<section id="p-persona" class="page">
<div class="row" id="personas"></div>
<div class="muted" id="persona-desc"></div>
<div class="msgs" id="persona-msgs"></div>
<div class="row" id="starters"></div>
<div class="row"><input id="persona-in" style="flex:1"><button class="btn btn-go" id="persona-go">Send</button><button class="btn" data-clear="persona">Clear Chat</button></div>
</section>
<section id="p-diagram" class="page">
<div class="muted">💡 Example Prompts</div>
<div class="row" id="diagram-examples"></div>
<textarea id="diagram-in" placeholder="e.g., Create a sequence diagram showing user authentication flow"></textarea>
<div class="row"><button class="btn btn-go" id="diagram-go">📊 Generate Diagram</button><button class="btn" id="diagram-toggle" disabled>👁️ Preview Diagram</button></div>
<div class="out" id="diagram-out"></div>
<div id="diagram-svg"></div>
</section>
<section id="p-translate" class="page">
<div class="muted">🚀 Quick Translate Examples</div>
<div class="row" id="tr-examples"></div>
<textarea id="tr-in" placeholder="Enter text in any language..."></textarea>
<div class="row"><select id="tr-target"></select><button class="btn btn-go" id="tr-go">🌐 Translate</button><button class="btn" data-clear="translate">Clear History</button></div>
<div class="out" id="tr-out">Translation will appear here</div>
<h3 class="muted">Translation History</h3>
<div class="out" id="tr-hist"></div>
</section>
</main>
<script>
const $=s=>document.querySelector(s);
const esc=s=>String(s).replace(/[&<>"]/g,c=>({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c]));
let SESSION='',PERSONA='business',META=null,DIAGRAM='',PREVIEW=false;
document.querySelectorAll('nav button').forEach(b=>b.onclick=()=>{
 document.querySelectorAll('nav button').forEach(x=>x.classList.toggle('active',x===b));
 document.querySelectorAll('.page').forEach(p=>p.classList.toggle('show',p.id==='p-'+b.dataset.page));
});
function bubble(box,role,text){const d=document.createElement('div');d.className='msg '+role;d.textContent=text;$(box).appendChild(d);return d;}
function stream(page,prompt,out,onFinal){
 const q=new URLSearchParams({page,prompt,session:SESSION,model:$('#model').value,key:$('#key').value,persona:PERSONA});
 const es=new EventSource('/stream?'+q);
 es.onmessage=e=>{
  if(e.data==='[DONE]'){es.close();return;}
  const ev=JSON.parse(e.data);
  if(ev.type==='snapshot')out.textContent=ev.text+'▌';
  else if(ev.type==='final'){out.textContent=ev.text;onFinal&&onFinal(ev);}
  else if(ev.type==='error'){out.innerHTML='<span class="err">Error: '+esc(ev.message)+'</span><br><span class="info">Please check your API key and try again.</span>';}
 };
 es.onerror=()=>es.close();
}
function send(page,input,box){
 const text=$(input).value.trim();if(!text)return;$(input).value='';
 bubble(box,'user',text);stream(page,text,bubble(box,'assistant',''));
}
$('#chat-go').onclick=()=>send('chat','#chat-in','#chat-msgs');
$('#persona-go').onclick=()=>send('persona','#persona-in','#persona-msgs');
$('#chat-in').onkeydown=e=>{if(e.key==='Enter')$('#chat-go').click();};
$('#persona-in').onkeydown=e=>{if(e.key==='Enter')$('#persona-go').click();};
function pickPersona(p){
 if(p.key!==PERSONA)$('#persona-msgs').innerHTML='';
 PERSONA=p.key;
 document.querySelectorAll('.persona').forEach(b=>b.classList.toggle('active',b.dataset.key===p.key));
 $('#persona-desc').textContent=p.icon+' '+p.name+' - '+p.description+' · '+p.example;
 $('#persona-in').placeholder='Chat with '+p.name+'...';
 $('#starters').innerHTML='';
 p.starters.forEach(s=>{const b=document.createElement('button');b.className='btn';b.textContent=s;b.onclick=()=>{$('#persona-in').value=s;$('#persona-go').click();};$('#starters').appendChild(b);});
}
$('#diagram-go').onclick=()=>{
 const prompt=$('#diagram-in').value.trim();
 if(!prompt){$('#diagram-out').innerHTML='<span class="info">Please enter a description for your diagram.</span>';return;}
 DIAGRAM='';PREVIEW=false;$('#diagram-svg').innerHTML='';$('#diagram-toggle').disabled=true;
 stream('diagram',prompt,$('#diagram-out'),ev=>{
  if(ev.diagram&&ev.diagram.status==='found'){DIAGRAM=ev.diagram.value;$('#diagram-toggle').disabled=false;}
  else{$('#diagram-out').insertAdjacentHTML('beforeend','<p class="info">No Mermaid diagram code found in the response.</p>');}
 });
};
$('#diagram-toggle').onclick=()=>{
 PREVIEW=!PREVIEW;
 $('#diagram-out').style.display=PREVIEW?'none':'block';
 $('#diagram-toggle').textContent=PREVIEW?'📝 Back to Code':'👁️ Preview Diagram';
 if(PREVIEW&&window.mermaid){mermaid.render('d'+Date.now(),DIAGRAM).then(r=>$('#diagram-svg').innerHTML=r.svg).catch(e=>$('#diagram-svg').innerHTML='<span class="err">'+esc(e.message||e)+'</span>');}
 else $('#diagram-svg').innerHTML='';
};
function renderHistory(h){
 $('#tr-hist').innerHTML=h.map(e=>'<b>'+esc(e.detected_lang)+':</b> '+esc(e.original)+'<br><b>'+esc(e.target_lang)+':</b> '+esc(e.translation)).join('<hr>');
}
$('#tr-go').onclick=async()=>{
 const text=$('#tr-in').value.trim();
 if(!text){$('#tr-out').innerHTML='<span class="info">Please enter text to translate.</span>';return;}
 $('#tr-out').textContent='Translating...';
 const q=new URLSearchParams({text,target:$('#tr-target').value,session:SESSION,model:$('#model').value,key:$('#key').value});
 const r=await (await fetch('/translate?'+q)).json();
 if(r.error){$('#tr-out').innerHTML='<span class="err">Error: '+esc(r.error)+'</span>';return;}
 const res=r.outcome.result;
 if(res.status==='found'){
  const t=res.value;let h='<b>🔍 Detected Language:</b> '+esc(t.detected_language||'Unknown')+' ('+esc(t.confidence_detection||'N/A')+' confidence)<hr>';
  if(t.is_same_language)h+='<p class="info">The input text is already in the target language.</p>'+esc(t.original_text||text);
  else h+='<h3>🎯 Translation</h3><p>'+esc(t.translated_text||'Translation not available')+'</p><p class="muted">Confidence: '+esc(t.confidence_translation||'N/A')+'</p>';
  const alts=t.alternatives.filter(a=>a&&a.trim());
  if(alts.length)h+='<p><b>🌟 Alternatives:</b></p>'+alts.map(a=>'• '+esc(a)).join('<br>');
  if(t.cultural_notes&&t.cultural_notes.trim())h+='<p><b>💡 Cultural Notes:</b></p><p class="info">'+esc(t.cultural_notes)+'</p>';
  $('#tr-out').innerHTML=h;
 }else{$('#tr-out').innerHTML='<h3>Translation Result</h3>'+esc(res.value||'');}
 renderHistory(r.history);
};
document.querySelectorAll('[data-clear]').forEach(b=>b.onclick=async()=>{
 const page=b.dataset.clear;
 await fetch('/clear?'+new URLSearchParams({page,session:SESSION}),{method:'POST'});
 if(page==='chat')$('#chat-msgs').innerHTML='';
 if(page==='persona')$('#persona-msgs').innerHTML='';
 if(page==='translate')$('#tr-hist').innerHTML='';
});
fetch('/meta').then(r=>r.json()).then(m=>{
 META=m;SESSION=m.session;
 m.models.forEach(x=>$('#model').insertAdjacentHTML('beforeend','<option value="'+esc(x.id)+'"'+(x.id===m.default_model?' selected':'')+'>'+esc(x.name)+'</option>'));
 const fill=(box,input,items)=>items.forEach(([label,text])=>{const b=document.createElement('button');b.className='btn';b.textContent=label;b.title=text;b.onclick=()=>{$(input).value=text;};$(box).appendChild(b);});
 fill('#diagram-examples','#diagram-in',m.diagram_examples);
 fill('#tr-examples','#tr-in',m.translate_examples.map(([text,label])=>[label,text]));
 m.languages.forEach(l=>$('#tr-target').insertAdjacentHTML('beforeend','<option>'+esc(l.name)+'</option>'));
 m.personas.forEach(p=>{const b=document.createElement('button');b.className='btn persona';b.dataset.key=p.key;b.style.background=p.color;b.textContent=p.icon+' '+p.name;b.title=p.description;b.onclick=()=>pickPersona(p);$('#personas').appendChild(b);});
 pickPersona(m.personas[0]);
 $('#chat-msgs').appendChild(Object.assign(document.createElement('div'),{className:'msg assistant',textContent:"Hello! I'm your AI assistant. How can I help you today?"}));
});
</script>
</body>
</html>"##;

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Percent-decoding for URL query parameters. Decodes to bytes first so
/// multi-byte UTF-8 sequences come out whole.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 3 <= bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse query string into key-value pairs.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((url_decode(key), url_decode(val)))
        })
        .collect()
}

pub fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn json_response(status: &str, body: &serde_json::Value) -> String {
    http_response(status, "application/json", &body.to_string())
}

async fn write_event(stream: &mut TcpStream, event: &StreamEvent<'_>) -> std::io::Result<()> {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    stream.write_all(format!("data: {}\n\n", json).as_bytes()).await
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Start the web UI server and open the browser.
pub async fn serve(port: u16, settings: Settings, open_browser: bool) -> crate::error::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    eprintln!(
        "{}",
        format!("  Web UI running at http://localhost:{}", port).bright_green()
    );
    eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());

    if open_browser {
        #[cfg(target_os = "windows")]
        {
            let _ = std::process::Command::new("cmd")
                .args(["/C", &format!("start http://localhost:{}", port)])
                .spawn();
        }
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("open")
                .arg(format!("http://localhost:{}", port))
                .spawn();
        }
        #[cfg(target_os = "linux")]
        {
            let _ = std::process::Command::new("xdg-open")
                .arg(format!("http://localhost:{}", port))
                .spawn();
        }
    }

    serve_listener(listener, AppState::new(settings)).await?;
    Ok(())
}

/// Accept loop; one task per connection.
pub async fn serve_listener(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::warn!(%addr, error = %e, "connection error");
            }
        });
    }
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_BYTES {
            break;
        }
    }
    Ok(buf)
}

async fn handle_connection(
    mut stream: TcpStream,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let raw = read_request_head(&mut stream).await?;

    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    let parsed = req.parse(&raw);
    let (method, path_and_query) = match (parsed, req.method, req.path) {
        (Ok(_), Some(m), Some(p)) => (m.to_string(), p.to_string()),
        _ => {
            let response = http_response("400 Bad Request", "text/plain", "Bad Request");
            stream.write_all(response.as_bytes()).await?;
            return Ok(());
        }
    };

    let (path, query_str) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, q),
        None => (path_and_query.as_str(), ""),
    };
    let params = parse_query(query_str);
    tracing::debug!(%method, path, "request");

    match (method.as_str(), path) {
        ("GET", "/") => {
            let response = http_response("200 OK", "text/html; charset=utf-8", INDEX_HTML);
            stream.write_all(response.as_bytes()).await?;
        }
        ("GET", "/meta") => {
            let response = json_response("200 OK", &meta_json(&state));
            stream.write_all(response.as_bytes()).await?;
        }
        ("GET", "/stream") => handle_stream(&mut stream, &state, &params).await?,
        ("GET", "/translate") => {
            let (status, body) = handle_translate(&state, &params).await;
            stream.write_all(json_response(status, &body).as_bytes()).await?;
        }
        ("POST", "/clear") => {
            let (status, body) = handle_clear(&state, &params);
            stream.write_all(json_response(status, &body).as_bytes()).await?;
        }
        _ => {
            let response = http_response("404 Not Found", "text/plain", "Not Found");
            stream.write_all(response.as_bytes()).await?;
        }
    }

    Ok(())
}

fn meta_json(state: &AppState) -> serde_json::Value {
    let models: Vec<_> = ModelChoice::ALL
        .iter()
        .map(|m| json!({ "name": m.display_name(), "id": m.model_id() }))
        .collect();
    let personas: Vec<_> = PERSONALITIES
        .iter()
        .map(|p| {
            json!({
                "key": p.key,
                "name": p.name,
                "icon": p.icon,
                "description": p.description,
                "example": p.example,
                "color": p.color,
                "starters": p.starters,
            })
        })
        .collect();
    json!({
        "session": uuid::Uuid::new_v4().to_string(),
        "default_model": state.settings.default_model,
        "models": models,
        "personas": personas,
        "languages": LANGUAGES,
        "diagram_examples": diagram::EXAMPLE_PROMPTS,
        "translate_examples": translate::QUICK_EXAMPLES,
    })
}

// ---------------------------------------------------------------------------
// /stream: chat, persona and diagram pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum StreamPage {
    Chat,
    Persona,
    Diagram,
}

impl StreamPage {
    fn parse(s: Option<&String>) -> Self {
        match s.map(String::as_str) {
            Some("persona") => StreamPage::Persona,
            Some("diagram") => StreamPage::Diagram,
            _ => StreamPage::Chat,
        }
    }
}

/// Build the outgoing messages, recording the user turn for chat pages.
fn stream_messages(
    state: &AppState,
    page: StreamPage,
    session: &str,
    prompt: &str,
    params: &HashMap<String, String>,
) -> Result<Vec<ChatMessage>, AppError> {
    if page == StreamPage::Diagram {
        return diagram::diagram_messages(prompt);
    }
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::InvalidInput("Please enter a message.".to_string()));
    }
    Ok(state.with_session(session, |s| {
        let conversation = match page {
            StreamPage::Persona => {
                if let Some(p) = params.get("persona").and_then(|k| find_personality(k)) {
                    s.persona.select(p);
                }
                s.persona.conversation_mut()
            }
            _ => &mut s.chat,
        };
        conversation.push_user(prompt);
        conversation.request_messages()
    }))
}

async fn handle_stream(
    stream: &mut TcpStream,
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    stream.write_all(SSE_HEADERS.as_bytes()).await?;

    let page = StreamPage::parse(params.get("page"));
    let session = params.get("session").cloned().unwrap_or_default();
    let prompt = params.get("prompt").cloned().unwrap_or_default();
    let model = state.model(params);

    let prepared = state
        .client(params.get("key"))
        .and_then(|client| Ok((client, stream_messages(state, page, &session, &prompt, params)?)));
    let (client, messages) = match prepared {
        Ok(v) => v,
        Err(e) => {
            write_event(stream, &StreamEvent::Error { message: e.to_string() }).await?;
            stream.write_all(b"data: [DONE]\n\n").await?;
            return Ok(());
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let task_model = model.clone();
    let task = tokio::spawn(async move {
        client
            .stream_chat(&task_model, &messages, |snapshot| {
                let _ = tx.send(snapshot.to_string());
            })
            .await
    });

    while let Some(snapshot) = rx.recv().await {
        if write_event(stream, &StreamEvent::Snapshot { text: &snapshot }).await.is_err() {
            // Browser went away; stop paying for tokens nobody will see.
            task.abort();
            return Ok(());
        }
    }

    let event_result = match task.await {
        Ok(Ok(text)) => match page {
            StreamPage::Diagram => {
                let output = DiagramOutput::from_response(text);
                write_event(
                    stream,
                    &StreamEvent::Final { text: &output.response, diagram: Some(&output.diagram) },
                )
                .await
            }
            StreamPage::Chat | StreamPage::Persona => {
                state.with_session(&session, |s| {
                    let conversation = if page == StreamPage::Persona {
                        s.persona.conversation_mut()
                    } else {
                        &mut s.chat
                    };
                    conversation.push_assistant(text.clone());
                });
                write_event(stream, &StreamEvent::Final { text: &text, diagram: None }).await
            }
        },
        Ok(Err(e)) => write_event(stream, &StreamEvent::Error { message: e.to_string() }).await,
        Err(e) => write_event(stream, &StreamEvent::Error { message: e.to_string() }).await,
    };
    event_result?;
    stream.write_all(b"data: [DONE]\n\n").await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// /translate and /clear
// ---------------------------------------------------------------------------

async fn handle_translate(state: &AppState, params: &HashMap<String, String>) -> (&'static str, serde_json::Value) {
    let text = params.get("text").cloned().unwrap_or_default();
    let session = params.get("session").cloned().unwrap_or_default();
    let target_name = params.get("target").map(String::as_str).unwrap_or("English");

    let Some(target) = translate::find_language(target_name) else {
        return ("400 Bad Request", json!({ "error": format!("Unsupported target language: {target_name}") }));
    };
    if let Err(e) = translate::translation_messages(&text, target) {
        return ("400 Bad Request", json!({ "error": e.to_string() }));
    }
    let client = match state.client(params.get("key")) {
        Ok(c) => c,
        Err(e) => return ("400 Bad Request", json!({ "error": e.to_string() })),
    };

    let model = state.model(params);
    match translate::translate(&client, &model, &text, target).await {
        Ok(outcome) => {
            let history = state.with_session(&session, |s| {
                if let Some(entry) = outcome.history_entry() {
                    s.translations.record(entry);
                }
                history_json(&s.translations)
            });
            ("200 OK", json!({ "outcome": outcome, "history": history }))
        }
        Err(e) => ("502 Bad Gateway", json!({ "error": e.to_string() })),
    }
}

/// History rows for display, long texts already cut to a preview.
fn history_json(history: &TranslationHistory) -> Vec<serde_json::Value> {
    history
        .entries()
        .iter()
        .map(|e| {
            json!({
                "detected_lang": e.detected_lang,
                "target_lang": e.target_lang,
                "original": preview(&e.original, PREVIEW_CHARS),
                "translation": preview(&e.translation, PREVIEW_CHARS),
            })
        })
        .collect()
}

fn handle_clear(state: &AppState, params: &HashMap<String, String>) -> (&'static str, serde_json::Value) {
    let session = params.get("session").cloned().unwrap_or_default();
    let page = params.get("page").map(String::as_str).unwrap_or("");
    if !matches!(page, "chat" | "persona" | "translate") {
        return ("400 Bad Request", json!({ "error": format!("unknown page: {page}") }));
    }
    // Nothing to clear for a session that was never written to.
    if let Some(s) = state.lock_sessions().get_mut(&session) {
        match page {
            "chat" => s.chat.clear(),
            "persona" => s.persona.conversation_mut().clear(),
            _ => s.translations.clear(),
        }
    }
    ("200 OK", json!({ "cleared": page }))
}
