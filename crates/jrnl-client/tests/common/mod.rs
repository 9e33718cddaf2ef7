//! In-memory server and canned transports for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, OnceLock};

use jrnl_client::wire::{EntryJson, JournalJson, MemberJson, UserInfoJson};
use http::header::AUTHORIZATION;
use jrnl_client::{
    ApiClient, HttpRequest, HttpResponse, Method, StatusCode, Transport, TransportError,
};
use jrnl_crypto::AsymmetricKeyPair;
use secrecy::SecretString;
use serde_json::json;
use url::Url;

/// scrypt("correct-password", salt = "alice@example.com"), base64
pub const ALICE_ROOT: &str = "WhVBafEpPH7APqp12k5VzkyF1MmTrNcTB7BApANE4b6t3QsbEYLWWYGHp8foq7ylOCs+1AA7O/ZxPRl+5fsBYTzboQNFfif30th9k8wx+uV9kHtyEJD1pxyr/NT90Y0AzoiEpQeJur8CoYOUpwu+5eWoFVUO8CN5+gGCAdTERRkSdJ4LwDGWAh2C2qtrRh+1tfUWNimYatKxZz5Ft4sRwwwf9wBlSywhe80AbCXDYNPbs8dvisRc4Tg1GYToxA==";
pub const ALICE: &str = "alice@example.com";
pub const ALICE_PASSWORD: &str = "correct-password";

/// Root key for the second account; its value only has to differ from Alice's.
pub fn bob_root() -> String {
    "B".repeat(253) + "A=="
}
pub const BOB: &str = "bob@example.com";
pub const BOB_PASSWORD: &str = "bobs-password";

pub fn alice_key_pair() -> &'static AsymmetricKeyPair {
    static PAIR: OnceLock<AsymmetricKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| AsymmetricKeyPair::generate_with_size(2048).unwrap())
}

pub fn bob_key_pair() -> &'static AsymmetricKeyPair {
    static PAIR: OnceLock<AsymmetricKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| AsymmetricKeyPair::generate_with_size(2048).unwrap())
}

pub fn base_url() -> Url {
    Url::parse("https://journal.test/").unwrap()
}

pub fn client_for(transport: Arc<dyn Transport>, token: Option<&str>) -> ApiClient {
    let client = ApiClient::new(&base_url(), transport);
    match token {
        Some(token) => client.with_token(SecretString::from(token)),
        None => client,
    }
}

#[derive(Default)]
struct State {
    passwords: HashMap<String, String>,
    /// token -> username
    tokens: HashMap<String, String>,
    journals: BTreeMap<String, JournalJson>,
    entries: HashMap<String, Vec<EntryJson>>,
    members: HashMap<String, Vec<MemberJson>>,
    users: HashMap<String, UserInfoJson>,
}

/// Just enough of the journal server to exercise the client end to end.
#[derive(Default)]
pub struct FakeServer {
    state: Mutex<State>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        let server = Self::default();
        {
            let mut state = server.state.lock().unwrap();
            state.passwords.insert(ALICE.into(), ALICE_PASSWORD.into());
            state.passwords.insert(BOB.into(), BOB_PASSWORD.into());
        }
        Arc::new(server)
    }

    /// Issue a token without going through the login endpoint.
    pub fn token_for(&self, user: &str) -> String {
        let token = format!("token-{user}");
        self.state
            .lock()
            .unwrap()
            .tokens
            .insert(token.clone(), user.to_string());
        token
    }

    /// Let a test play a malicious server.
    pub fn tamper_entries(&self, journal_uid: &str, f: impl FnOnce(&mut Vec<EntryJson>)) {
        let mut state = self.state.lock().unwrap();
        f(state.entries.entry(journal_uid.to_string()).or_default());
    }

    pub fn tamper_journal(&self, journal_uid: &str, f: impl FnOnce(&mut JournalJson)) {
        let mut state = self.state.lock().unwrap();
        if let Some(journal) = state.journals.get_mut(journal_uid) {
            f(journal);
        }
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn route(&self, req: &HttpRequest) -> HttpResponse {
        let segments: Vec<String> = req
            .url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let mut state = self.state.lock().unwrap();

        if let (&Method::POST, ["api-token-auth"]) = (&req.method, segments.as_slice()) {
            return login(&mut state, req);
        }

        let user = match authenticated_user(&state, req) {
            Some(user) => user,
            None => return error(StatusCode::UNAUTHORIZED, "Invalid token.", "not_authenticated"),
        };

        match (&req.method, segments.as_slice()) {
            (&Method::POST, ["api", "logout"]) => {
                state.tokens.retain(|_, u| *u != user);
                HttpResponse::new(StatusCode::NO_CONTENT)
            }
            (&Method::GET, ["api", "v1", "journals"]) => list_journals(&state, &user),
            (&Method::POST, ["api", "v1", "journals"]) => {
                let mut journal: JournalJson = parse(req);
                if state.journals.contains_key(&journal.uid) {
                    return error(StatusCode::CONFLICT, "journal already exists", "conflict");
                }
                journal.owner = Some(user);
                journal.key = None;
                state.journals.insert(journal.uid.clone(), journal);
                HttpResponse::new(StatusCode::CREATED)
            }
            (&Method::PUT, ["api", "v1", "journals", uid]) => {
                let update: JournalJson = parse(req);
                match state.journals.get_mut(*uid) {
                    Some(journal) if journal.owner.as_deref() == Some(user.as_str()) => {
                        journal.content = update.content;
                        HttpResponse::new(StatusCode::OK)
                    }
                    Some(_) => error(StatusCode::FORBIDDEN, "not the owner", "permission_denied"),
                    None => not_found(),
                }
            }
            (&Method::DELETE, ["api", "v1", "journals", uid]) => {
                if state.journals.remove(*uid).is_none() {
                    return not_found();
                }
                state.entries.remove(*uid);
                state.members.remove(*uid);
                HttpResponse::new(StatusCode::NO_CONTENT)
            }
            (&Method::GET, ["api", "v1", "journals", uid, "entries"]) => {
                if !state.journals.contains_key(*uid) {
                    return not_found();
                }
                let entries = state.entries.get(*uid).cloned().unwrap_or_default();
                let mut start = 0;
                if let Some(last) = query(req, "last") {
                    match entries.iter().position(|e| e.uid == last) {
                        Some(pos) => start = pos + 1,
                        None => return error(StatusCode::BAD_REQUEST, "unknown last uid", "bad_request"),
                    }
                }
                let limit = query(req, "limit")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(usize::MAX);
                let page: Vec<&EntryJson> = entries.iter().skip(start).take(limit).collect();
                HttpResponse::json(StatusCode::OK, &serde_json::to_value(page).unwrap())
            }
            (&Method::POST, ["api", "v1", "journals", uid, "entries"]) => {
                if !state.journals.contains_key(*uid) {
                    return not_found();
                }
                let new: Vec<EntryJson> = parse(req);
                let entries = state.entries.entry(uid.to_string()).or_default();
                let head = entries.last().map(|e| e.uid.clone());
                if query(req, "last") != head {
                    return error(StatusCode::CONFLICT, "last uid is not the current head", "conflict");
                }
                entries.extend(new);
                HttpResponse::new(StatusCode::CREATED)
            }
            (&Method::GET, ["api", "v1", "journals", uid, "members"]) => {
                let members = state.members.get(*uid).cloned().unwrap_or_default();
                HttpResponse::json(StatusCode::OK, &serde_json::to_value(members).unwrap())
            }
            (&Method::POST, ["api", "v1", "journals", uid, "members"]) => {
                if !state.journals.contains_key(*uid) {
                    return not_found();
                }
                let member: MemberJson = parse(req);
                if !state.users.contains_key(&member.user) {
                    return error(StatusCode::FORBIDDEN, "user has no key", "associate_not_allowed");
                }
                state.members.entry(uid.to_string()).or_default().push(member);
                HttpResponse::new(StatusCode::CREATED)
            }
            (&Method::DELETE, ["api", "v1", "journals", uid, "members", member]) => {
                let members = state.members.entry(uid.to_string()).or_default();
                let before = members.len();
                members.retain(|m| m.user != *member);
                if members.len() == before {
                    return not_found();
                }
                HttpResponse::new(StatusCode::NO_CONTENT)
            }
            (&Method::POST, ["api", "v1", "user"]) => {
                let info: UserInfoJson = parse(req);
                if info.owner != user {
                    return error(StatusCode::FORBIDDEN, "not your user info", "permission_denied");
                }
                state.users.insert(info.owner.clone(), info);
                HttpResponse::new(StatusCode::CREATED)
            }
            (&Method::GET, ["api", "v1", "user", owner]) => match state.users.get(*owner) {
                Some(info) => {
                    let mut info = info.clone();
                    // other accounts only see the public part
                    if info.owner != user {
                        info.content = None;
                    }
                    HttpResponse::json(StatusCode::OK, &serde_json::to_value(info).unwrap())
                }
                None => not_found(),
            },
            (&Method::PUT, ["api", "v1", "user", owner]) if *owner == user => {
                let info: UserInfoJson = parse(req);
                state.users.insert(owner.to_string(), info);
                HttpResponse::new(StatusCode::OK)
            }
            (&Method::DELETE, ["api", "v1", "user", owner]) if *owner == user => {
                match state.users.remove(*owner) {
                    Some(_) => HttpResponse::new(StatusCode::NO_CONTENT),
                    None => not_found(),
                }
            }
            _ => not_found(),
        }
    }
}

impl Transport for FakeServer {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.route(request))
    }
}

fn login(state: &mut State, req: &HttpRequest) -> HttpResponse {
    let body = req.body.clone().unwrap_or_default();
    let form: HashMap<String, String> = url::form_urlencoded::parse(&body).into_owned().collect();
    let (Some(username), Some(password)) = (form.get("username"), form.get("password")) else {
        return error(StatusCode::BAD_REQUEST, "missing credentials", "invalid");
    };
    if state.passwords.get(username) != Some(password) {
        return error(StatusCode::BAD_REQUEST, "Unable to log in with provided credentials.", "invalid");
    }
    let token = format!("token-{username}");
    state.tokens.insert(token.clone(), username.clone());
    HttpResponse::json(StatusCode::OK, &json!({ "token": token }))
}

fn authenticated_user(state: &State, req: &HttpRequest) -> Option<String> {
    let token = req.header_value(AUTHORIZATION)?.strip_prefix("Token ")?;
    state.tokens.get(token).cloned()
}

fn list_journals(state: &State, user: &str) -> HttpResponse {
    let mut visible = Vec::new();
    for journal in state.journals.values() {
        if journal.owner.as_deref() == Some(user) {
            visible.push(journal.clone());
        } else if let Some(member) = state
            .members
            .get(&journal.uid)
            .and_then(|members| members.iter().find(|m| m.user == user))
        {
            let mut shared = journal.clone();
            shared.key = Some(member.key.clone());
            shared.read_only = member.read_only;
            visible.push(shared);
        }
    }
    HttpResponse::json(StatusCode::OK, &serde_json::to_value(visible).unwrap())
}

fn parse<T: serde::de::DeserializeOwned>(req: &HttpRequest) -> T {
    serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap()
}

fn query(req: &HttpRequest, name: &str) -> Option<String> {
    req.url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn error(status: StatusCode, detail: &str, code: &str) -> HttpResponse {
    HttpResponse::json(status, &json!({ "detail": detail, "code": code }))
}

fn not_found() -> HttpResponse {
    error(StatusCode::NOT_FOUND, "Not found.", "not_found")
}

/// Answers every request with the same response (or transport failure).
pub struct Canned {
    response: Result<HttpResponse, String>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl Canned {
    pub fn respond(response: HttpResponse) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn fail(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl Transport for Canned {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone().map_err(TransportError)
    }
}
