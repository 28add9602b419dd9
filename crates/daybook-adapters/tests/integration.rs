//! Integration tests for the daybook-adapters crate.
//!
//! Each adapter is pointed at a loopback fake of its REST API and driven
//! through the `Adapter` trait: connect, call tools, read resources.

mod common;

use std::path::Path;

use daybook_adapters::{
    Adapter, CalendarConfig, GmailAdapter, GmailConfig, GoogleCalendarAdapter, LeagueAdapter,
    LeagueConfig, OuraAdapter, OuraConfig,
};
use serde_json::{Value, json};

/// Write a Google token file that stays valid for the test run.
fn write_google_token(path: &Path, scope: &str) {
    let body = json!({
        "token": "ya29.valid",
        "refresh_token": "1//refresh",
        "client_id": "cid",
        "client_secret": "csecret",
        "scopes": [scope],
        "expiry": "2099-01-01T00:00:00Z"
    });
    std::fs::write(path, body.to_string()).unwrap();
}

fn request_line(request: &str) -> &str {
    request.lines().next().unwrap_or("")
}

fn text(value: Value) -> String {
    value.as_str().unwrap().to_string()
}

// ═══════════════════════════════════════════════════════════════════════
//  Google Calendar
// ═══════════════════════════════════════════════════════════════════════

async fn calendar_adapter(base: &str, dir: &Path) -> GoogleCalendarAdapter {
    let token_file = dir.join("token.json");
    write_google_token(&token_file, daybook_adapters::calendar::CALENDAR_SCOPE);
    let mut adapter = GoogleCalendarAdapter::new("cal", CalendarConfig {
        client_secrets: dir.join("credentials.json"),
        token_file,
        calendar_ids: vec!["primary".into(), "team@group.calendar.google.com".into()],
        api_base: base.to_string(),
    });
    adapter.connect().await.unwrap();
    adapter
}

#[tokio::test]
async fn get_my_day_concatenates_calendars_in_order() {
    let (base, seen) = common::spawn(|request| {
        let line = request_line(request);
        let body = if line.contains("/calendars/primary/events") {
            json!({"items": [
                {"start": {"dateTime": "2025-03-09T09:00:00-08:00"}, "summary": "Standup"},
                {"start": {"dateTime": "2025-03-09T13:00:00-08:00"}, "summary": "Dentist"}
            ]})
        } else {
            json!({"items": [
                {"start": {"date": "2025-03-09"}, "summary": "Trash day"}
            ]})
        };
        (200, body.to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = calendar_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool("get_my_day", json!({"day": "2025-03-09"}))
        .await
        .unwrap();
    assert_eq!(
        text(out),
        "2025-03-09T09:00:00-08:00 Standup\n2025-03-09T13:00:00-08:00 Dentist\n2025-03-09 Trash day\n"
    );

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    let first = request_line(&requests[0]);
    assert!(first.starts_with("GET /calendars/primary/events?"), "{first}");
    assert!(first.contains("timeMin=2025-03-09T00%3A00%3A00Z"), "{first}");
    assert!(first.contains("timeMax=2025-03-10T00%3A00%3A00Z"), "{first}");
    assert!(first.contains("singleEvents=true"), "{first}");
    assert!(first.contains("orderBy=startTime"), "{first}");
    assert!(
        request_line(&requests[1]).starts_with("GET /calendars/team@group.calendar.google.com/events?")
    );
    assert!(requests[0].contains("Bearer ya29.valid"));
}

#[tokio::test]
async fn get_my_day_reports_fetch_errors_as_text() {
    let (base, _seen) = common::spawn(|_| {
        (
            404,
            json!({"error": {"code": 404, "message": "Not Found"}}).to_string(),
        )
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = calendar_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool("get_my_day", json!({"day": "2025-03-09"}))
        .await
        .unwrap();
    assert_eq!(text(out), "Error fetching events: HTTP 404: Not Found");
}

#[tokio::test]
async fn get_my_day_with_no_events() {
    let (base, _seen) = common::spawn(|_| (200, json!({"items": []}).to_string())).await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = calendar_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool("get_my_day", json!({"day": "2025-03-09"}))
        .await
        .unwrap();
    assert_eq!(text(out), "No events found for today.");
}

#[tokio::test]
async fn calendar_resources() {
    let (base, seen) = common::spawn(|request| {
        let body = if request_line(request).contains("/users/me/calendarList") {
            json!({"items": [
                {"summary": "Me", "id": "me@example.com"},
                {"summary": "Family", "id": "fam@group.calendar.google.com"}
            ]})
        } else {
            json!({})
        };
        (200, body.to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = calendar_adapter(&base, dir.path()).await;

    let calendars = adapter.read_resource("calendar://calendars").await.unwrap();
    assert_eq!(
        text(calendars),
        "Me: me@example.com\nFamily: fam@group.calendar.google.com\n"
    );

    let upcoming = adapter.read_resource("calendar://events").await.unwrap();
    assert_eq!(text(upcoming), "No upcoming events found.");

    let requests = seen.lock().unwrap().clone();
    let line = request_line(&requests[1]);
    assert!(line.starts_with("GET /calendars/primary/events?"), "{line}");
    assert!(line.contains("maxResults=10"), "{line}");
}

// ═══════════════════════════════════════════════════════════════════════
//  Gmail
// ═══════════════════════════════════════════════════════════════════════

async fn gmail_adapter(base: &str, dir: &Path) -> GmailAdapter {
    let config = GmailConfig {
        client_secrets: dir.join("credentials.json"),
        token_dir: dir.to_path_buf(),
        accounts: vec!["home".into(), "work".into()],
        api_base: base.to_string(),
    };
    for account in &config.accounts {
        write_google_token(&config.token_path(account), daybook_adapters::gmail::GMAIL_SCOPE);
    }
    let mut adapter = GmailAdapter::new("gmail", config);
    adapter.connect().await.unwrap();
    adapter
}

fn metadata(id: &str, from: &str, subject: &str) -> Value {
    json!({
        "id": id,
        "snippet": format!("snippet of {id}"),
        "labelIds": ["INBOX", "UNREAD"],
        "payload": {"headers": [
            {"name": "From", "value": from},
            {"name": "To", "value": "me@example.com"},
            {"name": "Subject", "value": subject},
            {"name": "Date", "value": "Sun, 9 Mar 2025 08:00:00 -0800"}
        ]}
    })
}

#[tokio::test]
async fn list_messages_one_line_per_message_in_listing_order() {
    let (base, seen) = common::spawn(|request| {
        let line = request_line(request);
        let body = if line.contains("/messages/m1?") {
            metadata("m1", "Ada <ada@example.com>", "Lunch?")
        } else if line.contains("/messages/m2?") {
            metadata("m2", "Bob <bob@example.com>", "Invoice")
        } else {
            json!({"messages": [{"id": "m1", "threadId": "t1"}, {"id": "m2", "threadId": "t2"}]})
        };
        (200, body.to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = gmail_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool(
            "gmail_list_messages",
            json!({"account": "work", "query": "is:unread", "max_results": 500}),
        )
        .await
        .unwrap();
    assert_eq!(
        text(out),
        "m1 | Sun, 9 Mar 2025 08:00:00 -0800 | Ada <ada@example.com> | Lunch?\n\
         m2 | Sun, 9 Mar 2025 08:00:00 -0800 | Bob <bob@example.com> | Invoice"
    );

    let requests = seen.lock().unwrap().clone();
    let listing = requests
        .iter()
        .map(|r| request_line(r))
        .find(|l| l.starts_with("GET /users/me/messages?"))
        .unwrap();
    assert!(listing.contains("maxResults=100"), "{listing}");
    assert!(listing.contains("q=is%3Aunread"), "{listing}");
    assert!(
        requests
            .iter()
            .any(|r| request_line(r).contains("format=metadata&metadataHeaders=From"))
    );
}

#[tokio::test]
async fn list_messages_empty_mailbox() {
    let (base, _seen) = common::spawn(|_| (200, json!({"resultSizeEstimate": 0}).to_string())).await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = gmail_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool("gmail_list_messages", json!({"account": "home"}))
        .await
        .unwrap();
    assert_eq!(text(out), "No messages found.");
}

#[tokio::test]
async fn get_message_shows_headers_labels_and_snippet() {
    let (base, _seen) = common::spawn(|_| {
        (200, metadata("m1", "Ada <ada@example.com>", "Lunch?").to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = gmail_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool("gmail_get_message", json!({"account": "home", "id": "m1"}))
        .await
        .unwrap();
    assert_eq!(
        text(out),
        "From: Ada <ada@example.com>\nTo: me@example.com\nDate: Sun, 9 Mar 2025 08:00:00 -0800\n\
         Subject: Lunch?\nLabels: INBOX, UNREAD\n\nsnippet of m1"
    );
}

#[tokio::test]
async fn triage_tools_post_to_the_right_endpoints() {
    let (base, seen) = common::spawn(|_| (200, json!({"id": "m1"}).to_string())).await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = gmail_adapter(&base, dir.path()).await;
    let params = json!({"account": "work", "id": "m1"});

    let out = adapter.execute_tool("gmail_mark_read", params.clone()).await.unwrap();
    assert_eq!(text(out), "Message m1 marked as read.");
    let out = adapter.execute_tool("gmail_archive", params.clone()).await.unwrap();
    assert_eq!(text(out), "Message m1 archived.");
    let out = adapter.execute_tool("gmail_trash", params).await.unwrap();
    assert_eq!(text(out), "Message m1 moved to trash.");

    let requests = seen.lock().unwrap().clone();
    assert!(request_line(&requests[0]).starts_with("POST /users/me/messages/m1/modify"));
    assert!(requests[0].contains(r#"{"removeLabelIds":["UNREAD"]}"#));
    assert!(requests[1].contains(r#"{"removeLabelIds":["INBOX"]}"#));
    assert!(request_line(&requests[2]).starts_with("POST /users/me/messages/m1/trash"));
}

#[tokio::test]
async fn gmail_api_errors_are_tool_errors() {
    let (base, _seen) = common::spawn(|_| {
        (
            401,
            json!({"error": {"code": 401, "message": "Invalid Credentials"}}).to_string(),
        )
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = gmail_adapter(&base, dir.path()).await;

    let err = adapter
        .execute_tool("gmail_trash", json!({"account": "work", "id": "m1"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 401: Invalid Credentials"), "{err}");
}

// ═══════════════════════════════════════════════════════════════════════
//  League of Legends
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn league_summarizes_live_game() {
    let (base, _seen) = common::spawn(|_| {
        let body = json!({
            "activePlayer": {"riotId": "Me#NA1"},
            "allPlayers": [
                {
                    "riotId": "Me#NA1", "team": "ORDER", "position": "BOTTOM",
                    "championName": "Jinx", "level": 11,
                    "runes": {"keystone": {"displayName": "Lethal Tempo"}},
                    "scores": {"kills": 7, "deaths": 2}
                },
                {
                    "riotId": "Them#NA1", "team": "CHAOS", "position": "BOTTOM",
                    "championName": "Caitlyn", "level": 10,
                    "runes": {"keystone": {"displayName": "Fleet Footwork"}},
                    "scores": {"kills": 1, "deaths": 5}
                }
            ]
        });
        (200, body.to_string())
    })
    .await;

    let mut adapter = LeagueAdapter::new("lol", LeagueConfig {
        live_client_url: format!("{base}/liveclientdata/allgamedata"),
    });
    adapter.connect().await.unwrap();
    let out = adapter
        .execute_tool("get_current_game_state", json!({}))
        .await
        .unwrap();
    assert_eq!(
        text(out),
        "I am Me#NA1, playing as Jinx in the BOTTOM role with the keystone rune Lethal Tempo. \
         I am level 11 with 7 kills and 2 deaths. My role opponent is Caitlyn with key stone \
         rune Fleet Footwork at level 10 with 1 kills and 5 deaths."
    );
}

#[tokio::test]
async fn league_empty_body_means_no_data() {
    let (base, _seen) = common::spawn(|_| (200, String::new())).await;
    let mut adapter = LeagueAdapter::new("lol", LeagueConfig {
        live_client_url: format!("{base}/liveclientdata/allgamedata"),
    });
    adapter.connect().await.unwrap();
    let out = adapter
        .execute_tool("get_current_game_state", json!({}))
        .await
        .unwrap();
    assert_eq!(text(out), "No data found");
}

// ═══════════════════════════════════════════════════════════════════════
//  Oura
// ═══════════════════════════════════════════════════════════════════════

async fn oura_adapter(base: &str, dir: &Path) -> OuraAdapter {
    let token_file = dir.join("token.json");
    std::fs::write(
        &token_file,
        json!({"CLIENT_ID": "oura-id", "CLIENT_SECRET": "oura-secret", "ACCESS_TOKEN": "oura-at"})
            .to_string(),
    )
    .unwrap();
    let mut adapter = OuraAdapter::new("oura", OuraConfig {
        token_file,
        api_base: base.to_string(),
        token_url: format!("{base}/oauth/token"),
        redirect_uri: "http://localhost:8080".into(),
    });
    adapter.connect().await.unwrap();
    adapter
}

fn sleep_day(day: &str, score: u64) -> Value {
    json!({
        "day": day,
        "score": score,
        "contributors": {
            "deep_sleep": 90, "efficiency": 88, "latency": 70, "rem_sleep": 95,
            "restfulness": 60, "timing": 100, "total_sleep": 85
        }
    })
}

#[tokio::test]
async fn last_nights_sleep_formats_first_document() {
    let (base, seen) = common::spawn(|_| {
        (200, json!({"data": [sleep_day("2025-03-09", 81)], "next_token": null}).to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = oura_adapter(&base, dir.path()).await;

    let out = text(
        adapter
            .execute_tool("get_last_nights_sleep_document", json!({}))
            .await
            .unwrap(),
    );
    assert!(out.starts_with("Sleep scores for last night (from "), "{out}");
    assert!(
        out.ends_with(
            "). Overall Sleep Score: 81\nDeep Sleep: 90\nEfficiency: 88\nLatency: 70\n\
             REM Sleep: 95\nRestfulness: 60\nTiming: 100\nTotal Sleep: 85"
        ),
        "{out}"
    );

    let request = seen.lock().unwrap()[0].clone();
    assert!(request_line(&request).starts_with("GET /v2/usercollection/daily_sleep?start_date="));
    assert!(request.contains("Bearer oura-at"));
}

#[tokio::test]
async fn sleep_documents_follow_next_token() {
    let (base, seen) = common::spawn(|request| {
        let body = if request_line(request).contains("next_token=page2") {
            json!({"data": [sleep_day("2025-03-02", 75)], "next_token": null})
        } else {
            json!({"data": [sleep_day("2025-03-01", 80)], "next_token": "page2"})
        };
        (200, body.to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = oura_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool(
            "get_sleep_documents",
            json!({"start_date": "2025-03-01", "end_date": "2025-03-03"}),
        )
        .await
        .unwrap();
    let block = |day: &str, score: u64| {
        format!(
            "Date: {day}\n  Overall Sleep Score: {score}\n  Deep Sleep: 90\n  Efficiency: 88\n  \
             Latency: 70\n  REM Sleep: 95\n  Restfulness: 60\n  Timing: 100\n  Total Sleep: 85\n\n"
        )
    };
    assert_eq!(
        text(out),
        format!("{}{}", block("2025-03-01", 80), block("2025-03-02", 75))
    );
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn sleep_documents_without_data() {
    let (base, _seen) = common::spawn(|_| (200, json!({"data": []}).to_string())).await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = oura_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool(
            "get_sleep_documents",
            json!({"start_date": "2025-03-01", "end_date": "2025-03-03"}),
        )
        .await
        .unwrap();
    assert_eq!(text(out), "No data found");
}

#[tokio::test]
async fn oura_rejection_is_a_friendly_message() {
    let (base, _seen) = common::spawn(|_| (401, json!({"detail": "Unauthorized"}).to_string())).await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = oura_adapter(&base, dir.path()).await;

    let out = adapter
        .execute_tool("get_last_nights_sleep_document", json!({}))
        .await
        .unwrap();
    assert_eq!(
        text(out),
        "An error occurred while making the request: HTTP 401: Unauthorized"
    );
}

#[tokio::test]
async fn auth_resource_exchanges_code() {
    let (base, seen) = common::spawn(|_| {
        (
            200,
            json!({"access_token": "new-at", "refresh_token": "new-rt", "expires_in": 86400, "token_type": "bearer"})
                .to_string(),
        )
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = oura_adapter(&base, dir.path()).await;

    let tokens = adapter.read_resource("auth://the-code").await.unwrap();
    assert_eq!(tokens["access_token"], "new-at");
    assert_eq!(tokens["refresh_token"], "new-rt");

    let request = seen.lock().unwrap()[0].clone();
    assert!(request_line(&request).starts_with("POST /oauth/token"));
    assert!(request.contains("code=the-code"));
    assert!(request.contains("client_id=oura-id"));
    assert!(request.contains("client_secret=oura-secret"));
    assert!(request.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
}

#[tokio::test]
async fn auth_resource_reports_rejection_in_body() {
    let (base, _seen) = common::spawn(|_| {
        (
            400,
            json!({"error": "invalid_grant", "error_description": "Code expired"}).to_string(),
        )
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let adapter = oura_adapter(&base, dir.path()).await;

    let out = adapter.read_resource("auth://stale").await.unwrap();
    assert_eq!(out["error"], "HTTP error: 400");
    let detail: serde_json::Value =
        serde_json::from_str(out["detail"].as_str().unwrap()).unwrap();
    assert_eq!(
        detail,
        json!({"error": "invalid_grant", "error_description": "Code expired"})
    );
}
