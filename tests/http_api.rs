use std::{
    io::{BufReader, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::Arc,
    thread,
};

use serde_json::{Value, json};

use get5_bracket::{api::Api, http};

fn server() -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?;
    let api = Arc::new(Api::default());

    thread::spawn(move || http::serve(&listener, &api));

    Ok(address)
}

fn call(
    address: SocketAddr,
    method: &str,
    path: &str,
    body: &Value,
) -> anyhow::Result<(u16, Value)> {
    let mut stream = TcpStream::connect(address)?;
    let body = if body.is_null() {
        String::new()
    } else {
        body.to_string()
    };

    write!(
        stream,
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;

    let mut response = String::new();
    BufReader::new(stream).read_to_string(&mut response)?;

    let (head, body) = response
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow::Error::msg("no header end"))?;
    let status = head
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow::Error::msg("no status"))?
        .parse()?;

    Ok((status, serde_json::from_str(body)?))
}

fn veto(
    address: SocketAddr,
    slug: &str,
    team: &str,
    map: Option<&str>,
    side: Option<&str>,
) -> anyhow::Result<(u16, Value)> {
    call(
        address,
        "POST",
        &format!("/api/veto/{slug}/action"),
        &json!({ "teamSlug": team, "mapName": map, "side": side }),
    )
}

#[test]
fn cs_major_bo1_over_http() -> anyhow::Result<()> {
    let address = server()?;

    let (status, body) = call(
        address,
        "PUT",
        "/api/settings",
        &json!({ "webhookUrl": "https://example.org/get5" }),
    )?;
    assert_eq!(status, 200);
    assert_eq!(body["webhookUrl"], "https://example.org/get5");

    for (slug, name, steam_id, player) in [
        ("navi", "Natus Vincere", "76561197991272318", "s1mple"),
        ("vitality", "Team Vitality", "76561198034202275", "ZywOo"),
    ] {
        let (status, body) = call(
            address,
            "POST",
            "/api/team",
            &json!({
                "slug": slug,
                "name": name,
                "players": [{ "steamId": steam_id, "name": player }],
            }),
        )?;
        assert_eq!(status, 201);
        assert_eq!(body["team"]["slug"], slug);
    }

    let (status, body) = call(
        address,
        "POST",
        "/api/tournament",
        &json!({
            "name": "Major",
            "type": "single_elimination",
            "format": "bo1-cs-major",
            "maps": ["mirage", "inferno", "nuke", "ancient", "anubis", "dust2", "vertigo"],
            "teamIds": ["navi", "vitality"],
        }),
    )?;
    assert_eq!(status, 201);
    assert_eq!(body["tournament"]["slug"], "major");

    let (status, body) = call(address, "POST", "/api/tournament/start", &Value::Null)?;
    assert_eq!(status, 200);
    assert_eq!(body["tournament"]["started"], true);

    let (status, body) = call(address, "GET", "/api/veto/major-r1-m1", &Value::Null)?;
    assert_eq!(status, 200);
    assert_eq!(body["veto"]["status"], "in_progress");
    assert_eq!(body["veto"]["nextStep"]["teamSlug"], "navi");

    let (status, body) = veto(address, "major-r1-m1", "vitality", Some("mirage"), None)?;
    assert_eq!((status, body["kind"].as_str()), (409, Some("NotYourTurn")));

    for (team, map) in [
        ("navi", "mirage"),
        ("navi", "inferno"),
        ("vitality", "ancient"),
        ("vitality", "anubis"),
        ("vitality", "dust2"),
        ("navi", "vertigo"),
    ] {
        let (status, _) = veto(address, "major-r1-m1", team, Some(map), None)?;
        assert_eq!(status, 200);
    }

    let (status, body) = veto(address, "major-r1-m1", "vitality", None, Some("CT"))?;
    assert_eq!(status, 200);
    assert_eq!(body["veto"]["status"], "completed");
    assert_eq!(body["veto"]["pickedMaps"][0]["mapName"], "nuke");
    assert_eq!(body["veto"]["pickedMaps"][0]["sideTeam2"], "CT");
    assert_eq!(body["veto"]["pickedMaps"][0]["sideTeam1"], "T");

    let (status, body) = veto(address, "major-r1-m1", "navi", Some("nuke"), None)?;
    assert_eq!((status, body["kind"].as_str()), (409, Some("VetoAlreadyCompleted")));

    let (status, config) = call(address, "GET", "/api/matches/major-r1-m1.json", &Value::Null)?;
    assert_eq!(status, 200);
    assert_eq!(config["matchid"], "major-r1-m1");
    assert_eq!(config["num_maps"], 1);
    assert_eq!(config["maplist"], json!(["nuke"]));
    assert_eq!(config["map_sides"], json!(["team2_ct"]));
    assert_eq!(config["team1"]["name"], "Natus Vincere");
    assert_eq!(config["team2"]["players"]["76561198034202275"], "ZywOo");

    let (status, body) = call(address, "POST", "/api/matches/major-r1-m1/live", &Value::Null)?;
    assert_eq!(status, 200);
    assert_eq!(body["match"]["status"], "live");

    let (status, body) = call(
        address,
        "POST",
        "/api/matches/major-r1-m1/result",
        &json!({ "winner": "vitality" }),
    )?;
    assert_eq!(status, 200);
    assert_eq!(body["match"]["winner"], "vitality");

    let (status, body) = call(address, "GET", "/api/tournament", &Value::Null)?;
    assert_eq!(status, 200);
    assert_eq!(body["tournament"]["champion"], "vitality");

    Ok(())
}

#[test]
fn malformed_requests_get_a_400() -> anyhow::Result<()> {
    let address = server()?;

    let mut stream = TcpStream::connect(address)?;
    stream.write_all(b"NONSENSE\r\n\r\n")?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.contains("\"kind\":\"BadRequest\""));

    Ok(())
}

#[test]
fn one_connection_many_requests() -> anyhow::Result<()> {
    let address = server()?;
    let mut stream = TcpStream::connect(address)?;

    stream.write_all(
        b"GET /api/teams HTTP/1.1\r\n\r\nGET /api/settings HTTP/1.1\r\nConnection: close\r\n\r\n",
    )?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;

    assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 2);
    assert!(response.contains("{\"teams\":[]}"));
    assert!(response.contains("{\"webhookUrl\":null}"));

    Ok(())
}
