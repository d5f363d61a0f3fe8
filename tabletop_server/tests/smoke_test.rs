// Smoke tests for the server over real TCP, using raw protocol messages.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use serde_json::json;
use tabletop_model::{Role, Token};
use tabletop_protocol::{
    AllowList, Arg, ClientMessage, Command, CommandKind, PROTOCOL_VERSION, ServerMessage,
    decode_call, encode_args, read_json, write_json,
};
use tabletop_server::{ServerConfig, ServerHandle, start_server};

fn start() -> (ServerHandle, SocketAddr) {
    start_server(ServerConfig {
        port: 0,
        gm_password: Some("dragon".into()),
        pump_interval_ms: 5,
        ..ServerConfig::default()
    })
    .unwrap()
}

struct RawClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl RawClient {
    fn connect(addr: SocketAddr, name: &str, role: Role, password: Option<&str>) -> (Self, ServerMessage) {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut client = Self {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: BufWriter::new(stream),
        };
        client.send(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: name.into(),
            role,
            password: password.map(Into::into),
        });
        let reply = client.recv();
        (client, reply)
    }

    fn send(&mut self, msg: &ClientMessage) {
        write_json(&mut self.writer, msg).unwrap();
    }

    fn recv(&mut self) -> ServerMessage {
        read_json(&mut self.reader).unwrap()
    }

    fn recv_call(&mut self) -> Command {
        match self.recv() {
            ServerMessage::Call { kind, sender, args } => {
                decode_call(sender, &kind, &args, &AllowList::standard()).unwrap()
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    /// Read calls until one of `kind` arrives.
    fn wait_for(&mut self, kind: CommandKind) -> Command {
        loop {
            let call = self.recv_call();
            if call.kind() == kind {
                return call;
            }
        }
    }
}

#[test]
fn wrong_gm_password_is_rejected() {
    let (handle, addr) = start();
    let (_client, reply) = RawClient::connect(addr, "Ann", Role::Gm, Some("kobold"));
    assert_eq!(
        reply,
        ServerMessage::Rejected {
            reason: "incorrect password".into()
        }
    );
    handle.stop();
}

#[test]
fn silent_connection_does_not_stall_others() {
    let (handle, addr) = start();
    let _silent = TcpStream::connect(addr).unwrap();
    // Let the listener pick the silent connection up first.
    std::thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    let (mut ann, reply) = RawClient::connect(addr, "Ann", Role::Gm, Some("dragon"));
    assert!(matches!(reply, ServerMessage::Welcome { .. }));
    assert_eq!(ann.recv_call().kind(), CommandKind::SetCampaign);
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    handle.stop();
}

#[test]
fn handshake_then_campaign_and_roster() {
    let (handle, addr) = start();
    let (mut ann, reply) = RawClient::connect(addr, "Ann", Role::Gm, Some("dragon"));
    assert!(matches!(reply, ServerMessage::Welcome { .. }));
    assert_eq!(ann.recv_call().kind(), CommandKind::SetCampaign);
    assert_eq!(ann.recv_call().kind(), CommandKind::PlayerConnected);
    handle.stop();
}

#[test]
fn denied_type_drops_message_but_keeps_connection() {
    let (handle, addr) = start();
    let (mut ann, _) = RawClient::connect(addr, "Ann", Role::Gm, Some("dragon"));
    let (mut bo, _) = RawClient::connect(addr, "Bo", Role::Player, None);
    ann.wait_for(CommandKind::PlayerConnected);
    ann.wait_for(CommandKind::PlayerConnected);

    bo.send(&ClientMessage::Call {
        kind: "setCampaignName".into(),
        args: vec![json!({"type": "os.ProcessBuilder", "value": "calc"})],
    });
    bo.send(&ClientMessage::Call {
        kind: "fooBar".into(),
        args: vec![],
    });
    let rename = Command::new(CommandKind::SetCampaignName, vec![Arg::str("Saltmarsh")]).unwrap();
    bo.send(&ClientMessage::call(&rename).unwrap());

    let got = ann.wait_for(CommandKind::SetCampaignName);
    assert_eq!(got.get::<&str>(0).unwrap(), "Saltmarsh");
    handle.stop();
}

#[test]
fn new_token_z_order_round_trip() {
    let (handle, addr) = start();
    let (mut ann, _) = RawClient::connect(addr, "Ann", Role::Gm, Some("dragon"));
    let campaign = ann.wait_for(CommandKind::SetCampaign);
    assert!(campaign.get::<&tabletop_model::Campaign>(0).unwrap().zones().next().is_none());

    let zone = tabletop_model::Zone::new("Cellar");
    let zone_id = zone.id;
    let put_zone = Command::new(CommandKind::PutZone, vec![Arg::zone(zone)]).unwrap();
    ann.send(&ClientMessage::call(&put_zone).unwrap());

    let token = Token::new("Bat");
    let put = Command::new(CommandKind::PutToken, vec![Arg::Guid(zone_id), Arg::token(token.clone())]).unwrap();
    ann.send(&ClientMessage::Call {
        kind: "putToken".into(),
        args: encode_args(put.args()).unwrap(),
    });

    let correction = ann.wait_for(CommandKind::UpdateTokenProperty);
    assert!(correction.sender().is_server());
    assert_eq!(correction.get::<tabletop_model::Guid>(1).unwrap(), token.id);
    assert_eq!(correction.get::<&[Arg]>(3).unwrap(), &[Arg::Int(1)]);
    handle.stop();
}
