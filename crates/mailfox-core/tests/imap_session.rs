//! End-to-end: a session over `ImapStore` against a scripted local server,
//! followed by an export of the loaded message.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mailfox_core::{
    ConnectParams, ExportFormat, Exporter, ImapStore, MailboxSession, Security, SessionError,
    SessionState,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

fn message(n: usize) -> String {
    format!(
        "Subject: Message {n}\r\nFrom: sender{n}@example.com\r\nTo: me@example.com\r\n\
         Date: Mon, 7 Oct 2024 10:0{n}:00 +0000\r\n\
         Content-Type: multipart/mixed; boundary=b\r\n\r\n\
         --b\r\nContent-Type: text/plain\r\n\r\nBody {n}\r\n\
         --b\r\nContent-Type: text/plain\r\nContent-Disposition: attachment; filename=notes{n}.txt\r\n\r\nnotes\r\n\
         --b--\r\n"
    )
}

/// Serves one connection: INBOX holds messages 1..=4 and message 3 cannot be fetched.
async fn serve(listener: TcpListener) {
    let (socket, _) = listener.accept().await.unwrap();
    let (read, mut write) = socket.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"* OK test server ready\r\n").await.unwrap();

    while let Some(line) = lines.next_line().await.unwrap() {
        let mut words = line.splitn(3, ' ');
        let tag = words.next().unwrap_or_default().to_string();
        let command = words.next().unwrap_or_default().to_ascii_uppercase();
        let args = words.next().unwrap_or_default().to_string();

        let reply = match command.as_str() {
            "LOGIN" if args == "me secret" => format!("{tag} OK LOGIN completed\r\n"),
            "LOGIN" => format!("{tag} NO [AUTHENTICATIONFAILED] bad credentials\r\n"),
            "LIST" => format!(
                "* LIST (\\HasNoChildren) \"/\" INBOX\r\n\
                 * LIST (\\HasNoChildren) \"/\" \"Sent Items\"\r\n\
                 {tag} OK LIST completed\r\n"
            ),
            "SELECT" if args == "INBOX" => {
                format!("* 4 EXISTS\r\n* 0 RECENT\r\n{tag} OK [READ-WRITE] SELECT completed\r\n")
            }
            "SELECT" => format!("{tag} NO Mailbox does not exist\r\n"),
            "SEARCH" if args == "ALL" => format!("* SEARCH 1 2 3 4\r\n{tag} OK SEARCH completed\r\n"),
            "SEARCH" if args == "TEXT \"Body 2\"" => {
                format!("* SEARCH 2\r\n{tag} OK SEARCH completed\r\n")
            }
            "SEARCH" => format!("* SEARCH\r\n{tag} OK SEARCH completed\r\n"),
            "FETCH" if args.starts_with("3 ") => format!("{tag} NO message expunged\r\n"),
            "FETCH" => {
                let n: usize = args.split(' ').next().unwrap().parse().unwrap();
                let body = message(n);
                format!(
                    "* {n} FETCH (RFC822 {{{}}}\r\n{body})\r\n{tag} OK FETCH completed\r\n",
                    body.len()
                )
            }
            "CLOSE" => format!("{tag} OK CLOSE completed\r\n"),
            "LOGOUT" => {
                let bye = format!("* BYE logging out\r\n{tag} OK LOGOUT completed\r\n");
                write.write_all(bye.as_bytes()).await.unwrap();
                break;
            }
            _ => format!("{tag} BAD unknown command\r\n"),
        };
        write.write_all(reply.as_bytes()).await.unwrap();
    }
}

async fn start_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(listener));
    port
}

fn params(port: u16, secret: &str) -> ConnectParams {
    ConnectParams {
        server: "127.0.0.1".to_string(),
        port,
        user: "me".to_string(),
        secret: secret.to_string(),
        security: Security::Plain,
    }
}

#[tokio::test]
async fn browse_and_export() {
    let port = start_server().await;
    let mut session = MailboxSession::<ImapStore>::connect(&params(port, "secret"))
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Connected);

    assert_eq!(
        session.list_folders().await.unwrap(),
        vec!["INBOX", "Sent Items"]
    );

    let err = session.select_folder("Sent Items").await.unwrap_err();
    assert!(matches!(err, SessionError::FolderUnavailable { .. }));

    assert_eq!(session.select_folder("INBOX").await.unwrap(), 4);
    let report = session.load_messages(20).await.unwrap();
    assert_eq!((report.loaded, report.failed), (3, 1));

    let subjects: Vec<_> = session.messages().iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Message 1", "Message 2", "Message 4"]);

    assert!(session.next());
    let current = session.view_current().unwrap();
    assert_eq!(current.body(), Some("Body 2"));

    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path());
    let export = exporter.export(current, ExportFormat::All);
    assert!(export.is_success());
    let eml = dir.path().join(format!("{}.eml", export.base_name));
    assert_eq!(std::fs::read(eml).unwrap(), message(2).as_bytes());
    let notes = dir
        .path()
        .join(&export.base_name)
        .join("attachments")
        .join("notes2.txt");
    assert_eq!(std::fs::read_to_string(notes).unwrap(), "notes");

    let found = session.search("Body 2").await.unwrap();
    assert_eq!(found.loaded, 1);
    assert!(matches!(
        session.search("nothing here").await,
        Err(SessionError::NoMatches(_))
    ));

    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn bad_password_is_connection_error() {
    let port = start_server().await;
    let err = MailboxSession::<ImapStore>::connect(&params(port, "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Connection(_)));
}
