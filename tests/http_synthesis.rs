use pdf_narrator::cache::AudioClip;
use pdf_narrator::config::AppConfig;
use pdf_narrator::document::{DocumentBackend, PDF_MIME, PdfDocument, Upload};
use pdf_narrator::error::{NarrationError, Result};
use pdf_narrator::generation::{GenerationEventKind, GenerationJob, run_generation};
use pdf_narrator::playback::{AudioOutput, PlaybackState};
use pdf_narrator::settings::NarrationSettings;
use pdf_narrator::synthesis::{Credentials, HttpSynthesisClient, SynthesisRequest};
use pdf_narrator::{ReaderSession, cancellation::CancellationToken};
use image::RgbaImage;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

enum Reply {
    Sized(Vec<u8>),
    Chunked(Vec<Vec<u8>>),
    Status(u16, &'static str),
}

#[derive(Debug)]
struct Captured {
    request_line: String,
    headers: HashMap<String, String>,
    body: serde_json::Value,
}

/// One-shot HTTP/1.1 server on a loopback port.
fn serve(reply: Reply) -> (SocketAddr, Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let captured = read_request(&stream);
        tx.send(captured).expect("test still listening");
        write_reply(stream, reply);
    });
    (addr, rx)
}

fn read_request(stream: &TcpStream) -> Captured {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).expect("request line");

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("header line");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).expect("request body");
    Captured {
        request_line: request_line.trim_end().to_string(),
        headers,
        body: serde_json::from_slice(&body).expect("json body"),
    }
}

fn write_reply(mut stream: TcpStream, reply: Reply) {
    match reply {
        Reply::Sized(body) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).expect("write head");
            stream.write_all(&body).expect("write body");
        }
        Reply::Chunked(chunks) => {
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                )
                .expect("write head");
            for chunk in chunks {
                stream
                    .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                    .expect("chunk size");
                stream.write_all(&chunk).expect("chunk data");
                stream.write_all(b"\r\n").expect("chunk end");
                stream.flush().expect("flush");
            }
            stream.write_all(b"0\r\n\r\n").expect("last chunk");
        }
        Reply::Status(status, body) => {
            let head = format!(
                "HTTP/1.1 {status} Error\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(head.as_bytes()).expect("write reply");
        }
    }
    stream.flush().expect("flush");
}

fn client(addr: SocketAddr) -> HttpSynthesisClient {
    HttpSynthesisClient::with_endpoint(
        format!("http://{addr}/api/v1/tts/stream"),
        WAIT,
        Credentials::new("test-key", "test-user"),
    )
    .expect("client builds")
}

fn job(text: &str) -> GenerationJob {
    let config = AppConfig::default();
    let settings = NarrationSettings::from_config(&config);
    GenerationJob {
        request_id: 1,
        page: 1,
        request: SynthesisRequest::new(text.to_string(), &settings, &config),
        token: CancellationToken::new(),
    }
}

fn run(client: &HttpSynthesisClient, job: &GenerationJob) -> Vec<GenerationEventKind> {
    let mut events = Vec::new();
    run_generation(client, job, |event| events.push(event.kind));
    events
}

#[test]
fn sized_response_streams_with_proportional_progress() {
    let audio: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let (addr, captured) = serve(Reply::Sized(audio.clone()));

    let events = run(&client(addr), &job("Hello from page one."));

    let request = captured.recv_timeout(WAIT).expect("request captured");
    assert_eq!(request.request_line, "POST /api/v1/tts/stream HTTP/1.1");
    assert_eq!(request.headers.get("authorization").map(String::as_str), Some("test-key"));
    assert_eq!(request.headers.get("x-user-id").map(String::as_str), Some("test-user"));
    assert_eq!(request.headers.get("accept").map(String::as_str), Some("audio/mpeg"));
    assert_eq!(request.body["text"], "Hello from page one.");
    assert_eq!(request.body["outputFormat"], "mp3");
    assert_eq!(request.body["model"], "PlayDialog");

    assert_eq!(
        events.first(),
        Some(&GenerationEventKind::Started {
            content_length: Some(audio.len() as u64)
        })
    );
    let progress: Vec<f32> = events
        .iter()
        .filter_map(|event| match event {
            GenerationEventKind::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(progress.iter().all(|pct| *pct < 100.0));
    assert_eq!(
        events.last(),
        Some(&GenerationEventKind::Completed { bytes: audio })
    );
}

#[test]
fn chunked_response_without_length_completes() {
    let chunks = vec![vec![1u8; 1000], vec![2u8; 1000], vec![3u8; 1000]];
    let (addr, _captured) = serve(Reply::Chunked(chunks.clone()));

    let events = run(&client(addr), &job("Chunked."));

    assert_eq!(
        events.first(),
        Some(&GenerationEventKind::Started {
            content_length: None
        })
    );
    assert!(events.iter().all(|event| match event {
        GenerationEventKind::Progress { percent } => *percent <= 90.0,
        _ => true,
    }));
    assert_eq!(
        events.last(),
        Some(&GenerationEventKind::Completed {
            bytes: chunks.concat()
        })
    );
}

#[test]
fn server_error_is_reported_with_status_and_body() {
    let (addr, _captured) = serve(Reply::Status(500, "upstream exploded"));

    let events = run(&client(addr), &job("Fails."));

    assert_eq!(
        events,
        vec![GenerationEventKind::Failed {
            error: NarrationError::ServiceError {
                status: 500,
                body: "upstream exploded".to_string(),
            }
        }]
    );
}

#[test]
fn refused_connection_is_a_network_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        listener.local_addr().expect("local addr")
    };

    let events = run(&client(addr), &job("Nobody home."));

    assert!(matches!(
        events.as_slice(),
        [GenerationEventKind::Failed {
            error: NarrationError::NetworkError(_)
        }]
    ));
}

struct OnePageBackend;

struct OnePage;

impl PdfDocument for OnePage {
    fn page_count(&self) -> Option<usize> {
        Some(1)
    }

    fn render_page(&self, _page: usize, _scale: f32) -> Result<RgbaImage> {
        Ok(RgbaImage::new(1, 1))
    }

    fn text_runs(&self, _page: usize) -> Result<Vec<String>> {
        Ok(vec!["Only".to_string(), "page.".to_string()])
    }
}

impl DocumentBackend for OnePageBackend {
    fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>> {
        Ok(Box::new(OnePage))
    }
}

struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn load(&mut self, _clip: &AudioClip) -> Result<()> {
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn stop(&mut self) {}

    fn is_finished(&self) -> bool {
        false
    }
}

#[test]
fn session_caches_audio_fetched_over_http() {
    let (addr, captured) = serve(Reply::Sized(vec![7u8; 2048]));
    let mut session = ReaderSession::new(AppConfig::default(), Box::new(SilentOutput));
    session
        .load_document(
            Upload::new("one.pdf", Some(PDF_MIME), b"%PDF-1.4".to_vec()),
            &OnePageBackend,
        )
        .expect("document loads");

    session
        .generate_with(&client(addr))
        .expect("generation succeeds");

    let request = captured.recv_timeout(WAIT).expect("request captured");
    assert_eq!(request.body["text"], "Only page.");
    assert_eq!(session.cache().pages(), vec![1]);
    assert_eq!(session.playback().state(), PlaybackState::Playing);
    assert_eq!(session.generation().progress(), None);
}
