//! Remote Backend Tests
//!
//! Runs `RemoteBackend` against the loopback emulator and against scripted
//! transports that replay fixed reply bytes.

use std::cell::Cell;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;
use std::sync::Arc;

use embedkv::backend::SessionState;
use embedkv::emulator::{Loopback, PreferenceTable};
use embedkv::{Config, KvError, KvStore, KvStoreExt, RemoteBackend, ReplyParsing, ValueType};
use parking_lot::Mutex;

// =============================================================================
// Helper Types
// =============================================================================

/// Replays canned reply bytes and records everything written
struct Scripted {
    replies: Cursor<Vec<u8>>,
    written: Vec<u8>,
}

impl Scripted {
    fn new(replies: &[u8]) -> Self {
        Self {
            replies: Cursor::new(replies.to_vec()),
            written: Vec::new(),
        }
    }
}

impl Read for Scripted {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.replies.read(buf)
    }
}

impl Write for Scripted {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Loopback that stops accepting bytes once a shared budget runs out
struct ShortWrite {
    inner: Loopback,
    budget: Rc<Cell<Option<usize>>>,
}

impl Read for ShortWrite {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ShortWrite {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self.budget.get() {
            None => buf.len(),
            Some(remaining) => {
                let n = remaining.min(buf.len());
                self.budget.set(Some(remaining - n));
                n
            }
        };
        if n == 0 {
            return Ok(0);
        }
        self.inner.write(&buf[..n])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn shared_table() -> Arc<Mutex<PreferenceTable>> {
    Arc::new(Mutex::new(PreferenceTable::new()))
}

fn open_remote(table: &Arc<Mutex<PreferenceTable>>, config: Config) -> RemoteBackend<Loopback> {
    let store = RemoteBackend::new(Loopback::with_table(Arc::clone(table)), config).unwrap();
    store.begin().unwrap();
    store
}

fn lenient() -> Config {
    Config::builder().reply_parsing(ReplyParsing::Lenient).build()
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_session_states() {
    let store = RemoteBackend::new(Loopback::new(), Config::default()).unwrap();
    assert_eq!(store.state(), SessionState::Closed);

    store.begin().unwrap();
    assert_eq!(
        store.state(),
        SessionState::Open {
            name: "arduino".to_string(),
            read_only: false,
        }
    );
    assert!(matches!(store.begin(), Err(KvError::AlreadyOpen)));

    store.end().unwrap();
    assert_eq!(store.state(), SessionState::Closed);
}

#[test]
fn test_calls_before_begin_send_nothing() {
    let store = RemoteBackend::new(Scripted::new(b""), Config::default()).unwrap();

    assert!(matches!(store.put_u8("a", 1), Err(KvError::NotOpen)));
    assert!(matches!(store.get_bytes_length("a"), Err(KvError::NotOpen)));
    assert!(store.into_inner().written.is_empty());
}

#[test]
fn test_begin_line_on_the_wire() {
    let config = Config::builder()
        .store_name("cfg")
        .read_only(true)
        .partition_label("nvs2")
        .build();
    let store = RemoteBackend::new(Scripted::new(b"1\r\n"), config).unwrap();
    store.begin().unwrap();

    assert_eq!(store.into_inner().written, b"PREF_BEGIN,cfg,1,nvs2\r\n");
}

#[test]
fn test_rejected_begin_stays_closed() {
    let store = RemoteBackend::new(Scripted::new(b"0\r\n"), Config::default()).unwrap();

    assert!(matches!(store.begin(), Err(KvError::Rejected("begin"))));
    assert!(!store.is_open());
}

#[test]
fn test_overlong_key_is_rejected_locally() {
    let store = RemoteBackend::new(Scripted::new(b"1\r\n"), Config::default()).unwrap();
    store.begin().unwrap();

    let err = store.put_u8("a_key_longer_than_15", 1).unwrap_err();
    assert!(matches!(err, KvError::InvalidKey { .. }));
    assert_eq!(store.into_inner().written, b"PREF_BEGIN,arduino,0,\r\n");
}

// =============================================================================
// Data Tests (loopback)
// =============================================================================

#[test]
fn test_put_get_remove_i32() {
    let table = shared_table();
    let store = open_remote(&table, Config::default());

    assert_eq!(store.put_i32("temp", -42).unwrap(), 4);
    assert_eq!(store.get_i32("temp", 0).unwrap(), -42);
    assert_eq!(store.type_of("temp").unwrap(), Some(ValueType::I32));

    assert!(store.remove("temp").unwrap());
    assert!(!store.exists("temp").unwrap());
    assert_eq!(store.type_of("temp").unwrap(), None);
}

#[test]
fn test_every_scalar_round_trips() {
    let store = open_remote(&shared_table(), Config::default());

    store.put_i8("i8", -128).unwrap();
    store.put_u8("u8", 255).unwrap();
    store.put_i16("i16", -32768).unwrap();
    store.put_u16("u16", 65535).unwrap();
    store.put_i32("i32", i32::MIN).unwrap();
    store.put_u32("u32", u32::MAX).unwrap();
    store.put_i64("i64", i64::MIN).unwrap();
    store.put_u64("u64", u64::MAX).unwrap();
    store.put_f64("f64", 1e-3).unwrap();
    store.put_bool("ok", true).unwrap();

    assert_eq!(store.get_i8("i8", 0).unwrap(), -128);
    assert_eq!(store.get_u8("u8", 0).unwrap(), 255);
    assert_eq!(store.get_i16("i16", 0).unwrap(), -32768);
    assert_eq!(store.get_u16("u16", 0).unwrap(), 65535);
    assert_eq!(store.get_i32("i32", 0).unwrap(), i32::MIN);
    assert_eq!(store.get_u32("u32", 0).unwrap(), u32::MAX);
    assert_eq!(store.get_i64("i64", 0).unwrap(), i64::MIN);
    assert_eq!(store.get_u64("u64", 0).unwrap(), u64::MAX);
    assert_eq!(store.get_f64("f64", 0.0).unwrap(), 1e-3);
    assert!(store.get_bool("ok", false).unwrap());
    assert_eq!(store.type_of("ok").unwrap(), Some(ValueType::Blob));
}

#[test]
fn test_string_reads() {
    let store = open_remote(&shared_table(), Config::default());
    store.put_string("name", "pippo").unwrap();

    let mut buf = [0u8; 6];
    assert_eq!(store.get_string("name", &mut buf).unwrap(), 5);
    assert_eq!(&buf[..5], b"pippo");

    let mut short = [0u8; 2];
    assert_eq!(store.get_string("name", &mut short).unwrap(), 2);
    assert_eq!(&short, b"pi");

    // The full payload was drained; the channel is still framed
    assert_eq!(store.get_bytes_length("name").unwrap(), 5);
}

#[test]
fn test_large_blob_partial_read() {
    let store = open_remote(&shared_table(), Config::default());
    let blob: Vec<u8> = (0..5000u32).map(|i| (i * 7) as u8).collect();

    assert_eq!(store.put_bytes("blob", &blob).unwrap(), 5000);

    let mut buf = [0u8; 3];
    assert_eq!(store.get_bytes("blob", &mut buf).unwrap(), 3);
    assert_eq!(&buf, &blob[..3]);
    assert_eq!(store.get_bytes_length("blob").unwrap(), 5000);
}

#[test]
fn test_namespaces_are_separate() {
    let table = shared_table();
    let first = open_remote(&table, Config::builder().store_name("one").build());
    let second = open_remote(&table, Config::builder().store_name("two").build());

    first.put_u8("k", 1).unwrap();
    assert!(!second.exists("k").unwrap());

    second.clear().unwrap();
    assert_eq!(first.get_u8("k", 0).unwrap(), 1);
}

// =============================================================================
// Type Mismatch / Read-Only Tests
// =============================================================================

#[test]
fn test_type_mismatch_is_an_error_when_strict() {
    let store = open_remote(&shared_table(), Config::default());
    store.put_u8("k", 9).unwrap();

    let err = store.get_u32("k", 0).unwrap_err();
    assert!(matches!(err, KvError::Remote(_)));

    // The ERR line carried no payload; the next exchange is unaffected
    assert_eq!(store.get_u8("k", 0).unwrap(), 9);
}

#[test]
fn test_type_mismatch_reads_zero_when_lenient() {
    let store = open_remote(&shared_table(), lenient());
    store.put_u8("k", 9).unwrap();

    assert_eq!(store.get_u32("k", 5).unwrap(), 0);
}

#[test]
fn test_read_only_session() {
    let table = shared_table();
    let writer = open_remote(&table, Config::default());
    writer.put_bytes("cal", &[1; 10]).unwrap();
    writer.end().unwrap();

    let reader = open_remote(&table, Config::builder().read_only(true).build());
    assert!(matches!(
        reader.put_bytes("cal", &[2; 4]),
        Err(KvError::Rejected("put"))
    ));
    assert!(!reader.remove("cal").unwrap());
    assert!(matches!(reader.clear(), Err(KvError::Rejected(_))));

    // Nothing changed, and the channel is still usable
    assert_eq!(reader.get_bytes_length("cal").unwrap(), 10);
    let mut buf = [0u8; 10];
    assert_eq!(reader.get_bytes("cal", &mut buf).unwrap(), 10);
    assert_eq!(buf, [1; 10]);
}

#[test]
fn test_empty_put_on_read_only_session_is_rejected() {
    let table = shared_table();
    let writer = open_remote(&table, Config::default());
    assert_eq!(writer.put_bytes("empty", &[]).unwrap(), 0);
    assert_eq!(writer.type_of("empty").unwrap(), Some(ValueType::Blob));
    writer.end().unwrap();

    let reader = open_remote(&table, Config::builder().read_only(true).build());
    assert!(matches!(
        reader.put_bytes("fresh", &[]),
        Err(KvError::Rejected("put"))
    ));
    assert_eq!(reader.type_of("fresh").unwrap(), None);
}

#[test]
fn test_read_only_begin_needs_existing_namespace() {
    let store = RemoteBackend::new(
        Loopback::new(),
        Config::builder().store_name("fresh").read_only(true).build(),
    )
    .unwrap();

    assert!(matches!(store.begin(), Err(KvError::Rejected("begin"))));
}

// =============================================================================
// Reply Parsing Tests (scripted)
// =============================================================================

#[test]
fn test_malformed_reply_strict_vs_lenient() {
    let strict = RemoteBackend::new(Scripted::new(b"1\r\nbogus\r\n"), Config::default()).unwrap();
    strict.begin().unwrap();
    assert!(matches!(
        strict.get_bytes_length("k"),
        Err(KvError::MalformedReply(_))
    ));

    let lenient = RemoteBackend::new(Scripted::new(b"1\r\nbogus\r\n"), lenient()).unwrap();
    lenient.begin().unwrap();
    assert_eq!(lenient.get_bytes_length("k").unwrap(), 0);
}

#[test]
fn test_error_reply_strict_vs_lenient() {
    let strict = RemoteBackend::new(Scripted::new(b"1\r\nERR,flash busy\r\n"), Config::default()).unwrap();
    strict.begin().unwrap();
    match strict.remove("k") {
        Err(KvError::Remote(reason)) => assert_eq!(reason, "flash busy"),
        other => panic!("Expected Remote error, got {:?}", other),
    }

    let lenient = RemoteBackend::new(Scripted::new(b"1\r\nERR,flash busy\r\n"), lenient()).unwrap();
    lenient.begin().unwrap();
    assert!(!lenient.remove("k").unwrap());
}

#[test]
fn test_out_of_range_scalar_reply() {
    // LEN says present, then GET answers 300 for a u8
    let store = RemoteBackend::new(Scripted::new(b"1\r\n1\r\n300\r\n"), Config::default()).unwrap();
    store.begin().unwrap();

    assert!(matches!(store.get_u8("k", 0), Err(KvError::MalformedReply(_))));
}

#[test]
fn test_transport_failure_keeps_session_open() {
    let store = RemoteBackend::new(Scripted::new(b"1\r\n"), Config::default()).unwrap();
    store.begin().unwrap();

    assert!(matches!(store.get_bytes_length("k"), Err(KvError::Io(_))));
    assert!(store.is_open());
}

#[test]
fn test_wire_bytes_of_passthrough_put() {
    let store = RemoteBackend::new(Scripted::new(b"1\r\n5\r\n"), Config::default()).unwrap();
    store.begin().unwrap();
    store.put_string("name", "pippo").unwrap();

    let written = store.into_inner().written;
    assert!(written.ends_with(b"PREF_PUT,name,8,5\r\npippo"));
}

// =============================================================================
// Desync Tests
// =============================================================================

#[test]
fn test_owner_stored_fewer_bytes_than_declared() {
    let store = RemoteBackend::new(Scripted::new(b"1\r\n7\r\n"), Config::default()).unwrap();
    store.begin().unwrap();

    match store.put_bytes("blob", &[0xAB; 10]) {
        Err(KvError::ProtocolDesync {
            declared,
            transferred,
        }) => {
            assert_eq!(declared, 10);
            assert_eq!(transferred, 7);
        }
        other => panic!("Expected ProtocolDesync, got {:?}", other),
    }
    assert_eq!(store.state(), SessionState::Desynced);
    assert!(matches!(store.get_bytes_length("blob"), Err(KvError::SessionDesynced)));
    assert!(matches!(store.begin(), Err(KvError::SessionDesynced)));
}

#[test]
fn test_short_data_reply_desyncs() {
    let store = RemoteBackend::new(Scripted::new(b"1\r\n10\r\nabc"), Config::default()).unwrap();
    store.begin().unwrap();

    let mut buf = [0u8; 10];
    let err = store.get_bytes("blob", &mut buf).unwrap_err();
    assert!(matches!(err, KvError::ProtocolDesync { declared: 10, transferred: 3 }));
    assert!(err.requires_reset());
    assert_eq!(store.state(), SessionState::Desynced);
}

#[test]
fn test_unusable_data_length_desyncs() {
    let store = RemoteBackend::new(Scripted::new(b"1\r\nxyz\r\n"), Config::default()).unwrap();
    store.begin().unwrap();

    let mut buf = [0u8; 4];
    assert!(matches!(
        store.get_bytes("blob", &mut buf),
        Err(KvError::MalformedReply(_))
    ));
    assert_eq!(store.state(), SessionState::Desynced);
}

#[test]
fn test_short_payload_write_then_reset() {
    let table = shared_table();
    let budget = Rc::new(Cell::new(None));
    let transport = ShortWrite {
        inner: Loopback::with_table(Arc::clone(&table)),
        budget: Rc::clone(&budget),
    };

    let store = RemoteBackend::new(transport, Config::default()).unwrap();
    store.begin().unwrap();
    store.put_u16("kept", 7).unwrap();

    // Header "PREF_PUT,blob,9,10\r\n" goes out whole, then 7 of 10 payload bytes
    budget.set(Some("PREF_PUT,blob,9,10\r\n".len() + 7));
    match store.put_bytes("blob", b"0123456789") {
        Err(KvError::ProtocolDesync {
            declared,
            transferred,
        }) => {
            assert_eq!(declared, 10);
            assert_eq!(transferred, 7);
        }
        other => panic!("Expected ProtocolDesync, got {:?}", other),
    }
    assert!(matches!(store.get_u16("kept", 0), Err(KvError::SessionDesynced)));

    let old = store.reset(ShortWrite {
        inner: Loopback::with_table(Arc::clone(&table)),
        budget: Rc::new(Cell::new(None)),
    });
    assert_eq!(old.inner.pending_input(), "PREF_PUT,blob,9,10\r\n".len() + 7);

    assert_eq!(store.state(), SessionState::Closed);
    store.begin().unwrap();
    assert_eq!(store.get_u16("kept", 0).unwrap(), 7);
    assert!(!store.exists("blob").unwrap());
}
